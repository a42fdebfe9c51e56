use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

/// Platform user directory: `%APPDATA%` on Windows, `$HOME` elsewhere.
fn user_base_dir() -> Result<PathBuf> {
    #[cfg(target_os = "windows")]
    let var = "APPDATA";
    #[cfg(not(target_os = "windows"))]
    let var = "HOME";

    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("environment variable {var} is not set"))
}

fn expand_tilde(raw: &str) -> Result<PathBuf> {
    if raw == "~" {
        return user_base_dir();
    }
    if let Some(rest) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        return Ok(user_base_dir()?.join(rest));
    }
    Ok(PathBuf::from(raw))
}

/// Resolve the gateway home directory to an absolute path.
///
/// `None` means `<user dir>/<default_subdir>`. `~` is expanded and relative
/// paths are taken against the current directory. With `create`, the directory
/// is created when missing.
pub fn resolve_home_dir(
    configured: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf> {
    let path = match configured {
        Some(raw) => expand_tilde(raw.trim())?,
        None => user_base_dir()?.join(default_subdir),
    };

    let path = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .context("cannot read current directory")?
            .join(path)
    };

    if create {
        std::fs::create_dir_all(&path)
            .with_context(|| format!("cannot create home dir {}", path.display()))?;
    }
    Ok(path)
}

/// Join `file` onto `base` unless it is already absolute.
pub fn resolve_under(base: &Path, file: &str) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}
