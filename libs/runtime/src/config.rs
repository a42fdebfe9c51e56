use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::paths::resolve_home_dir;

const DEFAULT_HOME_SUBDIR: &str = ".cloud-gateway";

/// Gateway configuration: typed global sections plus a per-module bag.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    /// Uses [`default_logging_config`] when absent.
    pub logging: Option<LoggingConfig>,
    /// Directory of extra `<module>.yaml` files merged into `modules`.
    #[serde(default)]
    pub modules_dir: Option<String>,
    /// module name → raw section, deserialized by the module itself.
    #[serde(default)]
    pub modules: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Normalized to an absolute path at load time; empty means the platform default.
    pub home_dir: String,
    pub host: String,
    pub port: u16,
}

/// Subsystem name → logging section. `"default"` catches every other target.
pub type LoggingConfig = HashMap<String, Section>;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Section {
    /// "trace" | "debug" | "info" | "warn" | "error" | "off"
    pub console_level: String,
    /// Empty disables file output for this section.
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub file_level: String,
    #[serde(default)]
    pub max_backups: Option<usize>,
    #[serde(default)]
    pub max_size_mb: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            home_dir: String::new(),
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

pub fn default_logging_config() -> LoggingConfig {
    let mut logging = HashMap::new();
    logging.insert(
        "default".to_string(),
        Section {
            console_level: "info".to_string(),
            file: "logs/gateway.log".to_string(),
            file_level: "debug".to_string(),
            max_backups: Some(3),
            max_size_mb: Some(100),
        },
    );
    logging
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: Some(default_logging_config()),
            modules_dir: None,
            modules: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// Layered load: defaults → YAML file → `APP__`-prefixed environment.
    /// Normalizes (and creates) `server.home_dir`, then merges `modules_dir`.
    pub fn load_layered<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        use figment::{
            providers::{Env, Format, Serialized, Yaml},
            Figment,
        };

        let path = config_path.as_ref();
        if !path.exists() {
            return Err(anyhow!("config file {} does not exist", path.display()));
        }

        // Optional sections stay None unless the file or env provides them.
        let base = AppConfig {
            logging: None,
            ..AppConfig::default()
        };

        // APP__SERVER__PORT=9000 maps to server.port
        let mut config: AppConfig = Figment::new()
            .merge(Serialized::defaults(base))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("APP__").split("__"))
            .extract()
            .with_context(|| format!("invalid configuration in {}", path.display()))?;

        normalize_home_dir_inplace(&mut config.server)?;

        if let Some(dir) = config.modules_dir.clone() {
            merge_module_files(&mut config.modules, dir)?;
        }

        Ok(config)
    }

    pub fn load_or_default<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_layered(path),
            None => {
                let mut c = Self::default();
                normalize_home_dir_inplace(&mut c.server)?;
                Ok(c)
            }
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("failed to serialize config to YAML")
    }

    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(port) = args.port {
            self.server.port = port;
        }

        let logging = self.logging.get_or_insert_with(default_logging_config);
        if let Some(default_section) = logging.get_mut("default") {
            match args.verbose {
                0 => {}
                1 => default_section.console_level = "debug".to_string(),
                _ => default_section.console_level = "trace".to_string(),
            }
        }
    }

    pub fn home_dir(&self) -> &Path {
        Path::new(&self.server.home_dir)
    }

    /// Lenient: the module's section as `T`, or `T::default()` when it is
    /// missing or does not deserialize.
    pub fn module_config<T: DeserializeOwned + Default>(&self, module: &str) -> T {
        match self.modules.get(module) {
            Some(raw) => serde_json::from_value(raw.clone()).unwrap_or_else(|e| {
                tracing::warn!(module, error = %e, "invalid module config, using defaults");
                T::default()
            }),
            None => T::default(),
        }
    }

    /// Strict: the section must exist and deserialize.
    pub fn module_config_required<T: DeserializeOwned>(&self, module: &str) -> Result<T> {
        let raw = self
            .modules
            .get(module)
            .ok_or_else(|| anyhow!("missing module config: {module}"))?;
        serde_json::from_value(raw.clone()).with_context(|| format!("invalid {module} config"))
    }
}

/// Command line overrides handed from the binary to the config layer.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config: Option<String>,
    pub port: Option<u16>,
    pub print_config: bool,
    pub verbose: u8,
    pub mock: bool,
}

fn normalize_home_dir_inplace(server: &mut ServerConfig) -> Result<()> {
    let configured = Some(server.home_dir.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let resolved: PathBuf = resolve_home_dir(configured, DEFAULT_HOME_SUBDIR, true)
        .context("failed to resolve server.home_dir")?;
    server.home_dir = resolved.to_string_lossy().to_string();
    Ok(())
}

fn merge_module_files(
    bag: &mut HashMap<String, serde_json::Value>,
    dir: impl AsRef<Path>,
) -> Result<()> {
    let dir = dir.as_ref();
    if !dir.exists() {
        tracing::debug!(dir = %dir.display(), "modules_dir does not exist, skipping");
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let is_yaml = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
        let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
            continue;
        };
        if !is_yaml {
            continue;
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let val: serde_yaml::Value = serde_yaml::from_str(&raw)
            .with_context(|| format!("invalid YAML in {}", path.display()))?;
        bag.insert(name, serde_json::to_value(val)?);
    }
    Ok(())
}
