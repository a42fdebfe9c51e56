//! Subscriber setup from [`LoggingConfig`].
//!
//! Console output is human-readable; file output is JSON lines routed to one
//! rotating file per configured subsystem, with the `default` section catching
//! every target no other section claims.
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};
use parking_lot::Mutex;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt::{self, MakeWriter};

use crate::config::{LoggingConfig, Section};
use crate::paths::resolve_under;

const DEFAULT_SECTION: &str = "default";
const DEFAULT_MAX_SIZE_MB: u64 = 100;
const DEFAULT_MAX_BACKUPS: usize = 3;

/// Empty strings fall back to `inherit`; unknown names mean `info`.
fn parse_level(raw: &str, inherit: LevelFilter) -> LevelFilter {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => inherit,
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        "off" | "none" => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

/// `target` belongs to `prefix` when equal to it or nested under it with `::`.
fn matches_prefix(target: &str, prefix: &str) -> bool {
    target
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

type SharedRotate = Arc<Mutex<FileRotate<AppendTimestamp>>>;

#[derive(Clone)]
struct RotWriter(SharedRotate);

/// Writer handle; `None` swallows the record.
struct RoutedWriter(Option<SharedRotate>);

impl Write for RoutedWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &self.0 {
            Some(file) => file.lock().write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &self.0 {
            Some(file) => file.lock().flush(),
            None => Ok(()),
        }
    }
}

/// Picks the file for a record by target prefix, longest prefix first.
struct MultiFileRouter {
    default: Option<RotWriter>,
    by_prefix: Vec<(String, RotWriter)>,
}

impl MultiFileRouter {
    fn resolve_for(&self, target: &str) -> Option<SharedRotate> {
        self.by_prefix
            .iter()
            .find(|(prefix, _)| matches_prefix(target, prefix))
            .map(|(_, w)| w.0.clone())
            .or_else(|| self.default.as_ref().map(|w| w.0.clone()))
    }

    fn is_empty(&self) -> bool {
        self.default.is_none() && self.by_prefix.is_empty()
    }
}

impl<'a> MakeWriter<'a> for MultiFileRouter {
    type Writer = RoutedWriter;

    fn make_writer(&'a self) -> Self::Writer {
        RoutedWriter(self.default.as_ref().map(|w| w.0.clone()))
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        RoutedWriter(self.resolve_for(meta.target()))
    }
}

fn open_rotating(path: &Path, section: &Section) -> std::io::Result<RotWriter> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let max_bytes = section.max_size_mb.unwrap_or(DEFAULT_MAX_SIZE_MB) * 1024 * 1024;
    let backups = section.max_backups.unwrap_or(DEFAULT_MAX_BACKUPS);
    let rot = FileRotate::new(
        path,
        AppendTimestamp::default(FileLimit::MaxFiles(backups)),
        ContentLimit::BytesSurpassed(max_bytes as usize),
        Compression::None,
        #[cfg(unix)]
        None,
    );
    Ok(RotWriter(Arc::new(Mutex::new(rot))))
}

fn file_writer(name: &str, section: &Section, base_dir: &Path) -> Option<RotWriter> {
    if section.file.trim().is_empty() {
        return None;
    }
    let path = resolve_under(base_dir, &section.file);
    match open_rotating(&path, section) {
        Ok(w) => Some(w),
        Err(e) => {
            eprintln!(
                "failed to open log file for '{name}' at {}: {e}",
                path.display()
            );
            None
        }
    }
}

/// Resolved filters and writers for one [`LoggingConfig`].
struct Plan {
    console: Targets,
    file: Targets,
    router: MultiFileRouter,
}

fn plan(cfg: &LoggingConfig, base_dir: &Path) -> Plan {
    let default = cfg.get(DEFAULT_SECTION);
    let default_console = default
        .map(|s| parse_level(&s.console_level, LevelFilter::INFO))
        .unwrap_or(LevelFilter::OFF);
    let default_file_writer = default.and_then(|s| file_writer(DEFAULT_SECTION, s, base_dir));
    let default_file = match (default, &default_file_writer) {
        (Some(s), Some(_)) => parse_level(&s.file_level, default_console),
        _ => LevelFilter::OFF,
    };

    let mut console = Targets::new().with_default(default_console);
    let mut file = Targets::new().with_default(default_file);
    let mut by_prefix = Vec::new();

    let mut sections: Vec<(&String, &Section)> = cfg
        .iter()
        .filter(|(name, _)| name.as_str() != DEFAULT_SECTION)
        .collect();
    // Longest prefix wins when routing.
    sections.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));

    for (name, section) in sections {
        let console_level = parse_level(&section.console_level, default_console);
        console = console.with_target(name.clone(), console_level);

        let own_file = file_writer(name, section, base_dir);
        let file_level = if own_file.is_some() || default_file_writer.is_some() {
            parse_level(&section.file_level, console_level)
        } else {
            LevelFilter::OFF
        };
        file = file.with_target(name.clone(), file_level);

        if let Some(w) = own_file {
            by_prefix.push((name.clone(), w));
        }
    }

    Plan {
        console,
        file,
        router: MultiFileRouter {
            default: default_file_writer,
            by_prefix,
        },
    }
}

/// Install the global subscriber. Relative file paths resolve against `base_dir`
/// (the normalized `server.home_dir`). Calling it twice is a no-op.
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

    // log -> tracing bridge before the subscriber goes in.
    let _ = tracing_log::LogTracer::init();

    let Plan {
        console,
        file,
        router,
    } = plan(cfg, base_dir);

    let ansi = atty::is(atty::Stream::Stdout);
    let console_layer = fmt::layer()
        .with_ansi(ansi)
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(console);

    let file_layer = (!router.is_empty()).then(|| {
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_target(true)
            .with_current_span(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(router)
            .with_filter(file)
    });

    let _ = Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init();
}
