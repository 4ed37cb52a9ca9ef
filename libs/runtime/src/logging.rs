//! Logging bootstrap: a console layer plus JSON files routed per subsystem.
//!
//! Every non-`default` key of [`LoggingConfig`] names a target prefix
//! (usually a crate, e.g. `session_profile`). Events under that prefix use the
//! section's levels and file; everything else falls back to `default`.

use crate::config::{LoggingConfig, Section};
use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    io::{IsTerminal, Write},
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{filter::Targets, fmt, Layer, Registry};

const DEFAULT_SECTION: &str = "default";
const DEFAULT_MAX_SIZE_MB: u64 = 100;
const DEFAULT_MAX_BACKUPS: usize = 5;

fn parse_level(s: &str) -> LevelFilter {
    match s.trim().to_ascii_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" | "" => LevelFilter::INFO,
        "warn" | "warning" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        "off" | "none" => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

/// True if `target` is `prefix` itself or a `prefix::...` child.
fn matches_prefix(target: &str, prefix: &str) -> bool {
    target
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

// -------- rotating file writers --------

#[derive(Clone)]
struct RotWriter(Arc<Mutex<FileRotate<AppendTimestamp>>>);

impl Write for RotWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.lock().flush()
    }
}

/// Writer handed to the fmt layer; `None` swallows the record.
struct Routed(Option<RotWriter>);

impl Write for Routed {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.0 {
            Some(w) => w.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.0 {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }
}

/// Picks the file for a record by the longest matching subsystem prefix.
#[derive(Clone, Default)]
struct FileRouter {
    default: Option<RotWriter>,
    by_prefix: Vec<(String, RotWriter)>,
}

impl FileRouter {
    fn resolve(&self, target: &str) -> Option<RotWriter> {
        self.by_prefix
            .iter()
            .filter(|(prefix, _)| matches_prefix(target, prefix))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, w)| w.clone())
            .or_else(|| self.default.clone())
    }

    fn is_empty(&self) -> bool {
        self.default.is_none() && self.by_prefix.is_empty()
    }
}

impl<'a> fmt::MakeWriter<'a> for FileRouter {
    type Writer = Routed;

    fn make_writer(&'a self) -> Self::Writer {
        Routed(self.default.clone())
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        Routed(self.resolve(meta.target()))
    }
}

/// Resolve a log file path against `base_dir`; absolute paths are kept.
fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

fn open_rotating(log_path: &Path, section: &Section) -> std::io::Result<RotWriter> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let max_bytes = section.max_size_mb.unwrap_or(DEFAULT_MAX_SIZE_MB) * 1024 * 1024;
    // An explicit backup count wins over age-based pruning.
    let limit = match (section.max_backups, section.max_age_days) {
        (Some(n), _) => FileLimit::MaxFiles(n.max(1)),
        (None, Some(days)) => FileLimit::Age(chrono::Duration::days(i64::from(days.max(1)))),
        (None, None) => FileLimit::MaxFiles(DEFAULT_MAX_BACKUPS),
    };

    let rot = FileRotate::new(
        log_path,
        AppendTimestamp::default(limit),
        ContentLimit::BytesSurpassed(max_bytes as usize),
        Compression::None,
        #[cfg(unix)]
        None,
    );

    Ok(RotWriter(Arc::new(Mutex::new(rot))))
}

fn file_writer_for(name: &str, section: &Section, base_dir: &Path) -> Option<RotWriter> {
    if section.file.trim().is_empty() {
        return None;
    }
    let path = resolve_log_path(&section.file, base_dir);
    match open_rotating(&path, section) {
        Ok(w) => Some(w),
        Err(e) => {
            // Subscriber is not installed yet; stderr is the only channel.
            eprintln!(
                "logging: cannot open file for '{}' at {}: {}",
                name,
                path.display(),
                e
            );
            None
        }
    }
}

// -------- filter construction --------

fn default_section(cfg: &LoggingConfig) -> Option<&Section> {
    cfg.get(DEFAULT_SECTION)
}

fn subsystem_sections(cfg: &LoggingConfig) -> impl Iterator<Item = (&String, &Section)> {
    cfg.iter().filter(|(k, _)| k.as_str() != DEFAULT_SECTION)
}

/// Console: `default.console_level` for unmatched targets, per-subsystem levels otherwise.
fn console_targets(cfg: &LoggingConfig) -> Targets {
    let default_level = default_section(cfg)
        .map(|s| parse_level(&s.console_level))
        .unwrap_or(LevelFilter::OFF);

    subsystem_sections(cfg).fold(Targets::new().with_default(default_level), |t, (name, s)| {
        t.with_target(name.clone(), parse_level(&s.console_level))
    })
}

/// Files: subsystems without a file of their own are not written to any file.
fn file_targets(cfg: &LoggingConfig, router: &FileRouter) -> Targets {
    let default_level = match (default_section(cfg), &router.default) {
        (Some(s), Some(_)) => parse_level(&s.file_level),
        _ => LevelFilter::OFF,
    };

    subsystem_sections(cfg).fold(Targets::new().with_default(default_level), |t, (name, s)| {
        let level = if s.file.trim().is_empty() {
            LevelFilter::OFF
        } else {
            parse_level(&s.file_level)
        };
        t.with_target(name.clone(), level)
    })
}

fn build_file_router(cfg: &LoggingConfig, base_dir: &Path) -> FileRouter {
    let default = default_section(cfg).and_then(|s| file_writer_for(DEFAULT_SECTION, s, base_dir));

    // Sections pointing at the same file share one writer.
    let mut opened: HashMap<PathBuf, RotWriter> = HashMap::new();
    let mut by_prefix = Vec::new();
    for (name, section) in subsystem_sections(cfg) {
        if section.file.trim().is_empty() {
            continue;
        }
        let path = resolve_log_path(&section.file, base_dir);
        let writer = match opened.get(&path) {
            Some(w) => Some(w.clone()),
            None => file_writer_for(name, section, base_dir),
        };
        if let Some(w) = writer {
            opened.insert(path, w.clone());
            by_prefix.push((name.clone(), w));
        }
    }

    FileRouter { default, by_prefix }
}

// -------- public init --------

/// Install the global subscriber from `cfg`.
/// Relative log file paths resolve against `base_dir` (normally `server.home_dir`).
/// Calling it twice is harmless: the second install is ignored.
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    use tracing_subscriber::prelude::*;

    // Bridge `log` → `tracing` before installing the subscriber.
    let _ = tracing_log::LogTracer::init();

    if cfg.is_empty() {
        let _ = tracing_subscriber::fmt()
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .try_init();
        return;
    }

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    layers.push(
        fmt::layer()
            .with_ansi(std::io::stdout().is_terminal())
            .with_target(true)
            .with_level(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_filter(console_targets(cfg))
            .boxed(),
    );

    let router = build_file_router(cfg, base_dir);
    if !router.is_empty() {
        let targets = file_targets(cfg, &router);
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_target(true)
                .with_level(true)
                .with_current_span(true)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_writer(router)
                .with_filter(targets)
                .boxed(),
        );
    }

    let _ = Registry::default().with(layers).try_init();
}
