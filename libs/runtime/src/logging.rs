//! Logging setup: a human-readable console sink and rotating JSON file sinks,
//! both routed per subsystem.
//!
//! The `logging` config maps a subsystem (a target prefix such as `persons`
//! or `auth`) to its [`Section`]. A record is governed by the section with the
//! longest matching prefix, or by `default` when none matches.

use crate::config::{LoggingConfig, Section};
use crate::paths::resolve_under;
use parking_lot::Mutex;
use std::{
    io::{IsTerminal, Write},
    path::Path,
    sync::Arc,
};
use tracing::{Level, Metadata};
use tracing_subscriber::{filter::filter_fn, fmt};

use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};

const DEFAULT_SECTION: &str = "default";
const DEFAULT_MAX_SIZE_MB: u64 = 100;
const DEFAULT_MAX_BACKUPS: usize = 3;

/// `None` switches the sink off. Unknown names fall back to `info`.
fn parse_level(s: &str) -> Option<Level> {
    match s.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        "off" | "none" => None,
        _ => Some(Level::INFO),
    }
}

/// `persons` matches `persons` and `persons::domain`, not `persons_server`.
fn matches_prefix(target: &str, prefix: &str) -> bool {
    target
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

fn longest_match<'a, T>(entries: &'a [(String, T)], target: &str) -> Option<&'a T> {
    entries
        .iter()
        .filter(|(prefix, _)| matches_prefix(target, prefix))
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(_, v)| v)
}

// -------- routing --------

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Thresholds {
    console: Option<Level>,
    file: Option<Level>,
}

impl Thresholds {
    fn of(section: &Section) -> Self {
        let has_file = !section.file.trim().is_empty();
        Self {
            console: parse_level(&section.console_level),
            file: if has_file {
                parse_level(&section.file_level)
            } else {
                None
            },
        }
    }
}

fn passes(threshold: Option<Level>, meta: &Metadata<'_>) -> bool {
    threshold.is_some_and(|max| meta.level() <= &max)
}

#[derive(Debug, Default)]
struct Routing {
    default: Thresholds,
    subsystems: Vec<(String, Thresholds)>,
}

impl Routing {
    fn from_config(cfg: &LoggingConfig) -> Self {
        let mut routing = Routing::default();
        for (name, section) in cfg {
            if name == DEFAULT_SECTION {
                routing.default = Thresholds::of(section);
            } else {
                routing.subsystems.push((name.clone(), Thresholds::of(section)));
            }
        }
        routing
    }

    fn for_target(&self, target: &str) -> Thresholds {
        longest_match(&self.subsystems, target)
            .copied()
            .unwrap_or(self.default)
    }
}

// -------- rotating file sinks --------

type SharedRotate = Arc<Mutex<FileRotate<AppendTimestamp>>>;

/// Cloneable handle to one rotating file.
#[derive(Clone)]
struct RotatingFile(SharedRotate);

impl RotatingFile {
    /// Opens `path` (creating parent directories). The file rotates once it
    /// passes `max_bytes`; `max_files` rotated files are kept.
    fn open(path: &Path, max_bytes: usize, max_files: usize) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let rotate = FileRotate::new(
            path,
            AppendTimestamp::default(FileLimit::MaxFiles(max_files)),
            ContentLimit::BytesSurpassed(max_bytes),
            Compression::None,
            #[cfg(unix)]
            None,
        );
        Ok(Self(Arc::new(Mutex::new(rotate))))
    }

    fn for_section(name: &str, section: &Section, base_dir: &Path) -> Option<Self> {
        if section.file.trim().is_empty() {
            return None;
        }
        let max_bytes = section.max_size_mb.unwrap_or(DEFAULT_MAX_SIZE_MB) * 1024 * 1024;
        let max_files = section.max_backups.unwrap_or(DEFAULT_MAX_BACKUPS);
        let path = resolve_under(&section.file, base_dir);

        match Self::open(&path, max_bytes as usize, max_files) {
            Ok(file) => Some(file),
            Err(e) => {
                // No subscriber yet; stderr is the only place to report this.
                eprintln!("log file for '{name}' unavailable at {}: {e}", path.display());
                None
            }
        }
    }
}

/// Writer handed to the fmt layer; writes go nowhere when no file applies.
struct SinkWriter(Option<RotatingFile>);

impl Write for SinkWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &self.0 {
            Some(f) => f.0.lock().write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &self.0 {
            Some(f) => f.0.lock().flush(),
            None => Ok(()),
        }
    }
}

/// Picks the file of the governing section, falling back to the default file.
#[derive(Clone, Default)]
struct FileSinks {
    default: Option<RotatingFile>,
    subsystems: Vec<(String, RotatingFile)>,
}

impl FileSinks {
    fn from_config(cfg: &LoggingConfig, base_dir: &Path) -> Self {
        let mut sinks = FileSinks::default();
        for (name, section) in cfg {
            let Some(file) = RotatingFile::for_section(name, section, base_dir) else {
                continue;
            };
            if name == DEFAULT_SECTION {
                sinks.default = Some(file);
            } else {
                sinks.subsystems.push((name.clone(), file));
            }
        }
        sinks
    }

    fn is_empty(&self) -> bool {
        self.default.is_none() && self.subsystems.is_empty()
    }

    fn file_for(&self, target: &str) -> Option<RotatingFile> {
        longest_match(&self.subsystems, target)
            .or(self.default.as_ref())
            .cloned()
    }
}

impl<'a> fmt::MakeWriter<'a> for FileSinks {
    type Writer = SinkWriter;

    fn make_writer(&'a self) -> Self::Writer {
        SinkWriter(self.default.clone())
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        SinkWriter(self.file_for(meta.target()))
    }
}

// -------- public init --------

/// Install the global subscriber described by `cfg`. Relative log file paths
/// resolve against `base_dir` (the server home dir). An empty config gives a
/// plain console logger. A second call leaves the first subscriber in place.
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

    // Route `log` records (sqlx, hyper internals) into tracing.
    let _ = tracing_log::LogTracer::init();

    if cfg.is_empty() {
        let _ = fmt()
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .try_init();
        return;
    }

    let routing = Arc::new(Routing::from_config(cfg));
    let sinks = FileSinks::from_config(cfg, base_dir);

    let console_routing = routing.clone();
    let console = fmt::layer()
        .with_ansi(std::io::stdout().is_terminal())
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(filter_fn(move |meta| {
            passes(console_routing.for_target(meta.target()).console, meta)
        }));

    let file = (!sinks.is_empty()).then(|| {
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(sinks)
            .with_filter(filter_fn(move |meta| {
                passes(routing.for_target(meta.target()).file, meta)
            }))
    });

    let _ = Registry::default().with(console).with(file).try_init();
}
