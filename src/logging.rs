use std::io::Write;
use std::sync::OnceLock;

use chrono::Local;
use log::{Level, Metadata, Record, SetLoggerError};

static LOGGER: OnceLock<PanelLogger> = OnceLock::new();

/// Target prefix of this crate's own log records
const OWN_TARGET: &str = "guitar_cabinet";

/// Writes `[HH:MM:SS] LEVEL message` lines to stderr.
///
/// Records from other crates (bluest, the platform backends) are only shown
/// from `warn` up.
pub struct PanelLogger {
    level: Level,
}

impl PanelLogger {
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    pub fn init(level: Level) -> Result<(), SetLoggerError> {
        let logger = LOGGER.get_or_init(|| PanelLogger::new(level));
        log::set_logger(logger).map(|()| log::set_max_level(level.to_level_filter()))
    }

    fn format(record: &Record) -> String {
        format!(
            "[{}] {:<5} {}",
            Local::now().format("%H:%M:%S"),
            record.level(),
            record.args()
        )
    }
}

impl log::Log for PanelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        if metadata.target().starts_with(OWN_TARGET) {
            metadata.level() <= self.level
        } else {
            metadata.level() <= self.level.min(Level::Warn)
        }
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let _ = writeln!(std::io::stderr(), "{}", Self::format(record));
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Installs the logger. A non-empty `RUST_LOG` selects `env_logger` with those
/// directives on top of the verbosity level; otherwise [`PanelLogger`] is used.
/// A logger that is already installed is left in place.
pub fn setup_logging(verbose: bool) {
    let level = if verbose { Level::Debug } else { Level::Info };
    let rust_log = std::env::var("RUST_LOG").ok();
    if wants_env_logger(rust_log.as_deref()) {
        let _ = env_logger::Builder::new()
            .filter_level(level.to_level_filter())
            .parse_default_env()
            .try_init();
    } else {
        let _ = PanelLogger::init(level);
    }
}

fn wants_env_logger(rust_log: Option<&str>) -> bool {
    rust_log.is_some_and(|directives| !directives.trim().is_empty())
}
