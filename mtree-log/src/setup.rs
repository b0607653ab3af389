use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

// Import CRATE_NAMES, which lists all crates in the workspace.
include!(concat!(env!("OUT_DIR"), "/constants.gen.rs"));

/// Controls the log format.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Auto detect the best format.
    ///
    /// This chooses [`LogFormat::Pretty`] for TTY, otherwise [`LogFormat::Simplified`].
    #[default]
    Auto,

    /// Pretty printing with colors.
    ///
    /// ```text
    ///  INFO mtree_collector::manager: task loaded task_id=1
    /// ```
    Pretty,

    /// Simplified plain text output.
    ///
    /// ```text
    /// 2024-12-04T12:10:32.123Z  INFO mtree_collector::manager: task loaded task_id=1
    /// ```
    Simplified,

    /// Dump out JSON lines.
    ///
    /// ```text
    /// {"timestamp":"2024-12-04T12:11:08.729716Z","level":"INFO","fields":{"message":"task loaded"},"target":"mtree_collector::manager"}
    /// ```
    Json,
}

/// The maximum log level of the workspace crates.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// The "error" level.
    Error,
    /// The "warn" level.
    Warn,
    /// The "info" level.
    #[default]
    Info,
    /// The "debug" level.
    Debug,
    /// The "trace" level.
    Trace,
    /// Disables logging.
    Off,
}

impl Level {
    /// Returns the tracing [`LevelFilter`].
    pub const fn level_filter(&self) -> LevelFilter {
        match self {
            Level::Error => LevelFilter::ERROR,
            Level::Warn => LevelFilter::WARN,
            Level::Info => LevelFilter::INFO,
            Level::Debug => LevelFilter::DEBUG,
            Level::Trace => LevelFilter::TRACE,
            Level::Off => LevelFilter::OFF,
        }
    }
}

/// Controls the logging system.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// The log level of the metric tree crates.
    ///
    /// Third-party crates log at `info` at most.
    pub level: Level,

    /// Controls the log output format.
    ///
    /// Defaults to [`LogFormat::Auto`], which detects the best format based on the TTY.
    pub format: LogFormat,
}

/// Returns the filter for all crates of the workspace at `level`.
fn default_filter(level: Level) -> EnvFilter {
    let third_party = level.level_filter().min(LevelFilter::INFO);
    let mut filter = EnvFilter::default().add_directive(third_party.into());

    for name in CRATE_NAMES {
        if let Ok(directive) = format!("{name}={}", level.level_filter()).parse() {
            filter = filter.add_directive(directive);
        }
    }

    filter
}

/// Initializes the logging system.
///
/// Installs a global subscriber writing to stderr. If a subscriber was installed before, this
/// function has no effect. When `RUST_LOG` is set, it overrides the configured level.
///
/// # Example
///
/// ```
/// let log_config = mtree_log::LogConfig {
///     level: mtree_log::Level::Debug,
///     ..Default::default()
/// };
///
/// mtree_log::init(&log_config);
/// ```
pub fn init(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(config.level));

    let format: Box<dyn Layer<Registry> + Send + Sync> =
        match (config.format, console::user_attended_stderr()) {
            (LogFormat::Auto, true) | (LogFormat::Pretty, _) => fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .compact()
                .boxed(),
            (LogFormat::Auto, false) | (LogFormat::Simplified, _) => fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .boxed(),
            (LogFormat::Json, _) => fmt::layer()
                .with_writer(std::io::stderr)
                .json()
                .flatten_event(true)
                .boxed(),
        };

    tracing_subscriber::registry()
        .with(format)
        .with(filter)
        .try_init()
        .ok();
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn test_level_filter() {
        assert_eq!(Level::Warn.level_filter(), LevelFilter::WARN);
        assert_eq!(Level::Off.level_filter(), LevelFilter::OFF);
    }

    #[test]
    fn test_default_filter_lists_workspace_crates() {
        let filter = default_filter(Level::Trace).to_string();
        assert!(filter.contains("mtree_log"), "{filter}");
    }

    #[test]
    fn test_config_defaults() {
        assert_eq!(
            LogConfig::default(),
            LogConfig {
                level: Level::Info,
                format: LogFormat::Auto,
            }
        );
    }
}
