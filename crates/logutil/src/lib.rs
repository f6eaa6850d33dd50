//! Utilities for logging.

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::SubscriberBuilder;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoggingMode {
    /// Single line per event, no span context.
    #[default]
    Compact,
    /// Include file/line and span context.
    Full,
    /// Newline delimited json.
    Json,
}

/// Verbosity of the default filter directive. `RUST_LOG` always takes
/// precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<Verbosity> for Level {
    fn from(value: Verbosity) -> Self {
        match value {
            Verbosity::Info => Level::INFO,
            Verbosity::Debug => Level::DEBUG,
            Verbosity::Trace => Level::TRACE,
        }
    }
}

fn env_filter(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(Level::from(verbosity).into())
        .from_env_lossy()
}

/// Configure the global subscriber.
///
/// Does nothing if a global subscriber has already been set.
pub fn configure_global_logger(verbosity: Verbosity, mode: LoggingMode) {
    let builder = SubscriberBuilder::default().with_env_filter(env_filter(verbosity));

    let res = match mode {
        LoggingMode::Compact => builder.compact().with_target(false).try_init(),
        LoggingMode::Full => builder.with_file(true).with_line_number(true).try_init(),
        LoggingMode::Json => builder.json().try_init(),
    };

    if res.is_err() {
        tracing::trace!("global logger already configured");
    }
}

/// Configure logging for tests, writing through the test harness so output is
/// captured per test.
pub fn init_test() {
    let _ = SubscriberBuilder::default()
        .with_env_filter(env_filter(Verbosity::Debug))
        .with_test_writer()
        .with_file(true)
        .with_line_number(true)
        .try_init();
}
