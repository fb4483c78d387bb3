//! Utilities for logging.

use tracing::Level;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::SubscriberBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    HumanReadable,
    Json,
}

/// Configure the global logger.
///
/// `RUST_LOG` takes precedence over the provided default level. Errors if a
/// global subscriber was already set.
pub fn configure_global_logger(
    default_level: Level,
    format: LogFormat,
) -> Result<(), SetGlobalDefaultError> {
    let builder = subscriber_builder(default_level);

    match format {
        LogFormat::HumanReadable => {
            let subscriber = builder.with_target(false).finish();
            tracing::subscriber::set_global_default(subscriber)
        }
        LogFormat::Json => {
            let subscriber = builder.json().with_current_span(false).finish();
            tracing::subscriber::set_global_default(subscriber)
        }
    }
}

/// Initialize a logger for tests.
///
/// Safe to call from multiple tests, only the first call installs the
/// subscriber.
pub fn init_test() {
    let subscriber = subscriber_builder(Level::DEBUG)
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn subscriber_builder(default_level: Level) -> SubscriberBuilder<
    tracing_subscriber::fmt::format::DefaultFields,
    tracing_subscriber::fmt::format::Format,
    EnvFilter,
> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(default_level).into())
        .parse_lossy(format!(
            "h2=info,hyper=info,reqwest=info,{}",
            std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default()
        ));

    tracing_subscriber::FmtSubscriber::builder().with_env_filter(env_filter)
}
