use std::path::Path;

use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{EnvFilter, Layer as _, fmt};

use crate::conf::LogConf;

/// Keeps the file writers flushing. Drop it only at process exit.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _guards: Vec<WorkerGuard>,
}

/// Installs the global subscriber: console output plus, when a log directory
/// is configured, a daily `combined.log` and an errors-only `error.log`.
///
/// `RUST_LOG` overrides `conf.filter`. Calling it twice is harmless; the
/// second subscriber is simply not installed.
pub fn init(conf: &LogConf) -> LogGuard {
    let env_filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&conf.filter))
    };

    let console_layer = fmt::layer()
        .with_target(true)
        .with_ansi(conf.ansi)
        .with_filter(env_filter());

    let mut guards = Vec::new();
    let file_layers = conf.dir.as_deref().map(|dir| {
        let dir = Path::new(dir);
        let (combined, combined_guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "combined.log"));
        let (errors, errors_guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "error.log"));
        guards.push(combined_guard);
        guards.push(errors_guard);

        let combined_layer = fmt::layer()
            .with_ansi(false)
            .with_writer(combined)
            .with_filter(env_filter());
        let errors_layer = fmt::layer()
            .with_ansi(false)
            .with_writer(errors)
            .with_filter(LevelFilter::ERROR);
        combined_layer.and_then(errors_layer)
    });

    let installed = tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layers)
        .try_init();
    if installed.is_err() {
        tracing::debug!("global subscriber already installed");
    }

    LogGuard { _guards: guards }
}
