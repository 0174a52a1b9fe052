use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::error::{Error, Result};

pub const LOG_ENV_VAR: &str = "WORKPARTNER_LOG";
pub const ERROR_LOG_FILE: &str = "error_log.txt";

/// Human-readable output on stderr filtered by `WORKPARTNER_LOG` (else `default_filter`),
/// plus every error appended to `<log_dir>/error_log.txt`.
/// Panics are routed through the error log as well.
pub fn init_logging(log_dir: &Path, default_filter: &str) -> Result<()> {
    std::fs::create_dir_all(log_dir).map_err(|err| Error::io(log_dir, err))?;
    let log_path = log_dir.join(ERROR_LOG_FILE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|err| Error::io(&log_path, err))?;

    let env_filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(default_filter));

    let installed = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(env_filter),
        )
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_line_number(true)
                .with_filter(LevelFilter::ERROR),
        )
        .try_init();
    if installed.is_err() {
        // Another subscriber is already active; keep it.
        return Ok(());
    }

    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!("panic: {info}");
        previous(info);
    }));
    Ok(())
}
