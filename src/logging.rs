//! Console plus append-only file logging

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;
use crate::error::Result;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level. The returned guard flushes the
/// file writer on drop, so keep it alive for the life of the process. `None`
/// means file logging is off.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,cryptoprinter={}", config.level)));

    // rolling::never panics if it can't open the file, so preflight writability
    let (file_layer, guard) = match preflight(&config.dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::never(&config.dir, &config.file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);

            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true);
            let layer = if config.json {
                layer.json().boxed()
            } else {
                layer.boxed()
            };
            (Some(layer), Some(guard))
        }
        Err(e) => {
            eprintln!(
                "Warning: Could not write to log directory {} ({}), file logging disabled",
                config.dir, e
            );
            (None, None)
        }
    };

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);
    let console_layer = if config.json {
        console_layer.json().boxed()
    } else {
        console_layer.boxed()
    };

    let file_logging_enabled = file_layer.is_some();
    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    if file_logging_enabled {
        eprintln!("Logging to: {}/{}", config.dir, config.file_name);
    }

    guard
}

fn preflight(dir: &str) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let test_path = Path::new(dir).join(".cryptoprinter_write_test");
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&test_path)?;
    let _ = std::fs::remove_file(&test_path);
    Ok(())
}
