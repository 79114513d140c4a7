//! Tracing setup: env-filtered stdout output, plus a daily-rotated file
//! layer when a log directory is given.

use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize the global subscriber. `RUST_LOG` controls filtering and
/// defaults to "info".
pub fn init(log_dir: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    let stdout_layer = fmt::layer()
        .with_target(false)
        .compact()
        .with_filter(env_filter);

    let registry = tracing_subscriber::registry().with(stdout_layer);

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = tracing_appender::rolling::daily(dir, "sitegraph.log");
            let (writer, guard) = tracing_appender::non_blocking(file_appender);

            let file_filter =
                EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .compact()
                .with_filter(file_filter);

            registry.with(file_layer).init();

            // The guard must outlive the program for buffered lines to flush.
            Box::leak(Box::new(guard));
        }
        None => registry.init(),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    #[test]
    fn test_log_directory_creation() {
        let dir = TempDir::new().unwrap();
        let log_path = dir.path().join("logs");

        // init() can only run once per process, so only the directory
        // handling is exercised here.
        std::fs::create_dir_all(&log_path).unwrap();
        assert!(log_path.exists());
    }
}
