//! Logging for the tool's own operation.
//!
//! Diagnostic reports never go through here; they are written by the
//! [`Reporter`](crate::report::Reporter). This is the developer-facing trail,
//! quiet unless `-v` or `RUST_LOG` asks for more.

use crate::error::LoggingError;
use std::io;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Level used when `RUST_LOG` is not set
    pub level: Level,
    /// Show timestamps
    pub timestamps: bool,
    /// Show the emitting module
    pub target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            timestamps: false,
            target: false,
        }
    }
}

impl LogConfig {
    /// Debug output for `-v`.
    pub fn verbose() -> Self {
        Self {
            level: Level::DEBUG,
            timestamps: true,
            target: true,
        }
    }

    pub fn from_verbosity(verbose: bool) -> Self {
        if verbose {
            Self::verbose()
        } else {
            Self::default()
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.to_string().to_ascii_lowercase()))
    }
}

/// Installs the global subscriber, writing to stderr.
pub fn init_logging(config: LogConfig) -> Result<(), LoggingError> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.filter())
        .with_writer(io::stderr)
        .with_target(config.target);

    let installed = if config.timestamps {
        builder.try_init()
    } else {
        builder.without_time().try_init()
    };
    installed.map_err(LoggingError)?;

    tracing::debug!(level = %config.level, "logging initialised");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_config_default_is_quiet() {
        let config = LogConfig::default();
        assert_eq!(config.level, Level::WARN);
        assert!(!config.timestamps);
    }

    #[test]
    fn log_config_verbose() {
        let config = LogConfig::from_verbosity(true);
        assert_eq!(config, LogConfig::verbose());
        assert_eq!(config.level, Level::DEBUG);
        assert!(config.target);
    }

    #[test]
    fn rust_log_overrides_level() {
        temp_env::with_var("RUST_LOG", Some("failguard=trace"), || {
            let filter = LogConfig::default().filter();
            assert_eq!(filter.to_string().to_ascii_lowercase(), "failguard=trace");
        });
        temp_env::with_var("RUST_LOG", None::<&str>, || {
            let filter = LogConfig::verbose().filter();
            assert_eq!(filter.to_string().to_ascii_lowercase(), "debug");
        });
    }
}
