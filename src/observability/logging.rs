//! Logging configuration.

use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "VECTORVAULT_LOG";

/// Environment variable selecting the log format.
pub const LOG_FORMAT_ENV: &str = "VECTORVAULT_LOG_FORMAT";

/// Environment variable naming a log file.
pub const LOG_FILE_ENV: &str = "VECTORVAULT_LOG_FILE";

/// Output format of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name; unknown names fall back to text.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Logging settings resolved from CLI flags and the environment.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Event filter.
    pub filter: EnvFilter,
    /// Output format.
    pub format: LogFormat,
    /// Append to this file instead of stderr.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Builds the configuration from the process environment.
    #[must_use]
    pub fn from_env(verbose: bool) -> Self {
        Self::from_lookup(verbose, |key| std::env::var(key).ok())
    }

    /// Builds the configuration from values read through `lookup`.
    ///
    /// `VECTORVAULT_LOG` wins over `verbose`; without either the level is `info`.
    #[must_use]
    pub fn from_lookup(verbose: bool, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default_directive = if verbose { "debug" } else { "info" };
        let filter = lookup(LOG_ENV)
            .and_then(|directive| EnvFilter::try_new(directive).ok())
            .unwrap_or_else(|| EnvFilter::new(default_directive));

        Self {
            filter,
            format: lookup(LOG_FORMAT_ENV)
                .map(|value| LogFormat::parse(&value))
                .unwrap_or_default(),
            file: lookup(LOG_FILE_ENV)
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    /// Sets the output format.
    #[must_use]
    pub const fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = LoggingConfig::from_lookup(false, lookup(&[]));
        assert_eq!(config.format, LogFormat::Text);
        assert!(config.file.is_none());
        assert_eq!(config.filter.to_string(), "info");
    }

    #[test]
    fn test_verbose_raises_level() {
        let config = LoggingConfig::from_lookup(true, lookup(&[]));
        assert_eq!(config.filter.to_string(), "debug");
    }

    #[test]
    fn test_env_overrides() {
        let config = LoggingConfig::from_lookup(
            true,
            lookup(&[
                (LOG_ENV, "vectorvault=trace"),
                (LOG_FORMAT_ENV, "JSON"),
                (LOG_FILE_ENV, "/tmp/vv.log"),
            ]),
        );
        assert_eq!(config.filter.to_string(), "vectorvault=trace");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.file, Some(PathBuf::from("/tmp/vv.log")));
    }

    #[test]
    fn test_unknown_format_is_text() {
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Text);
    }
}
