//! Sniffer configuration from the environment
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `MONGODOG_TRACEBACK` | attach a stack snapshot to every record | `true` |
//! | `MONGODOG_REPORTER` | `memory`, `null`, `logging` or `mongo` | `memory` |
//! | `MONGODOG_LOGGER` | logger name used by the logging reporter | `mongodog` |
//! | `MONGODOG_COLLECTION` | collection the mongo reporter writes to | none |

use crate::client::Database;
use crate::error::{MongodogError, Result};
use crate::reporters::{LoggingReporter, MemoryReporter, MongoReporter, NullReporter, Reporter};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

pub const ENV_TRACEBACK: &str = "MONGODOG_TRACEBACK";
pub const ENV_REPORTER: &str = "MONGODOG_REPORTER";
pub const ENV_LOGGER: &str = "MONGODOG_LOGGER";
pub const ENV_COLLECTION: &str = "MONGODOG_COLLECTION";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReporterKind {
    #[default]
    Memory,
    Null,
    Logging,
    Mongo,
}

impl FromStr for ReporterKind {
    type Err = MongodogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(ReporterKind::Memory),
            "null" => Ok(ReporterKind::Null),
            "logging" => Ok(ReporterKind::Logging),
            "mongo" => Ok(ReporterKind::Mongo),
            other => Err(MongodogError::ConfigError(format!(
                "unknown reporter '{}', expected memory, null, logging or mongo",
                other
            ))),
        }
    }
}

impl fmt::Display for ReporterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReporterKind::Memory => "memory",
            ReporterKind::Null => "null",
            ReporterKind::Logging => "logging",
            ReporterKind::Mongo => "mongo",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnifferConfig {
    pub capture_traceback: bool,
    pub reporter: ReporterKind,
    pub logger: String,
    pub collection: Option<String>,
}

impl Default for SnifferConfig {
    fn default() -> Self {
        Self {
            capture_traceback: true,
            reporter: ReporterKind::Memory,
            logger: "mongodog".to_string(),
            collection: None,
        }
    }
}

impl SnifferConfig {
    /// Read the configuration from the process environment, loading `.env` first if
    /// there is one
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Read the configuration from a dotenv-style file without touching the process
    /// environment
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self> {
        let vars = dotenv::from_path_iter(path.as_ref())?
            .collect::<std::result::Result<HashMap<String, String>, dotenv::Error>>()?;
        Self::from_vars(|key| vars.get(key).cloned())
    }

    fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(value) = get(ENV_TRACEBACK) {
            config.capture_traceback = parse_bool(ENV_TRACEBACK, &value)?;
        }
        if let Some(value) = get(ENV_REPORTER) {
            config.reporter = value.parse()?;
        }
        if let Some(value) = get(ENV_LOGGER) {
            config.logger = value;
        }
        config.collection = get(ENV_COLLECTION).filter(|name| !name.trim().is_empty());

        Ok(config)
    }

    /// Build the configured reporter; the mongo reporter writes into `database`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for a mongo reporter without a collection name or a logging
    /// reporter with an empty logger name.
    pub fn build_reporter(&self, database: &Database) -> Result<Arc<dyn Reporter>> {
        let reporter: Arc<dyn Reporter> = match self.reporter {
            ReporterKind::Memory => Arc::new(MemoryReporter::new()),
            ReporterKind::Null => Arc::new(NullReporter::new()),
            ReporterKind::Logging => Arc::new(LoggingReporter::named(self.logger.clone())?),
            ReporterKind::Mongo => {
                let name = self.collection.as_deref().ok_or_else(|| {
                    MongodogError::ConfigError(format!(
                        "the mongo reporter needs a collection name ({})",
                        ENV_COLLECTION
                    ))
                })?;
                Arc::new(MongoReporter::new(database.collection(name)))
            }
        };
        Ok(reporter)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(MongodogError::ConfigError(format!(
            "{} must be a boolean, got '{}'",
            key, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use crate::dispatch::DispatchTable;
    use std::io::Write;

    fn database() -> Database {
        Client::with_dispatch(Arc::new(DispatchTable::new())).database("mongodog_test")
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SnifferConfig::from_vars(vars(&[])).unwrap();
        assert_eq!(config, SnifferConfig::default());
        assert!(config.capture_traceback);
        assert_eq!(config.reporter, ReporterKind::Memory);
        assert_eq!(config.logger, "mongodog");
    }

    #[test]
    fn test_values_parsed() {
        let config = SnifferConfig::from_vars(vars(&[
            (ENV_TRACEBACK, "off"),
            (ENV_REPORTER, "Mongo"),
            (ENV_LOGGER, "app.db"),
            (ENV_COLLECTION, "mongodog_reports"),
        ]))
        .unwrap();

        assert!(!config.capture_traceback);
        assert_eq!(config.reporter, ReporterKind::Mongo);
        assert_eq!(config.logger, "app.db");
        assert_eq!(config.collection.as_deref(), Some("mongodog_reports"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = SnifferConfig::from_vars(vars(&[(ENV_REPORTER, "syslog")])).unwrap_err();
        assert!(matches!(err, MongodogError::ConfigError(_)));

        let err = SnifferConfig::from_vars(vars(&[(ENV_TRACEBACK, "maybe")])).unwrap_err();
        assert!(err.to_string().contains("MONGODOG_TRACEBACK must be a boolean"));
    }

    #[test]
    fn test_from_env_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "MONGODOG_REPORTER=logging").unwrap();
        writeln!(file, "MONGODOG_TRACEBACK=false").unwrap();

        let config = SnifferConfig::from_env_file(file.path()).unwrap();
        assert_eq!(config.reporter, ReporterKind::Logging);
        assert!(!config.capture_traceback);
    }

    #[test]
    fn test_missing_env_file() {
        let err = SnifferConfig::from_env_file("/nonexistent/mongodog.env").unwrap_err();
        assert!(matches!(err, MongodogError::EnvError(_)));
    }

    #[test]
    fn test_mongo_reporter_needs_collection() {
        let config = SnifferConfig {
            reporter: ReporterKind::Mongo,
            ..Default::default()
        };
        assert!(config.build_reporter(&database()).is_err());

        let config = SnifferConfig {
            collection: Some("mongodog_reports".to_string()),
            ..config
        };
        assert!(config.build_reporter(&database()).is_ok());
    }

    #[test]
    fn test_reporter_kind_display_round_trip() {
        for kind in [ReporterKind::Memory, ReporterKind::Null, ReporterKind::Logging, ReporterKind::Mongo] {
            assert_eq!(kind.to_string().parse::<ReporterKind>().unwrap(), kind);
        }
    }
}
