//! Configuration for the SMS store.
//!
//! Built in code with the `with_*` methods or loaded from TOML:
//!
//! ```toml
//! path = "/var/lib/sms"
//! max_tables = 16
//! parallel_scans = true
//! log_filter = "storage=debug,info"
//! ```

use crate::{platform, DbError, DbResult, DB_NAME};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration for opening a message store.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SmsDbConfig {
    /// Directory holding the libmdbx environment.
    pub path: PathBuf,

    /// Maximum number of named tables in the environment. The schema uses
    /// seven (records, meta and five indexes).
    pub max_tables: u64,

    /// Run the index scans of one search on separate blocking tasks.
    pub parallel_scans: bool,

    /// Fallback `tracing` filter when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl SmsDbConfig {
    /// Configuration for a store at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_max_tables(mut self, max_tables: u64) -> Self {
        self.max_tables = max_tables;
        self
    }

    pub fn with_parallel_scans(mut self, enabled: bool) -> Self {
        self.parallel_scans = enabled;
        self
    }

    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Parses a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(input: &str) -> DbResult<Self> {
        let config: Self =
            toml::from_str(input).map_err(|e| DbError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> DbResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!("Loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn validate(&self) -> DbResult<()> {
        if self.path.as_os_str().is_empty() {
            return Err(DbError::Configuration("path cannot be empty".to_string()));
        }
        if self.max_tables < MIN_TABLES {
            return Err(DbError::Configuration(format!(
                "max_tables must be at least {}, got {}",
                MIN_TABLES, self.max_tables
            )));
        }
        Ok(())
    }
}

/// Tables created by the schema.
const MIN_TABLES: u64 = 7;

impl Default for SmsDbConfig {
    fn default() -> Self {
        Self {
            path: platform::get_named_db_path(DB_NAME),
            max_tables: 16,
            parallel_scans: true,
            log_filter: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SmsDbConfig::default();
        assert!(config.path.ends_with("sms"));
        assert_eq!(config.max_tables, 16);
        assert!(config.parallel_scans);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = SmsDbConfig::from_toml_str(
            r#"
            path = "/tmp/sms-test"
            parallel_scans = false
            "#,
        )
        .unwrap();
        assert_eq!(config.path, PathBuf::from("/tmp/sms-test"));
        assert!(!config.parallel_scans);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_rejects_too_few_tables() {
        let err = SmsDbConfig::from_toml_str("max_tables = 3").unwrap_err();
        assert!(matches!(err, DbError::Configuration(_)));
    }

    #[test]
    fn test_rejects_bad_toml() {
        assert!(SmsDbConfig::from_toml_str("path = [").is_err());
    }
}
