//! Wizzard configuration.

use serde::{Deserialize, Serialize};
use sqlwizz_core::{Error, Result};

/// Configuration for a [`QueryWizzard`](crate::QueryWizzard).
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```ignore
/// let config = WizzardConfig::from_json_str(r#"{"default_page_size": 50}"#)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WizzardConfig {
    /// Statement returning the id generated by the last INSERT.
    pub last_insert_id_sql: String,
    /// Page size used when a page number is given without a size.
    pub default_page_size: u64,
    /// Include bound parameter values in trace events.
    pub log_params: bool,
}

impl Default for WizzardConfig {
    fn default() -> Self {
        Self {
            last_insert_id_sql: "SELECT last_insert_rowid()".to_string(),
            default_page_size: 20,
            log_params: false,
        }
    }
}

impl WizzardConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn last_insert_id_sql(mut self, sql: impl Into<String>) -> Self {
        self.last_insert_id_sql = sql.into();
        self
    }

    #[must_use]
    pub fn default_page_size(mut self, size: u64) -> Self {
        self.default_page_size = size;
        self
    }

    #[must_use]
    pub fn log_params(mut self, enabled: bool) -> Self {
        self.log_params = enabled;
        self
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.last_insert_id_sql.trim().is_empty() {
            return Err(Error::config("last_insert_id_sql must not be empty"));
        }
        if self.default_page_size == 0 {
            return Err(Error::config("default_page_size must be greater than zero"));
        }
        Ok(())
    }
}
