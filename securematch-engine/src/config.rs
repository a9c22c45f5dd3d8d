//! Engine configuration.

use crate::error::{EngineError, EngineResult};
use securematch_crypto::{DEFAULT_RECORD_BLOCK, MIN_RECORD_BLOCK};
use serde::{Deserialize, Serialize};

/// Configuration for the search engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum decrypted records returned by an internal search.
    pub internal_result_cap: usize,

    /// Exact number of result slots in every external search response.
    pub external_result_cap: usize,

    /// Maximum audit rows returned by an auditor log query.
    pub auditor_log_limit: usize,

    /// Trailing window for the per-auditor search counter (seconds).
    pub recent_search_window_secs: u64,

    /// Trailing window for success/failure counts in internal metrics (seconds).
    pub metrics_window_secs: u64,

    /// Fields that receive an index entry. `None` indexes every scalar field.
    pub searchable_fields: Option<Vec<String>>,

    /// Searchable fields that also carry a keyword hash for auditors.
    /// `None` gives every searchable field one.
    pub external_fields: Option<Vec<String>>,

    /// Plaintext block every record is padded to before encryption. Records
    /// whose canonical encoding does not fit are rejected at ingest. Must not
    /// change for an existing database.
    pub record_block_size: usize,

    /// DuckDB memory limit for file-backed engines (e.g. "256MB").
    pub memory_limit: String,

    /// DuckDB worker threads for file-backed engines.
    pub threads: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            internal_result_cap: 50,
            external_result_cap: 50,
            auditor_log_limit: 100,
            recent_search_window_secs: 3600, // 1 hour
            metrics_window_secs: 86_400,     // 24 hours
            searchable_fields: None,
            external_fields: None,
            record_block_size: DEFAULT_RECORD_BLOCK,
            memory_limit: "256MB".to_string(),
            threads: 2,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> EngineResult<()> {
        let positive = [
            ("internal_result_cap", self.internal_result_cap as u64),
            ("external_result_cap", self.external_result_cap as u64),
            ("auditor_log_limit", self.auditor_log_limit as u64),
            ("recent_search_window_secs", self.recent_search_window_secs),
            ("metrics_window_secs", self.metrics_window_secs),
            ("threads", u64::from(self.threads)),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(EngineError::Config(format!("{name} must be greater than zero")));
        }
        if self.record_block_size < MIN_RECORD_BLOCK {
            return Err(EngineError::Config(format!(
                "record_block_size must be at least {MIN_RECORD_BLOCK}"
            )));
        }
        if self.memory_limit.trim().is_empty() {
            return Err(EngineError::Config("memory_limit must not be empty".into()));
        }
        Ok(())
    }

    pub(crate) fn is_searchable(&self, field: &str) -> bool {
        self.searchable_fields
            .as_ref()
            .is_none_or(|fields| fields.iter().any(|f| f == field))
    }

    pub(crate) fn is_external(&self, field: &str) -> bool {
        self.is_searchable(field)
            && self
                .external_fields
                .as_ref()
                .is_none_or(|fields| fields.iter().any(|f| f == field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.external_result_cap, 50);
        assert_eq!(config.auditor_log_limit, 100);
    }

    #[test]
    fn zero_cap_rejected() {
        let config = EngineConfig {
            external_result_cap: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("external_result_cap"));
    }

    #[test]
    fn tiny_record_block_rejected() {
        let config = EngineConfig {
            record_block_size: 16,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"searchable_fields": ["email"], "threads": 4}"#).unwrap();
        assert_eq!(config.threads, 4);
        assert_eq!(config.internal_result_cap, 50);
        assert_eq!(config.record_block_size, DEFAULT_RECORD_BLOCK);
        assert!(config.is_searchable("email"));
        assert!(!config.is_searchable("notes"));
    }

    #[test]
    fn external_fields_subset_of_searchable() {
        let config = EngineConfig {
            searchable_fields: Some(vec!["email".into(), "name".into()]),
            external_fields: Some(vec!["email".into(), "ssn".into()]),
            ..Default::default()
        };
        assert!(config.is_external("email"));
        assert!(!config.is_external("name"));
        assert!(!config.is_external("ssn"));
    }
}
