//! Configuration
//!
//! Association definitions and backend settings. Both structs deserialize
//! from JSON (missing fields fall back to `Default`) and expose `validate()`
//! so misconfiguration is caught before any store is touched.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default segment appended to the owner identity for its list source record
pub const DEFAULT_LIST_SOURCE_SEGMENT: &str = "list_source";

/// Default busy timeout for libsql connections (milliseconds)
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Definition of an ordered aggregation on a host record
///
/// ```rust
/// use strand_core::config::OrderedAggregationConfig;
///
/// let config = OrderedAggregationConfig::new("ordered_members", "members");
/// assert!(config.validate().is_ok());
/// assert_eq!(config.list_source_segment, "list_source");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderedAggregationConfig {
    /// Name of the ordered association (e.g. "ordered_members")
    pub name: String,

    /// Name of the unordered association backing it (e.g. "members")
    pub unordered: String,

    /// Segment of the list source identity under the owner (`<owner>/<segment>`)
    pub list_source_segment: String,

    /// Record types accepted into the association (empty = any type)
    pub allowed_types: Vec<String>,
}

impl Default for OrderedAggregationConfig {
    fn default() -> Self {
        Self {
            name: "ordered_members".to_string(),
            unordered: "members".to_string(),
            list_source_segment: DEFAULT_LIST_SOURCE_SEGMENT.to_string(),
            allowed_types: Vec::new(),
        }
    }
}

impl OrderedAggregationConfig {
    pub fn new(name: impl Into<String>, unordered: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unordered: unordered.into(),
            ..Self::default()
        }
    }

    /// Restrict accepted records to the given types
    pub fn with_allowed_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// True if `record_type` passes the type check
    pub fn accepts_type(&self, record_type: &str) -> bool {
        self.allowed_types.is_empty() || self.allowed_types.iter().any(|t| t == record_type)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name cannot be empty".to_string());
        }

        if self.unordered.trim().is_empty() {
            return Err("unordered cannot be empty".to_string());
        }

        if self.name == self.unordered {
            return Err(format!(
                "ordered association '{}' cannot back itself",
                self.name
            ));
        }

        if self.list_source_segment.is_empty()
            || self
                .list_source_segment
                .contains(|c: char| c == '/' || c == '#')
        {
            return Err(format!(
                "list_source_segment '{}' must be a non-empty path segment",
                self.list_source_segment
            ));
        }

        Ok(())
    }
}

/// Settings for the embedded libsql backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file location
    pub path: PathBuf,

    /// How long a connection waits on a locked database before failing
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("strand.db"),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl DatabaseConfig {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.path.as_os_str().is_empty() {
            return Err("path cannot be empty".to_string());
        }

        if self.busy_timeout_ms == 0 {
            return Err("busy_timeout_ms must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_aggregation_config_is_valid() {
        assert!(OrderedAggregationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_self_backed_association_rejected() {
        let config = OrderedAggregationConfig::new("members", "members");
        let err = config.validate().unwrap_err();
        assert!(err.contains("cannot back itself"));
    }

    #[test]
    fn test_list_source_segment_must_be_plain() {
        let mut config = OrderedAggregationConfig::default();
        config.list_source_segment = "a/b".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_allowed_types() {
        let config = OrderedAggregationConfig::default().with_allowed_types(["page"]);
        assert!(config.accepts_type("page"));
        assert!(!config.accepts_type("collection"));
        assert!(OrderedAggregationConfig::default().accepts_type("anything"));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: OrderedAggregationConfig =
            serde_json::from_str(r#"{ "name": "chapters", "unordered": "parts" }"#).unwrap();
        assert_eq!(config.name, "chapters");
        assert_eq!(config.list_source_segment, DEFAULT_LIST_SOURCE_SEGMENT);

        let db: DatabaseConfig = serde_json::from_str(r#"{ "path": "/tmp/x.db" }"#).unwrap();
        assert_eq!(db.busy_timeout_ms, 5000);
        assert!(db.validate().is_ok());
    }

    #[test]
    fn test_zero_busy_timeout_rejected() {
        let mut db = DatabaseConfig::default();
        db.busy_timeout_ms = 0;
        assert!(db.validate().is_err());
    }
}
