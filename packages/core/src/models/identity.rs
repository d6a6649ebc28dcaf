//! Record and node identities
//!
//! Identities are opaque, stable keys (URI-like strings). They are assigned once
//! and never reused: list node identities are minted as fragments of the list
//! source that contains them (`<list source>#<uuid>`).

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque stable key for a record or list node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Wrap an existing key without validation
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generate a fresh random identity (UUID v4)
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Mint a new fragment identity underneath this one
    ///
    /// Used for list nodes: every node lives in the graph of its list source,
    /// so its identity is `<list source>#<random>`.
    pub fn mint_fragment(&self) -> Self {
        Self(format!("{}#{}", self.0, Uuid::new_v4().simple()))
    }

    /// Identity of a record nested under this one (e.g. an owner's list source)
    pub fn child(&self, segment: &str) -> Self {
        Self(format!("{}/{}", self.0, segment))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Identity {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
