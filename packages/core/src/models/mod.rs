//! Data Models
//!
//! This module contains the core data structures used throughout Strand:
//!
//! - `Identity` - Opaque stable keys for records and list nodes
//! - `Record` - Universal record model for elements and owners
//!
//! All entities use the Pure JSON approach with entity data stored in the
//! `properties` field; association state (membership, order summary) lives
//! in typed fields alongside it.

mod identity;
mod record;

#[cfg(test)]
mod record_test;

pub use identity::Identity;
pub use record::{Record, ValidationError};
