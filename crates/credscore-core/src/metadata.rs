//! Score metadata payloads.
//!
//! Metadata attached to a score update is a closed tagged enum with an
//! explicit schema version, not an untyped map: a malformed payload fails
//! deserialization deterministically instead of propagating nulls into the
//! record.

use serde::{Deserialize, Serialize};

/// Current metadata schema version stamped by [`ScoreMetadata::json`].
pub const METADATA_SCHEMA_VERSION: u32 = 1;

/// Opaque-but-versioned metadata blob carried by a score update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScoreMetadata {
    /// No metadata supplied.
    Empty,
    /// Structured JSON payload (e.g. the factor names that fed the score).
    Json {
        schema_version: u32,
        body: serde_json::Value,
    },
    /// Raw bytes the ledger stores but never interprets, hex-encoded.
    Opaque { schema_version: u32, hex: String },
}

impl ScoreMetadata {
    /// Wrap a JSON value at the current schema version.
    pub fn json(body: serde_json::Value) -> Self {
        ScoreMetadata::Json {
            schema_version: METADATA_SCHEMA_VERSION,
            body,
        }
    }

    /// Schema version of this payload, if it carries one.
    pub fn schema_version(&self) -> Option<u32> {
        match self {
            ScoreMetadata::Empty => None,
            ScoreMetadata::Json { schema_version, .. }
            | ScoreMetadata::Opaque { schema_version, .. } => Some(*schema_version),
        }
    }
}

impl Default for ScoreMetadata {
    fn default() -> Self {
        ScoreMetadata::Empty
    }
}
