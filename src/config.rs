//! Context configuration.
//!
//! Decoding limits protect a context from hostile or corrupted snapshots: a
//! length prefix claiming gigabytes is rejected before anything is allocated.

use serde::{Deserialize, Serialize};

use crate::error::{KnowledgeError, KnowledgeResult};

/// Configuration for a knowledge context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Maximum byte length of any string read from a snapshot.
    pub max_string_bytes: usize,
    /// Maximum byte length of a single primitive payload.
    pub max_primitive_bytes: usize,
    /// Maximum number of entities, facts, inheritance rows or ancestors per row.
    pub max_record_count: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_string_bytes: 1024 * 1024,        // 1 MiB
            max_primitive_bytes: 16 * 1024 * 1024, // 16 MiB
            max_record_count: 10_000_000,
        }
    }
}

impl ContextConfig {
    const MIN_STRING_BYTES: usize = 256;
    const MIN_RECORD_COUNT: usize = 1;

    /// Checks that the limits are usable.
    ///
    /// # Errors
    ///
    /// Returns `KnowledgeError::Config` if a limit is below its minimum or if
    /// primitives are capped below strings (identifiers are strings too).
    pub fn validate(self) -> KnowledgeResult<Self> {
        if self.max_string_bytes < Self::MIN_STRING_BYTES {
            return Err(KnowledgeError::config(format!(
                "max_string_bytes must be at least {} (got {})",
                Self::MIN_STRING_BYTES,
                self.max_string_bytes
            )));
        }

        if self.max_primitive_bytes < self.max_string_bytes {
            return Err(KnowledgeError::config(format!(
                "max_primitive_bytes ({}) must not be smaller than max_string_bytes ({})",
                self.max_primitive_bytes, self.max_string_bytes
            )));
        }

        if self.max_record_count < Self::MIN_RECORD_COUNT {
            return Err(KnowledgeError::config(
                "max_record_count must be at least 1",
            ));
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(ContextConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_tiny_strings() {
        let cfg = ContextConfig {
            max_string_bytes: 8,
            ..ContextConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_primitives_smaller_than_strings() {
        let cfg = ContextConfig {
            max_string_bytes: 4096,
            max_primitive_bytes: 1024,
            ..ContextConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(format!("{err}").contains("max_primitive_bytes"));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: ContextConfig = serde_json::from_str(r#"{"max_record_count": 42}"#).unwrap();
        assert_eq!(cfg.max_record_count, 42);
        assert_eq!(cfg.max_string_bytes, ContextConfig::default().max_string_bytes);
    }
}
