//! Compilation options shared by every compilation an engine runs.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{AmongError, Result};
pub use crate::syntax::tokenizer::InvalidUnicodeHandling;

/// Options read by the parser and the macro layer.
///
/// Deserializes from JSON; absent keys keep their default.
///
/// ```rust
/// use among::engine::EngineConfig;
///
/// let json = r#"{"allow_duplicate_object_property": true}"#;
/// let config: EngineConfig = serde_json::from_str(json).unwrap();
/// assert!(config.allow_duplicate_object_property);
/// assert!(config.copy_macro_constant);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Duplicate object keys become warnings instead of errors; the first value is kept.
    pub allow_duplicate_object_property: bool,
    /// Conflicting operator definitions become warnings, and the new definition replaces the old.
    pub allow_invalid_operator_registration: bool,
    /// Constant macros hand out a copy of their value.
    pub copy_macro_constant: bool,
    /// Severity of `\u`/`\U` escapes that do not form a code point.
    pub invalid_unicode_handling: InvalidUnicodeHandling,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            allow_duplicate_object_property: false,
            allow_invalid_operator_registration: false,
            copy_macro_constant: true,
            invalid_unicode_handling: InvalidUnicodeHandling::Error,
        }
    }
}

impl EngineConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| AmongError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_is_default() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn unicode_handling_is_lowercase() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"invalid_unicode_handling": "ignore"}"#).unwrap();
        assert_eq!(config.invalid_unicode_handling, InvalidUnicodeHandling::Ignore);
    }
}
