//! Pattern records supplied by callers

use serde::{Deserialize, Serialize};

use crate::capabilities::DelimiterPair;
use crate::result::PatternId;

/// A pattern as the caller wrote it, plus what to replace matches with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternRecord {
    /// Caller-assigned id, unique within one request
    pub id: PatternId,
    /// Pattern text, without delimiters or modifiers
    pub regex: String,
    /// Modifier characters
    #[serde(default)]
    pub modifiers: String,
    /// Delimiters; the engine's defaults are used when absent
    #[serde(default)]
    pub delimiters: Option<DelimiterPair>,
    /// Replacement template
    #[serde(default)]
    pub replace: String,
    /// Turn `\n`, `\t`, ... in `replace` into the characters they name
    #[serde(default)]
    pub transform_escaped_white_space: bool,
}

impl PatternRecord {
    /// A pattern with no modifiers and an empty replacement
    pub fn new(id: PatternId, regex: impl Into<String>) -> Self {
        PatternRecord {
            id,
            regex: regex.into(),
            modifiers: String::new(),
            delimiters: None,
            replace: String::new(),
            transform_escaped_white_space: false,
        }
    }

    /// Set the modifiers
    pub fn modifiers(mut self, modifiers: impl Into<String>) -> Self {
        self.modifiers = modifiers.into();
        self
    }

    /// Set the delimiters
    pub fn delimiters(mut self, delimiters: DelimiterPair) -> Self {
        self.delimiters = Some(delimiters);
        self
    }

    /// Set the replacement template
    pub fn replace(mut self, replace: impl Into<String>) -> Self {
        self.replace = replace.into();
        self
    }

    /// Set whether escaped whitespace in the replacement is transformed
    pub fn transform_escaped_white_space(mut self, transform: bool) -> Self {
        self.transform_escaped_white_space = transform;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let record = PatternRecord::new(9, "a(b)")
            .modifiers("gi")
            .replace("$1")
            .transform_escaped_white_space(true);
        assert_eq!(record.id, 9);
        assert_eq!(record.modifiers, "gi");
        assert_eq!(record.replace, "$1");
        assert!(record.transform_escaped_white_space);
        assert!(record.delimiters.is_none());
    }

    #[test]
    fn test_wire_names() {
        let record = PatternRecord::new(1, "x").delimiters(DelimiterPair::symmetric('#'));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["transformEscapedWhiteSpace"], false);
        assert_eq!(json["delimiters"]["open"], "#");

        let minimal: PatternRecord = serde_json::from_str(r#"{"id":2,"regex":"y"}"#).unwrap();
        assert_eq!(minimal, PatternRecord::new(2, "y"));
    }
}
