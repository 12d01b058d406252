//! Engine-agnostic result records
//!
//! These are the shapes every engine variant returns, and the shapes the
//! remote wire contract carries. Field names on the wire follow the
//! established regex API (`regexID`, `allMatches`, `executionTime`, ...).

use std::fmt;
use std::time::Duration;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Caller-assigned pattern identifier, unique within one request
pub type PatternId = i64;

/// Normalised diagnostic for a pattern that could not be used
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("pattern {regex_id} is invalid{}: {raw_message}", at_offset(.offset))]
pub struct PatternError {
    /// Pattern the error belongs to
    #[serde(rename = "regexID")]
    pub regex_id: PatternId,
    /// Message exactly as the engine produced it
    pub raw_message: String,
    /// Character offset into the pattern where the problem starts, if known
    pub offset: Option<usize>,
    /// Character at `offset`, if known
    pub bad_character: Option<char>,
    /// Shorter, human readable messages extracted from the raw one
    pub messages: Vec<String>,
}

impl PatternError {
    /// An error with only a raw message
    pub fn new(regex_id: PatternId, raw_message: impl Into<String>) -> Self {
        PatternError {
            regex_id,
            raw_message: raw_message.into(),
            offset: None,
            bad_character: None,
            messages: Vec::new(),
        }
    }
}

fn at_offset(offset: &Option<usize>) -> String {
    offset.map(|o| format!(" at offset {o}")).unwrap_or_default()
}

/// Whether a pattern could be used, as reported per result cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "ValidityRepr", try_from = "ValidityRepr")]
pub enum Validity {
    /// The pattern compiled
    Valid,
    /// The pattern was rejected
    Invalid(PatternError),
}

impl Validity {
    /// True for [`Validity::Valid`]
    pub fn is_valid(&self) -> bool {
        matches!(self, Validity::Valid)
    }

    /// The error, if any
    pub fn error(&self) -> Option<&PatternError> {
        match self {
            Validity::Valid => None,
            Validity::Invalid(error) => Some(error),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct ValidityRepr {
    valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<PatternError>,
}

impl From<Validity> for ValidityRepr {
    fn from(validity: Validity) -> Self {
        match validity {
            Validity::Valid => ValidityRepr {
                valid: true,
                error: None,
            },
            Validity::Invalid(error) => ValidityRepr {
                valid: false,
                error: Some(error),
            },
        }
    }
}

impl TryFrom<ValidityRepr> for Validity {
    type Error = String;

    fn try_from(repr: ValidityRepr) -> Result<Self, Self::Error> {
        match (repr.valid, repr.error) {
            (true, _) => Ok(Validity::Valid),
            (false, Some(error)) => Ok(Validity::Invalid(error)),
            (false, None) => Err("invalid pattern reported without an error".to_string()),
        }
    }
}

/// Captured groups of one match, in order: numbered groups first, then
/// named groups. A group that did not take part in the match is present
/// with `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Groups(Vec<(String, Option<String>)>);

impl Groups {
    /// Empty group list
    pub fn new() -> Self {
        Groups(Vec::new())
    }

    /// Append a group
    pub fn push(&mut self, key: impl Into<String>, value: Option<String>) {
        self.0.push((key.into(), value));
    }

    /// Look a group up by key. `Some(None)` means the group exists but did
    /// not participate.
    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_deref())
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    /// Rewrite every captured value
    pub fn map_values(self, mut f: impl FnMut(&str) -> String) -> Self {
        Groups(
            self.0
                .into_iter()
                .map(|(k, v)| (k, v.map(|text| f(&text))))
                .collect(),
        )
    }

    /// Number of groups
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no groups
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Groups {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Groups {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct GroupsVisitor;

        impl<'de> Visitor<'de> for GroupsVisitor {
            type Value = Groups;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of group keys to captured text or null")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Groups, A::Error> {
                let mut groups = Groups::new();
                while let Some((key, value)) = access.next_entry::<String, Option<String>>()? {
                    groups.push(key, value);
                }
                Ok(groups)
            }
        }

        deserializer.deserialize_map(GroupsVisitor)
    }
}

/// One located match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOccurrence {
    /// Whole matched text
    pub whole: String,
    /// Captured groups
    pub parts: Groups,
    /// Character offset of the match start in the sample it was found in
    pub position: usize,
}

/// Result of one pattern against one sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternOutcome {
    /// Pattern id
    #[serde(rename = "regexID")]
    pub regex_id: PatternId,
    /// Whether the pattern compiled
    pub error: Validity,
    /// Time spent matching (zero for invalid patterns)
    #[serde(with = "duration_ms")]
    pub execution_time: Duration,
    /// Matches, in order
    pub matches: Vec<MatchOccurrence>,
}

/// Results of every pattern against one sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleMatches {
    /// Index of the sample in the caller's list
    #[serde(rename = "inputID")]
    pub input_id: usize,
    /// Preview of the sample, truncated per the match config
    pub sample: String,
    /// One outcome per pattern, in pattern order
    pub all_matches: Vec<PatternOutcome>,
    /// Sum of every pattern's matching time
    #[serde(with = "duration_ms")]
    pub total_execution_time: Duration,
}

/// A sample after every pattern's replacement has been applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceResult {
    /// Final text
    #[serde(rename = "sample")]
    pub text: String,
    /// Sum of every pattern's replacement time
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

/// Validity of one pattern, independent of any sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOutcome {
    /// Pattern id
    #[serde(rename = "regexID")]
    pub regex_id: PatternId,
    /// Whether the pattern compiled
    pub valid: bool,
    /// Diagnostic for invalid patterns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<PatternError>,
}

impl TestOutcome {
    /// Build from a compile result
    pub fn new(regex_id: PatternId, validity: Validity) -> Self {
        match validity {
            Validity::Valid => TestOutcome {
                regex_id,
                valid: true,
                error: None,
            },
            Validity::Invalid(error) => TestOutcome {
                regex_id,
                valid: false,
                error: Some(error),
            },
        }
    }
}

/// A value together with how long it took to produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timed<T> {
    /// The value
    pub value: T,
    /// Wall-clock time spent
    pub duration: Duration,
}

/// Durations travel as floating-point milliseconds
pub(crate) mod duration_ms {
    use std::time::Duration;

    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_nanos() as f64 / 1_000_000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = f64::deserialize(deserializer)?;
        if !millis.is_finite() || millis < 0.0 {
            return Err(D::Error::custom(format!("invalid duration {millis}")));
        }
        Ok(Duration::from_nanos((millis * 1_000_000.0) as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_keep_order_and_absent_values() {
        let mut groups = Groups::new();
        groups.push("1", Some("ab".to_string()));
        groups.push("2", None);
        groups.push("word", Some("ab".to_string()));

        let json = serde_json::to_string(&groups).unwrap();
        assert_eq!(json, r#"{"1":"ab","2":null,"word":"ab"}"#);

        let back: Groups = serde_json::from_str(&json).unwrap();
        assert_eq!(back, groups);
        assert_eq!(back.get("2"), Some(None));
        assert_eq!(back.get("3"), None);
    }

    #[test]
    fn test_validity_wire_shape() {
        let valid = serde_json::to_string(&Validity::Valid).unwrap();
        assert_eq!(valid, r#"{"valid":true}"#);

        let invalid = Validity::Invalid(PatternError::new(3, "unclosed group"));
        let json = serde_json::to_value(&invalid).unwrap();
        assert_eq!(json["valid"], false);
        assert_eq!(json["error"]["regexID"], 3);
        assert_eq!(json["error"]["rawMessage"], "unclosed group");

        let back: Validity = serde_json::from_value(json).unwrap();
        assert_eq!(back, invalid);
    }

    #[test]
    fn test_invalid_without_error_rejected() {
        let result: Result<Validity, _> = serde_json::from_str(r#"{"valid":false}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_duration_serialized_as_millis() {
        let result = ReplaceResult {
            text: "x".to_string(),
            duration: Duration::from_millis(2),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["sample"], "x");
        assert_eq!(json["duration"], 2.0);
    }

    #[test]
    fn test_negative_duration_rejected() {
        let result: Result<ReplaceResult, _> =
            serde_json::from_str(r#"{"sample":"x","duration":-1.0}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_pattern_error_display() {
        let mut err = PatternError::new(4, "unclosed group");
        assert_eq!(err.to_string(), "pattern 4 is invalid: unclosed group");
        err.offset = Some(0);
        assert_eq!(err.to_string(), "pattern 4 is invalid at offset 0: unclosed group");
    }
}
