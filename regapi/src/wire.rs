//! Remote engine wire contract
//!
//! A request is a JSON object tagged by `action` with the inputs under
//! `payload`:
//!
//! ```json
//! {"action":"test","payload":{"regex":"a+","modifiers":"i","delimiters":{"open":"/","close":"/"}}}
//! {"action":"match","payload":{"config":{...},"input":["..."],"regexes":[...]}}
//! {"action":"replace","payload":{"input":["..."],"regexes":[...]}}
//! ```
//!
//! Responses are the bare result shapes: [`Validity`] for `test`, a list of
//! [`SampleMatches`] for `match`, a list of [`ReplaceResult`] for `replace`.
//!
//! [`Validity`]: crate::result::Validity
//! [`SampleMatches`]: crate::result::SampleMatches
//! [`ReplaceResult`]: crate::result::ReplaceResult

use serde::{Deserialize, Serialize};

use crate::capabilities::DelimiterPair;
use crate::config::MatchSettings;
use crate::pattern::PatternRecord;

/// One request to a remote engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "lowercase")]
pub enum RemoteRequest {
    /// Check one pattern
    Test(TestPayload),
    /// Match patterns against samples
    Match(MatchPayload),
    /// Replace through patterns
    Replace(ReplacePayload),
}

impl RemoteRequest {
    /// Action name as it appears on the wire
    pub fn action(&self) -> &'static str {
        match self {
            RemoteRequest::Test(_) => "test",
            RemoteRequest::Match(_) => "match",
            RemoteRequest::Replace(_) => "replace",
        }
    }
}

/// Body of a `test` request: compile one pattern and report whether it is usable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPayload {
    /// Pattern source without delimiters
    pub regex: String,
    /// Modifiers as typed by the user, validated on the server side
    pub modifiers: String,
    /// Delimiters the pattern was written with
    pub delimiters: DelimiterPair,
}

/// Body of a `match` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPayload {
    /// Output settings. `showWhiteSpaceChars` is always sent as `false`
    pub config: MatchSettings,
    /// Samples, matched in order
    pub input: Vec<String>,
    /// Patterns, run against every sample
    pub regexes: Vec<PatternRecord>,
}

/// Body of a `replace` request; every pattern rewrites the output of the one before
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacePayload {
    /// Samples to rewrite
    pub input: Vec<String>,
    /// Patterns with their replacement templates
    pub regexes: Vec<PatternRecord>,
}
