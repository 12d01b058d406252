//! Match configuration
//!
//! Controls how much text leaves the engine and in what form. Every length
//! is clamped to an engine-specific hard limit when it is set, so the
//! configured values can be trusted at truncation time.

use serde::{Deserialize, Serialize};

const DEFAULT_MATCH_LEN: usize = 300;

fn default_return_sample_len() -> usize {
    DEFAULT_MATCH_LEN
}

fn default_return_sample_len_limit() -> usize {
    100_000
}

/// Hard limits an engine places on its match config
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchConfigLimits {
    /// Highest allowed `max_sub_match_len`
    pub max_sub_match_len: usize,
    /// Highest allowed `max_whole_match_len`
    pub max_whole_match_len: usize,
    /// Highest allowed `max_return_sample_len`
    pub max_return_sample_len: usize,
    /// Whether callers may switch truncation off
    pub optional_truncate_long_str: bool,
}

/// Match config together with the limits it is held to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchConfig {
    chain_regexes: bool,
    max_sub_match_len: usize,
    max_whole_match_len: usize,
    #[serde(default = "default_return_sample_len")]
    max_return_sample_len: usize,
    show_white_space_chars: bool,
    truncate_long_str: bool,
    max_sub_match_len_limit: usize,
    max_whole_match_len_limit: usize,
    #[serde(default = "default_return_sample_len_limit")]
    max_return_sample_len_limit: usize,
    optional_truncate_long_str: bool,
}

/// The caller-adjustable part of [`MatchConfig`], as sent to remote engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSettings {
    /// Apply each pattern's replacement before running the next pattern
    pub chain_regexes: bool,
    /// Maximum characters of a captured group
    pub max_sub_match_len: usize,
    /// Maximum characters of a whole match
    pub max_whole_match_len: usize,
    /// Maximum characters of the sample echoed back with results
    #[serde(default = "default_return_sample_len")]
    pub max_return_sample_len: usize,
    /// Render whitespace visibly in matches
    pub show_white_space_chars: bool,
    /// Truncate long strings at all
    pub truncate_long_str: bool,
}

/// A single typed config update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchConfigProp {
    /// See [`MatchSettings::chain_regexes`]
    ChainRegexes(bool),
    /// Clamped to the engine's limit
    MaxSubMatchLen(usize),
    /// Clamped to the engine's limit
    MaxWholeMatchLen(usize),
    /// Clamped to the engine's limit
    MaxReturnSampleLen(usize),
    /// See [`MatchSettings::show_white_space_chars`]
    ShowWhiteSpaceChars(bool),
    /// Ignored unless the engine makes truncation optional
    TruncateLongStr(bool),
}

impl MatchConfig {
    /// Defaults for an engine with the given limits
    pub fn new(limits: MatchConfigLimits) -> Self {
        MatchConfig {
            chain_regexes: true,
            max_sub_match_len: DEFAULT_MATCH_LEN,
            max_whole_match_len: DEFAULT_MATCH_LEN,
            max_return_sample_len: DEFAULT_MATCH_LEN,
            show_white_space_chars: false,
            truncate_long_str: true,
            max_sub_match_len_limit: limits.max_sub_match_len,
            max_whole_match_len_limit: limits.max_whole_match_len,
            max_return_sample_len_limit: limits.max_return_sample_len,
            optional_truncate_long_str: limits.optional_truncate_long_str,
        }
        .normalized()
    }

    /// Re-establish the clamp invariants (used after deserialising)
    pub fn normalized(mut self) -> Self {
        self.max_sub_match_len_limit = self.max_sub_match_len_limit.max(1);
        self.max_whole_match_len_limit = self.max_whole_match_len_limit.max(1);
        self.max_return_sample_len_limit = self.max_return_sample_len_limit.max(1);
        self.max_sub_match_len = clamp(self.max_sub_match_len, self.max_sub_match_len_limit);
        self.max_whole_match_len = clamp(self.max_whole_match_len, self.max_whole_match_len_limit);
        self.max_return_sample_len =
            clamp(self.max_return_sample_len, self.max_return_sample_len_limit);
        self
    }

    /// Apply one update in place.
    ///
    /// Lengths above the engine limit are silently clamped to it; a request
    /// to change `truncate_long_str` is dropped when the engine does not make
    /// truncation optional.
    pub fn set(&mut self, prop: MatchConfigProp) {
        match prop {
            MatchConfigProp::ChainRegexes(value) => self.chain_regexes = value,
            MatchConfigProp::MaxSubMatchLen(value) => {
                self.max_sub_match_len = clamp(value, self.max_sub_match_len_limit);
            }
            MatchConfigProp::MaxWholeMatchLen(value) => {
                self.max_whole_match_len = clamp(value, self.max_whole_match_len_limit);
            }
            MatchConfigProp::MaxReturnSampleLen(value) => {
                self.max_return_sample_len = clamp(value, self.max_return_sample_len_limit);
            }
            MatchConfigProp::ShowWhiteSpaceChars(value) => self.show_white_space_chars = value,
            MatchConfigProp::TruncateLongStr(value) => {
                if self.optional_truncate_long_str {
                    self.truncate_long_str = value;
                }
            }
        }
    }

    /// Copy with one update applied
    pub fn with(mut self, prop: MatchConfigProp) -> Self {
        self.set(prop);
        self
    }

    /// Apply every adjustable property from `settings`
    pub fn apply(&mut self, settings: &MatchSettings) {
        for prop in [
            MatchConfigProp::ChainRegexes(settings.chain_regexes),
            MatchConfigProp::MaxSubMatchLen(settings.max_sub_match_len),
            MatchConfigProp::MaxWholeMatchLen(settings.max_whole_match_len),
            MatchConfigProp::MaxReturnSampleLen(settings.max_return_sample_len),
            MatchConfigProp::ShowWhiteSpaceChars(settings.show_white_space_chars),
            MatchConfigProp::TruncateLongStr(settings.truncate_long_str),
        ] {
            self.set(prop);
        }
    }

    /// The adjustable subset
    pub fn settings(&self) -> MatchSettings {
        MatchSettings {
            chain_regexes: self.chain_regexes,
            max_sub_match_len: self.max_sub_match_len,
            max_whole_match_len: self.max_whole_match_len,
            max_return_sample_len: self.max_return_sample_len,
            show_white_space_chars: self.show_white_space_chars,
            truncate_long_str: self.truncate_long_str,
        }
    }

    /// Whether matching chains replacements by default
    pub fn chain_regexes(&self) -> bool {
        self.chain_regexes
    }

    /// Configured sub-match length
    pub fn max_sub_match_len(&self) -> usize {
        self.max_sub_match_len
    }

    /// Configured whole-match length
    pub fn max_whole_match_len(&self) -> usize {
        self.max_whole_match_len
    }

    /// Configured sample preview length
    pub fn max_return_sample_len(&self) -> usize {
        self.max_return_sample_len
    }

    /// Whether whitespace is made visible in matches
    pub fn show_white_space_chars(&self) -> bool {
        self.show_white_space_chars
    }

    /// Whether long strings are truncated
    pub fn truncate_long_str(&self) -> bool {
        self.truncate_long_str
    }

    /// The limits this config is held to
    pub fn limits(&self) -> MatchConfigLimits {
        MatchConfigLimits {
            max_sub_match_len: self.max_sub_match_len_limit,
            max_whole_match_len: self.max_whole_match_len_limit,
            max_return_sample_len: self.max_return_sample_len_limit,
            optional_truncate_long_str: self.optional_truncate_long_str,
        }
    }

    /// Whole match as it should leave the engine
    pub fn present_whole(&self, text: &str) -> String {
        self.present(text, self.max_whole_match_len)
    }

    /// Captured group as it should leave the engine
    pub fn present_sub(&self, text: &str) -> String {
        self.present(text, self.max_sub_match_len)
    }

    /// Sample preview as it should leave the engine
    pub fn present_sample(&self, text: &str) -> String {
        self.clip(text, self.max_return_sample_len)
    }

    // visualised markers count towards the limit
    fn present(&self, text: &str, max: usize) -> String {
        if self.show_white_space_chars {
            self.clip(&visualize_white_space(text), max)
        } else {
            self.clip(text, max)
        }
    }

    fn clip(&self, text: &str, max: usize) -> String {
        if self.truncate_long_str {
            truncate_chars(text, max)
        } else {
            text.to_string()
        }
    }
}

fn clamp(value: usize, limit: usize) -> usize {
    value.clamp(1, limit)
}

/// First `max` characters of `text`
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

/// Replace whitespace characters with bracketed names
pub fn visualize_white_space(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            ' ' => output.push_str("[space]"),
            '\t' => output.push_str("[tab]"),
            '\r' => output.push_str("[cr]"),
            '\n' => output.push_str("[lf]"),
            '\u{0C}' => output.push_str("[ff]"),
            '\u{0B}' => output.push_str("[vt]"),
            other => output.push(other),
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(optional: bool) -> MatchConfigLimits {
        MatchConfigLimits {
            max_sub_match_len: 50,
            max_whole_match_len: 100,
            max_return_sample_len: 80,
            optional_truncate_long_str: optional,
        }
    }

    #[test]
    fn test_defaults_clamped_to_limits() {
        let config = MatchConfig::new(limits(true));
        assert_eq!(config.max_sub_match_len(), 50);
        assert_eq!(config.max_whole_match_len(), 100);
        assert_eq!(config.max_return_sample_len(), 80);
        assert!(config.truncate_long_str());
        assert!(config.chain_regexes());
    }

    #[test]
    fn test_lengths_clamped_on_set() {
        let mut config = MatchConfig::new(limits(true));
        config.set(MatchConfigProp::MaxWholeMatchLen(1_000));
        assert_eq!(config.max_whole_match_len(), 100);
        config.set(MatchConfigProp::MaxSubMatchLen(20));
        assert_eq!(config.max_sub_match_len(), 20);
        config.set(MatchConfigProp::MaxSubMatchLen(0));
        assert_eq!(config.max_sub_match_len(), 1);
    }

    #[test]
    fn test_truncate_toggle_needs_permission() {
        let fixed = MatchConfig::new(limits(false)).with(MatchConfigProp::TruncateLongStr(false));
        assert!(fixed.truncate_long_str());

        let optional =
            MatchConfig::new(limits(true)).with(MatchConfigProp::TruncateLongStr(false));
        assert!(!optional.truncate_long_str());
    }

    #[test]
    fn test_apply_settings_round_trip() {
        let mut config = MatchConfig::new(limits(true));
        let mut settings = config.settings();
        settings.chain_regexes = false;
        settings.max_whole_match_len = 500;
        settings.show_white_space_chars = true;
        config.apply(&settings);
        assert!(!config.chain_regexes());
        assert_eq!(config.max_whole_match_len(), 100);
        assert!(config.show_white_space_chars());
    }

    #[test]
    fn test_present_truncates_by_characters() {
        let config = MatchConfig::new(limits(true)).with(MatchConfigProp::MaxSubMatchLen(3));
        assert_eq!(config.present_sub("héllo"), "hél");
        assert_eq!(config.present_sub("hé"), "hé");
    }

    #[test]
    fn test_present_never_exceeds_limit_with_visible_white_space() {
        let config = MatchConfig::new(limits(true))
            .with(MatchConfigProp::MaxWholeMatchLen(10))
            .with(MatchConfigProp::ShowWhiteSpaceChars(true));
        let shown = config.present_whole("a b c d e f g h");
        assert_eq!(shown, "a[space]b[");
        assert_eq!(shown.chars().count(), 10);
        assert_eq!(config.present_whole("a b"), "a[space]b");

        let untruncated = config.with(MatchConfigProp::TruncateLongStr(false));
        assert_eq!(
            untruncated.present_whole("a b\tc"),
            "a[space]b[tab]c"
        );
    }

    #[test]
    fn test_visualize_white_space() {
        assert_eq!(visualize_white_space("a\r\n\tb"), "a[cr][lf][tab]b");
    }

    #[test]
    fn test_deserialized_config_is_normalized() {
        let json = r#"{
            "chainRegexes": false,
            "maxSubMatchLen": 900,
            "maxWholeMatchLen": 10,
            "showWhiteSpaceChars": false,
            "truncateLongStr": true,
            "maxSubMatchLenLimit": 500,
            "maxWholeMatchLenLimit": 500,
            "optionalTruncateLongStr": false
        }"#;
        let config: MatchConfig = serde_json::from_str(json).unwrap();
        let config = config.normalized();
        assert_eq!(config.max_sub_match_len(), 500);
        assert_eq!(config.max_whole_match_len(), 10);
        assert_eq!(config.max_return_sample_len(), 300);
    }
}
