//! Property tests for validation, clamping and truncation

use proptest::prelude::*;
use regapi::config::truncate_chars;
use regapi::{
    DelimiterPair, EngineCapabilities, MatchConfigProp, ValidationError, registry,
    validate_delimiters, validate_modifiers,
};

fn pcre() -> EngineCapabilities {
    registry::builtin().unwrap().get("pcre").unwrap().clone()
}

proptest! {
    #[test]
    fn test_modifiers_deduplicated_in_order(raw in "[a-zA-Z0-9 ]{0,24}") {
        let caps = pcre();
        let allowed = caps.allowed_modifiers();
        let cleaned = match validate_modifiers(&caps, &raw) {
            Ok(cleaned) => cleaned,
            Err(ValidationError::Modifier { invalid, cleaned, .. }) => {
                for c in &invalid {
                    prop_assert!(!allowed.contains(c));
                    prop_assert!(!cleaned.contains(*c));
                }
                let mut seen = invalid.clone();
                seen.sort_unstable();
                seen.dedup();
                prop_assert_eq!(seen.len(), invalid.len());
                cleaned
            }
            Err(other) => return Err(TestCaseError::fail(format!("unexpected {other:?}"))),
        };

        let mut expected = String::new();
        for c in raw.chars() {
            if allowed.contains(&c) && !expected.contains(c) {
                expected.push(c);
            }
        }
        prop_assert_eq!(cleaned, expected);
    }

    #[test]
    fn test_unknown_delimiter_falls_back(c in any::<char>()) {
        let caps = pcre();
        prop_assume!(!caps.allowed_delimiters().contains(&c));
        match validate_delimiters(&caps, DelimiterPair::symmetric(c)) {
            Err(ValidationError::Delimiter { invalid, message, fallback }) => {
                prop_assert_eq!(invalid, c);
                prop_assert!(message.contains(c));
                prop_assert_eq!(fallback, caps.defaults().delimiters());
            }
            other => return Err(TestCaseError::fail(format!("unexpected {other:?}"))),
        }
    }

    #[test]
    fn test_clamp_never_exceeds_limit(requested in 0usize..1_000_000) {
        let caps = pcre();
        let config = caps
            .match_config()
            .clone()
            .with(MatchConfigProp::MaxWholeMatchLen(requested))
            .with(MatchConfigProp::MaxSubMatchLen(requested));
        let limits = config.limits();
        prop_assert!(config.max_whole_match_len() <= limits.max_whole_match_len);
        prop_assert!(config.max_sub_match_len() <= limits.max_sub_match_len);
        if requested > limits.max_whole_match_len {
            prop_assert_eq!(config.max_whole_match_len(), limits.max_whole_match_len);
        }
    }

    #[test]
    fn test_truncation_is_exact(text in "\\PC{0,80}", max in 1usize..40) {
        let caps = registry::builtin().unwrap().get("rust-regex").unwrap().clone();
        let config = caps
            .match_config()
            .clone()
            .with(MatchConfigProp::MaxWholeMatchLen(max));
        let shown = config.present_whole(&text);
        let length = text.chars().count();
        if length > max {
            prop_assert_eq!(shown.chars().count(), max);
        } else {
            prop_assert_eq!(&shown, &text);
        }
        prop_assert!(text.starts_with(&shown));
        prop_assert_eq!(truncate_chars(&text, max), shown);

        let untruncated = config.with(MatchConfigProp::TruncateLongStr(false));
        prop_assert_eq!(untruncated.present_whole(&text), text);
    }
}

#[test]
fn test_paired_delimiters_returned_exactly() {
    let caps = pcre();
    for pair in caps.allowed_paired_delimiters() {
        assert_eq!(validate_delimiters(&caps, *pair).unwrap(), *pair);
    }
}
