//! Delimiter and modifier validation
//!
//! Pure functions of an engine's capability table. Failures still carry a
//! safe value (the default delimiters, or the cleaned modifier string) so
//! callers can decide how to recover.

use crate::capabilities::{DelimiterPair, EngineCapabilities};
use crate::error::ValidationError;

/// Check a delimiter pair against the engine's allowed delimiters.
///
/// A known paired delimiter is returned whole when it is the only one with
/// a matching side. Otherwise (no match, or a pair like `(` `>` that touches
/// two entries) the opening character becomes a symmetric pair.
pub fn validate_delimiters(
    caps: &EngineCapabilities,
    pair: DelimiterPair,
) -> Result<DelimiterPair, ValidationError> {
    if !caps.allowed_delimiters().contains(&pair.open) {
        let allowed: Vec<String> = caps
            .allowed_delimiters()
            .iter()
            .map(char::to_string)
            .collect();
        return Err(ValidationError::Delimiter {
            invalid: pair.open,
            message: format!(
                "Delimiter \"{}\" is invalid. Delimiters must be one of the following: {}",
                pair.open,
                human_list(&allowed)
            ),
            fallback: caps.defaults().delimiters(),
        });
    }

    let mut paired = caps
        .allowed_paired_delimiters()
        .iter()
        .filter(|allowed| allowed.open == pair.open || allowed.close == pair.close);

    Ok(match (paired.next(), paired.next()) {
        (Some(allowed), None) => *allowed,
        _ => DelimiterPair::symmetric(pair.open),
    })
}

/// Deduplicate modifiers and drop the ones the engine does not know.
///
/// First occurrence wins and order is preserved. Unknown characters are
/// reported once each.
pub fn validate_modifiers(caps: &EngineCapabilities, raw: &str) -> Result<String, ValidationError> {
    let mut cleaned = String::with_capacity(raw.len());
    let mut invalid: Vec<char> = Vec::new();

    for modifier in raw.chars() {
        if caps.allowed_modifiers().contains(&modifier) {
            if !cleaned.contains(modifier) {
                cleaned.push(modifier);
            }
        } else if !invalid.contains(&modifier) {
            invalid.push(modifier);
        }
    }

    if invalid.is_empty() {
        return Ok(cleaned);
    }

    let label = caps.modifiers_label().as_str();
    let bad: Vec<String> = invalid.iter().map(char::to_string).collect();
    let allowed: Vec<String> = caps.allowed_modifiers().iter().map(char::to_string).collect();
    Err(ValidationError::Modifier {
        message: format!(
            "The {label}: {} {} invalid. Only the following {label} are valid: {}",
            human_list(&bad),
            if invalid.len() == 1 { "is" } else { "are" },
            human_list(&allowed)
        ),
        invalid,
        cleaned,
    })
}

/// Quote and join items for messages: `"a", "b" & "c"`
pub fn human_list<S: AsRef<str>>(items: &[S]) -> String {
    let mut output = String::new();
    let last = items.len().saturating_sub(1);
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            output.push_str(if i == last { " & " } else { ", " });
        }
        output.push('"');
        output.push_str(item.as_ref());
        output.push('"');
    }
    output
}
