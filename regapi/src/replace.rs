//! Replacement templates
//!
//! A replacement string may reference the match it replaces:
//! `$&`, `$0`, `\0` and `\g{0}` insert the whole match; `$1`..`$99`, `\1`,
//! `${1}`, `$<1>` and `\g{1}` insert a numbered group; `${name}`,
//! `$<name>` and `\g{name}` insert a named group; `` $` `` and `$'` insert
//! the text before and after the match; `$$` is a literal dollar. Any other
//! backslash escape yields the escaped character. References to groups that
//! do not exist or did not participate expand to nothing.

use thiserror::Error;

/// A part of a replacement string
#[derive(Debug, Clone, PartialEq)]
pub enum ReplacementPart {
    /// Literal text
    Literal(String),
    /// Group by number (1-based)
    BackrefNumber(u32),
    /// Group by name
    BackrefName(String),
    /// Entire match
    EntireMatch,
    /// Text preceding the match
    Before,
    /// Text following the match
    After,
}

/// Errors that can occur while parsing a replacement template
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReplacementError {
    /// A reference that is opened but never closed, or is empty
    #[error("invalid group reference `{0}` in replacement")]
    InvalidBackreference(String),
}

/// A parsed replacement template
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Replacement {
    parts: Vec<ReplacementPart>,
}

impl Replacement {
    /// Parse a replacement string
    pub fn parse(input: &str) -> Result<Self, ReplacementError> {
        let mut parts = Vec::new();
        let mut chars = input.chars().peekable();
        let mut literal = String::new();

        let push = |parts: &mut Vec<ReplacementPart>, literal: &mut String, part| {
            if !literal.is_empty() {
                parts.push(ReplacementPart::Literal(std::mem::take(literal)));
            }
            parts.push(part);
        };

        while let Some(c) = chars.next() {
            match c {
                '$' => match chars.peek().copied() {
                    Some('$') => {
                        chars.next();
                        literal.push('$');
                    }
                    Some('&') => {
                        chars.next();
                        push(&mut parts, &mut literal, ReplacementPart::EntireMatch);
                    }
                    Some('`') => {
                        chars.next();
                        push(&mut parts, &mut literal, ReplacementPart::Before);
                    }
                    Some('\'') => {
                        chars.next();
                        push(&mut parts, &mut literal, ReplacementPart::After);
                    }
                    Some(d) if d.is_ascii_digit() => {
                        let num = read_number(&mut chars, 2);
                        push(&mut parts, &mut literal, number_part(num));
                    }
                    Some(open @ ('{' | '<')) => {
                        chars.next();
                        let close = if open == '{' { '}' } else { '>' };
                        let name = read_reference(&mut chars, open, close)?;
                        push(&mut parts, &mut literal, reference_part(name));
                    }
                    _ => literal.push('$'),
                },
                '\\' => match chars.peek().copied() {
                    Some(d) if d.is_ascii_digit() => {
                        let num = read_number(&mut chars, usize::MAX);
                        push(&mut parts, &mut literal, number_part(num));
                    }
                    Some('g') => {
                        chars.next();
                        if chars.peek() == Some(&'{') {
                            chars.next();
                            let name = read_reference(&mut chars, '{', '}')?;
                            push(&mut parts, &mut literal, reference_part(name));
                        } else {
                            literal.push('g');
                        }
                    }
                    Some(next) => {
                        chars.next();
                        literal.push(next);
                    }
                    None => literal.push('\\'),
                },
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            parts.push(ReplacementPart::Literal(literal));
        }

        Ok(Replacement { parts })
    }

    /// Apply the replacement to one match.
    ///
    /// `groups[i]` is the byte span of group `i + 1`; `names[i]` is its
    /// name, if it has one.
    pub fn apply(
        &self,
        original: &str,
        match_start: usize,
        match_end: usize,
        groups: &[Option<(usize, usize)>],
        names: &[Option<String>],
    ) -> String {
        let mut result = String::new();
        self.apply_into(&mut result, original, match_start, match_end, groups, names);
        result
    }

    /// Like [`Replacement::apply`], appending to `out`
    pub fn apply_into(
        &self,
        out: &mut String,
        original: &str,
        match_start: usize,
        match_end: usize,
        groups: &[Option<(usize, usize)>],
        names: &[Option<String>],
    ) {
        for part in &self.parts {
            match part {
                ReplacementPart::Literal(text) => out.push_str(text),
                ReplacementPart::EntireMatch => out.push_str(&original[match_start..match_end]),
                ReplacementPart::Before => out.push_str(&original[..match_start]),
                ReplacementPart::After => out.push_str(&original[match_end..]),
                ReplacementPart::BackrefNumber(n) => {
                    let span = (*n as usize)
                        .checked_sub(1)
                        .and_then(|i| groups.get(i).copied().flatten());
                    if let Some((start, end)) = span {
                        out.push_str(&original[start..end]);
                    }
                }
                ReplacementPart::BackrefName(name) => {
                    let span = names
                        .iter()
                        .position(|n| n.as_deref() == Some(name.as_str()))
                        .and_then(|i| groups.get(i).copied().flatten());
                    if let Some((start, end)) = span {
                        out.push_str(&original[start..end]);
                    }
                }
            }
        }
    }

    /// Get the parts of the replacement
    pub fn parts(&self) -> &[ReplacementPart] {
        &self.parts
    }
}

/// Turn escaped whitespace (`\n`, `\r`, `\t`, `\f`, `\v`) into the
/// characters it names. An escaped backslash is kept as is, so `\\n` stays
/// a backslash followed by `n` once the template is parsed.
pub fn transform_escaped_white_space(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            output.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => output.push('\n'),
            Some('r') => output.push('\r'),
            Some('t') => output.push('\t'),
            Some('f') => output.push('\u{0C}'),
            Some('v') => output.push('\u{0B}'),
            Some(other) => {
                output.push('\\');
                output.push(other);
            }
            None => output.push('\\'),
        }
    }

    output
}

fn number_part(num: u32) -> ReplacementPart {
    if num == 0 {
        ReplacementPart::EntireMatch
    } else {
        ReplacementPart::BackrefNumber(num)
    }
}

fn reference_part(name: String) -> ReplacementPart {
    match name.parse::<u32>() {
        Ok(num) => number_part(num),
        Err(_) => ReplacementPart::BackrefName(name),
    }
}

/// Read up to `max_digits` decimal digits
fn read_number(chars: &mut std::iter::Peekable<std::str::Chars>, max_digits: usize) -> u32 {
    let mut num: u32 = 0;
    let mut read = 0;
    while read < max_digits {
        match chars.peek().and_then(|c| c.to_digit(10)) {
            Some(digit) => {
                chars.next();
                num = num.saturating_mul(10).saturating_add(digit);
                read += 1;
            }
            None => break,
        }
    }
    num
}

/// Read a reference name up to `close`, consuming the delimiter
fn read_reference(
    chars: &mut std::iter::Peekable<std::str::Chars>,
    open: char,
    close: char,
) -> Result<String, ReplacementError> {
    let mut name = String::new();
    for c in chars.by_ref() {
        if c == close {
            if name.is_empty() {
                return Err(ReplacementError::InvalidBackreference(format!("{open}{close}")));
            }
            return Ok(name);
        }
        name.push(c);
    }
    Err(ReplacementError::InvalidBackreference(format!("{open}{name}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literal() {
        let repl = Replacement::parse("hello").unwrap();
        assert_eq!(repl.parts(), &[ReplacementPart::Literal("hello".to_string())]);
    }

    #[test]
    fn test_parse_dollar_refs() {
        let repl = Replacement::parse("$1-$&-$$-${name}-$<2>").unwrap();
        assert_eq!(
            repl.parts(),
            &[
                ReplacementPart::BackrefNumber(1),
                ReplacementPart::Literal("-".to_string()),
                ReplacementPart::EntireMatch,
                ReplacementPart::Literal("-$-".to_string()),
                ReplacementPart::BackrefName("name".to_string()),
                ReplacementPart::Literal("-".to_string()),
                ReplacementPart::BackrefNumber(2),
            ]
        );
    }

    #[test]
    fn test_dollar_reads_two_digits_at_most() {
        let repl = Replacement::parse("$123").unwrap();
        assert_eq!(
            repl.parts(),
            &[
                ReplacementPart::BackrefNumber(12),
                ReplacementPart::Literal("3".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_backslash_refs() {
        let repl = Replacement::parse("\\1\\g{name}\\g{0}").unwrap();
        assert_eq!(
            repl.parts(),
            &[
                ReplacementPart::BackrefNumber(1),
                ReplacementPart::BackrefName("name".to_string()),
                ReplacementPart::EntireMatch,
            ]
        );
    }

    #[test]
    fn test_unterminated_reference() {
        assert_eq!(
            Replacement::parse("${name").unwrap_err(),
            ReplacementError::InvalidBackreference("{name".to_string())
        );
        assert!(Replacement::parse("\\g{}").is_err());
    }

    #[test]
    fn test_lone_dollar_is_literal() {
        let repl = Replacement::parse("cost: $").unwrap();
        assert_eq!(repl.apply("x", 0, 1, &[], &[]), "cost: $");
    }

    #[test]
    fn test_apply_backref() {
        let repl = Replacement::parse("[$1]").unwrap();
        let result = repl.apply("abc", 0, 3, &[Some((1, 2))], &[None]);
        assert_eq!(result, "[b]");
    }

    #[test]
    fn test_apply_named_and_missing_groups() {
        let repl = Replacement::parse("${word}|$2|$9").unwrap();
        let names = vec![Some("word".to_string()), None];
        let result = repl.apply("ab", 0, 2, &[Some((0, 1)), None], &names);
        assert_eq!(result, "a||");
    }

    #[test]
    fn test_apply_context_refs() {
        let repl = Replacement::parse("<$`|$'>").unwrap();
        assert_eq!(repl.apply("one two three", 4, 7, &[], &[]), "<one | three>");
    }

    #[test]
    fn test_escape_sequences() {
        // \n and \t name their letters once parsed; whitespace needs the transform
        let repl = Replacement::parse("\\n\\t").unwrap();
        assert_eq!(repl.parts(), &[ReplacementPart::Literal("nt".to_string())]);
    }

    #[test]
    fn test_transform_escaped_white_space() {
        assert_eq!(transform_escaped_white_space("a\\nb\\tc"), "a\nb\tc");
        assert_eq!(transform_escaped_white_space("\\\\n"), "\\\\n");
        assert_eq!(transform_escaped_white_space("end\\"), "end\\");

        let repl = Replacement::parse(&transform_escaped_white_space("\\\\n")).unwrap();
        assert_eq!(repl.apply("x", 0, 1, &[], &[]), "\\n");
    }
}
