//! PCRE2 through the `pcre2` bindings

use pcre2::bytes::{Regex, RegexBuilder};

use super::{Diagnostic, Dialect, ExecError, FlagSet, NativeRegex, RawMatch};
use crate::capabilities::DialectKind;

/// PCRE2 dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct Pcre2Dialect;

#[derive(Debug)]
struct Pcre2Regex {
    regex: Regex,
    names: Vec<Option<String>>,
}

impl Dialect for Pcre2Dialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Pcre2
    }

    fn compile(&self, pattern: &str, flags: &FlagSet) -> Result<Box<dyn NativeRegex>, Diagnostic> {
        let prefix = flags.inline("UJ");
        // PCRE2_DOLLAR_ENDONLY has no builder switch and no inline form
        let full = if flags.dollar_end_only && !flags.multi_line {
            format!("{prefix}{}", end_only_dollars(pattern))
        } else {
            format!("{prefix}{pattern}")
        };

        let regex = RegexBuilder::new()
            .caseless(flags.case_insensitive)
            .multi_line(flags.multi_line)
            .dotall(flags.dot_all)
            .extended(flags.extended)
            .utf(true)
            .ucp(flags.unicode)
            .build(&full)
            .map_err(|e| {
                let diag = Diagnostic::new(e.to_string());
                match e.offset() {
                    Some(offset) => diag.at_byte(pattern, offset.saturating_sub(prefix.len())),
                    None => diag,
                }
            })?;

        let names = regex.capture_names().iter().skip(1).cloned().collect();

        Ok(Box::new(Pcre2Regex { regex, names }))
    }
}

/// `pattern` with every unescaped `$` outside a character class or `\Q..\E`
/// replaced by `\z`
fn end_only_dollars(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    let mut in_class = false;
    let mut quoted = false;
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push(c);
                if let Some(next) = chars.next() {
                    out.push(next);
                    match next {
                        'Q' => quoted = true,
                        'E' => quoted = false,
                        _ => {}
                    }
                }
            }
            _ if quoted => out.push(c),
            '[' if !in_class => {
                in_class = true;
                out.push(c);
                // a leading `]` (or `^]`) is a literal member
                if chars.peek() == Some(&'^') {
                    out.push('^');
                    chars.next();
                }
                if chars.peek() == Some(&']') {
                    out.push(']');
                    chars.next();
                }
            }
            ']' if in_class => {
                in_class = false;
                out.push(c);
            }
            '$' if !in_class => out.push_str("\\z"),
            _ => out.push(c),
        }
    }
    out
}

impl NativeRegex for Pcre2Regex {
    fn captures_at(&self, text: &str, start: usize) -> Result<Option<RawMatch>, ExecError> {
        let mut locs = self.regex.capture_locations();
        let found = self
            .regex
            .captures_read_at(&mut locs, text.as_bytes(), start)
            .map_err(|e| ExecError(e.to_string()))?;
        let Some(whole) = found else {
            return Ok(None);
        };
        Ok(Some(RawMatch {
            start: whole.start(),
            end: whole.end(),
            groups: (1..locs.len()).map(|i| locs.get(i)).collect(),
        }))
    }

    fn group_names(&self) -> &[Option<String>] {
        &self.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(pattern: &str, modifiers: &str) -> Result<Box<dyn NativeRegex>, Diagnostic> {
        Pcre2Dialect.compile(pattern, &FlagSet::from_modifiers(modifiers))
    }

    #[test]
    fn test_match_with_flags() {
        let regex = compile("A.B", "is").unwrap();
        let m = regex.captures_at("xa\nb", 0).unwrap().unwrap();
        assert_eq!((m.start, m.end), (1, 4));
    }

    #[test]
    fn test_dollar_end_only() {
        let default = compile("a$", "").unwrap();
        assert!(default.captures_at("a\n", 0).unwrap().is_some());
        let end_only = compile("a$", "D").unwrap();
        assert!(end_only.captures_at("a\n", 0).unwrap().is_none());
        assert!(end_only.captures_at("ba", 0).unwrap().is_some());
    }

    #[test]
    fn test_end_only_dollars_rewrite() {
        assert_eq!(end_only_dollars("a$|[$]\\$\\Q$\\E$"), "a\\z|[$]\\$\\Q$\\E\\z");
        assert_eq!(end_only_dollars("[]$]$"), "[]$]\\z");
    }

    #[test]
    fn test_compile_error_offset() {
        let diag = compile("(abc", "").unwrap_err();
        assert!(!diag.raw_message.is_empty());
        assert!(diag.offset.is_some());
    }
}
