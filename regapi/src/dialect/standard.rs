//! The `regex` crate: linear-time matching without look-around or
//! back-references

use regex::{Regex, RegexBuilder};
use regex_syntax::ParserBuilder;

use super::{Diagnostic, Dialect, ExecError, FlagSet, NativeRegex, RawMatch};
use crate::capabilities::DialectKind;

/// Baseline dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardDialect;

#[derive(Debug)]
struct StandardRegex {
    regex: Regex,
    names: Vec<Option<String>>,
}

impl Dialect for StandardDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Standard
    }

    fn compile(&self, pattern: &str, flags: &FlagSet) -> Result<Box<dyn NativeRegex>, Diagnostic> {
        if flags.dup_names {
            return Err(Diagnostic::unsupported('J', "duplicate group names", "the regex crate"));
        }
        // `$` already matches only at the end of the text, so `D` needs nothing
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(flags.case_insensitive)
            .multi_line(flags.multi_line)
            .dot_matches_new_line(flags.dot_all)
            .ignore_whitespace(flags.extended)
            .swap_greed(flags.swap_greed)
            .build()
            .map_err(|e| diagnose(pattern, flags, &e))?;

        let names = regex
            .capture_names()
            .skip(1)
            .map(|name| name.map(str::to_string))
            .collect();

        Ok(Box::new(StandardRegex { regex, names }))
    }
}

impl NativeRegex for StandardRegex {
    fn captures_at(&self, text: &str, start: usize) -> Result<Option<RawMatch>, ExecError> {
        let Some(caps) = self.regex.captures_at(text, start) else {
            return Ok(None);
        };
        let Some(whole) = caps.get(0) else {
            return Ok(None);
        };
        Ok(Some(RawMatch {
            start: whole.start(),
            end: whole.end(),
            groups: (1..caps.len())
                .map(|i| caps.get(i).map(|m| (m.start(), m.end())))
                .collect(),
        }))
    }

    fn group_names(&self) -> &[Option<String>] {
        &self.names
    }
}

/// The `regex` error only carries a rendered message; re-parse with
/// `regex-syntax` to recover the span and a short description.
fn diagnose(pattern: &str, flags: &FlagSet, err: &regex::Error) -> Diagnostic {
    let diag = Diagnostic::new(err.to_string());

    let parsed = ParserBuilder::new()
        .case_insensitive(flags.case_insensitive)
        .multi_line(flags.multi_line)
        .dot_matches_new_line(flags.dot_all)
        .ignore_whitespace(flags.extended)
        .swap_greed(flags.swap_greed)
        .build()
        .parse(pattern);

    match parsed {
        Err(regex_syntax::Error::Parse(e)) => diag
            .at_byte(pattern, e.span().start.offset)
            .with_message(e.kind().to_string()),
        Err(regex_syntax::Error::Translate(e)) => diag
            .at_byte(pattern, e.span().start.offset)
            .with_message(e.kind().to_string()),
        _ => match err {
            regex::Error::CompiledTooBig(limit) => {
                diag.with_message(format!("compiled pattern exceeds the size limit of {limit} bytes"))
            }
            _ => diag,
        },
    }
}
