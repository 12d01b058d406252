//! `fancy-regex`: adds look-around and back-references on top of `regex`

use fancy_regex::Regex;

use super::{Diagnostic, Dialect, ExecError, FlagSet, NativeRegex, RawMatch};
use crate::capabilities::DialectKind;

/// Backtracking dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct FancyDialect;

#[derive(Debug)]
struct FancyRegex {
    regex: Regex,
    names: Vec<Option<String>>,
}

impl Dialect for FancyDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Fancy
    }

    fn compile(&self, pattern: &str, flags: &FlagSet) -> Result<Box<dyn NativeRegex>, Diagnostic> {
        if flags.dup_names {
            return Err(Diagnostic::unsupported('J', "duplicate group names", "fancy-regex"));
        }
        // fancy-regex has no builder switches for these, so they go inline
        let prefix = flags.inline("imsxU");
        let full = format!("{prefix}{pattern}");

        let regex = Regex::new(&full).map_err(|e| {
            let diag = Diagnostic::new(e.to_string());
            match &e {
                fancy_regex::Error::ParseError(pos, kind) => diag
                    .at_byte(pattern, pos.saturating_sub(prefix.len()))
                    .with_message(kind.to_string()),
                _ => diag,
            }
        })?;

        let names = regex
            .capture_names()
            .skip(1)
            .map(|name| name.map(str::to_string))
            .collect();

        Ok(Box::new(FancyRegex { regex, names }))
    }
}

impl NativeRegex for FancyRegex {
    fn captures_at(&self, text: &str, start: usize) -> Result<Option<RawMatch>, ExecError> {
        let caps = self
            .regex
            .captures_from_pos(text, start)
            .map_err(|e| ExecError(e.to_string()))?;
        let Some(caps) = caps else {
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
