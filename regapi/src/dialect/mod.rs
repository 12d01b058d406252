//! Native regex implementations
//!
//! A [`Dialect`] turns pattern text plus flags into a [`NativeRegex`], the
//! engine-native executable object. Everything above this layer is
//! dialect-agnostic: the executor only ever asks a native regex for the
//! next match at or after a byte position.

use std::sync::Arc;

use thiserror::Error;

use crate::capabilities::DialectKind;
use crate::result::{PatternError, PatternId};

mod fancy;
#[cfg(feature = "pcre2")]
mod pcre;
mod standard;

pub use fancy::FancyDialect;
#[cfg(feature = "pcre2")]
pub use pcre::Pcre2Dialect;
pub use standard::StandardDialect;

/// Behaviour switches derived from a validated modifier string
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlagSet {
    /// `i`
    pub case_insensitive: bool,
    /// `m`: `^` and `$` match at line boundaries
    pub multi_line: bool,
    /// `s`: `.` matches newlines
    pub dot_all: bool,
    /// `x`: whitespace and `#` comments are ignored
    pub extended: bool,
    /// `U`: quantifiers are lazy by default
    pub swap_greed: bool,
    /// `u`: Unicode-aware classes
    pub unicode: bool,
    /// `J`: duplicate group names allowed
    pub dup_names: bool,
    /// `A`: every match must start where the search starts
    pub anchored: bool,
    /// `D`: `$` matches only at the very end of the text
    pub dollar_end_only: bool,
}

impl FlagSet {
    /// Map modifier characters to flags. Characters without a meaning for
    /// execution are ignored: the global modifier, `S` (study only speeds
    /// matching up) and `X` (unknown escapes are already errors).
    pub fn from_modifiers(modifiers: &str) -> Self {
        let mut flags = FlagSet::default();
        for c in modifiers.chars() {
            match c {
                'i' => flags.case_insensitive = true,
                'm' => flags.multi_line = true,
                's' => flags.dot_all = true,
                'x' => flags.extended = true,
                'U' => flags.swap_greed = true,
                'u' => flags.unicode = true,
                'J' => flags.dup_names = true,
                'A' => flags.anchored = true,
                'D' => flags.dollar_end_only = true,
                _ => {}
            }
        }
        flags
    }

    /// Inline flag group for the given flag letters, e.g. `(?ims)`
    fn inline(&self, supported: &str) -> String {
        let letters: String = supported
            .chars()
            .filter(|c| match c {
                'i' => self.case_insensitive,
                'm' => self.multi_line,
                's' => self.dot_all,
                'x' => self.extended,
                'U' => self.swap_greed,
                'J' => self.dup_names,
                _ => false,
            })
            .collect();
        if letters.is_empty() {
            String::new()
        } else {
            format!("(?{letters})")
        }
    }
}

/// Why a pattern failed to compile, before it is tied to a pattern id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Engine message, verbatim
    pub raw_message: String,
    /// Character offset of the problem in the pattern
    pub offset: Option<usize>,
    /// Character at `offset`
    pub bad_character: Option<char>,
    /// Short messages
    pub messages: Vec<String>,
}

impl Diagnostic {
    /// A diagnostic with only a raw message
    pub fn new(raw_message: impl Into<String>) -> Self {
        Diagnostic {
            raw_message: raw_message.into(),
            offset: None,
            bad_character: None,
            messages: Vec::new(),
        }
    }

    /// Record where in `pattern` the problem is, from a byte offset
    pub fn at_byte(mut self, pattern: &str, byte_offset: usize) -> Self {
        let byte_offset = byte_offset.min(pattern.len());
        self.offset = Some(
            pattern
                .char_indices()
                .take_while(|(i, _)| *i < byte_offset)
                .count(),
        );
        self.bad_character = pattern.get(byte_offset..).and_then(|rest| rest.chars().next());
        self
    }

    /// A modifier the dialect cannot honour
    pub fn unsupported(modifier: char, what: &str, dialect: &str) -> Self {
        Diagnostic::new(format!(
            "the `{modifier}` modifier ({what}) is not supported by {dialect}"
        ))
        .with_message(format!("remove the `{modifier}` modifier"))
    }

    /// Add a short message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }

    /// Attach the pattern id
    pub fn into_pattern_error(self, regex_id: PatternId) -> PatternError {
        PatternError {
            regex_id,
            raw_message: self.raw_message,
            offset: self.offset,
            bad_character: self.bad_character,
            messages: self.messages,
        }
    }
}

/// A match in byte offsets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMatch {
    /// Start of the whole match
    pub start: usize,
    /// End of the whole match (exclusive)
    pub end: usize,
    /// Span of each group, starting with group 1; `None` if it did not
    /// participate
    pub groups: Vec<Option<(usize, usize)>>,
}

/// Failure of a compiled pattern while searching
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ExecError(pub String);

/// An engine-native compiled pattern
pub trait NativeRegex: Send + Sync + std::fmt::Debug {
    /// First match starting at or after byte `start`. Text before `start`
    /// is still visible to anchors and look-behind.
    fn captures_at(&self, text: &str, start: usize) -> Result<Option<RawMatch>, ExecError>;

    /// Names of groups 1.., `None` for unnamed groups
    fn group_names(&self) -> &[Option<String>];
}

/// A native implementation that can compile patterns
pub trait Dialect: Send + Sync + std::fmt::Debug {
    /// Which implementation this is
    fn kind(&self) -> DialectKind;

    /// Compile pattern text with flags
    fn compile(&self, pattern: &str, flags: &FlagSet) -> Result<Box<dyn NativeRegex>, Diagnostic>;
}

/// The dialect for `kind`, if this build includes it
pub fn dialect_for(kind: DialectKind) -> Option<Arc<dyn Dialect>> {
    match kind {
        DialectKind::Standard => Some(Arc::new(StandardDialect)),
        DialectKind::Fancy => Some(Arc::new(FancyDialect)),
        #[cfg(feature = "pcre2")]
        DialectKind::Pcre2 => Some(Arc::new(Pcre2Dialect)),
        #[cfg(not(feature = "pcre2"))]
        DialectKind::Pcre2 => None,
    }
}
