//! Pattern compilation
//!
//! Turns a [`PatternRecord`] into a [`CompiledPattern`] for one engine, or
//! into a [`PatternError`] describing why it cannot be used. Failure is a
//! value here: nothing above this layer has to catch anything.

use tracing::trace;

use crate::capabilities::{DelimiterPair, EngineCapabilities, EngineDefaults};
use crate::dialect::{Dialect, FlagSet, NativeRegex};
use crate::error::ValidationError;
use crate::pattern::PatternRecord;
use crate::replace::{Replacement, transform_escaped_white_space};
use crate::result::{PatternError, PatternId};
use crate::validate::{validate_delimiters, validate_modifiers};

/// Everything a compile needs to know about the engine
#[derive(Debug, Clone, Copy)]
pub struct CompileContext<'a> {
    /// Capability table
    pub capabilities: &'a EngineCapabilities,
    /// Defaults in effect for this call
    pub defaults: &'a EngineDefaults,
}

impl<'a> CompileContext<'a> {
    /// Context using the table's own defaults
    pub fn new(capabilities: &'a EngineCapabilities) -> Self {
        CompileContext {
            capabilities,
            defaults: capabilities.defaults(),
        }
    }

    /// Context with explicit defaults
    pub fn with_defaults(capabilities: &'a EngineCapabilities, defaults: &'a EngineDefaults) -> Self {
        CompileContext {
            capabilities,
            defaults,
        }
    }
}

/// How the executor scans a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Every non-overlapping match
    FindAll,
    /// The first match only
    FindFirst,
}

/// A pattern ready to run against samples
#[derive(Debug)]
pub struct CompiledPattern {
    id: PatternId,
    native: Box<dyn NativeRegex>,
    replacement: Replacement,
    scan_mode: ScanMode,
    anchored: bool,
    modifiers: String,
    delimiters: DelimiterPair,
}

impl CompiledPattern {
    /// Id of the record this was compiled from
    pub fn id(&self) -> PatternId {
        self.id
    }

    /// Engine-native compiled object
    pub fn native(&self) -> &dyn NativeRegex {
        self.native.as_ref()
    }

    /// Parsed replacement template
    pub fn replacement(&self) -> &Replacement {
        &self.replacement
    }

    /// Whether to find every match or only the first
    pub fn scan_mode(&self) -> ScanMode {
        self.scan_mode
    }

    /// Every match must start where the previous one ended (the `A` modifier)
    pub fn anchored(&self) -> bool {
        self.anchored
    }

    /// Validated modifiers
    pub fn modifiers(&self) -> &str {
        &self.modifiers
    }

    /// Validated delimiters
    pub fn delimiters(&self) -> DelimiterPair {
        self.delimiters
    }
}

/// Compile one record.
///
/// Steps, in order: transform escaped whitespace in the replacement,
/// validate modifiers, validate delimiters (only when the engine requires
/// them), compile natively, parse the replacement template.
pub fn compile(
    ctx: &CompileContext<'_>,
    dialect: &dyn Dialect,
    record: &PatternRecord,
) -> Result<CompiledPattern, PatternError> {
    let replace = if record.transform_escaped_white_space {
        transform_escaped_white_space(&record.replace)
    } else {
        record.replace.clone()
    };

    let caps = ctx.capabilities;
    let modifiers =
        validate_modifiers(caps, &record.modifiers).map_err(|e| rejected(record.id, e))?;

    let delimiters = record.delimiters.unwrap_or(ctx.defaults.delimiters());
    let delimiters = if caps.delimiter_required() {
        validate_delimiters(caps, delimiters).map_err(|e| rejected(record.id, e))?
    } else {
        delimiters
    };

    let scan_mode = match caps.global_modifier() {
        Some(global) if !modifiers.contains(global) => ScanMode::FindFirst,
        _ => ScanMode::FindAll,
    };

    let flags = FlagSet::from_modifiers(&modifiers);
    let native = dialect
        .compile(&record.regex, &flags)
        .map_err(|diag| diag.into_pattern_error(record.id))?;

    let replacement = Replacement::parse(&replace).map_err(|e| {
        let mut error = PatternError::new(record.id, e.to_string());
        error.messages.push("the replacement text is not a valid template".to_string());
        error
    })?;

    trace!(
        engine = caps.id(),
        regex_id = record.id,
        ?scan_mode,
        modifiers = %modifiers,
        "compiled pattern"
    );

    Ok(CompiledPattern {
        id: record.id,
        native,
        replacement,
        scan_mode,
        anchored: flags.anchored,
        modifiers,
        delimiters,
    })
}

/// A validation failure makes the pattern unusable; the safe value the
/// validator fell back to is reported alongside.
fn rejected(regex_id: PatternId, err: ValidationError) -> PatternError {
    let mut error = PatternError::new(regex_id, err.to_string());
    error.bad_character = err.invalid_items().first().copied();
    error.messages.push(err.to_string());
    match &err {
        ValidationError::Delimiter { fallback, .. } => error.messages.push(format!(
            "the default delimiters {}{} would be used instead",
            fallback.open, fallback.close
        )),
        ValidationError::Modifier { cleaned, .. } => error
            .messages
            .push(format!("the valid {} are \"{cleaned}\"", err.field())),
    }
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{FancyDialect, StandardDialect};
    use crate::registry;
    use crate::replace::ReplacementPart;

    fn engine(id: &str) -> EngineCapabilities {
        registry::builtin().unwrap().get(id).unwrap().clone()
    }

    #[test]
    fn test_compile_valid_pattern() {
        let caps = engine("rust-regex");
        let ctx = CompileContext::new(&caps);
        let record = PatternRecord::new(3, "a(b)").modifiers("gii").replace("<$1>");
        let compiled = compile(&ctx, &StandardDialect, &record).unwrap();
        assert_eq!(compiled.id(), 3);
        assert_eq!(compiled.modifiers(), "gi");
        assert_eq!(compiled.scan_mode(), ScanMode::FindAll);
        assert_eq!(compiled.delimiters(), caps.defaults().delimiters());
        assert!(compiled.native().captures_at("xAB", 0).unwrap().is_some());
    }

    #[test]
    fn test_scan_mode_follows_global_modifier() {
        let caps = engine("rust-regex");
        let ctx = CompileContext::new(&caps);
        let record = PatternRecord::new(1, "a");
        let compiled = compile(&ctx, &StandardDialect, &record).unwrap();
        assert_eq!(compiled.scan_mode(), ScanMode::FindFirst);

        // PCRE has no global modifier and always finds every match
        let pcre = engine("pcre");
        let ctx = CompileContext::new(&pcre);
        let compiled = compile(&ctx, &FancyDialect, &record).unwrap();
        assert_eq!(compiled.scan_mode(), ScanMode::FindAll);
    }

    #[test]
    fn test_anchored_modifier() {
        let pcre = engine("pcre");
        let ctx = CompileContext::new(&pcre);
        let compiled = compile(&ctx, &FancyDialect, &PatternRecord::new(1, "b").modifiers("A")).unwrap();
        assert!(compiled.anchored());
        let compiled = compile(&ctx, &FancyDialect, &PatternRecord::new(1, "b")).unwrap();
        assert!(!compiled.anchored());
    }

    #[test]
    fn test_native_failure_is_a_value() {
        let caps = engine("rust-regex");
        let ctx = CompileContext::new(&caps);
        let error = compile(&ctx, &StandardDialect, &PatternRecord::new(5, "(abc")).unwrap_err();
        assert_eq!(error.regex_id, 5);
        assert!(!error.raw_message.is_empty());
    }

    #[test]
    fn test_invalid_modifier_rejects_pattern() {
        let caps = engine("rust-regex");
        let ctx = CompileContext::new(&caps);
        let record = PatternRecord::new(2, "a").modifiers("gq");
        let error = compile(&ctx, &StandardDialect, &record).unwrap_err();
        assert_eq!(error.bad_character, Some('q'));
        assert!(error.messages.iter().any(|m| m.contains("\"g\"")));
    }

    #[test]
    fn test_delimiters_checked_only_when_required() {
        let pcre = engine("pcre");
        let ctx = CompileContext::new(&pcre);
        let record = PatternRecord::new(4, "a").delimiters(DelimiterPair::symmetric('a'));
        let error = compile(&ctx, &FancyDialect, &record).unwrap_err();
        assert_eq!(error.bad_character, Some('a'));

        let caps = engine("rust-regex");
        let ctx = CompileContext::new(&caps);
        assert!(compile(&ctx, &StandardDialect, &record).is_ok());
    }

    #[test]
    fn test_paired_delimiters_resolved() {
        let pcre = engine("pcre");
        let ctx = CompileContext::new(&pcre);
        let record = PatternRecord::new(4, "a").delimiters(DelimiterPair::symmetric('('));
        let compiled = compile(&ctx, &FancyDialect, &record).unwrap();
        assert_eq!(compiled.delimiters(), DelimiterPair::new('(', ')'));
    }

    #[test]
    fn test_replacement_whitespace_transformed_first() {
        let caps = engine("rust-regex");
        let ctx = CompileContext::new(&caps);
        let record = PatternRecord::new(1, "a")
            .replace("x\\ty")
            .transform_escaped_white_space(true);
        let compiled = compile(&ctx, &StandardDialect, &record).unwrap();
        assert_eq!(
            compiled.replacement().parts(),
            &[ReplacementPart::Literal("x\ty".to_string())]
        );
    }

    #[test]
    fn test_bad_replacement_template() {
        let caps = engine("rust-regex");
        let ctx = CompileContext::new(&caps);
        let record = PatternRecord::new(8, "a").replace("${open");
        let error = compile(&ctx, &StandardDialect, &record).unwrap_err();
        assert_eq!(error.regex_id, 8);
    }

    #[test]
    fn test_explicit_defaults_used() {
        let caps = engine("pcre");
        let defaults = caps
            .defaults()
            .with_delimiters(&caps, DelimiterPair::symmetric('#'))
            .unwrap();
        let ctx = CompileContext::with_defaults(&caps, &defaults);
        let compiled = compile(&ctx, &FancyDialect, &PatternRecord::new(1, "a")).unwrap();
        assert_eq!(compiled.delimiters(), DelimiterPair::symmetric('#'));
    }
}
