//! In-process engines

use std::sync::Arc;

use tracing::debug;

use super::{EngineState, RegexEngine};
use crate::capabilities::{DelimiterPair, EngineAccess, EngineCapabilities, EngineDefaults};
use crate::chain::{run_match, run_replace, run_test};
use crate::compile::{CompileContext, compile};
use crate::config::{MatchConfig, MatchConfigProp, MatchSettings};
use crate::dialect::{Dialect, dialect_for};
use crate::error::{ConfigError, Result};
use crate::pattern::PatternRecord;
use crate::result::{PatternError, PatternId, ReplaceResult, SampleMatches, TestOutcome};

/// Engine that compiles and runs patterns itself.
///
/// The native and augmented engines differ only in the [`Dialect`] they
/// are composed with.
#[derive(Debug, Clone)]
pub struct LocalEngine {
    state: EngineState,
    dialect: Arc<dyn Dialect>,
}

impl LocalEngine {
    /// Engine for a local capability table, using the dialect it names
    pub fn new(capabilities: EngineCapabilities) -> std::result::Result<Self, ConfigError> {
        if capabilities.access() != EngineAccess::Local {
            return Err(ConfigError::AccessMismatch(capabilities.id().to_string()));
        }
        let dialect =
            dialect_for(capabilities.dialect()).ok_or_else(|| ConfigError::UnsupportedDialect {
                engine: capabilities.id().to_string(),
                dialect: capabilities.dialect().as_str(),
            })?;
        Ok(Self::with_dialect(capabilities, dialect))
    }

    /// Engine with an explicit dialect, regardless of the table's access
    pub fn with_dialect(capabilities: EngineCapabilities, dialect: Arc<dyn Dialect>) -> Self {
        debug!(
            engine = capabilities.id(),
            dialect = dialect.kind().as_str(),
            "opened local engine"
        );
        LocalEngine {
            state: EngineState::new(capabilities),
            dialect,
        }
    }

    /// Dialect patterns are compiled with
    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    fn context(&self) -> CompileContext<'_> {
        CompileContext::with_defaults(&self.state.capabilities, &self.state.defaults)
    }
}

impl RegexEngine for LocalEngine {
    fn capabilities(&self) -> &EngineCapabilities {
        &self.state.capabilities
    }

    fn match_config(&self) -> &MatchConfig {
        &self.state.config
    }

    fn set_match_config_prop(&mut self, prop: MatchConfigProp) {
        self.state.config.set(prop);
    }

    fn set_match_config(&mut self, settings: &MatchSettings) {
        self.state.config.apply(settings);
    }

    fn defaults(&self) -> &EngineDefaults {
        &self.state.defaults
    }

    fn set_defaults(&mut self, defaults: EngineDefaults) {
        self.state.defaults = defaults;
    }

    fn last_error(&self, regex_id: PatternId) -> Result<PatternError> {
        self.state.last_error(regex_id)
    }

    async fn test(
        &mut self,
        pattern: &str,
        modifiers: Option<&str>,
        delimiters: Option<DelimiterPair>,
    ) -> Result<bool> {
        let defaults = &self.state.defaults;
        let record = PatternRecord::new(0, pattern)
            .modifiers(modifiers.unwrap_or(defaults.modifiers()))
            .delimiters(delimiters.unwrap_or(defaults.delimiters()));

        let error = compile(&self.context(), self.dialect(), &record).err();
        let valid = error.is_none();
        self.state.record(error);
        Ok(valid)
    }

    async fn test_all(&self, patterns: &[PatternRecord]) -> Result<Vec<TestOutcome>> {
        Ok(run_test(&self.context(), self.dialect(), patterns))
    }

    async fn match_samples(
        &self,
        samples: &[String],
        patterns: &[PatternRecord],
        chain_override: Option<bool>,
    ) -> Result<Vec<SampleMatches>> {
        let config = self.state.config_for(chain_override);
        run_match(&self.context(), self.dialect(), patterns, samples, &config)
    }

    async fn replace(
        &self,
        samples: &[String],
        patterns: &[PatternRecord],
    ) -> Result<Vec<ReplaceResult>> {
        run_replace(&self.context(), self.dialect(), patterns, samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::DialectKind;
    use crate::error::EngineError;
    use crate::registry;

    fn engine(id: &str) -> LocalEngine {
        LocalEngine::new(registry::builtin().unwrap().get(id).unwrap().clone()).unwrap()
    }

    #[tokio::test]
    async fn test_test_records_last_error() {
        let mut engine = engine("rust-regex");
        assert!(!engine.test("(abc", None, None).await.unwrap());
        let error = engine.last_error(12).unwrap();
        assert_eq!(error.regex_id, 12);
        assert!(!error.raw_message.is_empty());

        assert!(engine.test("abc", None, None).await.unwrap());
        assert!(matches!(
            engine.last_error(12),
            Err(EngineError::NoPendingError(12))
        ));
    }

    #[tokio::test]
    async fn test_test_uses_defaults() {
        let mut engine = engine("rust-regex");
        let defaults = engine.defaults().with_modifiers(engine.capabilities(), "gx").unwrap();
        engine.set_defaults(defaults);
        assert_eq!(engine.defaults().modifiers(), "gx");
        assert!(engine.test("a b", None, None).await.unwrap());
        assert!(!engine.test("a", Some("q"), None).await.unwrap());
    }

    #[tokio::test]
    async fn test_augmented_engine_supports_backreferences() {
        let mut native = engine("rust-regex");
        let mut fancy = engine("fancy-regex");
        assert!(!native.test("(a)\\1", Some(""), None).await.unwrap());
        assert!(fancy.test("(a)\\1", Some(""), None).await.unwrap());
        assert_eq!(fancy.dialect().kind(), DialectKind::Fancy);
    }

    #[test]
    fn test_match_config_clamped() {
        let mut engine = engine("rust-regex");
        engine.set_match_config_prop(MatchConfigProp::MaxWholeMatchLen(usize::MAX));
        assert_eq!(
            engine.match_config().max_whole_match_len(),
            engine.match_config().limits().max_whole_match_len
        );
    }

    #[test]
    fn test_remote_table_rejected() {
        let caps = registry::builtin().unwrap().get("pcre").unwrap().clone();
        assert!(matches!(
            LocalEngine::new(caps),
            Err(ConfigError::AccessMismatch(_))
        ));
    }
}
