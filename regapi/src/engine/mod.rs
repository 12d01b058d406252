//! Engine facade
//!
//! [`RegexEngine`] is the contract every engine variant implements, whether
//! it runs patterns in this process ([`LocalEngine`]) or hands them to
//! another one ([`RemoteEngine`]). Callers cannot tell the variants apart
//! except by latency and capability table.
//!
//! Every operation is `async`: a remote engine suspends on its transport,
//! a local one completes immediately.

use crate::capabilities::{DelimiterPair, EngineAccess, EngineCapabilities, EngineDefaults};
use crate::config::{MatchConfig, MatchConfigProp, MatchSettings};
use crate::error::{ConfigError, EngineError, Result};
use crate::pattern::PatternRecord;
use crate::result::{PatternError, PatternId, ReplaceResult, SampleMatches, TestOutcome};
use crate::server::LoopbackTransport;

mod local;
mod remote;

pub use local::LocalEngine;
pub use remote::{RemoteEngine, Transport, TransportError};

/// Operations shared by every engine variant
#[allow(async_fn_in_trait)]
pub trait RegexEngine {
    /// Capability table the engine was built from
    fn capabilities(&self) -> &EngineCapabilities;

    /// Current match config
    fn match_config(&self) -> &MatchConfig;

    /// Change one match config property (lengths are clamped)
    fn set_match_config_prop(&mut self, prop: MatchConfigProp);

    /// Apply a whole settings block
    fn set_match_config(&mut self, settings: &MatchSettings);

    /// Defaults used when `test` is given no modifiers or delimiters, and
    /// for records without delimiters
    fn defaults(&self) -> &EngineDefaults;

    /// Replace the defaults. Build the new value with
    /// [`EngineDefaults::with_modifiers`] or [`EngineDefaults::with_delimiters`].
    fn set_defaults(&mut self, defaults: EngineDefaults);

    /// Error left by the last [`RegexEngine::test`] call, relabelled with
    /// `regex_id`. Fails with [`EngineError::NoPendingError`] when that
    /// call succeeded (or none was made).
    fn last_error(&self, regex_id: PatternId) -> Result<PatternError>;

    /// Runs patterns in this process
    fn is_local(&self) -> bool {
        self.capabilities().access() == EngineAccess::Local
    }

    /// Delegates patterns to another process
    fn is_remote(&self) -> bool {
        self.capabilities().access() == EngineAccess::Remote
    }

    /// Whether one pattern compiles. On failure the error is kept for
    /// [`RegexEngine::last_error`].
    async fn test(
        &mut self,
        pattern: &str,
        modifiers: Option<&str>,
        delimiters: Option<DelimiterPair>,
    ) -> Result<bool>;

    /// Validity of every record
    async fn test_all(&self, patterns: &[PatternRecord]) -> Result<Vec<TestOutcome>>;

    /// Match every pattern against every sample. `chain_override` replaces
    /// the config's `chain_regexes` for this call only.
    async fn match_samples(
        &self,
        samples: &[String],
        patterns: &[PatternRecord],
        chain_override: Option<bool>,
    ) -> Result<Vec<SampleMatches>>;

    /// Run every sample through every pattern's replacement
    async fn replace(
        &self,
        samples: &[String],
        patterns: &[PatternRecord],
    ) -> Result<Vec<ReplaceResult>>;
}

/// State every engine variant carries
#[derive(Debug, Clone)]
pub(crate) struct EngineState {
    pub(crate) capabilities: EngineCapabilities,
    pub(crate) config: MatchConfig,
    pub(crate) defaults: EngineDefaults,
    pending: Option<PatternError>,
}

impl EngineState {
    pub(crate) fn new(capabilities: EngineCapabilities) -> Self {
        EngineState {
            config: capabilities.match_config().clone(),
            defaults: capabilities.defaults().clone(),
            capabilities,
            pending: None,
        }
    }

    pub(crate) fn record(&mut self, error: Option<PatternError>) {
        self.pending = error;
    }

    pub(crate) fn last_error(&self, regex_id: PatternId) -> Result<PatternError> {
        match &self.pending {
            Some(error) => Ok(PatternError {
                regex_id,
                ..error.clone()
            }),
            None => Err(EngineError::NoPendingError(regex_id)),
        }
    }

    /// Config for one match call
    pub(crate) fn config_for(&self, chain_override: Option<bool>) -> MatchConfig {
        match chain_override {
            Some(chain) => self.config.clone().with(MatchConfigProp::ChainRegexes(chain)),
            None => self.config.clone(),
        }
    }
}

/// Any engine the registry can describe
#[derive(Debug)]
pub enum Engine {
    /// In-process engine
    Local(LocalEngine),
    /// Remote engine, reached in-process through a loopback transport
    Remote(RemoteEngine<LoopbackTransport>),
}

/// Open the engine a capability table describes.
///
/// Local tables get a [`LocalEngine`]; remote tables get a
/// [`RemoteEngine`] wired to an in-process request handler.
pub fn open_engine(capabilities: EngineCapabilities) -> std::result::Result<Engine, ConfigError> {
    match capabilities.access() {
        EngineAccess::Local => Ok(Engine::Local(LocalEngine::new(capabilities)?)),
        EngineAccess::Remote => {
            let transport = LoopbackTransport::new(capabilities.clone());
            Ok(Engine::Remote(RemoteEngine::new(capabilities, transport)?))
        }
    }
}

macro_rules! dispatch {
    ($self:expr, $engine:ident => $body:expr) => {
        match $self {
            Engine::Local($engine) => $body,
            Engine::Remote($engine) => $body,
        }
    };
}

impl RegexEngine for Engine {
    fn capabilities(&self) -> &EngineCapabilities {
        dispatch!(self, e => e.capabilities())
    }

    fn match_config(&self) -> &MatchConfig {
        dispatch!(self, e => e.match_config())
    }

    fn set_match_config_prop(&mut self, prop: MatchConfigProp) {
        dispatch!(self, e => e.set_match_config_prop(prop))
    }

    fn set_match_config(&mut self, settings: &MatchSettings) {
        dispatch!(self, e => e.set_match_config(settings))
    }

    fn defaults(&self) -> &EngineDefaults {
        dispatch!(self, e => e.defaults())
    }

    fn set_defaults(&mut self, defaults: EngineDefaults) {
        dispatch!(self, e => e.set_defaults(defaults))
    }

    fn last_error(&self, regex_id: PatternId) -> Result<PatternError> {
        dispatch!(self, e => e.last_error(regex_id))
    }

    async fn test(
        &mut self,
        pattern: &str,
        modifiers: Option<&str>,
        delimiters: Option<DelimiterPair>,
    ) -> Result<bool> {
        dispatch!(self, e => e.test(pattern, modifiers, delimiters).await)
    }

    async fn test_all(&self, patterns: &[PatternRecord]) -> Result<Vec<TestOutcome>> {
        dispatch!(self, e => e.test_all(patterns).await)
    }

    async fn match_samples(
        &self,
        samples: &[String],
        patterns: &[PatternRecord],
        chain_override: Option<bool>,
    ) -> Result<Vec<SampleMatches>> {
        dispatch!(self, e => e.match_samples(samples, patterns, chain_override).await)
    }

    async fn replace(
        &self,
        samples: &[String],
        patterns: &[PatternRecord],
    ) -> Result<Vec<ReplaceResult>> {
        dispatch!(self, e => e.replace(samples, patterns).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry;

    #[test]
    fn test_last_error_protocol() {
        let caps = registry::builtin().unwrap().get("rust-regex").unwrap().clone();
        let mut state = EngineState::new(caps);
        assert_eq!(state.last_error(1), Err(EngineError::NoPendingError(1)));

        state.record(Some(PatternError::new(0, "bad")));
        let error = state.last_error(4).unwrap();
        assert_eq!(error.regex_id, 4);
        assert_eq!(error.raw_message, "bad");

        state.record(None);
        assert!(state.last_error(4).is_err());
    }

    #[test]
    fn test_chain_override_does_not_stick() {
        let caps = registry::builtin().unwrap().get("rust-regex").unwrap().clone();
        let state = EngineState::new(caps);
        assert!(!state.config_for(Some(false)).chain_regexes());
        assert!(state.config.chain_regexes());
    }

    #[test]
    fn test_open_engine_by_access() {
        let registry = registry::builtin().unwrap();
        let native = open_engine(registry.get("rust-regex").unwrap().clone()).unwrap();
        assert!(native.is_local());
        assert!(!native.is_remote());

        let remote = open_engine(registry.get("pcre").unwrap().clone()).unwrap();
        assert!(remote.is_remote());
        assert!(matches!(remote, Engine::Remote(_)));
    }
}
