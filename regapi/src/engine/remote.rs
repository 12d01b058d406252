//! Engines that delegate to another process
//!
//! The proxy only speaks the wire contract in [`crate::wire`]; how a
//! request reaches the executing process is up to the [`Transport`].

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use super::{EngineState, RegexEngine};
use crate::capabilities::{DelimiterPair, EngineAccess, EngineCapabilities, EngineDefaults};
use crate::config::{MatchConfig, MatchConfigProp, MatchSettings};
use crate::error::{ConfigError, EngineError, Result};
use crate::pattern::PatternRecord;
use crate::result::{
    MatchOccurrence, PatternError, PatternId, ReplaceResult, SampleMatches, TestOutcome, Validity,
};
use crate::wire::{MatchPayload, RemoteRequest, ReplacePayload, TestPayload};

/// The remote process could not be reached
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Carries one serialised request to the executing process and brings
/// back its serialised response
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Send a request, wait for the response
    async fn send(&self, request: String) -> std::result::Result<String, TransportError>;
}

/// Engine proxy speaking the remote wire contract
#[derive(Debug)]
pub struct RemoteEngine<T> {
    state: EngineState,
    transport: T,
}

impl<T: Transport> RemoteEngine<T> {
    /// Proxy for a remote capability table
    pub fn new(capabilities: EngineCapabilities, transport: T) -> std::result::Result<Self, ConfigError> {
        if capabilities.access() != EngineAccess::Remote {
            return Err(ConfigError::AccessMismatch(capabilities.id().to_string()));
        }
        Ok(RemoteEngine {
            state: EngineState::new(capabilities),
            transport,
        })
    }

    /// The transport requests go through
    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn call<R: DeserializeOwned>(&self, request: &RemoteRequest) -> Result<R> {
        let engine = self.state.capabilities.id();
        let remote = |message: String| EngineError::Remote {
            engine: engine.to_string(),
            message,
        };

        let body = serde_json::to_string(request).map_err(|e| remote(e.to_string()))?;
        debug!(engine, action = request.action(), bytes = body.len(), "sending remote request");

        let response = self
            .transport
            .send(body)
            .await
            .map_err(|e| remote(e.to_string()))?;
        serde_json::from_str(&response)
            .map_err(|e| remote(format!("unreadable {} response: {e}", request.action())))
    }

    fn test_request(&self, record: &PatternRecord) -> RemoteRequest {
        RemoteRequest::Test(TestPayload {
            regex: record.regex.clone(),
            modifiers: record.modifiers.clone(),
            delimiters: record.delimiters.unwrap_or(self.state.defaults.delimiters()),
        })
    }
}

impl<T: Transport> RegexEngine for RemoteEngine<T> {
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

        let validity: Validity = self.call(&self.test_request(&record)).await?;
        let valid = validity.is_valid();
        self.state.record(validity.error().cloned());
        Ok(valid)
    }

    async fn test_all(&self, patterns: &[PatternRecord]) -> Result<Vec<TestOutcome>> {
        let mut outcomes = Vec::with_capacity(patterns.len());
        for record in patterns {
            let validity = match self.call(&self.test_request(record)).await? {
                Validity::Valid => Validity::Valid,
                Validity::Invalid(error) => Validity::Invalid(PatternError {
                    regex_id: record.id,
                    ..error
                }),
            };
            outcomes.push(TestOutcome::new(record.id, validity));
        }
        Ok(outcomes)
    }

    async fn match_samples(
        &self,
        samples: &[String],
        patterns: &[PatternRecord],
        chain_override: Option<bool>,
    ) -> Result<Vec<SampleMatches>> {
        let config = self.state.config_for(chain_override);
        // whitespace is made visible here; clipping the visualised text of a
        // truncated match gives the same prefix as clipping the full match
        let mut settings = config.settings();
        settings.show_white_space_chars = false;

        let request = RemoteRequest::Match(MatchPayload {
            config: settings,
            input: samples.to_vec(),
            regexes: patterns.to_vec(),
        });
        let results: Vec<SampleMatches> = self.call(&request).await?;

        if !config.show_white_space_chars() {
            return Ok(results);
        }
        Ok(results
            .into_iter()
            .map(|mut sample| {
                for outcome in &mut sample.all_matches {
                    outcome.matches = std::mem::take(&mut outcome.matches)
                        .into_iter()
                        .map(|m| visualize(&config, m))
                        .collect();
                }
                sample
            })
            .collect())
    }

    async fn replace(
        &self,
        samples: &[String],
        patterns: &[PatternRecord],
    ) -> Result<Vec<ReplaceResult>> {
        let request = RemoteRequest::Replace(ReplacePayload {
            input: samples.to_vec(),
            regexes: patterns.to_vec(),
        });
        self.call(&request).await
    }
}

fn visualize(config: &MatchConfig, occurrence: MatchOccurrence) -> MatchOccurrence {
    MatchOccurrence {
        whole: config.present_whole(&occurrence.whole),
        parts: occurrence.parts.map_values(|text| config.present_sub(text)),
        position: occurrence.position,
    }
}
