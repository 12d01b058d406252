//! The executing side of the remote wire contract
//!
//! [`RequestHandler`] answers serialised [`RemoteRequest`]s with its own
//! dialect and limits. [`LoopbackTransport`] plugs a handler straight into
//! a [`RemoteEngine`](crate::engine::RemoteEngine) in the same process.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::capabilities::EngineCapabilities;
use crate::chain::{run_match, run_replace};
use crate::compile::{CompileContext, compile};
use crate::dialect::{Dialect, FancyDialect, dialect_for};
use crate::engine::{Transport, TransportError};
use crate::error::EngineError;
use crate::pattern::PatternRecord;
use crate::result::Validity;
use crate::wire::RemoteRequest;

/// Why a request could not be answered
#[derive(Error, Debug)]
pub enum ServerError {
    /// The request is not valid JSON or not a known action
    #[error("malformed request: {0}")]
    Request(#[source] serde_json::Error),

    /// The response could not be serialised
    #[error("unserialisable response: {0}")]
    Response(#[source] serde_json::Error),

    /// The engine faulted while running the request
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Answers remote requests for one engine
#[derive(Debug, Clone)]
pub struct RequestHandler {
    capabilities: EngineCapabilities,
    dialect: Arc<dyn Dialect>,
}

impl RequestHandler {
    /// Handler using the dialect the table names. When this build lacks
    /// it, patterns are served by `fancy-regex`, the closest built-in
    /// dialect.
    pub fn new(capabilities: EngineCapabilities) -> Self {
        let dialect = dialect_for(capabilities.dialect()).unwrap_or_else(|| {
            warn!(
                engine = capabilities.id(),
                dialect = capabilities.dialect().as_str(),
                "dialect not built in, serving with fancy-regex"
            );
            Arc::new(FancyDialect) as Arc<dyn Dialect>
        });
        Self::with_dialect(capabilities, dialect)
    }

    /// Handler with an explicit dialect
    pub fn with_dialect(capabilities: EngineCapabilities, dialect: Arc<dyn Dialect>) -> Self {
        RequestHandler {
            capabilities,
            dialect,
        }
    }

    /// Capability table requests are checked against
    pub fn capabilities(&self) -> &EngineCapabilities {
        &self.capabilities
    }

    /// Dialect patterns are compiled with
    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// Answer one serialised request
    pub fn handle(&self, request: &str) -> Result<String, ServerError> {
        let request: RemoteRequest = serde_json::from_str(request).map_err(ServerError::Request)?;
        debug!(
            engine = self.capabilities.id(),
            action = request.action(),
            "handling remote request"
        );
        let response = self.dispatch(request)?;
        serde_json::to_string(&response).map_err(ServerError::Response)
    }

    /// Answer one parsed request
    pub fn dispatch(&self, request: RemoteRequest) -> Result<serde_json::Value, ServerError> {
        let ctx = CompileContext::new(&self.capabilities);
        let value = match request {
            RemoteRequest::Test(payload) => {
                let record = PatternRecord::new(0, payload.regex)
                    .modifiers(payload.modifiers)
                    .delimiters(payload.delimiters);
                let validity = match compile(&ctx, self.dialect(), &record) {
                    Ok(_) => Validity::Valid,
                    Err(error) => Validity::Invalid(error),
                };
                serde_json::to_value(validity)
            }
            RemoteRequest::Match(payload) => {
                // the request may only tighten or loosen within our limits
                let mut config = self.capabilities.match_config().clone();
                config.apply(&payload.config);
                let results =
                    run_match(&ctx, self.dialect(), &payload.regexes, &payload.input, &config)?;
                serde_json::to_value(results)
            }
            RemoteRequest::Replace(payload) => {
                let results = run_replace(&ctx, self.dialect(), &payload.regexes, &payload.input)?;
                serde_json::to_value(results)
            }
        };
        value.map_err(ServerError::Response)
    }
}

/// In-process transport: requests go straight to a [`RequestHandler`]
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    handler: RequestHandler,
}

impl LoopbackTransport {
    /// Loopback to a handler for `capabilities`
    pub fn new(capabilities: EngineCapabilities) -> Self {
        LoopbackTransport {
            handler: RequestHandler::new(capabilities),
        }
    }

    /// Loopback to an existing handler
    pub fn with_handler(handler: RequestHandler) -> Self {
        LoopbackTransport { handler }
    }

    /// The handler on the other end
    pub fn handler(&self) -> &RequestHandler {
        &self.handler
    }
}

impl Transport for LoopbackTransport {
    async fn send(&self, request: String) -> Result<String, TransportError> {
        self.handler
            .handle(&request)
            .map_err(|e| TransportError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry;

    fn handler() -> RequestHandler {
        RequestHandler::new(registry::builtin().unwrap().get("pcre").unwrap().clone())
    }

    #[test]
    fn test_handle_test_request() {
        let response = handler()
            .handle(r#"{"action":"test","payload":{"regex":"(abc","modifiers":"i","delimiters":{"open":"/","close":"/"}}}"#)
            .unwrap();
        let validity: Validity = serde_json::from_str(&response).unwrap();
        assert!(!validity.is_valid());

        let response = handler()
            .handle(r#"{"action":"test","payload":{"regex":"abc","modifiers":"i","delimiters":{"open":"/","close":"/"}}}"#)
            .unwrap();
        assert_eq!(response, r#"{"valid":true}"#);
    }

    #[test]
    fn test_handle_replace_request() {
        let response = handler()
            .handle(r#"{"action":"replace","payload":{"input":["banana"],"regexes":[{"id":1,"regex":"a","replace":"o"}]}}"#)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert_eq!(value[0]["sample"], "bonono");
    }

    #[test]
    fn test_match_request_clamped_to_limits() {
        let response = handler()
            .handle(
                r#"{"action":"match","payload":{
                    "config":{"chainRegexes":true,"maxSubMatchLen":3,"maxWholeMatchLen":99999,
                              "showWhiteSpaceChars":false,"truncateLongStr":false},
                    "input":["aaaaaa"],
                    "regexes":[{"id":1,"regex":"(a+)"}]}}"#,
            )
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&response).unwrap();
        let occurrence = &value[0]["allMatches"][0]["matches"][0];
        // truncation cannot be switched off for this engine
        assert_eq!(occurrence["parts"]["1"], "aaa");
        assert_eq!(occurrence["whole"], "aaaaaa");
    }

    #[test]
    fn test_malformed_request() {
        assert!(matches!(
            handler().handle("{"),
            Err(ServerError::Request(_))
        ));
    }
}
