//! regapi
//!
//! One contract for testing, matching and replacing with regular
//! expressions across several engines: the `regex` crate, `fancy-regex`,
//! and a PCRE engine reached through a remote wire contract.

pub mod capabilities;
pub mod chain;
pub mod compile;
pub mod config;
pub mod dialect;
pub mod engine;
pub mod error;
pub mod executor;
pub mod pattern;
pub mod registry;
pub mod replace;
pub mod result;
pub mod server;
pub mod validate;
pub mod wire;

pub use capabilities::{
    DelimiterPair, DialectKind, EngineAccess, EngineCapabilities, EngineDefaults, EngineSpec,
    ModifiersLabel,
};
pub use compile::{CompileContext, CompiledPattern, ScanMode, compile};
pub use config::{MatchConfig, MatchConfigLimits, MatchConfigProp, MatchSettings};
pub use dialect::{Dialect, FlagSet, NativeRegex};
pub use engine::{
    Engine, LocalEngine, RegexEngine, RemoteEngine, Transport, TransportError, open_engine,
};
pub use error::{ConfigError, EngineError, Result, ValidationError};
pub use pattern::PatternRecord;
pub use registry::Registry;
pub use replace::{Replacement, ReplacementError, ReplacementPart};
pub use result::{
    Groups, MatchOccurrence, PatternError, PatternId, PatternOutcome, ReplaceResult,
    SampleMatches, TestOutcome, Timed, Validity,
};
pub use server::{LoopbackTransport, RequestHandler, ServerError};
pub use validate::{validate_delimiters, validate_modifiers};
pub use wire::RemoteRequest;
