//! Request envelopes
//!
//! An envelope names a mode (`test`, `match` or `replace`), the patterns,
//! the samples and the match config. Every problem with it is reported with
//! a numbered status code, and the answer always goes back in the same
//! `{ok, code, content, message, hasTiming}` shape.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use regapi::{
    DelimiterPair, EngineCapabilities, EngineError, MatchConfigProp, PatternRecord, RegexEngine,
    Registry, open_engine,
};

/// Status code of a request that was answered
pub const OK: u16 = 0;
/// The engine faulted while answering
pub const SERVER_ERROR: u16 = 500;

/// Lowest value a length setting in `matchConfig` may take
pub const MIN_MATCH_LEN: usize = 10;

/// Size limits applied before any pattern is compiled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quotas {
    pub max_regexes: usize,
    pub max_samples: usize,
    /// Characters in a single sample
    pub max_sample_length: usize,
    /// Characters across every sample
    pub max_total_sample_length: usize,
}

impl Default for Quotas {
    fn default() -> Self {
        Quotas {
            max_regexes: 30,
            max_samples: 2048,
            max_sample_length: 4096,
            max_total_sample_length: 32768,
        }
    }
}

/// What the envelope asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Test,
    Match,
    Replace,
}

impl Mode {
    const ALL: [(&'static str, Mode); 3] = [
        ("test", Mode::Test),
        ("match", Mode::Match),
        ("replace", Mode::Replace),
    ];

    fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .find(|(name, _)| *name == raw)
            .map(|(_, mode)| *mode)
    }
}

/// A rejected envelope, with the status code it is reported under
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("[{code}] {message}")]
pub struct IngressError {
    pub code: u16,
    pub message: String,
}

impl IngressError {
    fn new(code: u16, message: impl Into<String>) -> Self {
        IngressError {
            code,
            message: message.into(),
        }
    }
}

/// Length settings of a `match` envelope, checked against the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestedConfig {
    pub max_whole_match_len: usize,
    pub max_sub_match_len: usize,
    pub max_return_sample_len: usize,
    pub show_white_space_chars: Option<bool>,
    pub truncate_long_str: Option<bool>,
}

/// A checked envelope, ready to run
#[derive(Debug, Clone)]
pub struct IngressRequest {
    pub mode: Mode,
    pub capabilities: EngineCapabilities,
    pub regexes: Vec<PatternRecord>,
    pub samples: Vec<String>,
    pub chain_regexes: bool,
    pub match_config: Option<RequestedConfig>,
}

/// Answer to one envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub ok: bool,
    pub code: u16,
    pub content: Value,
    pub message: String,
    pub has_timing: bool,
}

impl Response {
    fn failure(error: IngressError) -> Self {
        Response {
            ok: false,
            code: error.code,
            content: Value::Array(vec![Value::String(String::new())]),
            message: error.message,
            has_timing: false,
        }
    }
}

/// Parses and checks envelopes against one registry
#[derive(Debug, Clone)]
pub struct Ingress<'a> {
    registry: &'a Registry,
    default_engine: &'a str,
    quotas: Quotas,
}

impl<'a> Ingress<'a> {
    pub fn new(registry: &'a Registry, default_engine: &'a str, quotas: Quotas) -> Self {
        Ingress {
            registry,
            default_engine,
            quotas,
        }
    }

    /// Parse and answer one envelope. Never fails: every problem becomes a
    /// response with a non-zero code.
    pub async fn respond(&self, json: &str) -> Response {
        let request = match self.parse(json) {
            Ok(request) => request,
            Err(error) => {
                debug!(code = error.code, message = %error.message, "envelope rejected");
                return Response::failure(error);
            }
        };
        match run(&request).await {
            Ok(content) => Response {
                ok: true,
                code: OK,
                content,
                message: String::new(),
                has_timing: request.mode != Mode::Test,
            },
            Err(error) => {
                warn!(engine = request.capabilities.id(), %error, "request failed");
                Response::failure(IngressError::new(
                    SERVER_ERROR,
                    format!("Server error: {error}"),
                ))
            }
        }
    }

    /// Check an envelope. The first problem found is returned.
    pub fn parse(&self, json: &str) -> Result<IngressRequest, IngressError> {
        let json = json.trim();
        if json.is_empty() {
            return Err(IngressError::new(201, "JSON cannot be an empty string"));
        }
        let data: Value = serde_json::from_str(json)
            .map_err(|e| IngressError::new(202, format!("Invalid JSON: {e}")))?;
        let data = match data {
            Value::Object(data) => data,
            other => {
                return Err(IngressError::new(
                    202,
                    format!("Invalid JSON: expecting an object. Found {}", type_name(&other)),
                ));
            }
        };

        let mode = parse_mode(&data)?;
        let capabilities = self.engine(&data)?;
        let regexes = self.regexes(&data, mode)?;

        let mut request = IngressRequest {
            mode,
            capabilities,
            regexes,
            samples: Vec::new(),
            chain_regexes: false,
            match_config: None,
        };
        if mode == Mode::Test {
            return Ok(request);
        }

        request.samples = self.samples(&data)?;
        request.chain_regexes = match data.get("chainRegexes") {
            None => {
                return Err(IngressError::new(
                    130,
                    "Request data is missing the chainRegexes field",
                ));
            }
            Some(Value::Bool(chain)) => *chain,
            Some(other) => {
                return Err(IngressError::new(
                    131,
                    format!(
                        "Request data.chainRegexes is invalid. Expecting boolean. Found {}.",
                        type_name(other)
                    ),
                ));
            }
        };
        if mode == Mode::Match {
            request.match_config = Some(match_config(&data, &request.capabilities)?);
        }
        Ok(request)
    }

    fn engine(&self, data: &Map<String, Value>) -> Result<EngineCapabilities, IngressError> {
        let id = match data.get("engine") {
            None | Some(Value::Null) => self.default_engine,
            Some(Value::String(id)) => id.as_str(),
            Some(other) => {
                return Err(IngressError::new(
                    103,
                    format!(
                        "Request data.engine is invalid. Expecting string. Found {}.",
                        type_name(other)
                    ),
                ));
            }
        };
        self.registry
            .require(id)
            .cloned()
            .map_err(|e| IngressError::new(103, format!("Request data.engine is invalid: {e}")))
    }

    fn regexes(
        &self,
        data: &Map<String, Value>,
        mode: Mode,
    ) -> Result<Vec<PatternRecord>, IngressError> {
        let regexes = match data.get("regexes") {
            None => {
                return Err(IngressError::new(
                    110,
                    "Request data is missing the regexes field",
                ));
            }
            Some(Value::Array(regexes)) => regexes,
            Some(other) => {
                return Err(IngressError::new(
                    111,
                    format!(
                        "Request data.regexes is invalid. Expecting array. Found {}.",
                        type_name(other)
                    ),
                ));
            }
        };
        if regexes.is_empty() {
            return Err(IngressError::new(
                112,
                "Request data.regexes contains no regular expressions",
            ));
        }
        if regexes.len() > self.quotas.max_regexes {
            return Err(IngressError::new(
                113,
                format!(
                    "Request data.regexes contains too many regular expressions. \
                     We only allow {}. Received {}",
                    self.quotas.max_regexes,
                    regexes.len()
                ),
            ));
        }
        regexes.iter().map(|value| pattern_record(value, mode)).collect()
    }

    fn samples(&self, data: &Map<String, Value>) -> Result<Vec<String>, IngressError> {
        let samples = match data.get("samplestrings") {
            None => {
                return Err(IngressError::new(
                    120,
                    "Request data is missing the samplestrings field",
                ));
            }
            Some(Value::Array(samples)) => samples,
            Some(other) => {
                return Err(IngressError::new(
                    121,
                    format!(
                        "Request data.samplestrings is invalid. Expecting array. Found {}.",
                        type_name(other)
                    ),
                ));
            }
        };
        if samples.is_empty() {
            return Err(IngressError::new(
                122,
                "Request data.samplestrings contains no sample strings. \
                 You must provide at least one empty string",
            ));
        }
        if samples.len() > self.quotas.max_samples {
            return Err(IngressError::new(
                113,
                format!(
                    "Request data.samplestrings contains too many sample strings. \
                     We only allow {}. Received {}",
                    self.quotas.max_samples,
                    samples.len()
                ),
            ));
        }

        let mut total = 0;
        let mut checked = Vec::with_capacity(samples.len());
        for (index, sample) in samples.iter().enumerate() {
            let Value::String(sample) = sample else {
                return Err(IngressError::new(
                    121,
                    format!(
                        "Request data.samplestrings[{index}] is invalid. \
                         Expecting string. Found {}.",
                        type_name(sample)
                    ),
                ));
            };
            let length = sample.chars().count();
            total += length;
            if length > self.quotas.max_sample_length {
                return Err(IngressError::new(
                    114,
                    format!(
                        "Request data.samplestrings[{index}] has too many characters. \
                         We only allow {} characters per sample. Received {length}",
                        self.quotas.max_sample_length
                    ),
                ));
            }
            if total > self.quotas.max_total_sample_length {
                return Err(IngressError::new(
                    115,
                    format!(
                        "The cumulative character count of data.samplestrings ({total}) \
                         exceeds the maximum cumulative character count ({})",
                        self.quotas.max_total_sample_length
                    ),
                ));
            }
            checked.push(sample.clone());
        }
        Ok(checked)
    }
}

/// Why a checked request could not be answered
#[derive(Error, Debug)]
enum RunError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("unserialisable results: {0}")]
    Serialize(#[from] serde_json::Error),
}

async fn run(request: &IngressRequest) -> Result<Value, RunError> {
    let mut engine = open_engine(request.capabilities.clone()).map_err(EngineError::from)?;
    let content = match request.mode {
        Mode::Test => serde_json::to_value(engine.test_all(&request.regexes).await?),
        Mode::Match => {
            if let Some(config) = request.match_config {
                engine.set_match_config_prop(MatchConfigProp::MaxWholeMatchLen(
                    config.max_whole_match_len,
                ));
                engine.set_match_config_prop(MatchConfigProp::MaxSubMatchLen(
                    config.max_sub_match_len,
                ));
                engine.set_match_config_prop(MatchConfigProp::MaxReturnSampleLen(
                    config.max_return_sample_len,
                ));
                if let Some(show) = config.show_white_space_chars {
                    engine.set_match_config_prop(MatchConfigProp::ShowWhiteSpaceChars(show));
                }
                if let Some(truncate) = config.truncate_long_str {
                    engine.set_match_config_prop(MatchConfigProp::TruncateLongStr(truncate));
                }
            }
            let results = engine
                .match_samples(&request.samples, &request.regexes, Some(request.chain_regexes))
                .await?;
            serde_json::to_value(results)
        }
        Mode::Replace => {
            serde_json::to_value(engine.replace(&request.samples, &request.regexes).await?)
        }
    };
    Ok(content?)
}

fn parse_mode(data: &Map<String, Value>) -> Result<Mode, IngressError> {
    match data.get("type") {
        None => Err(IngressError::new(
            100,
            "Request data is missing the type field",
        )),
        Some(Value::String(raw)) => Mode::parse(raw).ok_or_else(|| {
            let names: Vec<&str> = Mode::ALL.iter().map(|(name, _)| *name).collect();
            IngressError::new(
                102,
                format!(
                    "Request data.type is invalid. Expecting one of the following: \"{}\". \
                     Found: \"{raw}\"",
                    names.join("\", \"")
                ),
            )
        }),
        Some(other) => Err(IngressError::new(
            101,
            format!(
                "Request data.type is invalid. Expecting string. Found {}.",
                type_name(other)
            ),
        )),
    }
}

/// Fields every pattern must carry, in the order their absence is reported
const TEST_FIELDS: [&str; 4] = ["id", "pattern", "modifiers", "delimiters"];
const REPLACE_FIELDS: [&str; 6] = [
    "id",
    "pattern",
    "modifiers",
    "delimiters",
    "replace",
    "transformWhiteSpace",
];

fn pattern_record(value: &Value, mode: Mode) -> Result<PatternRecord, IngressError> {
    let Value::Object(fields) = value else {
        return Err(invalid_pattern(format!(
            "expecting object. Found {}",
            type_name(value)
        )));
    };
    let required: &[&str] = match mode {
        Mode::Test => &TEST_FIELDS,
        Mode::Match | Mode::Replace => &REPLACE_FIELDS,
    };
    for (index, key) in required.iter().enumerate() {
        if !fields.contains_key(*key) {
            return Err(IngressError::new(
                200 + index as u16,
                format!("Regex is missing \"{key}\" field"),
            ));
        }
    }

    let id = fields
        .get("id")
        .and_then(Value::as_i64)
        .ok_or_else(|| invalid_pattern("property `id` must be an integer"))?;
    let pattern = string_field(fields, "pattern")?;
    let modifiers = string_field(fields, "modifiers")?;
    let delimiters = delimiter_field(fields)?;

    let mut record = PatternRecord::new(id, pattern).modifiers(modifiers);
    if let Some(delimiters) = delimiters {
        record = record.delimiters(delimiters);
    }
    if mode != Mode::Test {
        record = record.replace(string_field(fields, "replace")?).transform_escaped_white_space(
            fields
                .get("transformWhiteSpace")
                .and_then(Value::as_bool)
                .ok_or_else(|| invalid_pattern("property `transformWhiteSpace` must be a boolean"))?,
        );
    }
    Ok(record)
}

fn string_field(fields: &Map<String, Value>, key: &str) -> Result<String, IngressError> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| invalid_pattern(format!("property `{key}` must be a string")))
}

/// Delimiters may be written `"/"`, `"{}"` or `{"open": "{", "close": "}"}`.
/// An empty string leaves the engine default in place.
fn delimiter_field(fields: &Map<String, Value>) -> Result<Option<DelimiterPair>, IngressError> {
    match fields.get("delimiters") {
        Some(Value::String(raw)) if raw.is_empty() => Ok(None),
        Some(Value::String(raw)) => parse_delimiters(raw)
            .map(Some)
            .ok_or_else(|| invalid_pattern("property `delimiters` must be one or two characters")),
        Some(object @ Value::Object(_)) => serde_json::from_value(object.clone())
            .map(Some)
            .map_err(|e| invalid_pattern(format!("property `delimiters` is invalid: {e}"))),
        Some(Value::Null) | None => Ok(None),
        Some(other) => Err(invalid_pattern(format!(
            "property `delimiters` must be a string. Found {}",
            type_name(other)
        ))),
    }
}

fn invalid_pattern(detail: impl std::fmt::Display) -> IngressError {
    IngressError::new(210, format!("Regex data contains errors: \"{detail}\""))
}

/// A delimiter pair written as one character (symmetric) or two
pub fn parse_delimiters(raw: &str) -> Option<DelimiterPair> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(delim), None, None) => Some(DelimiterPair::symmetric(delim)),
        (Some(open), Some(close), None) => Some(DelimiterPair::new(open, close)),
        _ => None,
    }
}

fn match_config(
    data: &Map<String, Value>,
    caps: &EngineCapabilities,
) -> Result<RequestedConfig, IngressError> {
    let config = match data.get("matchConfig") {
        None => {
            return Err(IngressError::new(
                140,
                "Request data is missing the matchConfig field",
            ));
        }
        Some(Value::Object(config)) => config,
        Some(other) => {
            return Err(IngressError::new(
                141,
                format!(
                    "Request data.matchConfig is invalid. Expecting object. Found {}.",
                    type_name(other)
                ),
            ));
        }
    };
    let limits = caps.match_config().limits();
    Ok(RequestedConfig {
        max_whole_match_len: length_setting(
            config,
            "maxWholeMatchLen",
            limits.max_whole_match_len,
            142,
        )?,
        max_sub_match_len: length_setting(config, "maxSubMatchLen", limits.max_sub_match_len, 145)?,
        max_return_sample_len: length_setting(
            config,
            "maxReturnSampleLen",
            limits.max_return_sample_len,
            145,
        )?,
        show_white_space_chars: config.get("showWhiteSpaceChars").and_then(Value::as_bool),
        truncate_long_str: config.get("truncateLongStr").and_then(Value::as_bool),
    })
}

/// A length between [`MIN_MATCH_LEN`] and `max`. `base` is the code for a
/// missing field; `base + 1` and `base + 2` report a non-integer and an
/// out-of-range value.
fn length_setting(
    config: &Map<String, Value>,
    key: &str,
    max: usize,
    base: u16,
) -> Result<usize, IngressError> {
    let value = config.get(key).ok_or_else(|| {
        IngressError::new(
            base,
            format!("Request data.matchConfig is missing the {key} field."),
        )
    })?;
    let range = format!("must be an integer between {MIN_MATCH_LEN} & {max}");
    let Some(length) = value.as_u64() else {
        return Err(IngressError::new(
            base + 1,
            format!(
                "Request data.matchConfig.{key} {range}. {} given.",
                type_name(value)
            ),
        ));
    };
    match usize::try_from(length) {
        Ok(length) if (MIN_MATCH_LEN..=max).contains(&length) => Ok(length),
        _ => Err(IngressError::new(
            base + 2,
            format!("Request data.matchConfig.{key} {range}. {length} given."),
        )),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
