//! Engine capability registry
//!
//! The built-in table describes the three engines regapi ships with. A
//! replacement table can be loaded from JSON with [`Registry::from_json`].

use crate::capabilities::{
    DelimiterPair, DialectKind, EngineAccess, EngineCapabilities, EngineSpec, ModifiersLabel,
};
use crate::config::{MatchConfig, MatchConfigLimits};
use crate::error::ConfigError;

/// PCRE accepts any non-alphanumeric, non-backslash, non-whitespace delimiter
const PCRE_DELIMITERS: &str = "`~!@#$%^&*()_-+={}|[]:;\"'<>?,./";

/// Checked set of engine capability tables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    engines: Vec<EngineCapabilities>,
}

impl Registry {
    /// Check every spec; the first bad one aborts construction
    pub fn from_specs(specs: Vec<EngineSpec>) -> Result<Self, ConfigError> {
        let mut engines: Vec<EngineCapabilities> = Vec::with_capacity(specs.len());
        for spec in specs {
            if engines.iter().any(|caps| caps.id() == spec.id) {
                return Err(ConfigError::Table(format!("duplicate engine id `{}`", spec.id)));
            }
            engines.push(EngineCapabilities::new(spec)?);
        }
        Ok(Registry { engines })
    }

    /// Parse a JSON array of engine specs
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let specs: Vec<EngineSpec> =
            serde_json::from_str(json).map_err(|e| ConfigError::Table(e.to_string()))?;
        Self::from_specs(specs)
    }

    /// Look an engine up by id
    pub fn get(&self, id: &str) -> Option<&EngineCapabilities> {
        self.engines.iter().find(|caps| caps.id() == id)
    }

    /// Look an engine up by id, failing with [`ConfigError::UnknownEngine`]
    pub fn require(&self, id: &str) -> Result<&EngineCapabilities, ConfigError> {
        self.get(id)
            .ok_or_else(|| ConfigError::UnknownEngine(id.to_string()))
    }

    /// All engines, in table order
    pub fn iter(&self) -> impl Iterator<Item = &EngineCapabilities> {
        self.engines.iter()
    }

    /// Number of engines
    pub fn len(&self) -> usize {
        self.engines.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}

/// The built-in registry
pub fn builtin() -> Result<Registry, ConfigError> {
    Registry::from_specs(builtin_specs())
}

/// Raw specs of the built-in engines
pub fn builtin_specs() -> Vec<EngineSpec> {
    let local_config = MatchConfig::new(MatchConfigLimits {
        max_sub_match_len: 10_000,
        max_whole_match_len: 10_000,
        max_return_sample_len: 100_000,
        optional_truncate_long_str: true,
    });

    vec![
        EngineSpec {
            id: "rust-regex".to_string(),
            name: "Rust regex".to_string(),
            docs_url: "https://docs.rs/regex/latest/regex/#syntax".to_string(),
            api_url: String::new(),
            allowed_delimiters: vec!['/'],
            allowed_paired_delimiters: Vec::new(),
            allowed_modifiers: vec!['g', 'i', 'm', 's', 'u', 'x', 'U'],
            modifiers_label: ModifiersLabel::Flags,
            global_modifier: Some('g'),
            default_delimiters: DelimiterPair::symmetric('/'),
            default_modifiers: "ig".to_string(),
            delimiter_required: false,
            access: EngineAccess::Local,
            dialect: DialectKind::Standard,
            match_config: local_config.clone(),
        },
        EngineSpec {
            id: "fancy-regex".to_string(),
            name: "Fancy regex".to_string(),
            docs_url: "https://docs.rs/fancy-regex/latest/fancy_regex/#syntax".to_string(),
            api_url: String::new(),
            allowed_delimiters: vec!['/'],
            allowed_paired_delimiters: Vec::new(),
            allowed_modifiers: vec!['g', 'i', 'm', 's', 'x'],
            modifiers_label: ModifiersLabel::Flags,
            global_modifier: Some('g'),
            default_delimiters: DelimiterPair::symmetric('/'),
            default_modifiers: "ig".to_string(),
            delimiter_required: false,
            access: EngineAccess::Local,
            dialect: DialectKind::Fancy,
            match_config: local_config,
        },
        EngineSpec {
            id: "pcre".to_string(),
            name: "PCRE".to_string(),
            docs_url: "https://www.pcre.org/current/doc/html/pcre2pattern.html".to_string(),
            api_url: String::new(),
            allowed_delimiters: PCRE_DELIMITERS.chars().collect(),
            allowed_paired_delimiters: vec![
                DelimiterPair::new('(', ')'),
                DelimiterPair::new('<', '>'),
                DelimiterPair::new('[', ']'),
                DelimiterPair::new('{', '}'),
            ],
            allowed_modifiers: vec!['i', 'm', 's', 'x', 'A', 'D', 'S', 'U', 'X', 'J', 'u'],
            modifiers_label: ModifiersLabel::Modifiers,
            global_modifier: None,
            default_delimiters: DelimiterPair::symmetric('`'),
            default_modifiers: "is".to_string(),
            delimiter_required: true,
            access: EngineAccess::Remote,
            dialect: DialectKind::Pcre2,
            match_config: MatchConfig::new(MatchConfigLimits {
                max_sub_match_len: 500,
                max_whole_match_len: 500,
                max_return_sample_len: 300,
                optional_truncate_long_str: false,
            }),
        },
    ]
}
