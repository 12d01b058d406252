//! Engine capability tables
//!
//! An [`EngineSpec`] is the raw, deserialisable description of an engine:
//! which delimiters and modifiers it accepts, its defaults, whether it runs
//! in-process or remotely, and which dialect executes its patterns.
//! [`EngineCapabilities`] is the checked, immutable form every other module
//! works from.

use serde::{Deserialize, Serialize};

use crate::config::MatchConfig;
use crate::error::{ConfigError, ValidationError};
use crate::validate::{human_list, validate_delimiters, validate_modifiers};

/// Opening and closing delimiter characters of a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DelimiterPair {
    /// Opening delimiter
    pub open: char,
    /// Closing delimiter (same as `open` for symmetric delimiters)
    pub close: char,
}

impl DelimiterPair {
    /// A pair with distinct opening and closing characters
    pub const fn new(open: char, close: char) -> Self {
        DelimiterPair { open, close }
    }

    /// A pair that opens and closes with the same character
    pub const fn symmetric(delim: char) -> Self {
        DelimiterPair {
            open: delim,
            close: delim,
        }
    }

    /// Wrap a pattern and its modifiers the way a delimited engine expects
    pub fn wrap(&self, pattern: &str, modifiers: &str) -> String {
        format!("{}{}{}{}", self.open, pattern, self.close, modifiers)
    }
}

/// Where an engine executes its patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineAccess {
    /// In this process
    Local,
    /// In another process, reached through a transport
    Remote,
}

/// What the engine's documentation calls its modifier characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModifiersLabel {
    /// e.g. JavaScript, Rust
    Flags,
    /// e.g. PCRE
    Modifiers,
}

impl ModifiersLabel {
    /// Plural noun used in messages
    pub fn as_str(&self) -> &'static str {
        match self {
            ModifiersLabel::Flags => "flags",
            ModifiersLabel::Modifiers => "modifiers",
        }
    }
}

/// Which native implementation compiles and runs patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    /// The `regex` crate: linear time, no look-around or back-references
    Standard,
    /// The `fancy-regex` crate: adds look-around and back-references
    Fancy,
    /// PCRE2 through the `pcre2` crate
    Pcre2,
}

impl DialectKind {
    /// Short identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            DialectKind::Standard => "standard",
            DialectKind::Fancy => "fancy",
            DialectKind::Pcre2 => "pcre2",
        }
    }
}

/// Raw capability entry, as stored in an engine table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSpec {
    /// Unique engine identifier
    pub id: String,
    /// Human readable name
    pub name: String,
    /// Documentation URL
    #[serde(default, rename = "docsURL")]
    pub docs_url: String,
    /// Endpoint of a remote engine (empty for local engines)
    #[serde(default, rename = "apiURL")]
    pub api_url: String,
    /// Single characters accepted as opening delimiters
    #[serde(default)]
    pub allowed_delimiters: Vec<char>,
    /// Asymmetric delimiter pairs, e.g. `(` and `)`
    #[serde(default)]
    pub allowed_paired_delimiters: Vec<DelimiterPair>,
    /// Modifier characters the engine understands
    pub allowed_modifiers: Vec<char>,
    /// How the engine names its modifiers
    pub modifiers_label: ModifiersLabel,
    /// Modifier that requests exhaustive (find-all) scanning. Engines
    /// without one always scan for every match.
    #[serde(default)]
    pub global_modifier: Option<char>,
    /// Delimiters used when a pattern supplies none
    pub default_delimiters: DelimiterPair,
    /// Modifiers used when a pattern supplies none
    #[serde(default)]
    pub default_modifiers: String,
    /// Whether patterns must be delimited
    #[serde(default)]
    pub delimiter_required: bool,
    /// Local or remote execution
    pub access: EngineAccess,
    /// Native implementation
    pub dialect: DialectKind,
    /// Match config defaults and hard limits
    pub match_config: MatchConfig,
}

/// Immutable default delimiters and modifiers of an engine.
///
/// Updating a default produces a new value; nothing is changed in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineDefaults {
    delimiters: DelimiterPair,
    modifiers: String,
}

impl EngineDefaults {
    /// Default delimiters
    pub fn delimiters(&self) -> DelimiterPair {
        self.delimiters
    }

    /// Default modifiers
    pub fn modifiers(&self) -> &str {
        &self.modifiers
    }

    /// Copy with new default modifiers, if the engine accepts them
    pub fn with_modifiers(
        &self,
        caps: &EngineCapabilities,
        raw: &str,
    ) -> Result<Self, ValidationError> {
        let modifiers = validate_modifiers(caps, raw)?;
        Ok(EngineDefaults {
            delimiters: self.delimiters,
            modifiers,
        })
    }

    /// Copy with new default delimiters, if the engine accepts them
    pub fn with_delimiters(
        &self,
        caps: &EngineCapabilities,
        pair: DelimiterPair,
    ) -> Result<Self, ValidationError> {
        let delimiters = validate_delimiters(caps, pair)?;
        Ok(EngineDefaults {
            delimiters,
            modifiers: self.modifiers.clone(),
        })
    }
}

/// Validated capability table of one engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineCapabilities {
    id: String,
    name: String,
    docs_url: String,
    api_url: String,
    allowed_delimiters: Vec<char>,
    allowed_paired_delimiters: Vec<DelimiterPair>,
    allowed_modifiers: Vec<char>,
    modifiers_label: ModifiersLabel,
    global_modifier: Option<char>,
    defaults: EngineDefaults,
    delimiter_required: bool,
    access: EngineAccess,
    dialect: DialectKind,
    match_config: MatchConfig,
}

impl EngineCapabilities {
    /// Check a raw table entry and build the capability set
    pub fn new(spec: EngineSpec) -> Result<Self, ConfigError> {
        let allowed_modifiers = alphabetic_modifiers(&spec.allowed_modifiers, spec.modifiers_label)?;

        if let Some(global) = spec.global_modifier
            && !allowed_modifiers.contains(&global)
        {
            return Err(ConfigError::Table(format!(
                "engine `{}` names `{global}` as its global modifier but does not allow it",
                spec.id
            )));
        }

        let mut caps = EngineCapabilities {
            id: spec.id,
            name: spec.name,
            docs_url: spec.docs_url,
            api_url: spec.api_url,
            allowed_delimiters: spec.allowed_delimiters,
            allowed_paired_delimiters: spec.allowed_paired_delimiters,
            allowed_modifiers,
            modifiers_label: spec.modifiers_label,
            global_modifier: spec.global_modifier,
            defaults: EngineDefaults {
                delimiters: spec.default_delimiters,
                modifiers: String::new(),
            },
            delimiter_required: spec.delimiter_required,
            access: spec.access,
            dialect: spec.dialect,
            match_config: spec.match_config.normalized(),
        };

        let invalid = |source| ConfigError::InvalidDefaults {
            engine: caps.id.clone(),
            source,
        };
        let modifiers = validate_modifiers(&caps, &spec.default_modifiers).map_err(&invalid)?;
        if caps.delimiter_required {
            validate_delimiters(&caps, spec.default_delimiters).map_err(&invalid)?;
        }
        caps.defaults.modifiers = modifiers;

        Ok(caps)
    }

    /// Unique identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Human readable name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Documentation URL
    pub fn docs_url(&self) -> &str {
        &self.docs_url
    }

    /// Remote endpoint, empty for local engines
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Characters accepted as opening delimiters
    pub fn allowed_delimiters(&self) -> &[char] {
        &self.allowed_delimiters
    }

    /// Asymmetric delimiter pairs
    pub fn allowed_paired_delimiters(&self) -> &[DelimiterPair] {
        &self.allowed_paired_delimiters
    }

    /// Whether any asymmetric pairs are accepted
    pub fn paired_delimiters_allowed(&self) -> bool {
        !self.allowed_paired_delimiters.is_empty()
    }

    /// Modifier characters accepted
    pub fn allowed_modifiers(&self) -> &[char] {
        &self.allowed_modifiers
    }

    /// How modifiers are named in messages
    pub fn modifiers_label(&self) -> ModifiersLabel {
        self.modifiers_label
    }

    /// Modifier requesting find-all scanning, if the engine has one
    pub fn global_modifier(&self) -> Option<char> {
        self.global_modifier
    }

    /// Defaults as constructed from the table
    pub fn defaults(&self) -> &EngineDefaults {
        &self.defaults
    }

    /// Whether patterns must carry delimiters
    pub fn delimiter_required(&self) -> bool {
        self.delimiter_required
    }

    /// Local or remote
    pub fn access(&self) -> EngineAccess {
        self.access
    }

    /// Native implementation
    pub fn dialect(&self) -> DialectKind {
        self.dialect
    }

    /// Default match config with this engine's limits
    pub fn match_config(&self) -> &MatchConfig {
        &self.match_config
    }
}

/// Keep alphabetic modifiers (deduplicated); anything else is a table error
fn alphabetic_modifiers(
    modifiers: &[char],
    label: ModifiersLabel,
) -> Result<Vec<char>, ConfigError> {
    let mut duds = Vec::new();
    let mut output: Vec<char> = Vec::with_capacity(modifiers.len());

    for &modifier in modifiers {
        if !modifier.is_ascii_alphabetic() {
            duds.push(modifier.to_string());
        } else if !output.contains(&modifier) {
            output.push(modifier);
        }
    }

    if duds.is_empty() {
        Ok(output)
    } else {
        Err(ConfigError::NonAlphabeticModifier {
            label: label.as_str(),
            verb: if duds.len() == 1 { "is" } else { "are" },
            chars: human_list(&duds),
        })
    }
}
