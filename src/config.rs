//! Configuration: which checks run, their flags, and the source language level.
//!
//! A [`Config`] is read once from YAML or JSON, merged with command line flags and
//! then frozen into a [`Flags`] map and a [`LanguageLevel`] that every analysis sees.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::RectifyError;

// ============================================================================
// LANGUAGE LEVEL
// ============================================================================

/// The Java language level of the analysed sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageLevel(pub u32);

impl LanguageLevel {
    /// Text blocks became a standard feature in Java 15.
    pub const TEXT_BLOCKS: LanguageLevel = LanguageLevel(15);

    pub fn supports_text_blocks(self) -> bool {
        self >= Self::TEXT_BLOCKS
    }
}

impl Default for LanguageLevel {
    fn default() -> Self {
        LanguageLevel(17)
    }
}

impl fmt::Display for LanguageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// FLAGS
// ============================================================================

/// Resolved checker flags, keyed `Check:Flag`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Flags {
    values: BTreeMap<String, String>,
}

impl Flags {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds flags from `(key, value)` pairs; later pairs win.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Parses a `Check:Flag=value` assignment. A bare `Check:Flag` means `true`.
    pub fn parse_assignment(assignment: &str) -> Result<(String, String), RectifyError> {
        let (key, value) = match assignment.split_once('=') {
            Some((key, value)) => (key.trim(), value.trim()),
            None => (assignment.trim(), "true"),
        };
        match key.split_once(':') {
            Some((check, flag)) if !check.is_empty() && !flag.is_empty() => {
                Ok((key.to_string(), value.to_string()))
            }
            _ => Err(RectifyError::config(format!(
                "flag `{assignment}` must have the form Check:Flag=value"
            ))),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Boolean flag lookup; unparsable values count as absent.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)?.to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

// ============================================================================
// CONFIG FILE
// ============================================================================

/// The on-disk configuration.
///
/// ```yaml
/// language_level: 17
/// disabled: [EmptyMethod]
/// flags:
///   "TestHelperSourceFormat:AvoidTextBlocks": "true"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub language_level: Option<LanguageLevel>,
    /// Checks and rules that never run.
    pub disabled: BTreeSet<String>,
    /// When present, only these checks and rules run.
    pub enabled: Option<BTreeSet<String>>,
    /// Skip the template rule catalog entirely.
    pub disable_rules: bool,
    pub flags: BTreeMap<String, String>,
}

impl Config {
    /// Loads a configuration file; `.json` files are read as JSON, anything else as YAML.
    pub fn load(path: &Path) -> Result<Self, RectifyError> {
        let text = std::fs::read_to_string(path).map_err(|e| RectifyError::io(path, e))?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            Self::from_json(&text)?
        } else {
            Self::from_yaml(&text)?
        };
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self, RectifyError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| RectifyError::config(e.to_string()))
    }

    pub fn from_json(text: &str) -> Result<Self, RectifyError> {
        serde_json::from_str(text).map_err(|e| RectifyError::config(e.to_string()))
    }

    /// Applies command line `Check:Flag=value` assignments on top of the file flags.
    pub fn with_flag_assignments<S: AsRef<str>>(
        mut self,
        assignments: &[S],
    ) -> Result<Self, RectifyError> {
        for assignment in assignments {
            let (key, value) = Flags::parse_assignment(assignment.as_ref())?;
            self.flags.insert(key, value);
        }
        Ok(self)
    }

    pub fn flags(&self) -> Flags {
        Flags::from_pairs(self.flags.clone())
    }

    pub fn language_level(&self) -> LanguageLevel {
        self.language_level.unwrap_or_default()
    }

    /// Whether the named check or rule should run.
    pub fn is_enabled(&self, name: &str) -> bool {
        if self.disabled.contains(name) {
            return false;
        }
        match &self.enabled {
            Some(enabled) => enabled.contains(name),
            None => true,
        }
    }
}
