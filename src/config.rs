//! Compiler configuration.
//!
//! A YAML document setting the state a compilation starts from:
//!
//! ```yaml
//! key-signature: G major
//! time-signature: 3/4
//! tempo: Andante
//! clef: treble
//! default-duration: e
//! ```
//!
//! Every field is optional. Values use the same vocabularies as the `key:`, `time:`,
//! `tempo:` and `clef:` commands and are validated when the configuration is loaded.

use crate::ast::{Attributes, Clef, Duration, KeySignature, Tempo, TimeSignature};
use crate::error::ConfigError;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct CompilerConfig {
    #[serde(deserialize_with = "scalar")]
    pub key_signature: Option<String>,
    #[serde(deserialize_with = "scalar")]
    pub time_signature: Option<String>,
    #[serde(deserialize_with = "scalar")]
    pub tempo: Option<String>,
    #[serde(deserialize_with = "scalar")]
    pub clef: Option<String>,
    /// Sticky duration before the first explicit one
    #[serde(deserialize_with = "scalar")]
    pub default_duration: Option<String>,
}

/// Accept numbers as well as strings, so `tempo: 96` needs no quotes
fn scalar<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Option::<serde_yaml::Value>::deserialize(deserializer)? {
        None | Some(serde_yaml::Value::Null) => Ok(None),
        Some(serde_yaml::Value::String(s)) => Ok(Some(s)),
        Some(serde_yaml::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!("expected a scalar, found {:?}", other))),
    }
}

impl CompilerConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        log::debug!("loaded config from {}", path.display());
        Self::from_yaml_str(&content)
    }

    /// Check every present value against its vocabulary
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.attributes()?;
        self.default_duration()?;
        Ok(())
    }

    /// Initial key, time, tempo and clef
    pub fn attributes(&self) -> Result<Attributes, ConfigError> {
        let defaults = Attributes::default();
        Ok(Attributes {
            key: field(&self.key_signature, "key-signature", KeySignature::from_str)?
                .unwrap_or(defaults.key),
            time: field(&self.time_signature, "time-signature", TimeSignature::from_str)?
                .unwrap_or(defaults.time),
            tempo: field(&self.tempo, "tempo", Tempo::from_str)?.unwrap_or(defaults.tempo),
            clef: field(&self.clef, "clef", Clef::from_str)?.unwrap_or(defaults.clef),
        })
    }

    pub fn default_duration(&self) -> Result<Duration, ConfigError> {
        Ok(field(&self.default_duration, "default-duration", Duration::from_str)?
            .unwrap_or_default())
    }
}

fn field<T>(
    value: &Option<String>,
    name: &'static str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, ConfigError> {
    match value {
        None => Ok(None),
        Some(raw) => parse(raw.trim()).map(Some).ok_or_else(|| ConfigError::Invalid {
            field: name,
            value: raw.clone(),
        }),
    }
}
