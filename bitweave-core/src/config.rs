use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::buffer::BitOrder;
use crate::resolver::{Resolver, ResolverContext};
use crate::value::Value;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Settings for a top-level decode or encode.
///
/// ```toml
/// bit_order = "lsb_first"
/// allow_trailing_bits = false
///
/// [params]
/// version = 2
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    pub bit_order: BitOrder,
    /// External parameters, bound in the root resolver as integers.
    pub params: IndexMap<String, i64>,
    /// Whether whole unread bytes after the top-level value are tolerated.
    pub allow_trailing_bits: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            bit_order: BitOrder::MsbFirst,
            params: IndexMap::new(),
            allow_trailing_bits: true,
        }
    }
}

impl CodecConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn with_param(mut self, name: impl Into<String>, value: i64) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    /// Root resolver seeded with the parameters.
    pub fn resolver(&self) -> Resolver<'static> {
        Resolver::with_params(
            self.params
                .iter()
                .map(|(name, value)| (name.clone(), Value::Int(*value))),
        )
    }

    /// Schema-build context declaring the parameters.
    pub fn resolver_context(&self) -> ResolverContext<'static> {
        ResolverContext::with_params(self.params.keys().cloned())
    }
}
