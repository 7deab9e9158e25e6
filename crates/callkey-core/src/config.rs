//! Key configuration
//!
//! Loaded from JSON, e.g. `{"max_depth": 6}`. Missing fields take defaults;
//! unknown fields are rejected.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::normalizer::DEFAULT_DEPTH;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeyConfig {
    /// Recursion budget for normalization
    pub max_depth: usize,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_DEPTH,
        }
    }
}

impl KeyConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// # Errors
    /// Returns `Config` if `max_depth` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(Error::Config("max_depth must be at least 1".into()));
        }
        Ok(())
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: KeyConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        tracing::debug!(path = %path.display(), max_depth = config.max_depth, "loaded key config");
        Ok(config)
    }
}
