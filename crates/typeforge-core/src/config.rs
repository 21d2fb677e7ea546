//! Configuration for a typeforge deployment.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::compile::ValidatorConfig;
use crate::error::{Error, Result};
use crate::ident::{Canonicalizer, Initialisms};
use crate::registry::Activation;
use crate::schema::ReservedNames;

/// Top-level configuration, read from a JSON file.
///
/// Every field has a default, so `{}` is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    /// Catalog directory
    pub catalog_dir: PathBuf,

    /// Validator settings
    pub validation: ValidatorConfig,

    /// When published types become visible to lookups
    pub activation: Activation,

    /// Extra initialisms merged into the default table
    pub initialisms: Vec<String>,

    /// Extra type names refused at submission time
    pub reserved_names: Vec<String>,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            catalog_dir: PathBuf::from("catalog"),
            validation: ValidatorConfig::default(),
            activation: Activation::default(),
            initialisms: Vec::new(),
            reserved_names: Vec::new(),
        }
    }
}

impl ForgeConfig {
    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Canonicalizer with the configured initialisms.
    pub fn canonicalizer(&self) -> Canonicalizer {
        Canonicalizer::new(Initialisms::common().with_extra(&self.initialisms))
    }

    pub fn reserved_names(&self) -> ReservedNames {
        ReservedNames::default().with_extra(&self.reserved_names)
    }
}
