use crate::error::GuardError;
use crate::matcher::DEFAULT_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the optional configuration file at the repository root.
pub const CONFIG_FILE_NAME: &str = ".o2guard.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Minimum similarity for a suggestion (0.0 - 1.0)
    pub threshold: f64,

    /// Extra gitignore-style patterns, applied after `.o2guardignore`
    pub exclude_paths: Vec<String>,

    /// Names treated as known in addition to the builtin whitelist
    pub extra_builtins: Vec<String>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            exclude_paths: Vec::new(),
            extra_builtins: Vec::new(),
        }
    }
}

impl GuardConfig {
    /// Loads `.o2guard.yaml` from `root`, or the defaults if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file exists but cannot be read
    /// - The YAML content cannot be parsed into a valid `GuardConfig`
    pub fn load(root: &Path) -> Result<Self, GuardError> {
        let path = root.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&content).map_err(|source| GuardError::Config { path, source })
    }
}
