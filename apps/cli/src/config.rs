//! CLI defaults from an optional `strata.toml`.

use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

/// Defaults merged under explicit CLI arguments.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CliDefaults {
    pub test_size: f64,
    pub random_state: u64,
    pub algorithm: String,
    /// Owner recorded on deployments made from this machine.
    pub owner: String,
}

impl Default for CliDefaults {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            random_state: 42,
            algorithm: "auto".to_string(),
            owner: "cli".to_string(),
        }
    }
}

impl CliDefaults {
    /// Loads defaults from the given path, falling back to `strata.toml`
    /// in the working directory, then to built-in values.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = path.unwrap_or_else(|| Path::new("strata.toml"));
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }
}
