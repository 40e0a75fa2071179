use std::fs;
use std::path::Path;

use anyhow::Context;
use metatree_tree::TreeConfig;
use serde::{Deserialize, Serialize};

/// Settings read from the `--config` TOML file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub tree: TreeConfig,
    /// Namespace used when a command is given no `--namespace`.
    pub default_namespace: Option<String>,
}

impl CliConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}
