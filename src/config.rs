//! Tool configuration file.
//!
//! The config is optional JSON: codec options plus rule sets appended after
//! the built-in catalog.
use crate::catalog::{Catalog, RuleSetSpec};
use crate::codec::{Codec, CodecOptions};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    pub codec: CodecOptions,
    /// Include the rule sets shipped with the tool.
    pub builtin_catalog: bool,
    pub rule_sets: Vec<RuleSetSpec>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            codec: CodecOptions::default(),
            builtin_catalog: true,
            rule_sets: Vec::new(),
        }
    }
}

impl ToolConfig {
    pub fn codec(&self) -> Codec {
        Codec::new(self.codec.clone())
    }

    /// Built-in rule sets (unless disabled) followed by the configured ones.
    pub fn catalog(&self) -> Result<Catalog> {
        let mut catalog = if self.builtin_catalog {
            Catalog::builtin()
        } else {
            Catalog::default()
        };
        for spec in &self.rule_sets {
            let set = spec
                .build()
                .with_context(|| format!("rule set {:?}", spec.name))?;
            catalog.push(set);
        }
        Ok(catalog)
    }
}

/// Load a config file.
pub fn load_config(path: &Path) -> Result<ToolConfig> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let config: ToolConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
