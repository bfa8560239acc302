//! Rules configuration
//!
//! Two optional YAML files live under the state directory's `rules/`:
//!
//! - `modules.yaml` — `modules: [{name, paths: [glob, …]}]`
//! - `changetypes.yaml` — detector overrides (`disable: [CATEGORY, …]`)
//!
//! An absent file means defaults: no modules, every category enabled.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, SemanticError};
use crate::features::detect::Category;
use crate::features::modules::ModuleRule;

#[derive(Debug, Clone, Deserialize, Default)]
struct ModulesFile {
    #[serde(default)]
    modules: Vec<ModuleRuleEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct ModuleRuleEntry {
    name: String,
    #[serde(default)]
    paths: Vec<String>,
}

/// Load ordered module rules from `rules/modules.yaml`.
pub fn load_module_rules(path: impl AsRef<Path>) -> Result<Vec<ModuleRule>> {
    let path = path.as_ref();
    if !path.is_file() {
        debug!(path = %path.display(), "no module rules file, using empty rule list");
        return Ok(Vec::new());
    }
    let text = fs::read_to_string(path)?;
    let parsed: ModulesFile = serde_yaml::from_str(&text)?;
    Ok(parsed
        .modules
        .into_iter()
        .map(|entry| ModuleRule::new(entry.name, entry.paths))
        .collect())
}

/// Detector overrides from `rules/changetypes.yaml`
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DetectorRules {
    /// Category strings to drop from detection results
    pub disable: Vec<String>,
}

impl DetectorRules {
    pub fn allows(&self, category: Category) -> bool {
        !self.disable.iter().any(|s| s == category.as_str())
    }
}

/// Load detector overrides from `rules/changetypes.yaml`. Unknown category
/// strings in `disable` are rejected so typos fail loudly.
pub fn load_detector_rules(path: impl AsRef<Path>) -> Result<DetectorRules> {
    let path = path.as_ref();
    if !path.is_file() {
        return Ok(DetectorRules::default());
    }
    let text = fs::read_to_string(path)?;
    let rules: DetectorRules = serde_yaml::from_str(&text)?;
    for name in &rules.disable {
        if Category::parse(name).is_none() {
            return Err(SemanticError::config(format!(
                "unknown change category '{}' in {}",
                name,
                path.display()
            )));
        }
    }
    Ok(rules)
}
