//! Module matching: mapping file paths to named modules via glob rules
//!
//! Rules are ordered; a path collects every module whose patterns match it,
//! in rule order, each name at most once. `**` crosses path segments, `*`
//! stays within one segment.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::error::{Result, SemanticError};

/// One named rule: a module and the glob patterns that claim paths for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRule {
    pub name: String,
    pub patterns: Vec<String>,
}

impl ModuleRule {
    pub fn new(name: impl Into<String>, patterns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            patterns,
        }
    }
}

/// Compiled, ordered rule list
#[derive(Debug)]
pub struct ModuleMatcher {
    rules: Vec<(ModuleRule, GlobSet)>,
}

impl ModuleMatcher {
    pub fn new(rules: Vec<ModuleRule>) -> Result<Self> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let mut builder = GlobSetBuilder::new();
            for pattern in &rule.patterns {
                let glob = GlobBuilder::new(pattern)
                    .literal_separator(true)
                    .build()
                    .map_err(|e| {
                        SemanticError::config(format!(
                            "bad glob '{}' in module '{}': {}",
                            pattern, rule.name, e
                        ))
                    })?;
                builder.add(glob);
            }
            let set = builder.build().map_err(|e| {
                SemanticError::config(format!("module '{}' globs: {}", rule.name, e))
            })?;
            compiled.push((rule, set));
        }
        Ok(Self { rules: compiled })
    }

    /// Empty matcher: every path maps to no module.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Every module name claiming the path, in rule order, deduplicated.
    pub fn match_path(&self, path: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for (rule, set) in &self.rules {
            if set.is_match(path) && !names.contains(&rule.name) {
                names.push(rule.name.clone());
            }
        }
        names
    }

    pub fn rules(&self) -> impl Iterator<Item = &ModuleRule> {
        self.rules.iter().map(|(rule, _)| rule)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
