//! Structured-data change detectors (json, yaml)
//!
//! Both sides parse into generic value trees and a recursive walk produces
//! dotted key paths. The path of each difference lands in evidence as a
//! `path:<dotted>` marker entry; flat readers have no positions, so the
//! range list stays empty.

use std::collections::BTreeSet;

use intentgraph_store::Evidence;

use crate::error::{Result, SemanticError};

use super::{Category, Finding};

pub fn detect_json(before: &[u8], after: &[u8]) -> Result<Vec<Finding>> {
    let before: serde_json::Value = serde_json::from_slice(before)
        .map_err(|e| SemanticError::parse(format!("invalid json: {}", e)))?;
    let after: serde_json::Value = serde_json::from_slice(after)
        .map_err(|e| SemanticError::parse(format!("invalid json: {}", e)))?;

    let mut findings = Vec::new();
    walk_json("", &before, &after, &mut findings);
    Ok(findings)
}

fn walk_json(path: &str, before: &serde_json::Value, after: &serde_json::Value, out: &mut Vec<Finding>) {
    use serde_json::Value;
    match (before, after) {
        (Value::Object(b), Value::Object(a)) => {
            let keys: BTreeSet<&String> = b.keys().chain(a.keys()).collect();
            for key in keys {
                let child = join(path, key);
                match (b.get(key.as_str()), a.get(key.as_str())) {
                    (None, Some(_)) => out.push(path_finding(Category::JsonFieldAdded, &child)),
                    (Some(_), None) => out.push(path_finding(Category::JsonFieldRemoved, &child)),
                    (Some(bv), Some(av)) => walk_json(&child, bv, av, out),
                    (None, None) => {}
                }
            }
        }
        (Value::Array(b), Value::Array(a)) => {
            if b != a {
                out.push(path_finding(Category::JsonArrayChanged, path));
            }
        }
        (b, a) => {
            // Scalars differing, or a type change at the same path
            if b != a {
                out.push(path_finding(Category::JsonValueChanged, path));
            }
        }
    }
}

pub fn detect_yaml(before: &[u8], after: &[u8]) -> Result<Vec<Finding>> {
    let before: serde_yaml::Value = serde_yaml::from_slice(before)
        .map_err(|e| SemanticError::parse(format!("invalid yaml: {}", e)))?;
    let after: serde_yaml::Value = serde_yaml::from_slice(after)
        .map_err(|e| SemanticError::parse(format!("invalid yaml: {}", e)))?;

    let mut findings = Vec::new();
    walk_yaml("", &before, &after, &mut findings);
    Ok(findings)
}

fn walk_yaml(path: &str, before: &serde_yaml::Value, after: &serde_yaml::Value, out: &mut Vec<Finding>) {
    use serde_yaml::Value;
    match (before, after) {
        (Value::Mapping(b), Value::Mapping(a)) => {
            let keys: BTreeSet<String> = b
                .keys()
                .chain(a.keys())
                .map(yaml_key_string)
                .collect();
            for key in keys {
                let b_val = b.iter().find(|(k, _)| yaml_key_string(k) == key).map(|(_, v)| v);
                let a_val = a.iter().find(|(k, _)| yaml_key_string(k) == key).map(|(_, v)| v);
                let child = join(path, &key);
                match (b_val, a_val) {
                    (None, Some(_)) => out.push(path_finding(Category::YamlKeyAdded, &child)),
                    (Some(_), None) => out.push(path_finding(Category::YamlKeyRemoved, &child)),
                    (Some(bv), Some(av)) => walk_yaml(&child, bv, av, out),
                    (None, None) => {}
                }
            }
        }
        (b, a) => {
            // Sequences and scalars alike fold into value changes
            if b != a {
                out.push(path_finding(Category::YamlValueChanged, path));
            }
        }
    }
}

fn yaml_key_string(key: &serde_yaml::Value) -> String {
    use serde_yaml::Value;
    match key {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => serde_yaml::to_string(other)
            .unwrap_or_default()
            .trim()
            .to_string(),
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

fn path_finding(category: Category, path: &str) -> Finding {
    let label = if path.is_empty() { "." } else { path };
    Finding::new(
        category,
        Evidence {
            file_ranges: Vec::new(),
            symbols: vec![format!("path:{}", label)],
        },
    )
}
