//! Change classification
//!
//! Classifies the differences between two versions of one file into a
//! closed category taxonomy. Dispatch is a tagged switch on the language
//! inferred from the path: code files get the four tree-based detectors,
//! json/yaml get recursive value walks, sql gets a CREATE TABLE comparison,
//! and anything unparseable degrades to `FILE_CONTENT_CHANGED`.
//!
//! Detection is deterministic for identical inputs: pairing loops iterate
//! in (before document order, after document order).

pub mod code;
pub mod data;
pub mod sql;

use intentgraph_store::{Evidence, NodeId, Span};
use tracing::warn;

use crate::error::SemanticError;
use crate::shared::Language;

/// Closed change category taxonomy (the payload `category` strings)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    FunctionAdded,
    FunctionRemoved,
    ConditionChanged,
    ConstantUpdated,
    ApiSurfaceChanged,
    FileContentChanged,
    FileAdded,
    FileDeleted,
    JsonFieldAdded,
    JsonFieldRemoved,
    JsonValueChanged,
    JsonArrayChanged,
    YamlKeyAdded,
    YamlKeyRemoved,
    YamlValueChanged,
    SqlTableAdded,
    SqlTableRemoved,
    SqlColumnAdded,
    SqlColumnRemoved,
    SqlColumnModified,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::FunctionAdded => "FUNCTION_ADDED",
            Category::FunctionRemoved => "FUNCTION_REMOVED",
            Category::ConditionChanged => "CONDITION_CHANGED",
            Category::ConstantUpdated => "CONSTANT_UPDATED",
            Category::ApiSurfaceChanged => "API_SURFACE_CHANGED",
            Category::FileContentChanged => "FILE_CONTENT_CHANGED",
            Category::FileAdded => "FILE_ADDED",
            Category::FileDeleted => "FILE_DELETED",
            Category::JsonFieldAdded => "JSON_FIELD_ADDED",
            Category::JsonFieldRemoved => "JSON_FIELD_REMOVED",
            Category::JsonValueChanged => "JSON_VALUE_CHANGED",
            Category::JsonArrayChanged => "JSON_ARRAY_CHANGED",
            Category::YamlKeyAdded => "YAML_KEY_ADDED",
            Category::YamlKeyRemoved => "YAML_KEY_REMOVED",
            Category::YamlValueChanged => "YAML_VALUE_CHANGED",
            Category::SqlTableAdded => "SQL_TABLE_ADDED",
            Category::SqlTableRemoved => "SQL_TABLE_REMOVED",
            Category::SqlColumnAdded => "SQL_COLUMN_ADDED",
            Category::SqlColumnRemoved => "SQL_COLUMN_REMOVED",
            Category::SqlColumnModified => "SQL_COLUMN_MODIFIED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "FUNCTION_ADDED" => Some(Category::FunctionAdded),
            "FUNCTION_REMOVED" => Some(Category::FunctionRemoved),
            "CONDITION_CHANGED" => Some(Category::ConditionChanged),
            "CONSTANT_UPDATED" => Some(Category::ConstantUpdated),
            "API_SURFACE_CHANGED" => Some(Category::ApiSurfaceChanged),
            "FILE_CONTENT_CHANGED" => Some(Category::FileContentChanged),
            "FILE_ADDED" => Some(Category::FileAdded),
            "FILE_DELETED" => Some(Category::FileDeleted),
            "JSON_FIELD_ADDED" => Some(Category::JsonFieldAdded),
            "JSON_FIELD_REMOVED" => Some(Category::JsonFieldRemoved),
            "JSON_VALUE_CHANGED" => Some(Category::JsonValueChanged),
            "JSON_ARRAY_CHANGED" => Some(Category::JsonArrayChanged),
            "YAML_KEY_ADDED" => Some(Category::YamlKeyAdded),
            "YAML_KEY_REMOVED" => Some(Category::YamlKeyRemoved),
            "YAML_VALUE_CHANGED" => Some(Category::YamlValueChanged),
            "SQL_TABLE_ADDED" => Some(Category::SqlTableAdded),
            "SQL_TABLE_REMOVED" => Some(Category::SqlTableRemoved),
            "SQL_COLUMN_ADDED" => Some(Category::SqlColumnAdded),
            "SQL_COLUMN_REMOVED" => Some(Category::SqlColumnRemoved),
            "SQL_COLUMN_MODIFIED" => Some(Category::SqlColumnModified),
            _ => None,
        }
    }
}

/// One classified difference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub category: Category,
    pub evidence: Evidence,
}

impl Finding {
    pub fn new(category: Category, evidence: Evidence) -> Self {
        Self { category, evidence }
    }

    /// Finding with a bare marker entry (`path:…`, `table:…`, `name:…`)
    /// and no ranges.
    pub fn marker(category: Category, marker: String) -> Self {
        Self {
            category,
            evidence: Evidence {
                file_ranges: Vec::new(),
                symbols: vec![marker],
            },
        }
    }
}

/// Pre-seeded symbol list for a file: (symbol node id, range)
pub type FileSymbols = [(NodeId, Span)];

/// Classify the differences between two versions of one file.
///
/// `symbols` is the after-side symbol list for the file, used to attach
/// overlapping Symbol ids to evidence. Per-file parse failures degrade to a
/// single `FILE_CONTENT_CHANGED` finding rather than erroring.
pub fn detect_changes(
    path: &str,
    before: &[u8],
    after: &[u8],
    symbols: &FileSymbols,
) -> Vec<Finding> {
    let outcome: Result<Vec<Finding>, SemanticError> = match Language::from_path(path) {
        Some(lang) if lang.is_code() => code::detect(lang, before, after, symbols),
        Some(Language::Json) => data::detect_json(before, after),
        Some(Language::Yaml) => data::detect_yaml(before, after),
        Some(Language::Sql) => Ok(sql::detect(before, after)),
        _ => Ok(vec![content_changed()]),
    };
    match outcome {
        Ok(findings) => findings,
        Err(err) => {
            warn!(path, error = %err, "detection degraded to FILE_CONTENT_CHANGED");
            vec![content_changed()]
        }
    }
}

fn content_changed() -> Finding {
    Finding::new(Category::FileContentChanged, Evidence::default())
}

/// Hex ids of pre-seeded symbols overlapping an evidence range.
pub(crate) fn overlapping_symbols(range: &Span, symbols: &FileSymbols) -> Vec<String> {
    symbols
        .iter()
        .filter(|(_, span)| span.overlaps(range))
        .map(|(id, _)| id.to_hex())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_strings_are_exact() {
        assert_eq!(Category::FunctionAdded.as_str(), "FUNCTION_ADDED");
        assert_eq!(Category::ApiSurfaceChanged.as_str(), "API_SURFACE_CHANGED");
        assert_eq!(Category::JsonValueChanged.as_str(), "JSON_VALUE_CHANGED");
        assert_eq!(Category::YamlKeyRemoved.as_str(), "YAML_KEY_REMOVED");
        assert_eq!(Category::FileContentChanged.as_str(), "FILE_CONTENT_CHANGED");
    }

    #[test]
    fn test_category_roundtrip() {
        for cat in [
            Category::FunctionAdded,
            Category::FunctionRemoved,
            Category::ConditionChanged,
            Category::ConstantUpdated,
            Category::ApiSurfaceChanged,
            Category::FileContentChanged,
            Category::FileAdded,
            Category::FileDeleted,
            Category::JsonFieldAdded,
            Category::JsonFieldRemoved,
            Category::JsonValueChanged,
            Category::JsonArrayChanged,
            Category::YamlKeyAdded,
            Category::YamlKeyRemoved,
            Category::YamlValueChanged,
            Category::SqlTableAdded,
            Category::SqlTableRemoved,
            Category::SqlColumnAdded,
            Category::SqlColumnRemoved,
            Category::SqlColumnModified,
        ] {
            assert_eq!(Category::parse(cat.as_str()), Some(cat));
        }
        assert_eq!(Category::parse("NOT_A_CATEGORY"), None);
    }

    #[test]
    fn test_unsupported_extension_degrades() {
        let findings = detect_changes("image.bin", b"a", b"b", &[]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, Category::FileContentChanged);
    }

    #[test]
    fn test_broken_json_degrades() {
        let findings = detect_changes("config.json", b"{not json", b"{}", &[]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, Category::FileContentChanged);
    }

    #[test]
    fn test_detection_is_deterministic() {
        let before = b"function a(x){return x<1;}\nfunction b(){}\n";
        let after = b"function a(x){return x<=2;}\nfunction c(){}\n";
        let first = detect_changes("m.js", before, after, &[]);
        let second = detect_changes("m.js", before, after, &[]);
        assert_eq!(first, second);
    }
}
