//! Language tags inferred from file extensions

use std::path::Path;

/// Closed set of languages the analyzer understands. Code languages get a
/// full syntax tree; json/yaml/sql get flat structural readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Ts,
    Tsx,
    Js,
    Jsx,
    Json,
    Yaml,
    Sql,
}

impl Language {
    /// Infer a language from a path's extension; `None` means unsupported.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?;
        match ext.to_ascii_lowercase().as_str() {
            "ts" => Some(Language::Ts),
            "tsx" => Some(Language::Tsx),
            "js" | "mjs" | "cjs" => Some(Language::Js),
            "jsx" => Some(Language::Jsx),
            "json" => Some(Language::Json),
            "yaml" | "yml" => Some(Language::Yaml),
            "sql" => Some(Language::Sql),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Ts => "ts",
            Language::Tsx => "tsx",
            Language::Js => "js",
            Language::Jsx => "jsx",
            Language::Json => "json",
            Language::Yaml => "yaml",
            Language::Sql => "sql",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ts" => Some(Language::Ts),
            "tsx" => Some(Language::Tsx),
            "js" => Some(Language::Js),
            "jsx" => Some(Language::Jsx),
            "json" => Some(Language::Json),
            "yaml" => Some(Language::Yaml),
            "sql" => Some(Language::Sql),
            _ => None,
        }
    }

    /// True for languages parsed with a full syntax tree.
    pub fn is_code(&self) -> bool {
        matches!(self, Language::Ts | Language::Tsx | Language::Js | Language::Jsx)
    }
}
