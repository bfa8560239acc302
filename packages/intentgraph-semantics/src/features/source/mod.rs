//! File sources: where snapshot content comes from
//!
//! A source is a capability set, not a hierarchy: anything that can
//! enumerate `(path, bytes, lang)` triples can feed the snapshot builder.
//! The directory source ships here; VCS adapters implement the same trait
//! from the outside.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::Result;
use crate::shared::Language;

/// One enumerated file: repo-relative path (forward slashes), raw bytes,
/// and the inferred language tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: String,
    pub content: Vec<u8>,
    pub lang: Language,
}

/// Capability set for snapshot inputs
pub trait FileSource {
    /// Every supported file, sorted by path for deterministic snapshots.
    fn get_files(&self) -> Result<Vec<SourceFile>>;

    /// A single file by repo-relative path.
    fn get_file(&self, path: &str) -> Result<Option<SourceFile>>;

    /// Stable description of where the content came from (`sourceRef`).
    fn identifier(&self) -> String;

    /// Source flavor (`sourceType`), e.g. `"directory"`.
    fn source_type(&self) -> &'static str;
}

/// Working-directory source rooted at a directory on disk
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn is_skipped_dir(name: &str) -> bool {
        name.starts_with('.') || name == "node_modules" || name == "target"
    }

    fn relative_path(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let mut out = String::new();
        for component in rel.components() {
            if !out.is_empty() {
                out.push('/');
            }
            out.push_str(component.as_os_str().to_str()?);
        }
        Some(out)
    }
}

impl FileSource for DirSource {
    fn get_files(&self) -> Result<Vec<SourceFile>> {
        let mut files = Vec::new();
        let walker = WalkDir::new(&self.root).into_iter().filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            e.file_name()
                .to_str()
                .map(|name| !Self::is_skipped_dir(name))
                .unwrap_or(false)
        });

        for entry in walker {
            let entry = entry.map_err(|e| {
                crate::error::SemanticError::source_failure(format!(
                    "walking {}: {}",
                    self.root.display(),
                    e
                ))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(lang) = Language::from_path(entry.path()) else {
                continue;
            };
            let Some(path) = self.relative_path(entry.path()) else {
                continue;
            };
            files.push(SourceFile {
                path,
                content: fs::read(entry.path())?,
                lang,
            });
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    fn get_file(&self, path: &str) -> Result<Option<SourceFile>> {
        let Some(lang) = Language::from_path(path) else {
            return Ok(None);
        };
        let full = self.root.join(path);
        if !full.is_file() {
            return Ok(None);
        }
        Ok(Some(SourceFile {
            path: path.to_string(),
            content: fs::read(full)?,
            lang,
        }))
    }

    fn identifier(&self) -> String {
        self.root
            .canonicalize()
            .unwrap_or_else(|_| self.root.clone())
            .display()
            .to_string()
    }

    fn source_type(&self) -> &'static str {
        "directory"
    }
}
