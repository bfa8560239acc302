//! intentgraph-semantics — the analysis layer of the intent-aware version
//! control system
//!
//! Sits on top of [`intentgraph_store`] and provides:
//!
//! - **FileSource** ([`features::source`]): directory enumeration of
//!   `(path, bytes, lang)` triples; VCS adapters implement the same trait.
//! - **Parser** ([`features::parsing`]): tree-sitter trees plus Symbol
//!   extraction for ts/tsx/js/jsx.
//! - **ChangeDetector** ([`features::detect`]): the closed change category
//!   taxonomy over code, json, yaml, and sql inputs.
//! - **SnapshotBuilder / ChangeSetBuilder** ([`features::snapshot`],
//!   [`features::changeset`]): graph materialization in single
//!   transactions.
//! - **ModuleMatcher** ([`features::modules`]): glob rules mapping paths to
//!   named modules.
//! - **RefResolver** ([`features::resolve`]): hex ids, slugs, refs, and
//!   `@kind:last~N` selectors.
//! - **IntentGenerator** ([`features::intent`]): the one-line
//!   `verb module area` summary.
//! - **Workspaces** ([`features::workspace`]): mutable branch-like
//!   containers of changesets.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use intentgraph_semantics::prelude::*;
//! use intentgraph_store::Store;
//!
//! let store = Store::open(".intentgraph")?;
//! let builder = SnapshotBuilder::new(&store);
//! let base = builder.create_snapshot(&DirSource::new("."))?;
//! // …edit files…
//! let head = builder.create_snapshot(&DirSource::new("."))?;
//! builder.analyze_symbols(&head)?;
//!
//! let matcher = ModuleMatcher::new(load_module_rules("rules/modules.yaml")?)?;
//! let cs = ChangeSetBuilder::new(&store, &matcher).create_changeset(&base, &head)?;
//! let (_, text) = IntentGenerator::new(&store).generate_intent(&cs)?;
//! ```

pub mod cancel;
pub mod config;
pub mod error;
pub mod features;
pub mod shared;

pub use cancel::CancelToken;
pub use error::{ErrorKind, Result, SemanticError};
pub use shared::Language;

/// Flat imports for the common workflow
pub mod prelude {
    pub use crate::cancel::CancelToken;
    pub use crate::config::{load_detector_rules, load_module_rules, DetectorRules};
    pub use crate::error::{ErrorKind, Result, SemanticError};
    pub use crate::features::changeset::ChangeSetBuilder;
    pub use crate::features::detect::{detect_changes, Category, Finding};
    pub use crate::features::intent::IntentGenerator;
    pub use crate::features::modules::{ModuleMatcher, ModuleRule};
    pub use crate::features::resolve::RefResolver;
    pub use crate::features::snapshot::SnapshotBuilder;
    pub use crate::features::source::{DirSource, FileSource, SourceFile};
    pub use crate::features::workspace::WorkspaceService;
    pub use crate::shared::Language;
}
