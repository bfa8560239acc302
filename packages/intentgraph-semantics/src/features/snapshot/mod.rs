//! Snapshot building
//!
//! Turns a [`FileSource`] into a Snapshot node: blobs go to the object
//! store first, then one transaction inserts the File nodes, the Snapshot
//! node, the CONTAINS edges, the slug, the log entry, and moves the
//! `snap.latest` ref. Identical sources land on identical Snapshot ids.
//!
//! Symbol analysis is a separately callable pass: it parses each code file
//! and attaches Symbol nodes under `File --CONTAINS--> Symbol`.

use intentgraph_store::{
    EdgeKind, FilePayload, NodeId, NodeKind, SnapshotPayload, Span, Store, StoreError,
};
use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::error::{Result, SemanticError};
use crate::features::parsing;
use crate::features::source::FileSource;
use crate::shared::slug::assign_slug;

/// Conventional moving ref updated on every snapshot commit
pub const LATEST_SNAPSHOT_REF: &str = "snap.latest";

pub struct SnapshotBuilder<'a> {
    store: &'a Store,
    cancel: CancelToken,
}

impl<'a> SnapshotBuilder<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self {
            store,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(store: &'a Store, cancel: CancelToken) -> Self {
        Self { store, cancel }
    }

    /// Capture a snapshot of everything the source enumerates.
    ///
    /// Re-capturing identical bytes is idempotent: the manifest digest of
    /// the (path, digest) list is looked up first and an existing Snapshot
    /// node is returned with the same id.
    pub fn create_snapshot(&self, source: &dyn FileSource) -> Result<NodeId> {
        let files = source.get_files()?;

        let mut file_payloads = Vec::with_capacity(files.len());
        for file in &files {
            self.cancel.check("create_snapshot")?;
            let digest = self.store.write_object(&file.content)?;
            file_payloads.push(FilePayload {
                path: file.path.clone(),
                digest,
                size: file.content.len() as u64,
                lang: file.lang.as_str().to_string(),
            });
        }
        let manifest = manifest_digest(&file_payloads);
        let existing = self.find_by_manifest(&manifest)?;

        let snapshot_value = match &existing {
            Some(_) => None,
            None => {
                let snapshot = SnapshotPayload {
                    source_type: source.source_type().to_string(),
                    source_ref: source.identifier(),
                    file_count: files.len() as u64,
                    created_at: intentgraph_store::cas::now_ms(),
                    manifest: manifest.clone(),
                };
                Some(serde_json::to_value(&snapshot).map_err(StoreError::from)?)
            }
        };
        let mut file_values = Vec::with_capacity(file_payloads.len());
        for payload in &file_payloads {
            file_values.push(serde_json::to_value(payload).map_err(StoreError::from)?);
        }

        let cancel = self.cancel.clone();
        let snapshot_id = self.store.graph().transaction(|tx| {
            if cancel.is_cancelled() {
                return Err(StoreError::cancelled("create_snapshot"));
            }
            let snapshot_id = match (&existing, &snapshot_value) {
                (Some(id), _) => *id,
                (None, Some(value)) => {
                    let snapshot_id = tx.insert_node(NodeKind::Snapshot, value)?;
                    for value in &file_values {
                        let file_id = tx.insert_node(NodeKind::File, value)?;
                        tx.insert_edge(&snapshot_id, EdgeKind::Contains, &file_id, None)?;
                    }
                    snapshot_id
                }
                (None, None) => unreachable!("snapshot payload built when no existing node"),
            };
            assign_slug(tx, "snap", &snapshot_id)?;
            tx.append_log(NodeKind::Snapshot, &snapshot_id)?;
            tx.put_ref(LATEST_SNAPSHOT_REF, &snapshot_id, NodeKind::Snapshot)?;
            Ok(snapshot_id)
        })?;

        info!(snapshot = %snapshot_id, files = files.len(), "snapshot created");
        Ok(snapshot_id)
    }

    fn find_by_manifest(&self, manifest: &str) -> Result<Option<NodeId>> {
        Ok(self
            .store
            .graph()
            .get_nodes_by_kind(NodeKind::Snapshot)?
            .into_iter()
            .find(|node| node.payload["manifest"] == manifest)
            .map(|node| node.id))
    }

    /// Parse each code file of a snapshot and attach Symbol nodes. Returns
    /// the number of symbols written. Files that fail to parse are skipped
    /// with a warning; symbols whose range falls outside their file are
    /// dropped the same way.
    pub fn analyze_symbols(&self, snapshot_id: &NodeId) -> Result<usize> {
        let snapshot = self.store.graph().require_node(snapshot_id)?;
        if snapshot.kind != NodeKind::Snapshot {
            return Err(SemanticError::kind_mismatch(
                snapshot_id.to_hex(),
                NodeKind::Snapshot.as_str(),
                snapshot.kind.as_str(),
            ));
        }

        let mut batches: Vec<(NodeId, Vec<serde_json::Value>)> = Vec::new();
        for edge in self.store.graph().get_edges(snapshot_id, EdgeKind::Contains)? {
            self.cancel.check("analyze_symbols")?;
            let file = self.store.graph().require_node(&edge.dst)?;
            let payload: FilePayload = serde_json::from_value(file.payload.clone())?;
            let Some(lang) = crate::shared::Language::parse(&payload.lang) else {
                continue;
            };
            if !lang.is_code() {
                continue;
            }

            let bytes = self.store.read_object(&payload.digest)?;
            let parsed = match parsing::parse(lang, &bytes) {
                Ok(parsed) => parsed,
                Err(err) => {
                    warn!(path = %payload.path, error = %err, "symbol pass skipped file");
                    continue;
                }
            };

            let mut values = Vec::new();
            for symbol in &parsed.symbols {
                if !range_within(&parsed.source, &symbol.range) {
                    warn!(
                        path = %payload.path,
                        symbol = %symbol.fq_name,
                        "symbol range outside file extent, dropped"
                    );
                    continue;
                }
                values.push(serde_json::to_value(symbol)?);
            }
            batches.push((file.id, values));
        }

        let written = self.store.graph().transaction(|tx| {
            let mut written = 0usize;
            for (file_id, values) in &batches {
                for value in values {
                    let symbol_id = tx.insert_node(NodeKind::Symbol, value)?;
                    tx.insert_edge(file_id, EdgeKind::Contains, &symbol_id, None)?;
                    written += 1;
                }
            }
            Ok(written)
        })?;

        info!(snapshot = %snapshot_id, symbols = written, "symbol analysis complete");
        Ok(written)
    }
}

/// Content identity of a file set: BLAKE3 over the sorted (path, digest)
/// pairs. Identical sources produce identical manifests regardless of when
/// they were captured.
fn manifest_digest(files: &[FilePayload]) -> String {
    let mut hasher = blake3::Hasher::new();
    for file in files {
        hasher.update(file.path.as_bytes());
        hasher.update(b"\0");
        hasher.update(file.digest.as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize().to_hex().to_string()
}

/// A range lies within the file extent iff its end row/column exist in the
/// content (rows are 0-based; the column on the final row may equal the
/// line length).
fn range_within(content: &str, span: &Span) -> bool {
    if span.end < span.start {
        return false;
    }
    let lines: Vec<&str> = content.split('\n').collect();
    let end_row = span.end.row() as usize;
    if end_row >= lines.len() {
        return false;
    }
    span.end.col() as usize <= lines[end_row].len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::source::DirSource;
    use std::fs;

    fn fixture(files: &[(&str, &str)]) -> (tempfile::TempDir, tempfile::TempDir) {
        let src = tempfile::tempdir().unwrap();
        for (rel, content) in files {
            let path = src.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let state = tempfile::tempdir().unwrap();
        (src, state)
    }

    #[test]
    fn test_create_snapshot_wires_files_and_blobs() {
        let (src, state) = fixture(&[
            ("auth/login.js", "function login(u){return u;}"),
            ("config.json", "{\"timeout\":3600}"),
        ]);
        let store = Store::open(state.path()).unwrap();
        let builder = SnapshotBuilder::new(&store);
        let snap = builder.create_snapshot(&DirSource::new(src.path())).unwrap();

        let node = store.graph().require_node(&snap).unwrap();
        assert_eq!(node.kind, NodeKind::Snapshot);
        assert_eq!(node.payload["fileCount"], 2);
        assert_eq!(node.payload["sourceType"], "directory");

        let edges = store.graph().get_edges(&snap, EdgeKind::Contains).unwrap();
        assert_eq!(edges.len(), 2);
        for edge in &edges {
            let file = store.graph().require_node(&edge.dst).unwrap();
            let digest = file.payload["digest"].as_str().unwrap();
            assert!(store.objects().has(digest).unwrap());
        }
    }

    #[test]
    fn test_snapshot_registers_slug_log_and_ref() {
        let (src, state) = fixture(&[("a.js", "let a = 1;")]);
        let store = Store::open(state.path()).unwrap();
        let snap = SnapshotBuilder::new(&store)
            .create_snapshot(&DirSource::new(src.path()))
            .unwrap();

        let slug = store.graph().slug_of(&snap).unwrap().unwrap();
        assert!(slug.starts_with("snap_"));
        assert_eq!(
            store.graph().log_nth_latest(NodeKind::Snapshot, 0).unwrap(),
            Some(snap)
        );
        let entry = store.graph().get_ref(LATEST_SNAPSHOT_REF).unwrap().unwrap();
        assert_eq!(entry.target, snap);
    }

    #[test]
    fn test_analyze_symbols_attaches_symbol_nodes() {
        let (src, state) = fixture(&[(
            "user.js",
            "class User {\n  greet(name) { return name; }\n}\n",
        )]);
        let store = Store::open(state.path()).unwrap();
        let builder = SnapshotBuilder::new(&store);
        let snap = builder.create_snapshot(&DirSource::new(src.path())).unwrap();

        let written = builder.analyze_symbols(&snap).unwrap();
        assert_eq!(written, 2); // User + User.greet

        let file_edge = &store.graph().get_edges(&snap, EdgeKind::Contains).unwrap()[0];
        let symbols = store
            .graph()
            .get_edges(&file_edge.dst, EdgeKind::Contains)
            .unwrap();
        assert_eq!(symbols.len(), 2);
        let names: Vec<String> = symbols
            .iter()
            .map(|e| {
                store.graph().require_node(&e.dst).unwrap().payload["fqName"]
                    .as_str()
                    .unwrap()
                    .to_string()
            })
            .collect();
        assert!(names.contains(&"User.greet".to_string()));
    }

    #[test]
    fn test_cancelled_snapshot_leaves_no_node() {
        let (src, state) = fixture(&[("a.js", "let a = 1;")]);
        let store = Store::open(state.path()).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let builder = SnapshotBuilder::with_cancel(&store, cancel);
        let err = builder
            .create_snapshot(&DirSource::new(src.path()))
            .unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Cancelled);
        assert!(store
            .graph()
            .get_nodes_by_kind(NodeKind::Snapshot)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_range_within() {
        let content = "line one\nline two";
        assert!(range_within(content, &Span::new(0, 0, 1, 8)));
        assert!(!range_within(content, &Span::new(0, 0, 2, 0)));
        assert!(!range_within(content, &Span::new(0, 0, 1, 9)));
        assert!(!range_within(content, &Span::new(1, 0, 0, 0)));
    }
}
