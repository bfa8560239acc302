//! ChangeSet building
//!
//! Between two snapshots: identify changed files by digest, classify each
//! change, and materialize the ChangeSet with its MODIFIES / HAS / AFFECTS
//! edges in one transaction. A file that fails detection contributes no
//! ChangeType but keeps its MODIFIES edge. Deleted files contribute a
//! FILE_DELETED classification and no synthetic File node.

use std::collections::BTreeMap;

use intentgraph_store::{
    ChangeSetPayload, ChangeTypePayload, EdgeKind, FilePayload, ModulePayload, NodeId, NodeKind,
    Span, Store, StoreError, SymbolPayload,
};
use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::config::DetectorRules;
use crate::error::{Result, SemanticError};
use crate::features::detect::{self, Category, Finding};
use crate::features::modules::ModuleMatcher;
use crate::shared::slug::assign_slug;

/// Conventional moving ref updated on every changeset commit
pub const LATEST_CHANGESET_REF: &str = "cs.latest";

pub struct ChangeSetBuilder<'a> {
    store: &'a Store,
    matcher: &'a ModuleMatcher,
    rules: DetectorRules,
    cancel: CancelToken,
}

enum ChangeKind {
    Added,
    Modified,
}

struct ChangedFile {
    path: String,
    file_id: NodeId,
    findings: Vec<Finding>,
}

impl<'a> ChangeSetBuilder<'a> {
    pub fn new(store: &'a Store, matcher: &'a ModuleMatcher) -> Self {
        Self {
            store,
            matcher,
            rules: DetectorRules::default(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_rules(mut self, rules: DetectorRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Build the ChangeSet between two committed snapshots.
    pub fn create_changeset(&self, base: &NodeId, head: &NodeId) -> Result<NodeId> {
        let base_files = self.load_snapshot_files(base)?;
        let head_files = self.load_snapshot_files(head)?;

        let mut changed: Vec<ChangedFile> = Vec::new();
        for (path, (file_id, payload)) in &head_files {
            self.cancel.check("create_changeset")?;
            let kind = match base_files.get(path) {
                None => ChangeKind::Added,
                Some((_, base_payload)) if base_payload.digest != payload.digest => {
                    ChangeKind::Modified
                }
                Some(_) => continue,
            };

            let findings = match &kind {
                ChangeKind::Added => {
                    vec![Finding::marker(
                        Category::FileAdded,
                        format!("path:{}", path),
                    )]
                }
                ChangeKind::Modified => {
                    let (_, base_payload) = &base_files[path];
                    let before = self.store.read_object(&base_payload.digest)?;
                    let after = self.store.read_object(&payload.digest)?;
                    let symbols = self.load_file_symbols(file_id)?;
                    detect::detect_changes(path, &before, &after, &symbols)
                }
            };
            let findings = findings
                .into_iter()
                .filter(|f| self.rules.allows(f.category))
                .collect();

            changed.push(ChangedFile {
                path: path.clone(),
                file_id: *file_id,
                findings,
            });
        }

        let mut deleted: Vec<(String, Vec<Finding>)> = Vec::new();
        for path in base_files.keys() {
            if !head_files.contains_key(path) {
                let finding = Finding::marker(Category::FileDeleted, format!("path:{}", path));
                let findings = if self.rules.allows(finding.category) {
                    vec![finding]
                } else {
                    Vec::new()
                };
                deleted.push((path.clone(), findings));
            }
        }

        let payload = ChangeSetPayload {
            base: base.to_hex(),
            head: head.to_hex(),
            created_at: intentgraph_store::cas::now_ms(),
            workspace_id: None,
        };
        let payload_value = serde_json::to_value(&payload)?;

        let matcher = self.matcher;
        let cancel = self.cancel.clone();
        let changeset_id = self.store.graph().transaction(|tx| {
            if cancel.is_cancelled() {
                return Err(StoreError::cancelled("create_changeset"));
            }
            let changeset_id = tx.insert_node(NodeKind::ChangeSet, &payload_value)?;

            for file in &changed {
                tx.insert_edge(&changeset_id, EdgeKind::Modifies, &file.file_id, None)?;
            }

            let all_findings = changed
                .iter()
                .flat_map(|f| f.findings.iter())
                .chain(deleted.iter().flat_map(|(_, f)| f.iter()));
            for finding in all_findings {
                let ct = ChangeTypePayload {
                    category: finding.category.as_str().to_string(),
                    evidence: finding.evidence.clone(),
                };
                let ct_value = serde_json::to_value(&ct).map_err(StoreError::from)?;
                let ct_id = tx.insert_node(NodeKind::ChangeType, &ct_value)?;
                tx.insert_edge(&changeset_id, EdgeKind::Has, &ct_id, None)?;

                // Evidence symbol ids become MODIFIES edges; marker entries
                // (name:/path:/table:/column:) are not ids and are skipped.
                for entry in &finding.evidence.symbols {
                    if let Ok(symbol_id) = NodeId::from_hex(entry) {
                        tx.insert_edge(&changeset_id, EdgeKind::Modifies, &symbol_id, None)?;
                    }
                }
            }

            let mut affected: Vec<String> = Vec::new();
            let changed_paths = changed
                .iter()
                .map(|f| f.path.as_str())
                .chain(deleted.iter().map(|(p, _)| p.as_str()));
            for path in changed_paths {
                for name in matcher.match_path(path) {
                    if affected.contains(&name) {
                        continue;
                    }
                    let Some(rule) = matcher.rules().find(|r| r.name == name) else {
                        continue;
                    };
                    let module = ModulePayload {
                        name: name.clone(),
                        patterns: rule.patterns.clone(),
                    };
                    let module_value = serde_json::to_value(&module).map_err(StoreError::from)?;
                    let module_id = tx.insert_node(NodeKind::Module, &module_value)?;
                    tx.insert_edge(&changeset_id, EdgeKind::Affects, &module_id, None)?;
                    affected.push(name);
                }
            }

            assign_slug(tx, "cs", &changeset_id)?;
            tx.append_log(NodeKind::ChangeSet, &changeset_id)?;
            tx.put_ref(LATEST_CHANGESET_REF, &changeset_id, NodeKind::ChangeSet)?;
            Ok(changeset_id)
        })?;

        info!(
            changeset = %changeset_id,
            changed = changed.len(),
            deleted = deleted.len(),
            "changeset created"
        );
        Ok(changeset_id)
    }

    fn load_snapshot_files(
        &self,
        snapshot_id: &NodeId,
    ) -> Result<BTreeMap<String, (NodeId, FilePayload)>> {
        let node = self.store.graph().require_node(snapshot_id)?;
        if node.kind != NodeKind::Snapshot {
            return Err(SemanticError::kind_mismatch(
                snapshot_id.to_hex(),
                NodeKind::Snapshot.as_str(),
                node.kind.as_str(),
            ));
        }
        let mut files = BTreeMap::new();
        for edge in self
            .store
            .graph()
            .get_edges(snapshot_id, EdgeKind::Contains)?
        {
            let file = self.store.graph().require_node(&edge.dst)?;
            let payload: FilePayload = serde_json::from_value(file.payload.clone())?;
            files.insert(payload.path.clone(), (file.id, payload));
        }
        Ok(files)
    }

    /// Pre-seeded symbol list for one head-side file: (symbol id, range).
    fn load_file_symbols(&self, file_id: &NodeId) -> Result<Vec<(NodeId, Span)>> {
        let mut symbols = Vec::new();
        for edge in self.store.graph().get_edges(file_id, EdgeKind::Contains)? {
            let node = self.store.graph().require_node(&edge.dst)?;
            if node.kind != NodeKind::Symbol {
                continue;
            }
            let payload: SymbolPayload = serde_json::from_value(node.payload.clone())?;
            symbols.push((node.id, payload.range));
        }
        debug!(file = %file_id, count = symbols.len(), "symbols preloaded");
        Ok(symbols)
    }
}
