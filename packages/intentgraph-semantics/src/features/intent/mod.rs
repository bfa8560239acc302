//! Intent generation
//!
//! Distills a ChangeSet into a one-line imperative sentence
//! `verb ⌴ module ⌴ area`:
//!
//! - verb: Update (api surface) > Modify (conditions) > Update (constants)
//!   > Change
//! - module: first affected module, or `General`
//! - area: first modified symbol's last fqName segment, else the last
//!   common directory segment of the changed paths, else a lone file's
//!   basename, else `codebase`
//!
//! The text lives in its own Intent node; updating retargets the single
//! HAS_INTENT edge so the ChangeSet payload stays byte-identical.

use intentgraph_store::{
    ChangeTypePayload, EdgeKind, FilePayload, IntentPayload, NodeId, NodeKind, Store, StoreError,
    SymbolPayload,
};
use tracing::info;

use crate::error::{Result, SemanticError};
use crate::features::detect::Category;

pub struct IntentGenerator<'a> {
    store: &'a Store,
}

impl<'a> IntentGenerator<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Compose the sentence for a ChangeSet without storing anything.
    pub fn compose(&self, changeset_id: &NodeId) -> Result<String> {
        let (nodes, _edges) = self.store.graph().changeset_closure(changeset_id)?;

        let mut categories: Vec<Category> = Vec::new();
        let mut module: Option<String> = None;
        let mut first_symbol: Option<String> = None;
        let mut paths: Vec<String> = Vec::new();

        // Closure nodes arrive in edge insertion order after the root
        for node in nodes.iter().skip(1) {
            match node.kind {
                NodeKind::ChangeType => {
                    let payload: ChangeTypePayload =
                        serde_json::from_value(node.payload.clone())?;
                    if let Some(category) = Category::parse(&payload.category) {
                        categories.push(category);
                    }
                }
                NodeKind::Module => {
                    if module.is_none() {
                        if let Some(name) = node.payload["name"].as_str() {
                            module = Some(name.to_string());
                        }
                    }
                }
                NodeKind::Symbol => {
                    if first_symbol.is_none() {
                        let payload: SymbolPayload =
                            serde_json::from_value(node.payload.clone())?;
                        first_symbol = Some(payload.fq_name);
                    }
                }
                NodeKind::File => {
                    let payload: FilePayload = serde_json::from_value(node.payload.clone())?;
                    paths.push(payload.path);
                }
                _ => {}
            }
        }

        let verb = pick_verb(&categories);
        let module = module.unwrap_or_else(|| "General".to_string());
        let area = pick_area(first_symbol.as_deref(), &paths);
        Ok(format!("{} {} {}", verb, module, area))
    }

    /// Compose, store as a new Intent node, and (re)target the HAS_INTENT
    /// edge. Returns the intent node id and its text.
    pub fn generate_intent(&self, changeset_id: &NodeId) -> Result<(NodeId, String)> {
        let text = self.compose(changeset_id)?;
        let id = self.store_intent(changeset_id, &text)?;
        Ok((id, text))
    }

    /// Store caller-provided text verbatim, replacing any generated intent.
    pub fn render_intent(&self, changeset_id: &NodeId, edit_text: &str) -> Result<NodeId> {
        let node = self.store.graph().require_node(changeset_id)?;
        if node.kind != NodeKind::ChangeSet {
            return Err(SemanticError::kind_mismatch(
                changeset_id.to_hex(),
                NodeKind::ChangeSet.as_str(),
                node.kind.as_str(),
            ));
        }
        self.store_intent(changeset_id, edit_text)
    }

    fn store_intent(&self, changeset_id: &NodeId, text: &str) -> Result<NodeId> {
        let payload = IntentPayload {
            text: text.to_string(),
            change_set_id: changeset_id.to_hex(),
            created_at: intentgraph_store::cas::now_ms(),
        };
        let value = serde_json::to_value(&payload)?;

        let intent_id = self.store.graph().transaction(|tx| {
            let intent_id = tx.insert_node(NodeKind::Intent, &value)?;
            // At most one HAS_INTENT edge leaves a ChangeSet
            for edge in tx.get_edges(changeset_id, EdgeKind::HasIntent)? {
                tx.delete_edge(&edge.src, edge.kind, &edge.dst, edge.at.as_ref())?;
            }
            tx.insert_edge(changeset_id, EdgeKind::HasIntent, &intent_id, None)?;
            Ok::<NodeId, StoreError>(intent_id)
        })?;

        info!(changeset = %changeset_id, intent = %intent_id, "intent stored");
        Ok(intent_id)
    }
}

fn pick_verb(categories: &[Category]) -> &'static str {
    if categories.contains(&Category::ApiSurfaceChanged) {
        "Update"
    } else if categories.contains(&Category::ConditionChanged) {
        "Modify"
    } else if categories.contains(&Category::ConstantUpdated) {
        "Update"
    } else {
        "Change"
    }
}

fn pick_area(first_symbol: Option<&str>, paths: &[String]) -> String {
    if let Some(fq_name) = first_symbol {
        if let Some(last) = fq_name.rsplit('.').next() {
            if !last.is_empty() {
                return last.to_string();
            }
        }
    }

    if let Some(segment) = last_common_dir_segment(paths) {
        return segment;
    }

    if paths.len() == 1 {
        if let Some(stem) = basename_without_ext(&paths[0]) {
            return stem;
        }
    }

    "codebase".to_string()
}

/// Last segment of the common directory prefix of all paths, skipping empty
/// segments and `.`.
fn last_common_dir_segment(paths: &[String]) -> Option<String> {
    if paths.is_empty() {
        return None;
    }
    let dirs: Vec<Vec<&str>> = paths
        .iter()
        .map(|p| {
            let mut segments: Vec<&str> = p.split('/').collect();
            segments.pop(); // drop the file name
            segments
                .into_iter()
                .filter(|s| !s.is_empty() && *s != ".")
                .collect()
        })
        .collect();

    let mut common: Vec<&str> = dirs[0].clone();
    for dir in &dirs[1..] {
        let shared = common
            .iter()
            .zip(dir.iter())
            .take_while(|(a, b)| a == b)
            .count();
        common.truncate(shared);
    }
    common.last().map(|s| s.to_string())
}

fn basename_without_ext(path: &str) -> Option<String> {
    let name = path.rsplit('/').next()?;
    let stem = match name.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem,
        _ => name,
    };
    (!stem.is_empty()).then(|| stem.to_string())
}
