//! Reference resolution
//!
//! Translates user-facing references to node ids with unambiguous matching.
//! Lookups try, in order:
//!
//! 1. full 64-hex id
//! 2. exact slug
//! 3. exact ref name
//! 4. `@` selector (`@snap:last~2`, `@cs:prev`, `@ws:<name>[:head|:base]`)
//! 5. 8+-hex prefix (exactly one match, else Ambiguous with ≤10 candidates)
//!
//! An `expected_kind` constraint is enforced at every terminal success.

use intentgraph_store::cas::is_hex;
use intentgraph_store::{NodeId, NodeKind, Store, WorkspacePayload};
use tracing::debug;

use crate::error::{ErrorKind, Result, SemanticError};

/// Maximum candidates listed in an Ambiguous error
const MAX_CANDIDATES: usize = 10;

/// Minimum hex length accepted for prefix lookups
const MIN_PREFIX_LEN: usize = 8;

pub struct RefResolver<'a> {
    store: &'a Store,
}

impl<'a> RefResolver<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Resolve an input to `(id, kind)`.
    pub fn resolve(
        &self,
        input: &str,
        expected_kind: Option<NodeKind>,
    ) -> Result<(NodeId, NodeKind)> {
        let input = input.trim();

        // 1. Full hex id
        if input.len() == 64 && is_hex(input) {
            let id = NodeId::from_hex(input)?;
            let node = self
                .store
                .graph()
                .get_node(&id)?
                .ok_or_else(|| SemanticError::not_found(format!("node '{}'", input)))?;
            return self.accept(input, node.id, node.kind, expected_kind);
        }

        // 2. Slug
        if let Some(id) = self.store.graph().slug_target(input)? {
            let node = self.store.graph().require_node(&id)?;
            return self.accept(input, node.id, node.kind, expected_kind);
        }

        // 3. Ref
        if let Some(entry) = self.store.graph().get_ref(input)? {
            return self.accept(input, entry.target, entry.kind, expected_kind);
        }

        // 4. Selector
        if let Some(selector) = input.strip_prefix('@') {
            return self.resolve_selector(input, selector, expected_kind);
        }

        // 5. Hex prefix
        if input.len() >= MIN_PREFIX_LEN && input.len() < 64 && is_hex(input) {
            return self.resolve_prefix(input, expected_kind);
        }

        Err(SemanticError::not_found(format!("reference '{}'", input)))
    }

    fn resolve_prefix(
        &self,
        input: &str,
        expected_kind: Option<NodeKind>,
    ) -> Result<(NodeId, NodeKind)> {
        // One extra row detects ambiguity past the candidate cap
        let hits = self
            .store
            .graph()
            .find_id_prefix(input, MAX_CANDIDATES + 1)?;
        match hits.len() {
            0 => Err(SemanticError::not_found(format!("id prefix '{}'", input))),
            1 => {
                let (id, kind) = hits[0];
                self.accept(input, id, kind, expected_kind)
            }
            _ => {
                let candidates: Vec<String> = hits
                    .iter()
                    .take(MAX_CANDIDATES)
                    .map(|(id, _)| id.to_hex())
                    .collect();
                let mut err = SemanticError::new(
                    ErrorKind::Ambiguous,
                    format!(
                        "ambiguous reference '{}' ({} candidates)",
                        input,
                        candidates.len()
                    ),
                );
                err.candidates = candidates;
                Err(err)
            }
        }
    }

    fn resolve_selector(
        &self,
        input: &str,
        selector: &str,
        expected_kind: Option<NodeKind>,
    ) -> Result<(NodeId, NodeKind)> {
        let (kind_token, rest) = selector
            .split_once(':')
            .ok_or_else(|| SemanticError::not_found(format!("selector '{}'", input)))?;

        match kind_token {
            "snap" | "snapshot" => self.resolve_log_selector(input, NodeKind::Snapshot, rest, expected_kind),
            "cs" | "changeset" => self.resolve_log_selector(input, NodeKind::ChangeSet, rest, expected_kind),
            "ws" | "workspace" => self.resolve_workspace_selector(input, rest, expected_kind),
            other => Err(SemanticError::not_found(format!(
                "selector kind '{}' in '{}'",
                other, input
            ))),
        }
    }

    /// `last[~N]` / `prev[~N]` against the per-kind commit log.
    fn resolve_log_selector(
        &self,
        input: &str,
        kind: NodeKind,
        rest: &str,
        expected_kind: Option<NodeKind>,
    ) -> Result<(NodeId, NodeKind)> {
        let (word, back) = match rest.split_once('~') {
            Some((word, n)) => {
                let n: usize = n.parse().map_err(|_| {
                    SemanticError::not_found(format!("selector offset in '{}'", input))
                })?;
                (word, n)
            }
            None => (rest, 0),
        };
        let offset = match word {
            "last" => back,
            "prev" => back + 1,
            other => {
                return Err(SemanticError::not_found(format!(
                    "selector '{}' in '{}'",
                    other, input
                )))
            }
        };

        debug!(kind = kind.as_str(), offset, "log selector");
        let id = self
            .store
            .graph()
            .log_nth_latest(kind, offset)?
            .ok_or_else(|| {
                SemanticError::not_found(format!("no {} entry for '{}'", kind, input))
            })?;
        self.accept(input, id, kind, expected_kind)
    }

    /// `@ws:<name>` returns the workspace itself; `:head` / `:base` return
    /// the snapshot id stored in the workspace payload.
    fn resolve_workspace_selector(
        &self,
        input: &str,
        rest: &str,
        expected_kind: Option<NodeKind>,
    ) -> Result<(NodeId, NodeKind)> {
        let (name, field) = match rest.rsplit_once(':') {
            Some((name, field @ ("head" | "base"))) => (name, Some(field)),
            _ => (rest, None),
        };

        let workspace = self
            .store
            .graph()
            .get_nodes_by_kind(NodeKind::Workspace)?
            .into_iter()
            .find(|node| node.payload["name"] == name)
            .ok_or_else(|| SemanticError::not_found(format!("workspace '{}'", name)))?;

        match field {
            None => self.accept(input, workspace.id, NodeKind::Workspace, expected_kind),
            Some(field) => {
                let payload: WorkspacePayload = serde_json::from_value(workspace.payload)?;
                let hex = match field {
                    "head" => payload.head_snapshot,
                    _ => payload.base_snapshot,
                };
                let id = NodeId::from_hex(&hex)?;
                self.accept(input, id, NodeKind::Snapshot, expected_kind)
            }
        }
    }

    fn accept(
        &self,
        input: &str,
        id: NodeId,
        kind: NodeKind,
        expected_kind: Option<NodeKind>,
    ) -> Result<(NodeId, NodeKind)> {
        match expected_kind {
            Some(expected) if expected != kind => Err(SemanticError::kind_mismatch(
                input,
                expected.as_str(),
                kind.as_str(),
            )),
            _ => Ok((id, kind)),
        }
    }
}
