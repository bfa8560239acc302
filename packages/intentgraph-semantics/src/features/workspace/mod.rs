//! Workspace lifecycle
//!
//! A workspace is the one mutable node kind: a branch-like container of
//! changesets on top of a base snapshot. Its identity is a fresh random id
//! (payload mutation would invalidate a content-derived one); evolving
//! relations are kept as INCLUDES edges plus payload fields rewritten in
//! place.

use intentgraph_store::{
    ChangeSetPayload, EdgeKind, NodeId, NodeKind, Store, StoreError, WorkspacePayload,
};
use tracing::info;

use crate::error::{Result, SemanticError};

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_CLOSED: &str = "closed";

pub struct WorkspaceService<'a> {
    store: &'a Store,
}

impl<'a> WorkspaceService<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Create an active workspace on top of a base snapshot. Head starts at
    /// base; `ws.<name>.base` / `ws.<name>.head` refs are registered.
    pub fn create(&self, name: &str, base_snapshot: &NodeId) -> Result<NodeId> {
        if name.is_empty() || name.contains(':') {
            return Err(SemanticError::invariant(format!(
                "workspace name '{}' must be non-empty and colon-free",
                name
            )));
        }
        let base = self.store.graph().require_node(base_snapshot)?;
        if base.kind != NodeKind::Snapshot {
            return Err(SemanticError::kind_mismatch(
                base_snapshot.to_hex(),
                NodeKind::Snapshot.as_str(),
                base.kind.as_str(),
            ));
        }
        if self.find_by_name(name)?.is_some() {
            return Err(SemanticError::new(
                crate::error::ErrorKind::Conflict,
                format!("workspace '{}' already exists", name),
            ));
        }

        let id = NodeId::random();
        let payload = WorkspacePayload {
            name: name.to_string(),
            status: STATUS_ACTIVE.to_string(),
            base_snapshot: base_snapshot.to_hex(),
            head_snapshot: base_snapshot.to_hex(),
            change_sets: Vec::new(),
        };
        let value = serde_json::to_value(&payload)?;

        self.store.graph().transaction(|tx| {
            tx.insert_node_with_id(&id, NodeKind::Workspace, &value)?;
            tx.append_log(NodeKind::Workspace, &id)?;
            tx.put_ref(&format!("ws.{}.base", name), base_snapshot, NodeKind::Snapshot)?;
            tx.put_ref(&format!("ws.{}.head", name), base_snapshot, NodeKind::Snapshot)?;
            Ok(())
        })?;

        info!(workspace = %id, name, "workspace created");
        Ok(id)
    }

    /// Attach a changeset: INCLUDES edge, `changeSets` append, head moves
    /// to the changeset's head snapshot.
    pub fn attach_changeset(&self, workspace_id: &NodeId, changeset_id: &NodeId) -> Result<()> {
        let mut payload = self.load(workspace_id)?;
        if payload.status != STATUS_ACTIVE {
            return Err(SemanticError::new(
                crate::error::ErrorKind::Conflict,
                format!("workspace '{}' is {}", payload.name, payload.status),
            ));
        }

        let changeset = self.store.graph().require_node(changeset_id)?;
        if changeset.kind != NodeKind::ChangeSet {
            return Err(SemanticError::kind_mismatch(
                changeset_id.to_hex(),
                NodeKind::ChangeSet.as_str(),
                changeset.kind.as_str(),
            ));
        }
        let cs_payload: ChangeSetPayload = serde_json::from_value(changeset.payload)?;
        let new_head = NodeId::from_hex(&cs_payload.head)?;

        let cs_hex = changeset_id.to_hex();
        if !payload.change_sets.contains(&cs_hex) {
            payload.change_sets.push(cs_hex);
        }
        payload.head_snapshot = cs_payload.head;
        let value = serde_json::to_value(&payload).map_err(StoreError::from)?;

        self.store.graph().transaction(|tx| {
            tx.insert_edge(workspace_id, EdgeKind::Includes, changeset_id, None)?;
            tx.update_node_payload(workspace_id, &value)?;
            tx.put_ref(
                &format!("ws.{}.head", payload.name),
                &new_head,
                NodeKind::Snapshot,
            )?;
            Ok(())
        })?;

        info!(workspace = %workspace_id, changeset = %changeset_id, "changeset attached");
        Ok(())
    }

    /// Close a workspace. Closing twice is a no-op.
    pub fn close(&self, workspace_id: &NodeId) -> Result<()> {
        let mut payload = self.load(workspace_id)?;
        if payload.status == STATUS_CLOSED {
            return Ok(());
        }
        payload.status = STATUS_CLOSED.to_string();
        let value = serde_json::to_value(&payload)?;
        self.store.graph().update_node_payload(workspace_id, &value)?;
        info!(workspace = %workspace_id, "workspace closed");
        Ok(())
    }

    pub fn find_by_name(&self, name: &str) -> Result<Option<NodeId>> {
        Ok(self
            .store
            .graph()
            .get_nodes_by_kind(NodeKind::Workspace)?
            .into_iter()
            .find(|node| node.payload["name"] == name)
            .map(|node| node.id))
    }

    pub fn load(&self, workspace_id: &NodeId) -> Result<WorkspacePayload> {
        let node = self.store.graph().require_node(workspace_id)?;
        if node.kind != NodeKind::Workspace {
            return Err(SemanticError::kind_mismatch(
                workspace_id.to_hex(),
                NodeKind::Workspace.as_str(),
                node.kind.as_str(),
            ));
        }
        Ok(serde_json::from_value(node.payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn store_with_snapshot() -> (tempfile::TempDir, Store, NodeId) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let snap = store
            .graph()
            .transaction(|tx| {
                let id = tx.insert_node(
                    NodeKind::Snapshot,
                    &json!({"sourceType": "directory", "sourceRef": "/s", "fileCount": 0, "createdAt": 1}),
                )?;
                tx.append_log(NodeKind::Snapshot, &id)?;
                Ok(id)
            })
            .unwrap();
        (dir, store, snap)
    }

    fn insert_changeset(store: &Store, base: &NodeId, head: &NodeId) -> NodeId {
        store
            .graph()
            .transaction(|tx| {
                tx.insert_node(
                    NodeKind::ChangeSet,
                    &json!({"base": base.to_hex(), "head": head.to_hex(), "createdAt": 2}),
                )
            })
            .unwrap()
    }

    #[test]
    fn test_create_workspace() {
        let (_d, store, snap) = store_with_snapshot();
        let service = WorkspaceService::new(&store);
        let ws = service.create("feature-x", &snap).unwrap();

        let payload = service.load(&ws).unwrap();
        assert_eq!(payload.status, STATUS_ACTIVE);
        assert_eq!(payload.base_snapshot, snap.to_hex());
        assert_eq!(payload.head_snapshot, snap.to_hex());
        assert!(payload.change_sets.is_empty());

        let head_ref = store.graph().get_ref("ws.feature-x.head").unwrap().unwrap();
        assert_eq!(head_ref.target, snap);
        assert_eq!(service.find_by_name("feature-x").unwrap(), Some(ws));
    }

    #[test]
    fn test_duplicate_name_conflicts() {
        let (_d, store, snap) = store_with_snapshot();
        let service = WorkspaceService::new(&store);
        service.create("dup", &snap).unwrap();
        let err = service.create("dup", &snap).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[test]
    fn test_attach_changeset_moves_head() {
        let (_d, store, snap) = store_with_snapshot();
        let head_snap = store
            .graph()
            .transaction(|tx| {
                tx.insert_node(
                    NodeKind::Snapshot,
                    &json!({"sourceType": "directory", "sourceRef": "/s2", "fileCount": 1, "createdAt": 3}),
                )
            })
            .unwrap();
        let cs = insert_changeset(&store, &snap, &head_snap);

        let service = WorkspaceService::new(&store);
        let ws = service.create("feature-y", &snap).unwrap();
        service.attach_changeset(&ws, &cs).unwrap();

        let payload = service.load(&ws).unwrap();
        assert_eq!(payload.head_snapshot, head_snap.to_hex());
        assert_eq!(payload.change_sets, vec![cs.to_hex()]);

        let includes = store.graph().get_edges(&ws, EdgeKind::Includes).unwrap();
        assert_eq!(includes.len(), 1);
        assert_eq!(includes[0].dst, cs);

        let head_ref = store.graph().get_ref("ws.feature-y.head").unwrap().unwrap();
        assert_eq!(head_ref.target, head_snap);
    }

    #[test]
    fn test_attach_is_idempotent_in_payload() {
        let (_d, store, snap) = store_with_snapshot();
        let cs = insert_changeset(&store, &snap, &snap);
        let service = WorkspaceService::new(&store);
        let ws = service.create("ws-idem", &snap).unwrap();
        service.attach_changeset(&ws, &cs).unwrap();
        service.attach_changeset(&ws, &cs).unwrap();
        assert_eq!(service.load(&ws).unwrap().change_sets.len(), 1);
    }

    #[test]
    fn test_closed_workspace_rejects_attach() {
        let (_d, store, snap) = store_with_snapshot();
        let cs = insert_changeset(&store, &snap, &snap);
        let service = WorkspaceService::new(&store);
        let ws = service.create("done", &snap).unwrap();
        service.close(&ws).unwrap();
        service.close(&ws).unwrap(); // idempotent

        let err = service.attach_changeset(&ws, &cs).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(service.load(&ws).unwrap().status, STATUS_CLOSED);
    }

    #[test]
    fn test_invalid_name_rejected() {
        let (_d, store, snap) = store_with_snapshot();
        let service = WorkspaceService::new(&store);
        assert!(service.create("", &snap).is_err());
        assert!(service.create("a:b", &snap).is_err());
    }
}
