//! SQLite-backed property graph
//!
//! Tables: `nodes`, `edges`, plus the auxiliary `refs`, `slugs`, and `logs`.
//! The database runs in WAL mode. All writes funnel through
//! [`GraphStore::transaction`], which holds the one process-wide connection
//! for the duration of the closure — that lock is the single-writer
//! serialization point. Payloads are stored as canonical JSON text.
//!
//! Insertion is idempotent: re-inserting a node with an existing id, or an
//! edge whose (src, type, dst, at) 4-tuple exists, leaves the row untouched.
//! Integrity (an edge to an unknown node) is not proactively checked;
//! consumers are responsible.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::cas;
use crate::domain::{Edge, EdgeKind, Node, NodeId, NodeKind};
use crate::error::{Result, StoreError};

/// A named pointer to a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefEntry {
    pub name: String,
    pub target: NodeId,
    pub kind: NodeKind,
}

/// Aggregate counters for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphStats {
    pub nodes: u64,
    pub edges: u64,
    pub refs: u64,
    pub slugs: u64,
    pub db_size_bytes: u64,
}

/// SQLite-backed graph store
#[derive(Clone)]
pub struct GraphStore {
    conn: Arc<Mutex<Connection>>,
}

impl GraphStore {
    /// Open (creating if needed) the graph database at the given path.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// In-memory store (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        // journal_mode returns its new value as a row; on :memory: this
        // yields "memory", which is fine.
        conn.query_row("PRAGMA journal_mode = WAL", [], |_row| Ok(()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS nodes (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                payload TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_nodes_kind ON nodes(kind)",
            [],
        )?;

        // `at` uses '' for "no context" so the 4-tuple can be the primary key
        conn.execute(
            "CREATE TABLE IF NOT EXISTS edges (
                src TEXT NOT NULL,
                type TEXT NOT NULL,
                dst TEXT NOT NULL,
                at TEXT NOT NULL DEFAULT '',
                created_at INTEGER NOT NULL,
                PRIMARY KEY (src, type, dst, at)
            )",
            [],
        )?;

        conn.execute("CREATE INDEX IF NOT EXISTS idx_edges_src ON edges(src)", [])?;
        conn.execute("CREATE INDEX IF NOT EXISTS idx_edges_dst ON edges(dst)", [])?;
        conn.execute("CREATE INDEX IF NOT EXISTS idx_edges_type ON edges(type)", [])?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS refs (
                name TEXT PRIMARY KEY,
                target_id TEXT NOT NULL,
                target_kind TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS slugs (
                target_id TEXT PRIMARY KEY,
                slug TEXT NOT NULL UNIQUE
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS logs (
                kind TEXT NOT NULL,
                seq INTEGER NOT NULL,
                id TEXT NOT NULL,
                PRIMARY KEY (kind, seq)
            )",
            [],
        )?;

        Ok(())
    }

    /// Run `f` inside a single exclusive transaction. Commits on `Ok`,
    /// rolls back on `Err`. A second caller blocks on the connection lock
    /// until the first completes.
    pub fn transaction<T>(&self, f: impl FnOnce(&GraphTx<'_>) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;
        let gtx = GraphTx { tx };
        match f(&gtx) {
            Ok(value) => {
                gtx.tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                let _ = gtx.tx.rollback();
                Err(err)
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Reads
    // ═══════════════════════════════════════════════════════════════════════

    pub fn get_node(&self, id: &NodeId) -> Result<Option<Node>> {
        let conn = self.conn.lock().unwrap();
        get_node_impl(&conn, id)
    }

    /// Like [`Self::get_node`] but absence is an error.
    pub fn require_node(&self, id: &NodeId) -> Result<Node> {
        self.get_node(id)?
            .ok_or_else(|| StoreError::not_found(format!("node {}", id)))
    }

    pub fn get_nodes_by_kind(&self, kind: NodeKind) -> Result<Vec<Node>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, kind, payload, created_at FROM nodes WHERE kind = ?1 ORDER BY id",
        )?;
        let nodes = stmt
            .query_map(params![kind.as_str()], map_node)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(nodes)
    }

    pub fn get_edges(&self, src: &NodeId, kind: EdgeKind) -> Result<Vec<Edge>> {
        let conn = self.conn.lock().unwrap();
        get_edges_impl(&conn, src, kind)
    }

    pub fn get_edges_to(&self, dst: &NodeId, kind: EdgeKind) -> Result<Vec<Edge>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT src, type, dst, at, created_at FROM edges
             WHERE dst = ?1 AND type = ?2 ORDER BY rowid",
        )?;
        let edges = stmt
            .query_map(params![dst.to_hex(), kind.as_str()], map_edge)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(edges)
    }

    /// Case-insensitive hex prefix lookup, ordered by id for deterministic
    /// candidate lists. `limit` bounds the row count.
    pub fn find_id_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<(NodeId, NodeKind)>> {
        let needle = prefix.to_lowercase();
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, kind FROM nodes WHERE id LIKE ?1 || '%' ORDER BY id LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![needle, limit as i64], |row| {
                let id_hex: String = row.get(0)?;
                let kind_s: String = row.get(1)?;
                let id = NodeId::from_hex(&id_hex).map_err(conv_err)?;
                let kind = NodeKind::parse(&kind_s).map_err(conv_err)?;
                Ok((id, kind))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn get_ref(&self, name: &str) -> Result<Option<RefEntry>> {
        let conn = self.conn.lock().unwrap();
        let entry = conn
            .query_row(
                "SELECT name, target_id, target_kind FROM refs WHERE name = ?1",
                params![name],
                map_ref,
            )
            .optional()?;
        Ok(entry)
    }

    pub fn list_refs(&self) -> Result<Vec<RefEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT name, target_id, target_kind FROM refs ORDER BY name")?;
        let refs = stmt
            .query_map([], map_ref)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(refs)
    }

    /// Create or move a named ref outside any larger transaction.
    pub fn set_ref(&self, name: &str, target: &NodeId, kind: NodeKind) -> Result<()> {
        self.transaction(|tx| tx.put_ref(name, target, kind))
    }

    pub fn delete_ref(&self, name: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute("DELETE FROM refs WHERE name = ?1", params![name])?;
        Ok(n > 0)
    }

    pub fn slug_target(&self, slug: &str) -> Result<Option<NodeId>> {
        let conn = self.conn.lock().unwrap();
        let id: Option<String> = conn
            .query_row(
                "SELECT target_id FROM slugs WHERE slug = ?1",
                params![slug],
                |row| row.get(0),
            )
            .optional()?;
        id.map(|s| NodeId::from_hex(&s)).transpose()
    }

    pub fn slug_of(&self, id: &NodeId) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let slug = conn
            .query_row(
                "SELECT slug FROM slugs WHERE target_id = ?1",
                params![id.to_hex()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(slug)
    }

    /// Nth-from-latest committed id for a kind (offset 0 = latest).
    pub fn log_nth_latest(&self, kind: NodeKind, offset: usize) -> Result<Option<NodeId>> {
        let conn = self.conn.lock().unwrap();
        log_nth_latest_impl(&conn, kind, offset)
    }

    /// Rewrite a node payload in place. Only Workspace nodes are mutable;
    /// any content-addressed kind fails with `Conflict`. The payload is
    /// re-canonicalized on write.
    pub fn update_node_payload(&self, id: &NodeId, payload: &Value) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        update_node_payload_impl(&conn, id, payload)
    }

    /// Assemble the closure reachable from a ChangeSet via MODIFIES, HAS,
    /// AFFECTS, and HAS_INTENT: the changeset node itself, every target
    /// node, and the connecting edges.
    pub fn changeset_closure(&self, id: &NodeId) -> Result<(Vec<Node>, Vec<Edge>)> {
        let conn = self.conn.lock().unwrap();
        let root = get_node_impl(&conn, id)?
            .ok_or_else(|| StoreError::not_found(format!("node {}", id)))?;
        if root.kind != NodeKind::ChangeSet {
            return Err(StoreError::kind_mismatch(
                id.to_hex(),
                NodeKind::ChangeSet.as_str(),
                root.kind.as_str(),
            ));
        }

        let mut edges = Vec::new();
        for kind in [
            EdgeKind::Modifies,
            EdgeKind::Has,
            EdgeKind::Affects,
            EdgeKind::HasIntent,
        ] {
            edges.extend(get_edges_impl(&conn, id, kind)?);
        }

        let mut nodes = vec![root];
        let mut seen: std::collections::HashSet<NodeId> =
            std::collections::HashSet::from([*id]);
        for edge in &edges {
            if seen.insert(edge.dst) {
                if let Some(node) = get_node_impl(&conn, &edge.dst)? {
                    nodes.push(node);
                }
            }
        }
        Ok((nodes, edges))
    }

    pub fn stats(&self) -> Result<GraphStats> {
        let conn = self.conn.lock().unwrap();
        let nodes: i64 = conn.query_row("SELECT COUNT(*) FROM nodes", [], |r| r.get(0))?;
        let edges: i64 = conn.query_row("SELECT COUNT(*) FROM edges", [], |r| r.get(0))?;
        let refs: i64 = conn.query_row("SELECT COUNT(*) FROM refs", [], |r| r.get(0))?;
        let slugs: i64 = conn.query_row("SELECT COUNT(*) FROM slugs", [], |r| r.get(0))?;
        let db_size_bytes: u64 = conn
            .query_row(
                "SELECT page_count * page_size FROM pragma_page_count(), pragma_page_size()",
                [],
                |row| {
                    let pages: i64 = row.get(0)?;
                    let page_size: i64 = row.get(1)?;
                    Ok((pages * page_size) as u64)
                },
            )
            .unwrap_or(0);
        Ok(GraphStats {
            nodes: nodes as u64,
            edges: edges as u64,
            refs: refs as u64,
            slugs: slugs as u64,
            db_size_bytes,
        })
    }
}

/// Write handle scoped to one open transaction
pub struct GraphTx<'conn> {
    tx: rusqlite::Transaction<'conn>,
}

impl GraphTx<'_> {
    /// Insert a content-addressed node, returning its derived id.
    /// A re-insert of an existing payload is a no-op returning the same id.
    pub fn insert_node(&self, kind: NodeKind, payload: &Value) -> Result<NodeId> {
        let id = cas::node_id(kind, payload)?;
        let canonical = cas::canonical_json_string(payload);
        let inserted = self.tx.execute(
            "INSERT OR IGNORE INTO nodes (id, kind, payload, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![id.to_hex(), kind.as_str(), canonical, cas::now_ms()],
        )?;
        if inserted > 0 {
            debug!(kind = kind.as_str(), id = %id, "node inserted");
        }
        Ok(id)
    }

    /// Insert a node under a caller-supplied id. Reserved for Workspace,
    /// the one kind whose identity is not derived from its payload.
    pub fn insert_node_with_id(
        &self,
        id: &NodeId,
        kind: NodeKind,
        payload: &Value,
    ) -> Result<()> {
        if kind.is_content_addressed() {
            return Err(StoreError::invariant(format!(
                "{} nodes derive their id from their payload",
                kind
            )));
        }
        if !payload.is_object() {
            return Err(StoreError::invariant(format!(
                "{} payload must be a JSON object",
                kind
            )));
        }
        let canonical = cas::canonical_json_string(payload);
        self.tx.execute(
            "INSERT OR IGNORE INTO nodes (id, kind, payload, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![id.to_hex(), kind.as_str(), canonical, cas::now_ms()],
        )?;
        Ok(())
    }

    /// Insert an edge; the full (src, type, dst, at) 4-tuple is the key and
    /// re-insertion is a no-op.
    pub fn insert_edge(
        &self,
        src: &NodeId,
        kind: EdgeKind,
        dst: &NodeId,
        at: Option<&NodeId>,
    ) -> Result<()> {
        self.tx.execute(
            "INSERT OR IGNORE INTO edges (src, type, dst, at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                src.to_hex(),
                kind.as_str(),
                dst.to_hex(),
                at.map(NodeId::to_hex).unwrap_or_default(),
                cas::now_ms()
            ],
        )?;
        Ok(())
    }

    pub fn delete_edge(
        &self,
        src: &NodeId,
        kind: EdgeKind,
        dst: &NodeId,
        at: Option<&NodeId>,
    ) -> Result<bool> {
        let n = self.tx.execute(
            "DELETE FROM edges WHERE src = ?1 AND type = ?2 AND dst = ?3 AND at = ?4",
            params![
                src.to_hex(),
                kind.as_str(),
                dst.to_hex(),
                at.map(NodeId::to_hex).unwrap_or_default()
            ],
        )?;
        Ok(n > 0)
    }

    /// Create or move a named ref.
    pub fn put_ref(&self, name: &str, target: &NodeId, kind: NodeKind) -> Result<()> {
        self.tx.execute(
            "INSERT OR REPLACE INTO refs (name, target_id, target_kind)
             VALUES (?1, ?2, ?3)",
            params![name, target.to_hex(), kind.as_str()],
        )?;
        Ok(())
    }

    /// Attach a slug to a node. A node keeps its first slug: re-insertion
    /// for an already-slugged target is a no-op.
    pub fn put_slug(&self, target: &NodeId, slug: &str) -> Result<()> {
        self.tx.execute(
            "INSERT OR IGNORE INTO slugs (target_id, slug) VALUES (?1, ?2)",
            params![target.to_hex(), slug],
        )?;
        Ok(())
    }

    /// Append an id to the per-kind commit log.
    pub fn append_log(&self, kind: NodeKind, id: &NodeId) -> Result<()> {
        let next: i64 = self.tx.query_row(
            "SELECT COALESCE(MAX(seq), 0) + 1 FROM logs WHERE kind = ?1",
            params![kind.as_str()],
            |row| row.get(0),
        )?;
        self.tx.execute(
            "INSERT INTO logs (kind, seq, id) VALUES (?1, ?2, ?3)",
            params![kind.as_str(), next, id.to_hex()],
        )?;
        Ok(())
    }

    pub fn get_node(&self, id: &NodeId) -> Result<Option<Node>> {
        get_node_impl(&self.tx, id)
    }

    pub fn get_edges(&self, src: &NodeId, kind: EdgeKind) -> Result<Vec<Edge>> {
        get_edges_impl(&self.tx, src, kind)
    }

    pub fn log_nth_latest(&self, kind: NodeKind, offset: usize) -> Result<Option<NodeId>> {
        log_nth_latest_impl(&self.tx, kind, offset)
    }

    pub fn update_node_payload(&self, id: &NodeId, payload: &Value) -> Result<()> {
        update_node_payload_impl(&self.tx, id, payload)
    }

    pub fn slug_of(&self, id: &NodeId) -> Result<Option<String>> {
        let slug = self
            .tx
            .query_row(
                "SELECT slug FROM slugs WHERE target_id = ?1",
                params![id.to_hex()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(slug)
    }

    /// Count slugs matching a LIKE pattern (collision counter input).
    pub fn count_slugs_like(&self, pattern: &str) -> Result<u64> {
        let n: i64 = self.tx.query_row(
            "SELECT COUNT(*) FROM slugs WHERE slug LIKE ?1",
            params![pattern],
            |row| row.get(0),
        )?;
        Ok(n as u64)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Shared query bodies (Transaction derefs to Connection)
// ═══════════════════════════════════════════════════════════════════════════

fn get_node_impl(conn: &Connection, id: &NodeId) -> Result<Option<Node>> {
    let node = conn
        .query_row(
            "SELECT id, kind, payload, created_at FROM nodes WHERE id = ?1",
            params![id.to_hex()],
            map_node,
        )
        .optional()?;
    Ok(node)
}

fn get_edges_impl(conn: &Connection, src: &NodeId, kind: EdgeKind) -> Result<Vec<Edge>> {
    // rowid order = insertion order, which consumers treat as meaningful
    // ("first affected module", "first symbol")
    let mut stmt = conn.prepare(
        "SELECT src, type, dst, at, created_at FROM edges
         WHERE src = ?1 AND type = ?2 ORDER BY rowid",
    )?;
    let edges = stmt
        .query_map(params![src.to_hex(), kind.as_str()], map_edge)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(edges)
}

fn log_nth_latest_impl(conn: &Connection, kind: NodeKind, offset: usize) -> Result<Option<NodeId>> {
    let id: Option<String> = conn
        .query_row(
            "SELECT id FROM logs WHERE kind = ?1 ORDER BY seq DESC LIMIT 1 OFFSET ?2",
            params![kind.as_str(), offset as i64],
            |row| row.get(0),
        )
        .optional()?;
    id.map(|s| NodeId::from_hex(&s)).transpose()
}

fn update_node_payload_impl(conn: &Connection, id: &NodeId, payload: &Value) -> Result<()> {
    let kind_s: Option<String> = conn
        .query_row(
            "SELECT kind FROM nodes WHERE id = ?1",
            params![id.to_hex()],
            |row| row.get(0),
        )
        .optional()?;
    let kind = match kind_s {
        Some(s) => NodeKind::parse(&s)?,
        None => return Err(StoreError::not_found(format!("node {}", id))),
    };
    if kind.is_content_addressed() {
        return Err(StoreError::conflict(format!(
            "payload of content-addressed {} node {} is immutable",
            kind, id
        )));
    }
    if !payload.is_object() {
        return Err(StoreError::invariant(format!(
            "{} payload must be a JSON object",
            kind
        )));
    }
    conn.execute(
        "UPDATE nodes SET payload = ?2 WHERE id = ?1",
        params![id.to_hex(), cas::canonical_json_string(payload)],
    )?;
    Ok(())
}

fn map_node(row: &Row<'_>) -> rusqlite::Result<Node> {
    let id_hex: String = row.get(0)?;
    let kind_s: String = row.get(1)?;
    let payload_s: String = row.get(2)?;
    Ok(Node {
        id: NodeId::from_hex(&id_hex).map_err(conv_err)?,
        kind: NodeKind::parse(&kind_s).map_err(conv_err)?,
        payload: serde_json::from_str(&payload_s)
            .map_err(|e| conv_err(StoreError::from(e)))?,
        created_at: row.get(3)?,
    })
}

fn map_edge(row: &Row<'_>) -> rusqlite::Result<Edge> {
    let src: String = row.get(0)?;
    let kind_s: String = row.get(1)?;
    let dst: String = row.get(2)?;
    let at: String = row.get(3)?;
    Ok(Edge {
        src: NodeId::from_hex(&src).map_err(conv_err)?,
        kind: EdgeKind::parse(&kind_s).map_err(conv_err)?,
        dst: NodeId::from_hex(&dst).map_err(conv_err)?,
        at: if at.is_empty() {
            None
        } else {
            Some(NodeId::from_hex(&at).map_err(conv_err)?)
        },
        created_at: row.get(4)?,
    })
}

fn map_ref(row: &Row<'_>) -> rusqlite::Result<RefEntry> {
    let name: String = row.get(0)?;
    let target: String = row.get(1)?;
    let kind_s: String = row.get(2)?;
    Ok(RefEntry {
        name,
        target: NodeId::from_hex(&target).map_err(conv_err)?,
        kind: NodeKind::parse(&kind_s).map_err(conv_err)?,
    })
}

fn conv_err(e: StoreError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
}
