//! intentgraph-store — content-addressed property-graph persistence
//!
//! The storage core of the intent-aware version control layer:
//!
//! 1. **CAS** ([`cas`]): canonical JSON serialization and BLAKE3 node ids.
//!    Identity is `hash(kind ‖ "\n" ‖ canonical(payload))`, so identical
//!    payloads always land on the same node.
//! 2. **ObjectStore** ([`infrastructure::objects`]): BLAKE3-indexed blobs at
//!    `objects/<aa>/<rest>`, write-once, deduplicated.
//! 3. **GraphStore** ([`infrastructure::sqlite`]): nodes/edges plus the
//!    `refs`, `slugs`, and `logs` auxiliary tables in one WAL-mode SQLite
//!    file; idempotent inserts, single-writer transactions.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use intentgraph_store::{NodeKind, EdgeKind, Store};
//!
//! let store = Store::open(".intentgraph")?;
//! let snapshot_id = store.graph().transaction(|tx| {
//!     let file = tx.insert_node(NodeKind::File, &file_payload)?;
//!     let snap = tx.insert_node(NodeKind::Snapshot, &snap_payload)?;
//!     tx.insert_edge(&snap, EdgeKind::Contains, &file, None)?;
//!     tx.append_log(NodeKind::Snapshot, &snap)?;
//!     Ok(snap)
//! })?;
//! ```

pub mod cas;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod store;

pub use error::{ErrorKind, Result, StoreError};

pub use domain::{
    ChangeSetPayload, ChangeTypePayload, Edge, EdgeKind, Evidence, FilePayload, IntentPayload,
    ModulePayload, Node, NodeId, NodeKind, Point, SnapshotPayload, Span, SymbolKind,
    SymbolPayload, WorkspacePayload,
};
pub use infrastructure::{GraphStats, GraphStore, GraphTx, ObjectStore, RefEntry};
pub use store::{Store, StoreStats};
