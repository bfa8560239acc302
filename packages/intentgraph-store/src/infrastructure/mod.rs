//! Storage backends: the SQLite graph database and the on-disk object store

pub mod objects;
pub mod sqlite;

pub use objects::ObjectStore;
pub use sqlite::{GraphStats, GraphStore, GraphTx, RefEntry};
