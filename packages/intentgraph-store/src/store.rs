//! Store facade: one state directory wiring the graph database, the object
//! store, and the rules location together.
//!
//! Layout under the state directory:
//!
//! ```text
//! db.sqlite            graph + auxiliary tables (WAL mode)
//! objects/<aa>/<rest>  BLAKE3-named blobs
//! rules/modules.yaml   module rules
//! rules/changetypes.yaml  optional detector overrides
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::Result;
use crate::infrastructure::{GraphStats, GraphStore, ObjectStore};

/// Combined store statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub graph: GraphStats,
    pub objects: u64,
}

/// Application state store
#[derive(Clone)]
pub struct Store {
    graph: GraphStore,
    objects: ObjectStore,
    state_dir: PathBuf,
}

impl Store {
    /// Open (creating if needed) the state directory.
    pub fn open(state_dir: impl AsRef<Path>) -> Result<Self> {
        let state_dir = state_dir.as_ref().to_path_buf();
        fs::create_dir_all(&state_dir)?;
        let graph = GraphStore::open(state_dir.join("db.sqlite"))?;
        let objects = ObjectStore::open(state_dir.join("objects"))?;
        info!(dir = %state_dir.display(), "store opened");
        Ok(Self {
            graph,
            objects,
            state_dir,
        })
    }

    pub fn graph(&self) -> &GraphStore {
        &self.graph
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn rules_dir(&self) -> PathBuf {
        self.state_dir.join("rules")
    }

    pub fn write_object(&self, bytes: &[u8]) -> Result<String> {
        self.objects.write(bytes)
    }

    pub fn read_object(&self, digest: &str) -> Result<Vec<u8>> {
        self.objects.read(digest)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            graph: self.graph.stats()?,
            objects: self.objects.count()?,
        })
    }
}
