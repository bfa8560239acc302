//! BLAKE3-indexed byte-blob storage
//!
//! Blobs live at `objects/<first-2-hex>/<remaining-hex>` with a write-once
//! contract. Writes stage under a temp name in the same shard directory and
//! rename into place, so a blob is either absent or complete; a partial file
//! left by a crash is overwritten by the next write of the same digest.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::cas;
use crate::error::{Result, StoreError};

/// Content-addressed blob store rooted at an `objects/` directory
#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
}

impl ObjectStore {
    /// Open (creating if needed) an object store at `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Write bytes, returning their hex BLAKE3 digest. Writing identical
    /// content twice is a no-op returning the same digest.
    pub fn write(&self, bytes: &[u8]) -> Result<String> {
        let digest = cas::blob_digest(bytes);
        let path = self.blob_path(&digest)?;
        if path.exists() {
            return Ok(digest);
        }

        let shard = path
            .parent()
            .ok_or_else(|| StoreError::invariant("blob path has no shard directory"))?;
        fs::create_dir_all(shard)?;

        // Single writer per digest: the temp name is deterministic so a
        // stale partial from a crash gets overwritten here.
        let staged = shard.join(format!(
            ".{}.tmp",
            path.file_name().and_then(|n| n.to_str()).unwrap_or(&digest)
        ));
        let mut file = fs::File::create(&staged)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&staged, &path)?;

        debug!(digest = %digest, size = bytes.len(), "object written");
        Ok(digest)
    }

    /// Read the exact bytes for a digest; absence is a `NotFound` error.
    pub fn read(&self, digest: &str) -> Result<Vec<u8>> {
        let path = self.blob_path(digest)?;
        if !path.exists() {
            return Err(StoreError::not_found(format!("object {}", digest)));
        }
        Ok(fs::read(path)?)
    }

    pub fn has(&self, digest: &str) -> Result<bool> {
        Ok(self.blob_path(digest)?.exists())
    }

    /// Number of stored blobs (walks the two-level shard layout).
    pub fn count(&self) -> Result<u64> {
        let mut n = 0;
        for shard in fs::read_dir(&self.root)? {
            let shard = shard?;
            if !shard.file_type()?.is_dir() {
                continue;
            }
            for entry in fs::read_dir(shard.path())? {
                let entry = entry?;
                let name = entry.file_name();
                let is_staged = name.to_str().is_some_and(|n| n.starts_with('.'));
                if entry.file_type()?.is_file() && !is_staged {
                    n += 1;
                }
            }
        }
        Ok(n)
    }

    fn blob_path(&self, digest: &str) -> Result<PathBuf> {
        if digest.len() != 64 || !cas::is_hex(digest) {
            return Err(StoreError::invariant(format!(
                "malformed object digest '{}'",
                digest
            )));
        }
        let digest = digest.to_lowercase();
        Ok(self.root.join(&digest[..2]).join(&digest[2..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, ObjectStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::open(dir.path().join("objects")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_blob_roundtrip() {
        let (_dir, store) = temp_store();
        let digest = store.write(b"function login(u){return u;}").unwrap();
        assert_eq!(store.read(&digest).unwrap(), b"function login(u){return u;}");
    }

    #[test]
    fn test_write_is_a_function_of_content() {
        let (_dir, store) = temp_store();
        let a = store.write(b"same bytes").unwrap();
        let b = store.write(b"same bytes").unwrap();
        assert_eq!(a, b);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_sharded_layout() {
        let (dir, store) = temp_store();
        let digest = store.write(b"x").unwrap();
        let expected = dir
            .path()
            .join("objects")
            .join(&digest[..2])
            .join(&digest[2..]);
        assert!(expected.is_file());
    }

    #[test]
    fn test_missing_blob_is_not_found() {
        let (_dir, store) = temp_store();
        let absent = "0".repeat(64);
        let err = store.read(&absent).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::NotFound);
        assert!(!store.has(&absent).unwrap());
    }

    #[test]
    fn test_malformed_digest_rejected() {
        let (_dir, store) = temp_store();
        assert!(store.read("not-hex").is_err());
        assert!(store.has("ab12").is_err());
    }

    #[test]
    fn test_stale_partial_is_replaced() {
        let (dir, store) = temp_store();
        let digest = cas::blob_digest(b"payload");
        // Simulate a crashed writer's leftovers
        let shard = dir.path().join("objects").join(&digest[..2]);
        fs::create_dir_all(&shard).unwrap();
        fs::write(shard.join(format!(".{}.tmp", &digest[2..])), b"par").unwrap();

        let written = store.write(b"payload").unwrap();
        assert_eq!(written, digest);
        assert_eq!(store.read(&digest).unwrap(), b"payload");
    }

    #[test]
    fn test_empty_blob() {
        let (_dir, store) = temp_store();
        let digest = store.write(b"").unwrap();
        assert_eq!(store.read(&digest).unwrap(), Vec::<u8>::new());
    }
}
