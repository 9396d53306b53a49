//! Content-addressed filesystem object store for large artifact payloads (§4.5).

use std::fs;
use std::path::{Path, PathBuf};

use super::traits::{StorageError, StorageResult};

/// Object-storage capability for artifact blobs too large to inline.
/// Keys are opaque content-addressed strings (see [`FilesystemBlobStore::put`]).
pub trait BlobStore: Send + Sync {
    fn put(&self, key: &str, bytes: &[u8]) -> StorageResult<()>;
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;
    fn delete(&self, key: &str) -> StorageResult<bool>;
    fn exists(&self, key: &str) -> StorageResult<bool>;
}

/// Local-filesystem realization, keyed by the first 32 hex characters of the
/// SHA-256 digest of the payload (§4.5). Two-level fan-out (`ab/cd/<key>`)
/// keeps any single directory from holding too many entries.
pub struct FilesystemBlobStore {
    root: PathBuf,
}

impl FilesystemBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// First 32 hex chars of the content's SHA-256 digest (§3, §4.5).
    pub fn content_key(bytes: &[u8]) -> String {
        use sha2::{Digest, Sha256};
        let digest = Sha256::digest(bytes);
        hex::encode(digest)[..32].to_string()
    }

    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        if key.len() < 4 || !key.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StorageError::ReferentialIntegrity(format!(
                "blob key must be hex: {key}"
            )));
        }
        Ok(self.root.join(&key[0..2]).join(&key[2..4]).join(key))
    }
}

impl BlobStore for FilesystemBlobStore {
    fn put(&self, key: &str, bytes: &[u8]) -> StorageResult<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)?;
        Ok(())
    }

    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::from(e)),
        }
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::from(e)),
        }
    }

    fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.path_for(key)?.exists())
    }
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (FilesystemBlobStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        (FilesystemBlobStore::new(dir.path()), dir)
    }

    #[test]
    fn put_then_get_round_trips() {
        let (store, _dir) = temp_store();
        let key = FilesystemBlobStore::content_key(b"hello world");
        store.put(&key, b"hello world").unwrap();
        assert_eq!(store.get(&key).unwrap(), Some(b"hello world".to_vec()));
    }

    #[test]
    fn missing_key_returns_none() {
        let (store, _dir) = temp_store();
        assert_eq!(store.get("deadbeefdeadbeefdeadbeefdeadbeef").unwrap(), None);
    }

    #[test]
    fn delete_reports_whether_it_existed() {
        let (store, _dir) = temp_store();
        let key = FilesystemBlobStore::content_key(b"payload");
        store.put(&key, b"payload").unwrap();
        assert!(store.delete(&key).unwrap());
        assert!(!store.delete(&key).unwrap());
    }

    #[test]
    fn content_key_is_deterministic_and_32_hex_chars() {
        let a = FilesystemBlobStore::content_key(b"same content");
        let b = FilesystemBlobStore::content_key(b"same content");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn rejects_non_hex_keys() {
        let (store, _dir) = temp_store();
        assert!(store.put("not-hex!!", b"x").is_err());
    }
}
