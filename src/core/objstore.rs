//! Object storage for photos and blob-backed record lists
//!
//! Keys are relative, `/`-separated paths ("photos/2025-001/opening/x.jpg").
//! [`FsObjectStore`] keeps each object as a file under a bucket directory.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

/// Errors from object storage operations
#[derive(Debug, Error, Diagnostic)]
pub enum StorageError {
    #[error("invalid object key '{0}'")]
    #[diagnostic(help("keys are relative paths without '..' segments"))]
    InvalidKey(String),

    #[error("object '{0}' not found")]
    NotFound(String),

    #[error("object '{0}' already exists")]
    AlreadyExists(String),

    #[error("failed to write object '{key}': {source}")]
    Write {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read object '{key}': {source}")]
    Read {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to delete object '{key}': {source}")]
    Delete {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

/// A bucket of byte blobs addressed by key
pub trait ObjectStore {
    /// Upload bytes at `key`; with `overwrite = false` an existing key is an error
    fn put(&self, key: &str, bytes: &[u8], overwrite: bool) -> Result<(), StorageError>;

    /// Download the bytes at `key`
    fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Delete `key`; deleting a missing key is an error
    fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// URL under which `key` is published
    fn public_url(&self, key: &str) -> String;
}

/// Directory-backed object store
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
    public_base_url: Option<String>,
}

impl FsObjectStore {
    pub fn new<P: AsRef<Path>>(root: P, public_base_url: Option<String>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            public_base_url: public_base_url.map(|u| u.trim_end_matches('/').to_string()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(key
            .split('/')
            .fold(self.root.clone(), |path, segment| path.join(segment)))
    }
}

/// Reject keys that are empty, absolute, or step outside the bucket
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let invalid = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key
            .split('/')
            .any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if invalid {
        Err(StorageError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}

impl ObjectStore for FsObjectStore {
    fn put(&self, key: &str, bytes: &[u8], overwrite: bool) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let write_err = |source| StorageError::Write {
            key: key.to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        if !overwrite {
            // create_new is an atomic check-and-create
            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    return Err(StorageError::AlreadyExists(key.to_string()));
                }
                Err(e) => return Err(write_err(e)),
            };
            file.write_all(bytes).map_err(write_err)?;
            return Ok(());
        }

        // Write beside the target then rename so readers never see a partial object
        let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp = path.with_file_name(tmp_name);
        fs::write(&tmp, bytes).map_err(write_err)?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(write_err(e));
        }

        tracing::debug!(key, bytes = bytes.len(), "object stored");
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(key)?;
        fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(key.to_string())
            } else {
                StorageError::Read {
                    key: key.to_string(),
                    source: e,
                }
            }
        })
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        fs::remove_file(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(key.to_string())
            } else {
                StorageError::Delete {
                    key: key.to_string(),
                    source: e,
                }
            }
        })?;
        tracing::debug!(key, "object deleted");
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        match self.public_base_url {
            Some(ref base) => format!("{}/{}", base, key),
            None => {
                let path = key
                    .split('/')
                    .fold(self.root.clone(), |path, segment| path.join(segment));
                let absolute = std::path::absolute(&path).unwrap_or(path);
                format!("file://{}", absolute.display())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_put_get_delete() {
        let tmp = tempdir().unwrap();
        let store = FsObjectStore::new(tmp.path(), None);

        store.put("photos/2025-001/opening/a.jpg", b"jpeg", false).unwrap();
        assert!(tmp.path().join("photos/2025-001/opening/a.jpg").is_file());
        assert_eq!(store.get("photos/2025-001/opening/a.jpg").unwrap(), b"jpeg");

        store.delete("photos/2025-001/opening/a.jpg").unwrap();
        assert!(!tmp.path().join("photos/2025-001/opening/a.jpg").exists());
        assert!(matches!(
            store.get("photos/2025-001/opening/a.jpg"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_put_without_overwrite_refuses_existing_key() {
        let tmp = tempdir().unwrap();
        let store = FsObjectStore::new(tmp.path(), None);

        store.put("a.txt", b"one", false).unwrap();
        assert!(matches!(
            store.put("a.txt", b"two", false),
            Err(StorageError::AlreadyExists(_))
        ));
        assert_eq!(store.get("a.txt").unwrap(), b"one");

        store.put("a.txt", b"two", true).unwrap();
        assert_eq!(store.get("a.txt").unwrap(), b"two");
    }

    #[test]
    fn test_rejects_escaping_keys() {
        let tmp = tempdir().unwrap();
        let store = FsObjectStore::new(tmp.path(), None);

        for key in ["", "/etc/passwd", "../x", "a/../../x", "a//b", "a\\b"] {
            assert!(
                matches!(store.put(key, b"x", true), Err(StorageError::InvalidKey(_))),
                "key {:?} should be rejected",
                key
            );
        }
    }

    #[test]
    fn test_delete_missing_key() {
        let tmp = tempdir().unwrap();
        let store = FsObjectStore::new(tmp.path(), None);
        assert!(matches!(store.delete("nope"), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_public_url() {
        let tmp = tempdir().unwrap();
        let published = FsObjectStore::new(tmp.path(), Some("https://cdn.example.com/rnc/".into()));
        assert_eq!(
            published.public_url("photos/a.jpg"),
            "https://cdn.example.com/rnc/photos/a.jpg"
        );

        let local = FsObjectStore::new(tmp.path(), None);
        let url = local.public_url("photos/a.jpg");
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("a.jpg"));
    }
}
