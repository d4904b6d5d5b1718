//! Record storage backends
//!
//! [`RncStore`] is implemented by [`SqliteStore`] (relational tables with an
//! atomic per-year counter) and [`JsonBlobStore`] (the whole record list as
//! one JSON document in object storage).

mod json;
mod schema;
mod sql;

pub use json::{JsonBlobStore, RECORDS_KEY};
pub use sql::SqliteStore;

use std::path::Path;

use chrono::{DateTime, Datelike, Local, Utc};
use miette::Diagnostic;
use thiserror::Error;

use crate::core::config::{Backend, Config};
use crate::core::dburl::{DatabaseUrl, DbUrlError};
use crate::core::numbering::{RncNumber, RncNumberError};
use crate::core::objstore::{FsObjectStore, StorageError};
use crate::entities::rnc::{NewRnc, PhotoRef, Rnc, RncEvent, RncPatch, RncStatus};

/// Errors from record storage
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("RNC {0} not found")]
    #[diagnostic(code(rnc::store::not_found), help("run `rnc list` to see existing numbers"))]
    NotFound(RncNumber),

    #[error("RNC {number} changed while you were working on it (expected {expected}, found {actual})")]
    #[diagnostic(code(rnc::store::status_conflict), help("show the RNC again and retry"))]
    StatusConflict {
        number: RncNumber,
        expected: RncStatus,
        actual: RncStatus,
    },

    #[error("photo '{key}' is already attached to RNC {number}")]
    DuplicatePhoto { number: RncNumber, key: String },

    #[error("stored data is corrupt: {0}")]
    Corrupt(String),

    #[error("database created by a newer version (schema {found}, supported {supported})")]
    #[diagnostic(help("upgrade rnc"))]
    SchemaTooNew { found: i64, supported: i64 },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Url(#[from] DbUrlError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Storage(#[from] StorageError),

    #[error("database error: {0}")]
    #[diagnostic(code(rnc::store::database))]
    Database(#[from] rusqlite::Error),

    #[error("record document error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RncNumberError> for StoreError {
    fn from(e: RncNumberError) -> Self {
        StoreError::Corrupt(e.to_string())
    }
}

/// Persistence for RNC records
pub trait RncStore {
    /// Which backend this is
    fn backend(&self) -> Backend;

    /// Assign the next number for `now`'s year and persist the record
    fn create(&mut self, new: NewRnc, now: DateTime<Utc>) -> Result<Rnc, StoreError>;

    /// All records, newest number first
    fn list(&self) -> Result<Vec<Rnc>, StoreError>;

    /// One record with its history and photos
    fn get(&self, number: RncNumber) -> Result<Option<Rnc>, StoreError>;

    /// Edit free-text fields and the report date
    fn update(&mut self, number: RncNumber, patch: &RncPatch) -> Result<Rnc, StoreError>;

    /// Move to `event.to` and append the event; fails if the status is no longer `event.from`
    fn record_event(&mut self, number: RncNumber, event: RncEvent) -> Result<Rnc, StoreError>;

    fn add_photo(&mut self, number: RncNumber, photo: PhotoRef) -> Result<Rnc, StoreError>;

    /// Detach a photo reference, returning it if it was attached
    fn remove_photo(&mut self, number: RncNumber, key: &str)
        -> Result<Option<PhotoRef>, StoreError>;

    /// Hard delete; the number is never handed out again
    fn delete(&mut self, number: RncNumber) -> Result<Rnc, StoreError>;

    /// Like [`RncStore::get`] but missing records are an error
    fn require(&self, number: RncNumber) -> Result<Rnc, StoreError> {
        self.get(number)?.ok_or(StoreError::NotFound(number))
    }
}

/// Calendar year (local time) a record created at `now` is numbered in
pub fn numbering_year(now: DateTime<Utc>) -> i32 {
    now.with_timezone(&Local).year()
}

/// Open the configured backend for a project rooted at `root`
pub fn open_store(config: &Config, root: &Path) -> Result<Box<dyn RncStore>, StoreError> {
    match config.backend() {
        Backend::Sql => {
            let url = DatabaseUrl::parse(config.database_url(), root)?;
            for rewrite in &url.rewrites {
                tracing::warn!("database URL rewritten: {}", rewrite);
            }
            tracing::debug!(url = %url.target, "opening SQL store");
            Ok(Box::new(SqliteStore::open(&url.target)?))
        }
        Backend::Json => {
            let objects = FsObjectStore::new(
                config.storage_dir(root),
                config.public_base_url.clone(),
            );
            tracing::debug!(root = %objects.root().display(), "opening JSON blob store");
            Ok(Box::new(JsonBlobStore::new(objects)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_store_selects_backend() {
        let tmp = tempdir().unwrap();

        let sql = open_store(&Config::default(), tmp.path()).unwrap();
        assert_eq!(sql.backend(), Backend::Sql);
        assert!(tmp.path().join(".rnc/rnc.db").exists());

        let config = Config {
            backend: Some(Backend::Json),
            ..Default::default()
        };
        let json = open_store(&config, tmp.path()).unwrap();
        assert_eq!(json.backend(), Backend::Json);
    }

    #[test]
    fn test_open_store_rejects_server_urls() {
        let tmp = tempdir().unwrap();
        let config = Config {
            database_url: Some("postgresql://u:p@host:5432/db".to_string()),
            ..Default::default()
        };
        let err = open_store(&config, tmp.path()).err().unwrap();
        assert!(matches!(err, StoreError::Url(DbUrlError::UnsupportedScheme { .. })));
    }
}
