//! RNC operations
//!
//! [`RncService`] ties a record store to object storage and enforces the
//! rules that hold regardless of backend: status changes go through
//! [`crate::core::workflow`], photo bytes and photo references stay in step,
//! and every write needs a [`QualitySession`].

use std::io::{Read, Write};
use std::path::Path;

use chrono::{DateTime, Local, Utc};
use miette::Diagnostic;
use thiserror::Error;

use crate::core::auth::QualitySession;
use crate::core::config::{Backend, Config};
use crate::core::csvio::{self, CsvError, ExportOptions, ImportOptions, ImportStats};
use crate::core::numbering::RncNumber;
use crate::core::objstore::{FsObjectStore, ObjectStore, StorageError};
use crate::core::pdf::{self, PdfError};
use crate::core::store::{open_store, RncStore, StoreError};
use crate::core::workflow::{self, WorkflowError};
use crate::entities::rnc::{NewRnc, PhotoCategory, PhotoRef, Rnc, RncAction, RncPatch};

#[derive(Debug, Error, Diagnostic)]
pub enum ServiceError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Csv(#[from] CsvError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Pdf(#[from] PdfError),

    #[error("title must not be empty")]
    EmptyTitle,

    #[error("photo '{key}' is not attached to RNC {number}")]
    #[diagnostic(help("run `rnc photo list {number}` to see attached photos"))]
    PhotoNotAttached { number: RncNumber, key: String },
}

pub type Result<T> = std::result::Result<T, ServiceError>;

pub struct RncService {
    store: Box<dyn RncStore>,
    objects: Box<dyn ObjectStore>,
}

impl RncService {
    pub fn new(store: Box<dyn RncStore>, objects: Box<dyn ObjectStore>) -> Self {
        Self { store, objects }
    }

    /// Open the configured backend and photo bucket for a project rooted at `root`
    pub fn open(config: &Config, root: &Path) -> Result<Self> {
        let store = open_store(config, root)?;
        let objects = FsObjectStore::new(config.storage_dir(root), config.public_base_url.clone());
        Ok(Self::new(store, Box::new(objects)))
    }

    pub fn backend(&self) -> Backend {
        self.store.backend()
    }

    pub fn create(&mut self, session: &QualitySession, new: NewRnc) -> Result<Rnc> {
        self.create_at(session, new, Utc::now())
    }

    /// Create with an explicit timestamp; the number's year comes from `now`
    pub fn create_at(
        &mut self,
        session: &QualitySession,
        mut new: NewRnc,
        now: DateTime<Utc>,
    ) -> Result<Rnc> {
        new.title = new.title.trim().to_string();
        if new.title.is_empty() {
            return Err(ServiceError::EmptyTitle);
        }
        let rnc = self.store.create(new, now)?;
        tracing::debug!(number = %rnc.number, actor = session.actor(), "created by");
        Ok(rnc)
    }

    /// All records, newest first
    pub fn list(&self) -> Result<Vec<Rnc>> {
        Ok(self.store.list()?)
    }

    pub fn get(&self, number: RncNumber) -> Result<Rnc> {
        Ok(self.store.require(number)?)
    }

    pub fn edit(
        &mut self,
        session: &QualitySession,
        number: RncNumber,
        patch: &RncPatch,
    ) -> Result<Rnc> {
        if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(ServiceError::EmptyTitle);
        }
        if patch.is_empty() {
            return self.get(number);
        }
        let mut patch = patch.clone();
        if let Some(title) = patch.title.as_mut() {
            *title = title.trim().to_string();
        }
        let rnc = self.store.update(number, &patch)?;
        tracing::debug!(%number, actor = session.actor(), "edited by");
        Ok(rnc)
    }

    pub fn close(&mut self, session: &QualitySession, number: RncNumber, note: &str) -> Result<Rnc> {
        self.apply(session, number, RncAction::Close, note, Utc::now())
    }

    pub fn reopen(
        &mut self,
        session: &QualitySession,
        number: RncNumber,
        note: &str,
    ) -> Result<Rnc> {
        self.apply(session, number, RncAction::Reopen, note, Utc::now())
    }

    pub fn cancel(
        &mut self,
        session: &QualitySession,
        number: RncNumber,
        note: &str,
    ) -> Result<Rnc> {
        self.apply(session, number, RncAction::Cancel, note, Utc::now())
    }

    /// Validate `action` against the current status and persist the resulting event
    pub fn apply(
        &mut self,
        session: &QualitySession,
        number: RncNumber,
        action: RncAction,
        note: &str,
        at: DateTime<Utc>,
    ) -> Result<Rnc> {
        let current = self.store.require(number)?;
        let event = workflow::transition(action, current.status, note, session.actor(), at)?;
        Ok(self.store.record_event(number, event)?)
    }

    /// Upload a photo and attach its reference
    pub fn attach_photo(
        &mut self,
        session: &QualitySession,
        number: RncNumber,
        category: PhotoCategory,
        filename: &str,
        bytes: &[u8],
    ) -> Result<PhotoRef> {
        self.store.require(number)?;

        let uploaded = Utc::now();
        let key = photo_key(number, category, uploaded, &sanitize_filename(filename));
        self.objects.put(&key, bytes, false)?;

        let photo = PhotoRef {
            url: self.objects.public_url(&key),
            key,
            category,
            filename: match base_name(filename) {
                "" => "photo".to_string(),
                base => base.to_string(),
            },
            uploaded,
        };

        if let Err(e) = self.store.add_photo(number, photo.clone()) {
            // Don't leave an unreferenced object behind
            if let Err(cleanup) = self.objects.delete(&photo.key) {
                tracing::warn!(key = %photo.key, error = %cleanup, "failed to remove orphaned photo");
            }
            return Err(e.into());
        }

        tracing::info!(%number, key = %photo.key, actor = session.actor(), "photo attached");
        Ok(photo)
    }

    /// Download a photo attached to `number`
    pub fn fetch_photo(&self, number: RncNumber, key: &str) -> Result<(PhotoRef, Vec<u8>)> {
        let rnc = self.store.require(number)?;
        let photo = rnc
            .photos
            .into_iter()
            .find(|p| p.key == key)
            .ok_or_else(|| ServiceError::PhotoNotAttached {
                number,
                key: key.to_string(),
            })?;
        let bytes = self.objects.get(&photo.key)?;
        Ok((photo, bytes))
    }

    /// Detach a photo and delete its object
    pub fn detach_photo(
        &mut self,
        session: &QualitySession,
        number: RncNumber,
        key: &str,
    ) -> Result<PhotoRef> {
        let photo = self
            .store
            .remove_photo(number, key)?
            .ok_or_else(|| ServiceError::PhotoNotAttached {
                number,
                key: key.to_string(),
            })?;

        match self.objects.delete(&photo.key) {
            Ok(()) | Err(StorageError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
        tracing::info!(%number, key, actor = session.actor(), "photo detached");
        Ok(photo)
    }

    /// Hard-delete a record; photo objects are removed best-effort
    pub fn delete(&mut self, session: &QualitySession, number: RncNumber) -> Result<Rnc> {
        let rnc = self.store.delete(number)?;
        for photo in &rnc.photos {
            if let Err(e) = self.objects.delete(&photo.key) {
                tracing::warn!(key = %photo.key, error = %e, "failed to delete photo object");
            }
        }
        tracing::info!(%number, actor = session.actor(), "deleted by");
        Ok(rnc)
    }

    /// Create one record per valid CSV row
    ///
    /// Without `skip_errors` any invalid row aborts the import before the
    /// first record is written.
    pub fn import_csv<R: Read>(
        &mut self,
        session: &QualitySession,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportStats> {
        let parsed = csvio::read_csv(reader, Local::now().date_naive())?;
        let mut stats = ImportStats {
            rows_processed: parsed.rows.len() + parsed.errors.len(),
            valid: parsed.rows.len(),
            errors: parsed.errors,
            ..Default::default()
        };

        if !options.skip_errors {
            if let Some(first) = stats.errors.first() {
                return Err(CsvError::from(first.clone()).into());
            }
        }
        if options.dry_run {
            return Ok(stats);
        }

        for row in parsed.rows {
            let rnc = self.create(session, row.new)?;
            stats.created.push(rnc.number);
        }
        tracing::info!(
            created = stats.created.len(),
            errors = stats.errors.len(),
            "CSV import finished"
        );
        Ok(stats)
    }

    /// Write every record as CSV, oldest first
    pub fn export_csv<W: Write>(&self, writer: W, options: ExportOptions) -> Result<usize> {
        let mut records = self.store.list()?;
        records.reverse();
        csvio::write_csv(writer, &records, options)?;
        Ok(records.len())
    }

    pub fn render_pdf(&self, number: RncNumber) -> Result<Vec<u8>> {
        let rnc = self.store.require(number)?;
        Ok(pdf::render(&rnc)?)
    }
}

/// `photos/{number}/{category}/{timestamp}_{filename}`
fn photo_key(
    number: RncNumber,
    category: PhotoCategory,
    uploaded: DateTime<Utc>,
    filename: &str,
) -> String {
    format!(
        "photos/{}/{}/{}_{}",
        number,
        category,
        uploaded.format("%Y%m%dT%H%M%S%3fZ"),
        filename
    )
}

/// Final path component, trimmed
fn base_name(filename: &str) -> &str {
    filename.rsplit(['/', '\\']).next().unwrap_or(filename).trim()
}

/// Base name of a file reduced to characters safe in a key or a local path
pub fn sanitize_filename(filename: &str) -> String {
    let cleaned: String = base_name(filename)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "photo".to_string()
    } else {
        cleaned.to_string()
    }
}
