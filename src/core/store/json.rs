//! Record store kept as one JSON document in object storage
//!
//! Every operation reads the whole document and every mutation writes it
//! back. Numbering takes the larger of the document's per-year counter and
//! the highest stored sequence, plus one. Two processes creating records at
//! the same moment can still pick the same number; the last writer wins.
//! Use the SQL backend where concurrent submissions are expected.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{numbering_year, RncStore, StoreError};
use crate::core::config::Backend;
use crate::core::numbering::RncNumber;
use crate::core::objstore::{ObjectStore, StorageError};
use crate::entities::rnc::{NewRnc, PhotoRef, Rnc, RncEvent, RncPatch};

/// Key of the record document inside the bucket
pub const RECORDS_KEY: &str = "rnc/records.json";

const DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct RecordDocument {
    version: u32,
    /// Last sequence handed out per year, so deleted numbers stay retired
    #[serde(default)]
    last_seq: BTreeMap<i32, u32>,
    #[serde(default)]
    records: Vec<Rnc>,
}

impl Default for RecordDocument {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION,
            last_seq: BTreeMap::new(),
            records: Vec::new(),
        }
    }
}

impl RecordDocument {
    fn find_mut(&mut self, number: RncNumber) -> Result<&mut Rnc, StoreError> {
        self.records
            .iter_mut()
            .find(|r| r.number == number)
            .ok_or(StoreError::NotFound(number))
    }
}

/// The record store backed by a JSON document
pub struct JsonBlobStore<O: ObjectStore> {
    objects: O,
}

impl<O: ObjectStore> JsonBlobStore<O> {
    pub fn new(objects: O) -> Self {
        Self { objects }
    }

    fn load(&self) -> Result<RecordDocument, StoreError> {
        let bytes = match self.objects.get(RECORDS_KEY) {
            Ok(bytes) => bytes,
            Err(StorageError::NotFound(_)) => return Ok(RecordDocument::default()),
            Err(e) => return Err(e.into()),
        };
        let doc: RecordDocument = serde_json::from_slice(&bytes)?;
        if doc.version > DOCUMENT_VERSION {
            return Err(StoreError::SchemaTooNew {
                found: i64::from(doc.version),
                supported: i64::from(DOCUMENT_VERSION),
            });
        }
        Ok(doc)
    }

    fn save(&self, doc: &RecordDocument) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(doc)?;
        self.objects.put(RECORDS_KEY, &bytes, true)?;
        Ok(())
    }
}

impl<O: ObjectStore> RncStore for JsonBlobStore<O> {
    fn backend(&self) -> Backend {
        Backend::Json
    }

    fn create(&mut self, new: NewRnc, now: DateTime<Utc>) -> Result<Rnc, StoreError> {
        let mut doc = self.load()?;
        let year = numbering_year(now);
        let scanned = RncNumber::next_after(year, doc.records.iter().map(|r| &r.number));
        let retired = doc.last_seq.get(&year).copied().unwrap_or(0);
        let number = RncNumber::new(year, scanned.seq().max(retired + 1))?;
        doc.last_seq.insert(year, number.seq());

        let rnc = Rnc::from_new(number, new, now);
        doc.records.push(rnc.clone());
        self.save(&doc)?;

        tracing::info!(%number, "RNC created");
        Ok(rnc)
    }

    fn list(&self) -> Result<Vec<Rnc>, StoreError> {
        let mut records = self.load()?.records;
        records.sort_by(|a, b| b.number.cmp(&a.number));
        Ok(records)
    }

    fn get(&self, number: RncNumber) -> Result<Option<Rnc>, StoreError> {
        Ok(self
            .load()?
            .records
            .into_iter()
            .find(|r| r.number == number))
    }

    fn update(&mut self, number: RncNumber, patch: &RncPatch) -> Result<Rnc, StoreError> {
        let mut doc = self.load()?;
        let rnc = doc.find_mut(number)?;
        patch.apply_to(rnc);
        let updated = rnc.clone();
        self.save(&doc)?;

        tracing::info!(%number, "RNC updated");
        Ok(updated)
    }

    fn record_event(&mut self, number: RncNumber, event: RncEvent) -> Result<Rnc, StoreError> {
        let mut doc = self.load()?;
        let rnc = doc.find_mut(number)?;
        if rnc.status != event.from {
            return Err(StoreError::StatusConflict {
                number,
                expected: event.from,
                actual: rnc.status,
            });
        }

        tracing::info!(%number, action = %event.action, to = %event.to, "RNC status changed");
        rnc.status = event.to;
        rnc.events.push(event);
        let updated = rnc.clone();
        self.save(&doc)?;
        Ok(updated)
    }

    fn add_photo(&mut self, number: RncNumber, photo: PhotoRef) -> Result<Rnc, StoreError> {
        let mut doc = self.load()?;
        let rnc = doc.find_mut(number)?;
        if rnc.photos.iter().any(|p| p.key == photo.key) {
            return Err(StoreError::DuplicatePhoto {
                number,
                key: photo.key,
            });
        }
        rnc.photos.push(photo);
        let updated = rnc.clone();
        self.save(&doc)?;
        Ok(updated)
    }

    fn remove_photo(
        &mut self,
        number: RncNumber,
        key: &str,
    ) -> Result<Option<PhotoRef>, StoreError> {
        let mut doc = self.load()?;
        let rnc = doc.find_mut(number)?;
        let Some(pos) = rnc.photos.iter().position(|p| p.key == key) else {
            return Ok(None);
        };
        let removed = rnc.photos.remove(pos);
        self.save(&doc)?;
        Ok(Some(removed))
    }

    fn delete(&mut self, number: RncNumber) -> Result<Rnc, StoreError> {
        let mut doc = self.load()?;
        let pos = doc
            .records
            .iter()
            .position(|r| r.number == number)
            .ok_or(StoreError::NotFound(number))?;
        let removed = doc.records.remove(pos);
        self.save(&doc)?;

        tracing::info!(%number, "RNC deleted");
        Ok(removed)
    }
}
