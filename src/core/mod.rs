//! Core module - numbering, workflow, storage and the operations built on them

pub mod auth;
pub mod config;
pub mod csvio;
pub mod dburl;
pub mod numbering;
pub mod objstore;
pub mod pdf;
pub mod project;
pub mod service;
pub mod store;
pub mod workflow;

pub use auth::{AuthError, QualityGate, QualitySession};
pub use config::{Backend, Config};
pub use numbering::{RncNumber, RncNumberError};
pub use objstore::{FsObjectStore, ObjectStore, StorageError};
pub use project::{Project, ProjectError};
pub use service::{RncService, ServiceError};
pub use store::{open_store, JsonBlobStore, RncStore, SqliteStore, StoreError};
pub use workflow::WorkflowError;
