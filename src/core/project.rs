//! Project discovery and structure
//!
//! A project is a directory holding `.rnc/`: configuration, the default
//! SQLite database and the default object storage bucket.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::config::DEFAULT_STORAGE_DIR;

/// Name of the project marker directory
pub const PROJECT_DIR: &str = ".rnc";

/// Represents an RNC project
#[derive(Debug, Clone)]
pub struct Project {
    /// Root directory of the project (parent of .rnc/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current =
            std::env::current_dir().map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(PROJECT_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create a new project structure at the given path
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        if root.join(PROJECT_DIR).exists() {
            return Err(ProjectError::AlreadyExists(root));
        }

        Self::create_structure(root)
    }

    /// Force initialization even if .rnc/ exists (rewrites the config file)
    pub fn init_force(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Self::create_structure(root)
    }

    fn create_structure(root: PathBuf) -> Result<Self, ProjectError> {
        let rnc_dir = root.join(PROJECT_DIR);
        std::fs::create_dir_all(root.join(DEFAULT_STORAGE_DIR))
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        std::fs::write(rnc_dir.join("config.yaml"), Self::default_config())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        // The database and bucket are local state, never committed
        std::fs::write(rnc_dir.join(".gitignore"), "rnc.db*\nobjects/\n")
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        Ok(Self { root })
    }

    fn default_config() -> &'static str {
        r#"# RNC Project Configuration

# Database connection string (SQLite). Relative paths resolve from the project root.
# database_url: sqlite://.rnc/rnc.db

# Record backend: sql (tables in the database) or json (one document in object storage)
# backend: sql

# Object storage directory for photos
# storage_dir: .rnc/objects

# Base URL under which stored photos are published
# public_base_url: https://files.example.com/rnc

# Quality-role password. Prefer the RNC_QUALITY_PASS environment variable.
# quality_pass: ""

# Name recorded on status changes (default: git user.name)
# author: ""
"#
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .rnc configuration directory
    pub fn rnc_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    /// Project configuration file
    pub fn config_path(&self) -> PathBuf {
        self.rnc_dir().join("config.yaml")
    }
}

/// Errors that can occur during project operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not an RNC project (searched from {searched_from:?}). Run 'rnc init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("RNC project already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}
