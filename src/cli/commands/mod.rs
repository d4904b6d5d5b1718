//! CLI command implementations

pub mod completions;
pub mod config;
pub mod export;
pub mod import;
pub mod init;
pub mod pdf;
pub mod photo;
pub mod record;
pub mod report;
pub mod status;
