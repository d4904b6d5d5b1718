//! RNC: non-conformance report tracker
//!
//! Registers non-conformance reports under sequential per-year numbers
//! (`2025-001`, `2025-002`, ...), tracks their status through a small
//! workflow, keeps photos in object storage and exchanges records as CSV
//! and PDF.

pub mod cli;
pub mod core;
pub mod entities;
