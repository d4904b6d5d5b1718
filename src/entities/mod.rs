//! Entity type definitions
//!
//! - [`Rnc`] - a non-conformance report with its status history and photos

pub mod rnc;

pub use rnc::{NewRnc, PhotoCategory, PhotoRef, Rnc, RncAction, RncEvent, RncPatch, RncStatus};
