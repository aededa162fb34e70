//! Entity repository acquisition.
//!
//! Clones or reuses per-entity git checkouts and reports their versions.

pub mod cloner;

pub use cloner::{fetch_entities, validate_entity_id};
