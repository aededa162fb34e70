//! Config field analysis engine.
//!
//! Extraction turns one document into field observations, the aggregator
//! merges them per entity, and the summary builders derive the by-entity
//! and by-field views. The driver runs one such pipeline per config type.

pub mod aggregator;
pub mod driver;
pub mod extractor;
pub mod summary;

pub use driver::analyze_all;
pub use extractor::extract;
