//! Provenance-preserving aggregation of extracted fields.
//!
//! This module folds the fields extracted from one document into the
//! aggregate of its config type, tagging every value with the entity that
//! contributed it.

use crate::models::{ConfigTypeAggregate, ExtractedFields, FieldAggregate};
use std::collections::BTreeSet;

impl ConfigTypeAggregate {
    /// Create an empty aggregate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one document's extracted fields on behalf of `entity`.
    ///
    /// A field seen for the first time takes the extracted kind; later
    /// documents never change it. The entity gets a (possibly empty) value
    /// set for every extracted field, so re-running with the same input is
    /// a no-op.
    pub fn merge(&mut self, entity: &str, extracted: &ExtractedFields) {
        for (path, local) in extracted {
            let aggregate = self
                .fields
                .entry(path.clone())
                .or_insert_with(|| FieldAggregate::new(local.kind));

            let entity_values = aggregate.per_entity.entry(entity.to_string()).or_default();
            for value in &local.values {
                entity_values.insert(value.clone());
                aggregate.all_values.insert(value.clone());
            }
        }

        debug_assert!(self.is_consistent());
    }

    /// Number of distinct field paths.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Entities that contributed at least one field.
    pub fn entities(&self) -> BTreeSet<&str> {
        self.fields
            .values()
            .flat_map(|f| f.per_entity.keys().map(String::as_str))
            .collect()
    }

    /// Check that every field's `all_values` equals the union of its
    /// per-entity value sets.
    pub fn is_consistent(&self) -> bool {
        self.fields.values().all(|field| {
            let union: BTreeSet<&String> = field.per_entity.values().flatten().collect();
            union.len() == field.all_values.len()
                && field.all_values.iter().all(|v| union.contains(v))
        })
    }
}
