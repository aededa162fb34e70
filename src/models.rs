//! Data models for the field analyzer.
//!
//! This module contains the core data structures shared by the engine,
//! persistence and report rendering: field kinds, per-document extraction
//! results, per-config-type aggregates and the two derived summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Identifier of an entity (one independently-versioned content source).
pub type EntityId = String;

/// Dot-joined structural location of a value inside a document.
pub type FieldPath = String;

/// Path used for a document whose top level is a primitive or a
/// primitive-only array.
pub const ROOT_PATH: &str = "[root]";

/// Shape recorded for a field path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// A scalar or null leaf.
    Primitive,
    /// An array holding scalar elements.
    Array,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Primitive => write!(f, "primitive"),
            FieldKind::Array => write!(f, "array"),
        }
    }
}

/// A field as observed inside a single document, without provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalField {
    pub kind: FieldKind,
    pub values: BTreeSet<String>,
}

/// Result of extracting one document.
pub type ExtractedFields = BTreeMap<FieldPath, LocalField>;

/// Everything known about one field path within one config type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAggregate {
    /// First kind observed for this path.
    pub kind: FieldKind,
    /// Values contributed by each entity.
    pub per_entity: BTreeMap<EntityId, BTreeSet<String>>,
    /// Union of all per-entity value sets.
    pub all_values: BTreeSet<String>,
}

impl FieldAggregate {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            per_entity: BTreeMap::new(),
            all_values: BTreeSet::new(),
        }
    }
}

/// Field aggregates for exactly one config type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigTypeAggregate {
    pub fields: BTreeMap<FieldPath, FieldAggregate>,
}

/// One row of the by-entity view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityFieldUsage {
    pub path: FieldPath,
    pub kind: FieldKind,
    /// Sorted values this entity uses for the field.
    pub values: Vec<String>,
}

/// By-entity view: entity -> field rows ordered by path.
pub type EntitySummary = BTreeMap<EntityId, Vec<EntityFieldUsage>>;

/// Values one entity contributed to a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityValues {
    pub entity: EntityId,
    pub values: Vec<String>,
}

/// One entry of the by-field view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldUsage {
    pub kind: FieldKind,
    /// Contributing entities ordered by id.
    pub entities: Vec<EntityValues>,
    /// Sorted distinct values across all entities.
    pub all_values: Vec<String>,
}

/// By-field view: field path -> usage.
pub type FieldSummary = BTreeMap<FieldPath, FieldUsage>;

/// Counters collected while analyzing one config type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Entities present in the document store.
    pub entities: usize,
    /// Documents extracted and merged.
    pub documents_merged: usize,
    /// Absent or falsy documents that were skipped.
    pub documents_skipped: usize,
    /// Distinct field paths in the finished aggregate.
    pub fields: usize,
}

/// Both summaries of one config type plus run statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigTypeSummaries {
    pub config_type: String,
    pub stats: RunStats,
    pub entities: EntitySummary,
    pub fields: FieldSummary,
}

/// Version of an entity checkout used for the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityVersion {
    pub id: EntityId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Short commit hash, if the checkout could be inspected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

/// Metadata about the rendered report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Directory the entity documents were read from.
    pub entities_dir: String,
    /// Versions of fetched entity checkouts.
    pub entity_versions: Vec<EntityVersion>,
    /// Number of config types with summaries.
    pub config_types_available: usize,
    /// Number of config types that could not be loaded.
    pub config_types_unavailable: usize,
    /// Duration of the run in seconds.
    pub duration_seconds: f64,
}

/// Content of one config type section in the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SectionContent {
    Available {
        /// Missing when the report was rendered from persisted summaries only.
        #[serde(skip_serializing_if = "Option::is_none")]
        stats: Option<RunStats>,
        entities: EntitySummary,
        fields: FieldSummary,
    },
    Unavailable {
        reason: String,
    },
}

/// One config type in the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigTypeSection {
    pub name: String,
    #[serde(flatten)]
    pub content: SectionContent,
}

impl ConfigTypeSection {
    /// Creates an available section from freshly built summaries.
    pub fn from_summaries(summaries: ConfigTypeSummaries) -> Self {
        Self {
            name: summaries.config_type,
            content: SectionContent::Available {
                stats: Some(summaries.stats),
                entities: summaries.entities,
                fields: summaries.fields,
            },
        }
    }

    /// Creates a section for a config type that could not be loaded.
    pub fn unavailable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: SectionContent::Unavailable {
                reason: reason.into(),
            },
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.content, SectionContent::Available { .. })
    }
}

/// The complete field usage report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub config_types: Vec<ConfigTypeSection>,
}
