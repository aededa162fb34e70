//! Per-config-type orchestration.
//!
//! Each config type runs its own pipeline: load documents, extract and
//! merge them entity by entity, then build both summaries. Pipelines share
//! nothing and run concurrently, one blocking task each.

use super::extract;
use super::summary::{build_entity_summary, build_field_summary};
use crate::config::ConfigTypeSpec;
use crate::models::{ConfigTypeAggregate, ConfigTypeSummaries, EntityId, RunStats};
use crate::store::{DocumentLoader, DocumentStore};
use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Outcome of one config type pipeline.
#[derive(Debug)]
pub struct PipelineResult {
    pub config_type: String,
    pub summaries: Result<ConfigTypeSummaries>,
}

/// Whether a loaded document counts as missing.
///
/// `null`, `false`, `0` and `""` are skipped like absent files. An empty
/// object or array is a real document.
pub fn is_falsy(document: &Value) -> bool {
    match document {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Analyze one config type's document store.
pub fn analyze(config_type: &str, store: &DocumentStore) -> ConfigTypeSummaries {
    let mut aggregate = ConfigTypeAggregate::new();
    let mut stats = RunStats {
        entities: store.entity_count(),
        ..RunStats::default()
    };

    match store {
        DocumentStore::Single(docs) => {
            merge_single(config_type, docs, &mut aggregate, &mut stats);
        }
        DocumentStore::Multi(docs) => {
            merge_multi(config_type, docs, &mut aggregate, &mut stats);
        }
    }

    stats.fields = aggregate.len();
    debug!(
        "'{}': merged {} documents from {} entities, skipped {}, {} fields",
        config_type,
        stats.documents_merged,
        aggregate.entities().len(),
        stats.documents_skipped,
        stats.fields
    );

    ConfigTypeSummaries {
        config_type: config_type.to_string(),
        stats,
        entities: build_entity_summary(&aggregate),
        fields: build_field_summary(&aggregate),
    }
}

fn merge_single(
    config_type: &str,
    docs: &BTreeMap<EntityId, Option<Value>>,
    aggregate: &mut ConfigTypeAggregate,
    stats: &mut RunStats,
) {
    for (entity, document) in docs {
        match document.as_ref().filter(|d| !is_falsy(d)) {
            Some(document) => {
                aggregate.merge(entity, &extract(document, config_type));
                stats.documents_merged += 1;
            }
            None => {
                debug!("'{}': no document for {}", config_type, entity);
                stats.documents_skipped += 1;
            }
        }
    }
}

fn merge_multi(
    config_type: &str,
    docs: &BTreeMap<EntityId, BTreeMap<String, Option<Value>>>,
    aggregate: &mut ConfigTypeAggregate,
    stats: &mut RunStats,
) {
    for (entity, files) in docs {
        for (file, document) in files {
            match document.as_ref().filter(|d| !is_falsy(d)) {
                Some(document) => {
                    aggregate.merge(entity, &extract(document, config_type));
                    stats.documents_merged += 1;
                }
                None => {
                    debug!("'{}': skipping {}/{}", config_type, entity, file);
                    stats.documents_skipped += 1;
                }
            }
        }
    }
}

/// Load and analyze one config type.
pub fn run_pipeline(loader: &DocumentLoader, spec: &ConfigTypeSpec) -> Result<ConfigTypeSummaries> {
    let store = loader
        .load(spec)
        .with_context(|| format!("Failed to load documents for '{}'", spec.name))?;
    Ok(analyze(&spec.name, &store))
}

/// Run every config type pipeline concurrently.
///
/// Results come back in the order of `specs`. A failing pipeline only
/// affects its own result.
pub async fn analyze_all(loader: &DocumentLoader, specs: &[ConfigTypeSpec]) -> Vec<PipelineResult> {
    let handles = specs.iter().map(|spec| {
        let loader = loader.clone();
        let spec = spec.clone();
        tokio::task::spawn_blocking(move || run_pipeline(&loader, &spec))
    });

    let joined = futures::future::join_all(handles).await;

    specs
        .iter()
        .zip(joined)
        .map(|(spec, outcome)| {
            let summaries = outcome
                .map_err(|e| anyhow!("Pipeline for '{}' panicked: {}", spec.name, e))
                .and_then(|result| result);

            if let Ok(ref s) = summaries {
                info!(
                    "Analyzed '{}': {} entities, {} documents, {} fields",
                    spec.name, s.stats.entities, s.stats.documents_merged, s.stats.fields
                );
            }

            PipelineResult {
                config_type: spec.name.clone(),
                summaries,
            }
        })
        .collect()
}
