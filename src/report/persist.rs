//! Persisted summaries.
//!
//! Each config type is stored as two pretty-printed JSON files,
//! `<name>.entities.json` and `<name>.fields.json`. Maps are ordered, so
//! identical inputs produce identical files.

use crate::models::{ConfigTypeSection, ConfigTypeSummaries, EntitySummary, FieldSummary, SectionContent};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Path of the by-entity summary for a config type.
pub fn entities_file(dir: &Path, config_type: &str) -> PathBuf {
    dir.join(format!("{}.entities.json", config_type))
}

/// Path of the by-field summary for a config type.
pub fn fields_file(dir: &Path, config_type: &str) -> PathBuf {
    dir.join(format!("{}.fields.json", config_type))
}

/// Write both summaries of a config type into `dir`.
pub fn write_summaries(dir: &Path, summaries: &ConfigTypeSummaries) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    write_json_atomic(&entities_file(dir, &summaries.config_type), &summaries.entities)?;
    write_json_atomic(&fields_file(dir, &summaries.config_type), &summaries.fields)?;

    debug!(
        "Persisted summaries for '{}' to {}",
        summaries.config_type,
        dir.display()
    );
    Ok(())
}

/// Load both summaries of a config type.
///
/// Returns `Ok(None)` when either file is missing.
pub fn load_summaries(dir: &Path, config_type: &str) -> Result<Option<(EntitySummary, FieldSummary)>> {
    let entities_path = entities_file(dir, config_type);
    let fields_path = fields_file(dir, config_type);

    if !entities_path.exists() || !fields_path.exists() {
        return Ok(None);
    }

    let entities = read_json(&entities_path)?;
    let fields = read_json(&fields_path)?;
    Ok(Some((entities, fields)))
}

/// Load a config type as a report section.
///
/// Missing or unreadable summaries become an unavailable section rather
/// than an error, so one broken config type never sinks the report.
pub fn load_section(dir: &Path, config_type: &str) -> ConfigTypeSection {
    match load_summaries(dir, config_type) {
        Ok(Some((entities, fields))) => ConfigTypeSection {
            name: config_type.to_string(),
            content: SectionContent::Available {
                stats: None,
                entities,
                fields,
            },
        },
        Ok(None) => ConfigTypeSection::unavailable(config_type, "No persisted summaries found"),
        Err(e) => {
            warn!("Failed to load summaries for '{}': {:#}", config_type, e);
            ConfigTypeSection::unavailable(config_type, format!("{:#}", e))
        }
    }
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;

    serde_json::to_writer_pretty(&mut file, value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    file.write_all(b"\n")?;

    file.persist(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}
