//! Document store loading.
//!
//! This module reads one config type's documents for every entity from
//! the entities directory. Each non-hidden subdirectory is an entity.
//! Documents that are missing, unreadable, oversized or not valid JSON
//! end up absent; they are never handed on half-parsed.

use crate::config::{ConfigTypeSpec, Layout};
use crate::models::EntityId;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

pub type Result<T> = std::result::Result<T, StoreError>;

/// Failure to produce a document or an entity listing.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("entities directory not found: {}", .0.display())]
    MissingRoot(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{} is {size} bytes, over the {limit} byte limit", .path.display())]
    TooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("failed to walk {}: {source}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Documents of one config type, keyed by entity.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentStore {
    /// One optional document per entity.
    Single(BTreeMap<EntityId, Option<Value>>),
    /// Optional documents per entity, keyed by relative file path.
    Multi(BTreeMap<EntityId, BTreeMap<String, Option<Value>>>),
}

impl DocumentStore {
    /// Number of entities in the store.
    pub fn entity_count(&self) -> usize {
        match self {
            DocumentStore::Single(docs) => docs.len(),
            DocumentStore::Multi(docs) => docs.len(),
        }
    }

    /// Number of documents that were actually loaded.
    pub fn document_count(&self) -> usize {
        match self {
            DocumentStore::Single(docs) => docs.values().filter(|d| d.is_some()).count(),
            DocumentStore::Multi(docs) => docs
                .values()
                .flat_map(|files| files.values())
                .filter(|d| d.is_some())
                .count(),
        }
    }
}

/// Settings for document loading.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Entity directory names to ignore.
    pub excludes: Vec<String>,
    /// Maximum document size in bytes.
    pub max_document_size: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            excludes: Vec::new(),
            max_document_size: 1024 * 1024,
        }
    }
}

impl From<&crate::config::SourcesConfig> for LoaderConfig {
    fn from(config: &crate::config::SourcesConfig) -> Self {
        Self {
            excludes: config.excludes.clone(),
            max_document_size: config.max_document_size,
        }
    }
}

/// Loads document stores from an entities directory.
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    config: LoaderConfig,
    root: PathBuf,
}

impl DocumentLoader {
    /// Create a new loader.
    pub fn new(root: PathBuf, config: LoaderConfig) -> Self {
        Self { config, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List entity ids, sorted.
    pub fn entities(&self) -> Result<Vec<EntityId>> {
        if !self.root.is_dir() {
            return Err(StoreError::MissingRoot(self.root.clone()));
        }

        let entries = fs::read_dir(&self.root).map_err(|source| StoreError::Read {
            path: self.root.clone(),
            source,
        })?;

        let mut entities: Vec<EntityId> = entries
            .flatten()
            .filter(|entry| entry.path().is_dir())
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .filter(|name| !self.is_excluded(name))
            .collect();

        entities.sort();
        Ok(entities)
    }

    /// Load all documents of one config type.
    pub fn load(&self, spec: &ConfigTypeSpec) -> Result<DocumentStore> {
        let entities = self.entities()?;
        debug!(
            "Loading '{}' for {} entities from {}",
            spec.name,
            entities.len(),
            self.root.display()
        );

        let store = match spec.layout {
            Layout::Single => DocumentStore::Single(
                entities
                    .into_iter()
                    .map(|entity| {
                        let path = self.root.join(&entity).join(&spec.path);
                        let document = self.load_document(&path);
                        (entity, document)
                    })
                    .collect(),
            ),
            Layout::Multi => {
                let mut docs = BTreeMap::new();
                for entity in entities {
                    let dir = self.root.join(&entity).join(&spec.path);
                    let files = self.load_directory(&dir, &spec.extension);
                    docs.insert(entity, files);
                }
                DocumentStore::Multi(docs)
            }
        };

        Ok(store)
    }

    /// Read and parse one document. A missing file is `Ok(None)`.
    pub fn read_document(&self, path: &Path) -> Result<Option<Value>> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        if metadata.len() > self.config.max_document_size {
            return Err(StoreError::TooLarge {
                path: path.to_path_buf(),
                size: metadata.len(),
                limit: self.config.max_document_size,
            });
        }

        let content = fs::read_to_string(path).map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let value = serde_json::from_str(&content).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Some(value))
    }

    /// Read a document, downgrading any failure to an absent document.
    fn load_document(&self, path: &Path) -> Option<Value> {
        match self.read_document(path) {
            Ok(document) => document,
            Err(e) => {
                warn!("Skipping document: {}", e);
                None
            }
        }
    }

    /// Load every matching document below `dir`, keyed by `/`-separated
    /// path relative to `dir`.
    fn load_directory(&self, dir: &Path, extension: &str) -> BTreeMap<String, Option<Value>> {
        let mut files = BTreeMap::new();
        if !dir.is_dir() {
            return files;
        }

        let walker = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(source) => {
                    let e = StoreError::Walk {
                        path: dir.to_path_buf(),
                        source,
                    };
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !has_extension(entry.path(), extension) {
                continue;
            }

            let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            files.insert(key, self.load_document(entry.path()));
        }

        files
    }

    /// Check if an entity directory name is excluded.
    fn is_excluded(&self, name: &str) -> bool {
        // Hidden directories
        if name.starts_with('.') {
            return true;
        }

        self.config.excludes.iter().any(|pattern| name == pattern)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}
