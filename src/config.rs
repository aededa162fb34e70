//! Configuration file handling.
//!
//! This module handles loading, validating and merging configuration from
//! `.fieldscope.toml` files.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = ".fieldscope.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Entity sources and document loading settings.
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Config types to analyze, in report order.
    #[serde(default = "default_config_types")]
    pub config_types: Vec<ConfigTypeSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            sources: SourcesConfig::default(),
            report: ReportConfig::default(),
            config_types: default_config_types(),
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory persisted summaries are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Rendered report path.
    #[serde(default = "default_report")]
    pub report: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            report: default_report(),
        }
    }
}

fn default_output_dir() -> String {
    "fieldscope-out".to_string()
}

fn default_report() -> String {
    "field_report.md".to_string()
}

/// Where entity documents come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Directory holding one subdirectory per entity.
    #[serde(default = "default_entities_dir")]
    pub entities_dir: String,

    /// Entity directory names to ignore.
    #[serde(default)]
    pub excludes: Vec<String>,

    /// Maximum document size in bytes.
    #[serde(default = "default_max_document_size")]
    pub max_document_size: u64,

    /// Depth for shallow clones of entity repositories.
    #[serde(default = "default_clone_depth")]
    pub clone_depth: i32,

    /// Entity repositories to fetch into `entities_dir`.
    #[serde(default)]
    pub entities: Vec<EntitySource>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            entities_dir: default_entities_dir(),
            excludes: Vec::new(),
            max_document_size: default_max_document_size(),
            clone_depth: default_clone_depth(),
            entities: Vec::new(),
        }
    }
}

fn default_entities_dir() -> String {
    "entities".to_string()
}

fn default_max_document_size() -> u64 {
    1024 * 1024 // 1MB
}

fn default_clone_depth() -> i32 {
    1
}

/// A git repository providing one entity's documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySource {
    /// Entity id, also the checkout directory name.
    pub id: String,
    /// Clone URL.
    pub url: String,
    /// Branch to check out (default branch if unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

/// How a config type's documents are laid out inside an entity directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// One document at a fixed relative file path.
    Single,
    /// Every matching file under a relative directory.
    Multi,
}

/// One analyzed config type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigTypeSpec {
    /// Config type name; `default-config` enables settings collapsing.
    pub name: String,
    pub layout: Layout,
    /// File (single) or directory (multi) relative to the entity directory.
    pub path: String,
    /// Document file extension for the multi layout.
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl ConfigTypeSpec {
    pub fn single(name: &str, file: &str) -> Self {
        Self {
            name: name.to_string(),
            layout: Layout::Single,
            path: file.to_string(),
            extension: default_extension(),
        }
    }

    pub fn multi(name: &str, dir: &str) -> Self {
        Self {
            name: name.to_string(),
            layout: Layout::Multi,
            path: dir.to_string(),
            extension: default_extension(),
        }
    }
}

fn default_extension() -> String {
    "json".to_string()
}

fn default_config_types() -> Vec<ConfigTypeSpec> {
    vec![
        ConfigTypeSpec::single("default-config", "default-config.json"),
        ConfigTypeSpec::single("mod-info", "mod.json"),
        ConfigTypeSpec::single("manifest", "manifest.json"),
        ConfigTypeSpec::single("permissions", "permissions.json"),
        ConfigTypeSpec::multi("presets", "presets"),
        ConfigTypeSpec::multi("translations", "lang"),
    ]
}

/// Report rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Values listed per field before truncating.
    #[serde(default = "default_max_values_shown")]
    pub max_values_shown: usize,

    /// Include the by-entity listing for each config type.
    #[serde(default = "default_true")]
    pub include_entity_view: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_values_shown: default_max_values_shown(),
            include_entity_view: true,
        }
    }
}

fn default_max_values_shown() -> usize {
    10
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings when given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref root) = args.root {
            self.sources.entities_dir = root.display().to_string();
        }
        if let Some(ref output_dir) = args.output_dir {
            self.general.output_dir = output_dir.display().to_string();
        }
        if let Some(ref report) = args.report {
            self.general.report = report.display().to_string();
        }
    }

    /// Check the configuration for conflicting or unusable entries.
    pub fn validate(&self) -> Result<()> {
        if self.config_types.is_empty() {
            bail!("At least one config type must be configured");
        }

        let mut names = BTreeSet::new();
        for spec in &self.config_types {
            if spec.name.trim().is_empty() {
                bail!("Config type names must not be empty");
            }
            if !names.insert(spec.name.as_str()) {
                bail!("Duplicate config type: {}", spec.name);
            }
            if spec.path.trim().is_empty() {
                bail!("Config type '{}' has an empty path", spec.name);
            }
        }

        let mut ids = BTreeSet::new();
        for source in &self.sources.entities {
            crate::repo::validate_entity_id(&source.id)?;
            if !ids.insert(source.id.as_str()) {
                bail!("Duplicate entity source: {}", source.id);
            }
        }

        if self.sources.clone_depth < 0 {
            bail!("Clone depth must not be negative");
        }

        Ok(())
    }

    /// Resolve the config types to run, honoring `--only`.
    ///
    /// Keeps configured order. Unknown names are an error.
    pub fn select_config_types(&self, only: Option<&[String]>) -> Result<Vec<ConfigTypeSpec>> {
        let Some(only) = only else {
            return Ok(self.config_types.clone());
        };

        for name in only {
            if !self.config_types.iter().any(|spec| &spec.name == name) {
                let known: Vec<&str> = self.config_types.iter().map(|s| s.name.as_str()).collect();
                bail!(
                    "Unknown config type '{}' (configured: {})",
                    name,
                    known.join(", ")
                );
            }
        }

        Ok(self
            .config_types
            .iter()
            .filter(|spec| only.contains(&spec.name))
            .cloned()
            .collect())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.output_dir, "fieldscope-out");
        assert_eq!(config.config_types.len(), 6);
        assert!(config.validate().is_ok());

        let multi = config
            .config_types
            .iter()
            .filter(|c| c.layout == Layout::Multi)
            .count();
        assert_eq!(multi, 2);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output_dir = "out"

[sources]
entities_dir = "mods"
excludes = ["broken-mod"]

[[sources.entities]]
id = "alpha"
url = "https://example.com/alpha.git"
branch = "main"

[[config_types]]
name = "default-config"
layout = "single"
path = "default-config.json"

[[config_types]]
name = "presets"
layout = "multi"
path = "presets"
extension = "jsonc"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output_dir, "out");
        assert_eq!(config.sources.entities_dir, "mods");
        assert_eq!(config.sources.excludes, vec!["broken-mod"]);
        assert_eq!(config.sources.entities[0].branch.as_deref(), Some("main"));
        assert_eq!(config.config_types.len(), 2);
        assert_eq!(config.config_types[0].extension, "json");
        assert_eq!(config.config_types[1].layout, Layout::Multi);
        assert_eq!(config.config_types[1].extension, "jsonc");
        assert_eq!(config.report.max_values_shown, 10);
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let mut config = Config::default();
        config
            .config_types
            .push(ConfigTypeSpec::single("manifest", "other.json"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_entity_id() {
        let mut config = Config::default();
        config.sources.entities.push(EntitySource {
            id: "../escape".to_string(),
            url: "https://example.com/x.git".to_string(),
            branch: None,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_select_config_types() {
        let config = Config::default();

        let all = config.select_config_types(None).unwrap();
        assert_eq!(all.len(), 6);

        let only = vec!["presets".to_string(), "default-config".to_string()];
        let selected = config.select_config_types(Some(&only)).unwrap();
        let names: Vec<&str> = selected.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["default-config", "presets"]);

        let unknown = vec!["nope".to_string()];
        assert!(config.select_config_types(Some(&unknown)).is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[sources]"));
        assert!(toml_str.contains("[[config_types]]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.config_types, Config::default().config_types);
    }

    #[test]
    fn test_logging_is_not_a_config_setting() {
        // The log level comes from --verbose/--quiet only.
        assert!(!Config::default_toml().contains("verbose"));

        let config: Config = toml::from_str("[general]\nverbose = true\n").unwrap();
        assert_eq!(config.general.output_dir, "fieldscope-out");
    }
}
