//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// fieldscope - field usage analysis for JSON configuration documents
///
/// Reads every entity's configuration documents, infers which structural
/// fields each config type uses, and reports which entities use which
/// fields and which values each field takes.
///
/// Examples:
///   fieldscope --root ./mods
///   fieldscope --root ./mods --only default-config,presets --format json
///   fieldscope --offline --render-only --output-dir ./fieldscope-out
///   fieldscope --dry-run
///   fieldscope --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Directory containing one subdirectory per entity
    ///
    /// Overrides `sources.entities_dir` from the config file.
    #[arg(long, value_name = "DIR", env = "FIELDSCOPE_ROOT")]
    pub root: Option<PathBuf>,

    /// Directory for persisted summaries
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output file path for the rendered report
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Report format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .fieldscope.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Config types to analyze (comma-separated)
    ///
    /// Example: --only default-config,presets
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub only: Option<Vec<String>>,

    /// Do not fetch entity repositories; use what is already on disk
    #[arg(long)]
    pub offline: bool,

    /// Load documents and list what would be analyzed, then exit
    #[arg(long, conflicts_with = "render_only")]
    pub dry_run: bool,

    /// Render the report from previously persisted summaries
    #[arg(long, conflicts_with = "dry_run")]
    pub render_only: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .fieldscope.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.dry_run && self.render_only {
            return Err("Cannot use both --dry-run and --render-only".to_string());
        }

        if let Some(ref only) = self.only {
            if only.iter().any(|name| name.trim().is_empty()) {
                return Err("--only must not contain empty config type names".to_string());
            }
        }

        // The root may not exist yet when entities are about to be fetched,
        // but if it exists it must be a directory.
        if let Some(ref root) = self.root {
            if root.exists() && !root.is_dir() {
                return Err(format!("Entities root is not a directory: {}", root.display()));
            }
            if self.offline && !root.exists() {
                return Err(format!(
                    "Entities root does not exist: {}",
                    root.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
