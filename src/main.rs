//! fieldscope - config field usage analysis
//!
//! A CLI tool that reads the JSON configuration documents of many
//! entities, infers the structural fields of each config type, and
//! reports which entities use which fields with which values.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad arguments, config, unwritable output, etc.)

mod analysis;
mod cli;
mod config;
mod models;
mod repo;
mod report;
mod store;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, ConfigTypeSpec, CONFIG_FILE_NAME};
use models::{ConfigTypeSection, EntityVersion, Report, ReportMetadata};
use std::path::{Path, PathBuf};
use std::time::Instant;
use store::{DocumentLoader, LoaderConfig};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("fieldscope v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .fieldscope.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize config types, entity sources, and output paths.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete workflow. Returns the exit code.
async fn run(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate()?;

    let selected = config.select_config_types(args.only.as_deref())?;
    let entities_dir = PathBuf::from(&config.sources.entities_dir);
    let output_dir = PathBuf::from(&config.general.output_dir);

    // Render-only: the persisted summaries are the only input
    if args.render_only {
        println!("📂 Rendering from summaries in: {}", output_dir.display());
        let sections = selected
            .iter()
            .map(|spec| report::load_section(&output_dir, &spec.name))
            .collect();
        let report = build_report(&entities_dir, Vec::new(), sections, start_time);
        write_report(&args, &config, &report)?;
        return Ok(0);
    }

    // Step 1: Fetch entity sources
    let versions = fetch_sources(&args, &config, &entities_dir)?;

    let loader = DocumentLoader::new(entities_dir.clone(), LoaderConfig::from(&config.sources));

    // Handle --dry-run: load documents and exit
    if args.dry_run {
        return handle_dry_run(&loader, &selected);
    }

    // Step 2: Analyze every config type
    println!(
        "\n🔬 Analyzing {} config types in {}...",
        selected.len(),
        entities_dir.display()
    );
    let results = analysis::analyze_all(&loader, &selected).await;

    // Step 3: Persist summaries
    let mut sections = Vec::with_capacity(results.len());
    for result in results {
        match result.summaries {
            Ok(summaries) => {
                report::write_summaries(&output_dir, &summaries)?;
                println!(
                    "   ✔ {}: {} entities, {} documents, {} fields",
                    summaries.config_type,
                    summaries.stats.entities,
                    summaries.stats.documents_merged,
                    summaries.stats.fields
                );
                sections.push(ConfigTypeSection::from_summaries(summaries));
            }
            Err(e) => {
                warn!("Config type '{}' unavailable: {:#}", result.config_type, e);
                println!("   ✖ {}: unavailable", result.config_type);
                sections.push(ConfigTypeSection::unavailable(
                    &result.config_type,
                    format!("{:#}", e),
                ));
            }
        }
    }

    // Step 4: Render the report
    println!("\n📝 Generating report...");
    let report = build_report(&entities_dir, versions, sections, start_time);
    write_report(&args, &config, &report)?;

    println!("   Summaries saved to: {}", output_dir.display());
    println!("   Duration: {:.1}s", report.metadata.duration_seconds);

    Ok(0)
}

/// Fetch configured entity repositories unless running offline.
fn fetch_sources(args: &Args, config: &Config, entities_dir: &Path) -> Result<Vec<EntityVersion>> {
    if args.offline || config.sources.entities.is_empty() {
        debug!("Skipping entity fetch");
        return Ok(Vec::new());
    }

    println!(
        "📥 Fetching {} entity repositories into {}",
        config.sources.entities.len(),
        entities_dir.display()
    );
    let versions = repo::fetch_entities(
        &config.sources.entities,
        entities_dir,
        config.sources.clone_depth,
        !args.quiet,
    )?;
    info!(
        "{} of {} entity repositories available",
        versions.len(),
        config.sources.entities.len()
    );
    Ok(versions)
}

/// Handle --dry-run: load documents, print what would be analyzed, exit.
fn handle_dry_run(loader: &DocumentLoader, selected: &[ConfigTypeSpec]) -> Result<i32> {
    println!("\n🔍 Dry run: loading documents (no analysis)...\n");

    let entities = loader.entities()?;
    println!("   Found {} entities in {}\n", entities.len(), loader.root().display());

    for spec in selected {
        match loader.load(spec) {
            Ok(store) => println!(
                "     📄 {} ({:?} layout, {}): {} documents",
                spec.name,
                spec.layout,
                spec.path,
                store.document_count()
            ),
            Err(e) => println!("     ✖ {}: {}", spec.name, e),
        }
    }

    println!("\n✅ Dry run complete. Nothing was written.");
    Ok(0)
}

fn build_report(
    entities_dir: &Path,
    entity_versions: Vec<EntityVersion>,
    sections: Vec<ConfigTypeSection>,
    start_time: Instant,
) -> Report {
    let available = sections.iter().filter(|s| s.is_available()).count();

    Report {
        metadata: ReportMetadata {
            generated_at: Utc::now(),
            entities_dir: entities_dir.display().to_string(),
            entity_versions,
            config_types_available: available,
            config_types_unavailable: sections.len() - available,
            duration_seconds: start_time.elapsed().as_secs_f64(),
        },
        config_types: sections,
    }
}

/// Render and write the report in the requested format.
fn write_report(args: &Args, config: &Config, report: &Report) -> Result<()> {
    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(report)?,
        OutputFormat::Markdown => report::generate_markdown_report(report, &config.report),
    };

    let path = Path::new(&config.general.report);
    std::fs::write(path, &output)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    println!("\n✅ Report saved to: {}", path.display());
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
