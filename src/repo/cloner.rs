//! Entity repository fetching.
//!
//! This module clones entity repositories into the entities directory
//! using the git2 library. An existing checkout is reused as-is, so the
//! entities directory doubles as the on-disk cache between runs.

use crate::config::EntitySource;
use crate::models::EntityVersion;
use anyhow::{bail, Context, Result};
use git2::{FetchOptions, Progress, RemoteCallbacks, Repository};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a successful clone operation.
pub struct CloneResult {
    /// The cloned or reused repository.
    pub repo: Repository,
    /// Path to the checkout.
    pub path: PathBuf,
    /// Whether an existing checkout was reused.
    pub reused: bool,
}

/// Options for cloning a repository.
#[derive(Debug, Clone)]
pub struct CloneOptions {
    /// Branch to checkout (None for default branch).
    pub branch: Option<String>,
    /// Depth for shallow clone (None for full clone).
    pub depth: Option<i32>,
    /// Whether to show progress.
    pub show_progress: bool,
}

impl Default for CloneOptions {
    fn default() -> Self {
        Self {
            branch: None,
            depth: Some(1), // Shallow clone by default for speed
            show_progress: true,
        }
    }
}

/// Check that an entity id is usable as a directory name.
pub fn validate_entity_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        bail!("Entity id must not be empty");
    }
    if id.starts_with('.') {
        bail!("Entity id must not start with '.': {}", id);
    }
    if id.contains(['/', '\\']) {
        bail!("Entity id must not contain path separators: {}", id);
    }
    Ok(())
}

/// Clone a repository from a URL into `target`, reusing an existing checkout.
pub fn clone_repository(url: &str, target: &Path, options: &CloneOptions) -> Result<CloneResult> {
    if target.exists() {
        debug!("Target directory already exists: {}", target.display());
        if let Ok(repo) = Repository::open(target) {
            info!("Using existing checkout at: {}", target.display());
            return Ok(CloneResult {
                repo,
                path: target.to_path_buf(),
                reused: true,
            });
        }
        bail!(
            "{} exists but is not a git checkout",
            target.display()
        );
    }

    info!("Cloning repository: {}", url);

    // Set up progress callback
    let progress_bar = if options.show_progress {
        let pb = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )
            .map(|style| style.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        Some(Arc::new(pb))
    } else {
        None
    };

    let pb_clone = progress_bar.clone();
    let mut callbacks = RemoteCallbacks::new();

    callbacks.transfer_progress(move |progress: Progress<'_>| {
        if let Some(ref pb) = pb_clone {
            pb.set_length(progress.total_objects() as u64);
            pb.set_position(progress.received_objects() as u64);
        }
        true
    });

    // Set up fetch options
    let mut fetch_opts = FetchOptions::new();
    fetch_opts.remote_callbacks(callbacks);

    if let Some(depth) = options.depth {
        fetch_opts.depth(depth);
    }

    // Build the repository
    let mut builder = git2::build::RepoBuilder::new();
    builder.fetch_options(fetch_opts);

    if let Some(ref branch) = options.branch {
        builder.branch(branch);
    }

    // Perform the clone
    let repo = builder
        .clone(url, target)
        .with_context(|| format!("Failed to clone repository: {}", url))?;

    if let Some(pb) = progress_bar {
        pb.finish_with_message("Clone complete");
    }

    info!("Successfully cloned repository to: {}", target.display());

    Ok(CloneResult {
        repo,
        path: target.to_path_buf(),
        reused: false,
    })
}

/// Fetch every configured entity into `entities_dir`.
///
/// A failed fetch is logged and leaves that entity out; it never aborts
/// the run. Returns the version of every checkout that is available.
pub fn fetch_entities(
    sources: &[EntitySource],
    entities_dir: &Path,
    depth: i32,
    show_progress: bool,
) -> Result<Vec<EntityVersion>> {
    std::fs::create_dir_all(entities_dir).with_context(|| {
        format!(
            "Failed to create entities directory: {}",
            entities_dir.display()
        )
    })?;

    let mut versions = Vec::new();
    for source in sources {
        let options = CloneOptions {
            branch: source.branch.clone(),
            depth: (depth > 0).then_some(depth),
            show_progress,
        };
        let target = entities_dir.join(&source.id);

        match clone_repository(&source.url, &target, &options) {
            Ok(result) => {
                debug!(
                    "{} {} at {}",
                    if result.reused { "Reused" } else { "Fetched" },
                    source.id,
                    result.path.display()
                );
                versions.push(entity_version(&source.id, &result.repo));
            }
            Err(e) => warn!("Skipping entity {}: {:#}", source.id, e),
        }
    }

    versions.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(versions)
}

/// Describe the checked-out version of an entity.
pub fn entity_version(id: &str, repo: &Repository) -> EntityVersion {
    EntityVersion {
        id: id.to_string(),
        branch: get_current_branch(repo),
        commit: get_current_commit(repo),
    }
}

/// Get the current branch name of a repository.
pub fn get_current_branch(repo: &Repository) -> Option<String> {
    repo.head()
        .ok()
        .and_then(|head| head.shorthand().map(String::from))
}

/// Get the current commit hash (short form).
pub fn get_current_commit(repo: &Repository) -> Option<String> {
    repo.head()
        .ok()
        .and_then(|head| head.peel_to_commit().ok())
        .map(|commit| commit.id().to_string()[..8].to_string())
}
