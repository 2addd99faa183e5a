//! Fragment discovery in a render folder.
//!
//! # Responsibilities
//! - Walk the folder recursively in a stable (sorted) order
//! - Select fragment files by extension, skipping the base and output files
//! - Load each file exactly once, even when reachable through several paths
//!
//! # Design Decisions
//! - Read and parse failures are carried on the [`LoadedDocument`] so the
//!   assembler can report them alongside every other issue
//! - Hidden files and directories are skipped

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use walkdir::{DirEntry, WalkDir};

use crate::config::loader::{load_document, ConfigError};
use crate::config::schema::Settings;

/// A document handed to the assembler, labelled with where it came from.
#[derive(Debug)]
pub struct LoadedDocument {
    pub source: String,
    pub document: Result<Value, ConfigError>,
}

impl LoadedDocument {
    /// An already parsed document.
    pub fn parsed(source: impl Into<String>, document: Value) -> Self {
        Self {
            source: source.into(),
            document: Ok(document),
        }
    }

    /// Read and parse the YAML file at `path`.
    pub fn load(path: &Path) -> Self {
        Self {
            source: path.display().to_string(),
            document: load_document(path),
        }
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

/// Regular files, and symlinks that resolve to one even when links are not
/// followed for directories.
fn is_fragment_file(entry: &DirEntry) -> bool {
    if entry.file_type().is_file() {
        return true;
    }
    if !entry.path_is_symlink() {
        return false;
    }
    match fs::metadata(entry.path()) {
        Ok(meta) => meta.is_file(),
        Err(err) => {
            tracing::warn!(path = %entry.path().display(), error = %err, "Skipping dangling symlink");
            false
        }
    }
}

/// Paths of the fragment files under `folder`, in discovery order.
pub fn fragment_paths(folder: &Path, settings: &Settings) -> Vec<Result<PathBuf, ConfigError>> {
    let mut seen = HashSet::new();
    let mut paths = Vec::new();

    let walker = WalkDir::new(folder)
        .follow_links(settings.follow_links)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_hidden(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(source) => {
                let path = source.path().unwrap_or(folder).to_path_buf();
                tracing::warn!(path = %path.display(), error = %source, "Failed to walk directory entry");
                paths.push(Err(ConfigError::Walk { path, source }));
                continue;
            }
        };
        if !is_fragment_file(&entry) {
            continue;
        }

        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if name == settings.base_file
            || name == settings.output_file
            || !settings.has_fragment_extension(name)
        {
            continue;
        }

        let resolved = fs::canonicalize(entry.path()).unwrap_or_else(|_| entry.path().to_path_buf());
        if !seen.insert(resolved) {
            tracing::debug!(path = %entry.path().display(), "Skipping already processed file");
            continue;
        }
        paths.push(Ok(entry.into_path()));
    }

    paths
}

/// Discover and load every fragment under `folder`.
pub fn discover(folder: &Path, settings: &Settings) -> Vec<LoadedDocument> {
    tracing::info!(folder = %folder.display(), "Searching for routes and receivers configuration");

    fragment_paths(folder, settings)
        .into_iter()
        .map(|path| match path {
            Ok(path) => {
                tracing::info!(path = %path.display(), "Processing configuration file");
                LoadedDocument::load(&path)
            }
            Err(err) => LoadedDocument {
                source: match &err {
                    ConfigError::Walk { path, .. } => path.display().to_string(),
                    _ => folder.display().to_string(),
                },
                document: Err(err),
            },
        })
        .collect()
}
