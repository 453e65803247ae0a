//! Source loading.
//!
//! Reads every declaration file (`*.tf`) under one or more root directories.
//! Each root carries the [`Tier`] its resources belong to. Files are returned
//! sorted by path so later stages see the same order on every run.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use log::{debug, info};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

use infragram_core::resource::Tier;

use crate::error::ErrorCode;

/// File extension of declaration files.
pub const DECLARATION_EXTENSION: &str = "tf";

/// Directory names never descended into, besides hidden directories.
const SKIPPED_DIRECTORIES: &[&str] = &[".terraform"];

/// A directory to load declaration files from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRoot {
    path: PathBuf,
    tier: Tier,
}

impl SourceRoot {
    pub fn new(path: impl Into<PathBuf>, tier: Tier) -> Self {
        Self {
            path: path.into(),
            tier,
        }
    }

    /// A root in the [`Tier::Infrastructure`] tier.
    pub fn infrastructure(path: impl Into<PathBuf>) -> Self {
        Self::new(path, Tier::Infrastructure)
    }

    /// A root in the [`Tier::RuntimeProvisioned`] tier.
    pub fn runtime(path: impl Into<PathBuf>) -> Self {
        Self::new(path, Tier::RuntimeProvisioned)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }
}

/// The text of one declaration file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    text: Arc<str>,
    tier: Tier,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<Arc<str>>, tier: Tier) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
            tier,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// A shared handle to the file text.
    pub fn shared_text(&self) -> Arc<str> {
        Arc::clone(&self.text)
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }
}

/// The input could not be found or read.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("source path `{}` does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("no `.{DECLARATION_EXTENSION}` files found in `{}`", .0.display())]
    NoFiles(PathBuf),

    #[error("failed to read `{}`: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

impl LoadError {
    /// Diagnostic code for this error, if it has one.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            LoadError::NotFound(_) => Some(ErrorCode::E300),
            LoadError::NoFiles(_) => Some(ErrorCode::E301),
            LoadError::Io { .. } => None,
        }
    }
}

/// Load all declaration files under `roots`.
///
/// Only the top level of each root is read unless `recursive` is set, in
/// which case sub-directories are walked too, skipping hidden directories
/// and `.terraform`. A file reachable from several roots is loaded once, with
/// the tier of the first root listing it.
///
/// # Errors
///
/// Returns [`LoadError::NotFound`] if a root does not exist,
/// [`LoadError::NoFiles`] if a root holds no declaration files, and
/// [`LoadError::Io`] if a file cannot be read as UTF-8 text.
pub fn load_sources(roots: &[SourceRoot], recursive: bool) -> Result<Vec<SourceFile>, LoadError> {
    let mut files: Vec<SourceFile> = Vec::new();

    for root in roots {
        let paths = discover(root.path(), recursive)?;
        if paths.is_empty() {
            return Err(LoadError::NoFiles(root.path().to_path_buf()));
        }

        info!(
            root = root.path().display().to_string(),
            tier = root.tier().to_string(),
            files = paths.len();
            "Discovered declaration files"
        );

        for path in paths {
            if files.iter().any(|f| f.path() == path) {
                debug!(path = path.display().to_string(); "Skipping file already loaded");
                continue;
            }
            let text = fs::read_to_string(&path).map_err(|source| LoadError::Io {
                path: path.clone(),
                source,
            })?;
            debug!(path = path.display().to_string(), bytes = text.len(); "Loaded file");
            files.push(SourceFile::new(path, text, root.tier()));
        }
    }

    files.sort_by(|a, b| a.path().cmp(b.path()));
    Ok(files)
}

fn discover(root: &Path, recursive: bool) -> Result<Vec<PathBuf>, LoadError> {
    if !root.is_dir() {
        return Err(LoadError::NotFound(root.to_path_buf()));
    }

    let walker = WalkDir::new(root)
        .follow_links(false)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .sort_by_file_name();

    let mut paths = Vec::new();
    for entry in walker.into_iter().filter_entry(|e| e.depth() == 0 || !is_skipped(e)) {
        let entry = entry.map_err(|err| LoadError::Io {
            path: err
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf()),
            source: err
                .into_io_error()
                .unwrap_or_else(|| io::Error::other("directory walk failed")),
        })?;

        let path = entry.path();
        if entry.file_type().is_file()
            && path.extension().is_some_and(|ext| ext == DECLARATION_EXTENSION)
        {
            paths.push(path.to_path_buf());
        }
    }
    Ok(paths)
}

fn is_skipped(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIPPED_DIRECTORIES.contains(&name.as_ref())
}
