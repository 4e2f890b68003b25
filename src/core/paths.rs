// src/core/paths.rs

//! Filesystem queries, rooted at the build directory.

use crate::constants::MAKEFILE_CANDIDATES;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

/// Failures locating the build directory or its makefile.
#[derive(Error, Debug)]
pub enum PathError {
    /// None of the makefile candidates exist.
    #[error("No makefile found in '{dir}' (looked for {candidates}).")]
    MakefileNotFound {
        /// The directory searched.
        dir: String,
        /// The names tried, comma separated.
        candidates: String,
    },
    /// The `-C` directory cannot be resolved.
    #[error("Could not enter build directory '{path}': {source}")]
    BadDirectory {
        /// The directory as given.
        path: String,
        /// The resolution error.
        #[source]
        source: std::io::Error,
    },
}

/// Resolves a target or prerequisite name against the build directory.
/// Absolute names are returned unchanged.
pub fn resolve(root: &Path, name: &str) -> PathBuf {
    root.join(name)
}

/// Whether a filesystem entry exists for `name`. Any stat failure counts as absent.
///
/// An empty name never exists, even though joining it yields `root` itself.
pub fn exists(root: &Path, name: &str) -> bool {
    !name.is_empty() && fs::metadata(resolve(root, name)).is_ok()
}

/// Point-in-time modification time of `name`, or `None` if it cannot be read.
pub fn modified_time(root: &Path, name: &str) -> Option<SystemTime> {
    if name.is_empty() {
        return None;
    }
    let path = resolve(root, name);
    match fs::metadata(&path).and_then(|m| m.modified()) {
        Ok(time) => Some(time),
        Err(e) => {
            log::trace!("No modification time for '{}': {}", path.display(), e);
            None
        }
    }
}

/// Canonicalizes the build directory, without Windows verbatim prefixes.
pub fn canonical_directory(dir: &Path) -> Result<PathBuf, PathError> {
    dunce::canonicalize(dir).map_err(|e| PathError::BadDirectory {
        path: dir.display().to_string(),
        source: e,
    })
}

/// Returns the first makefile candidate that exists in `dir`.
pub fn find_makefile(dir: &Path) -> Result<PathBuf, PathError> {
    MAKEFILE_CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
        .ok_or_else(|| PathError::MakefileNotFound {
            dir: dir.display().to_string(),
            candidates: MAKEFILE_CANDIDATES.join(", "),
        })
}
