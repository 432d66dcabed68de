//! Artifact discovery over the installation layout.
//!
//! # Responsibility
//! - List every artifact root and keep loadable library files.
//! - Append resource roots verbatim, without filtering or existence checks.
//! - Normalize every kept location to an absolute path.
//!
//! # Invariants
//! - A root that cannot be listed aborts discovery; it is never skipped.
//! - Reserved client artifacts are never returned.
//! - Entries within one artifact root are ordered by file name; roots keep
//!   their declared order and resource roots always follow artifact roots.

use crate::layout::RootSet;
use log::{debug, error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

/// Kind of one located entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Library file found under an artifact root.
    Library,
    /// Resource root added verbatim.
    ResourceRoot,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Library => "library",
            Self::ResourceRoot => "resource_root",
        }
    }
}

/// One located library file or resource root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactEntry {
    path: PathBuf,
    kind: ArtifactKind,
    root: PathBuf,
}

impl ArtifactEntry {
    pub fn library(path: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ArtifactKind::Library,
            root: root.into(),
        }
    }

    pub fn resource_root(path: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ArtifactKind::ResourceRoot,
            root: root.into(),
        }
    }

    /// Absolute, normalized location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Configured root (relative to the home) this entry came from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }
}

/// File-name filter applied to artifact root listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFilter {
    suffix: String,
    reserved_prefix: String,
}

impl ArtifactFilter {
    pub fn new(suffix: impl Into<String>, reserved_prefix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
            reserved_prefix: reserved_prefix.into(),
        }
    }

    /// Returns whether a file name qualifies as a library artifact.
    ///
    /// An empty reserved prefix reserves nothing.
    pub fn accepts(&self, file_name: &str) -> bool {
        if !file_name.ends_with(self.suffix.as_str()) {
            return false;
        }
        self.reserved_prefix.is_empty() || !file_name.starts_with(self.reserved_prefix.as_str())
    }
}

impl Default for ArtifactFilter {
    fn default() -> Self {
        Self::new(
            crate::layout::DEFAULT_LIBRARY_SUFFIX,
            crate::layout::RESERVED_CLIENT_PREFIX,
        )
    }
}

/// Locates library artifacts and resource roots under `home`.
///
/// # Errors
/// - Returns [`LocateError::ListRoot`] when any artifact root cannot be
///   listed (missing, unreadable, not a directory).
/// - Returns [`LocateError::CurrentDir`] when a relative `home` cannot be
///   made absolute.
pub fn locate(
    home: &Path,
    roots: &RootSet,
    filter: &ArtifactFilter,
) -> Result<Vec<ArtifactEntry>, LocateError> {
    let started_at = Instant::now();
    let home = absolute(home)?;
    info!(
        "event=locate module=locator status=start home={} artifact_roots={} resource_roots={}",
        home.display(),
        roots.artifact_roots().len(),
        roots.resource_roots().len()
    );

    let mut entries = Vec::new();
    for root in roots.artifact_roots() {
        let dir = normalize_lexically(&home.join(root));
        match list_libraries(&dir, filter) {
            Ok(paths) => {
                debug!(
                    "event=locate_root module=locator status=ok root={} libraries={}",
                    dir.display(),
                    paths.len()
                );
                entries.extend(
                    paths
                        .into_iter()
                        .map(|path| ArtifactEntry::library(path, root.clone())),
                );
            }
            Err(source) => {
                error!(
                    "event=locate_root module=locator status=error root={} duration_ms={} error={}",
                    dir.display(),
                    started_at.elapsed().as_millis(),
                    source
                );
                return Err(LocateError::ListRoot { root: dir, source });
            }
        }
    }

    for root in roots.resource_roots() {
        let dir = normalize_lexically(&home.join(root));
        entries.push(ArtifactEntry::resource_root(dir, root.clone()));
    }

    info!(
        "event=locate module=locator status=ok entries={} duration_ms={}",
        entries.len(),
        started_at.elapsed().as_millis()
    );
    Ok(entries)
}

fn list_libraries(dir: &Path, filter: &ArtifactFilter) -> std::io::Result<Vec<PathBuf>> {
    let mut kept = Vec::new();
    for item in std::fs::read_dir(dir)? {
        let item = item?;
        let path = item.path();
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            debug!(
                "event=locate_skip module=locator reason=non_utf8_name path={}",
                path.display()
            );
            continue;
        };
        if !filter.accepts(name) {
            continue;
        }
        // Follows symlinks; a dangling link is not a regular file.
        if !std::fs::metadata(&path).map(|meta| meta.is_file()).unwrap_or(false) {
            continue;
        }
        kept.push(normalize_lexically(&path));
    }
    kept.sort_by(|left, right| left.file_name().cmp(&right.file_name()));
    Ok(kept)
}

fn absolute(path: &Path) -> Result<PathBuf, LocateError> {
    if path.is_absolute() {
        return Ok(normalize_lexically(path));
    }
    let cwd = std::env::current_dir().map_err(LocateError::CurrentDir)?;
    Ok(normalize_lexically(&cwd.join(path)))
}

/// Resolves `.` and `..` components without touching the filesystem.
pub(crate) fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Discovery errors. Every variant is fatal to the bootstrap.
#[derive(Debug)]
pub enum LocateError {
    ListRoot {
        root: PathBuf,
        source: std::io::Error,
    },
    CurrentDir(std::io::Error),
}

impl Display for LocateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ListRoot { root, source } => {
                write!(f, "could not list artifact root `{}`: {source}", root.display())
            }
            Self::CurrentDir(source) => {
                write!(f, "could not determine current directory: {source}")
            }
        }
    }
}

impl Error for LocateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ListRoot { source, .. } => Some(source),
            Self::CurrentDir(source) => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_lexically, ArtifactFilter};
    use std::path::{Path, PathBuf};

    #[test]
    fn filter_requires_suffix_and_rejects_reserved_prefix() {
        let filter = ArtifactFilter::default();
        assert!(filter.accepts("a.jar"));
        assert!(filter.accepts("server-core-1.0.0.jar"));
        assert!(!filter.accepts("a.jar.bak"));
        assert!(!filter.accepts("README"));
        assert!(!filter.accepts("bootstrap-client-1.0.jar"));
        // Prefix match only; the reserved text may appear elsewhere.
        assert!(filter.accepts("x-bootstrap-client-1.0.jar"));
    }

    #[test]
    fn empty_reserved_prefix_reserves_nothing() {
        let filter = ArtifactFilter::new(".so", "");
        assert!(filter.accepts("libdaemon.so"));
        assert!(!filter.accepts("libdaemon.a"));
    }

    #[test]
    fn normalizes_dot_components() {
        assert_eq!(
            normalize_lexically(Path::new("/opt/isoboot/./config/../extensions")),
            PathBuf::from("/opt/isoboot/extensions")
        );
        assert_eq!(
            normalize_lexically(Path::new("/opt/isoboot/config/logging/")),
            PathBuf::from("/opt/isoboot/config/logging")
        );
    }
}
