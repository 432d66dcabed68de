//! Installation layout and home directory configuration.
//!
//! # Responsibility
//! - Resolve the installation home every root is relative to.
//! - Describe artifact roots, resource roots and the artifact filter.
//! - Apply optional `layout.json` overrides on top of the built-in defaults.
//!
//! # Invariants
//! - Configured roots are relative and never escape the home via `..`.
//! - Artifact root order is resolution priority order.
//! - The entry-point name is a dotted identifier.

use crate::locator::ArtifactFilter;
use crate::resolver::is_qualified_name;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::ffi::OsString;
use std::fmt::{Display, Formatter};
use std::path::{Component, Path, PathBuf};

/// Artifact roots scanned for library files, highest priority first.
pub const DEFAULT_ARTIFACT_ROOTS: &[&str] = &["extensions-private", "extensions", "bootstrap-libs"];
/// Resource roots added verbatim to the isolated environment.
pub const DEFAULT_RESOURCE_ROOTS: &[&str] = &["config", "config/logging"];
/// File-name suffix of loadable library artifacts.
pub const DEFAULT_LIBRARY_SUFFIX: &str = ".jar";
/// File-name prefix of the client-only launcher artifact.
pub const RESERVED_CLIENT_PREFIX: &str = "bootstrap-client-";
/// Fully qualified name of the server entry point.
pub const ENTRY_POINT_TYPE: &str = "isoboot.daemon.Server";
/// Environment variable naming the installation home.
pub const HOME_ENV_VAR: &str = "ISOBOOT_HOME";
/// Optional layout override file, relative to the home.
pub const LAYOUT_FILE_NAME: &str = "layout.json";

/// Ordered artifact and resource roots relative to the installation home.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootSet {
    artifact_roots: Vec<PathBuf>,
    resource_roots: Vec<PathBuf>,
}

impl RootSet {
    pub fn new(
        artifact_roots: impl IntoIterator<Item = impl Into<PathBuf>>,
        resource_roots: impl IntoIterator<Item = impl Into<PathBuf>>,
    ) -> Self {
        Self {
            artifact_roots: artifact_roots.into_iter().map(Into::into).collect(),
            resource_roots: resource_roots.into_iter().map(Into::into).collect(),
        }
    }

    pub fn artifact_roots(&self) -> &[PathBuf] {
        &self.artifact_roots
    }

    pub fn resource_roots(&self) -> &[PathBuf] {
        &self.resource_roots
    }
}

impl Default for RootSet {
    fn default() -> Self {
        Self::new(
            DEFAULT_ARTIFACT_ROOTS.iter().copied(),
            DEFAULT_RESOURCE_ROOTS.iter().copied(),
        )
    }
}

/// Declarative installation layout.
///
/// Every field is optional in `layout.json`; missing fields keep the
/// built-in default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    pub artifact_roots: Vec<String>,
    pub resource_roots: Vec<String>,
    pub library_suffix: String,
    pub reserved_prefix: String,
    pub entry_point: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            artifact_roots: DEFAULT_ARTIFACT_ROOTS.iter().map(|s| s.to_string()).collect(),
            resource_roots: DEFAULT_RESOURCE_ROOTS.iter().map(|s| s.to_string()).collect(),
            library_suffix: DEFAULT_LIBRARY_SUFFIX.to_string(),
            reserved_prefix: RESERVED_CLIENT_PREFIX.to_string(),
            entry_point: ENTRY_POINT_TYPE.to_string(),
        }
    }
}

impl LayoutConfig {
    /// Loads `<home>/layout.json` when present, otherwise the defaults.
    ///
    /// # Errors
    /// - Returns an error when the file exists but cannot be read or parsed.
    /// - Returns an error when the resulting layout fails [`Self::validate`].
    pub fn load(home: &Path) -> Result<Self, ConfigError> {
        let path = home.join(LAYOUT_FILE_NAME);
        if !path.is_file() {
            debug!(
                "event=layout_load module=layout status=ok source=defaults home={}",
                home.display()
            );
            let layout = Self::default();
            layout.validate()?;
            return Ok(layout);
        }

        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::ReadLayout {
            path: path.clone(),
            source,
        })?;
        let layout: Self = serde_json::from_str(&raw)
            .map_err(|source| ConfigError::InvalidLayout { path: path.clone(), source })?;
        layout.validate()?;
        info!(
            "event=layout_load module=layout status=ok source=file path={}",
            path.display()
        );
        Ok(layout)
    }

    /// Validates root paths, the artifact filter and the entry-point name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for root in self.artifact_roots.iter().chain(&self.resource_roots) {
            if !is_contained_relative(root) {
                return Err(ConfigError::InvalidRoot(root.clone()));
            }
        }
        if self.library_suffix.trim().is_empty() {
            return Err(ConfigError::EmptySuffix);
        }
        if !is_qualified_name(&self.entry_point) {
            return Err(ConfigError::InvalidEntryPoint(self.entry_point.clone()));
        }
        Ok(())
    }

    pub fn root_set(&self) -> RootSet {
        RootSet::new(&self.artifact_roots, &self.resource_roots)
    }

    pub fn artifact_filter(&self) -> ArtifactFilter {
        ArtifactFilter::new(&self.library_suffix, &self.reserved_prefix)
    }
}

/// Resolves the installation home.
///
/// Precedence: `explicit`, then [`HOME_ENV_VAR`], then the parent of the
/// directory holding the running executable (`<home>/bin/<exe>`).
///
/// # Errors
/// - Returns an error when no candidate is available.
/// - Returns an error when the chosen candidate is not an existing directory.
pub fn resolve_home(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let exe = std::env::current_exe().ok();
    resolve_home_from(explicit, std::env::var_os(HOME_ENV_VAR), exe.as_deref())
}

fn resolve_home_from(
    explicit: Option<&Path>,
    env_value: Option<OsString>,
    exe: Option<&Path>,
) -> Result<PathBuf, ConfigError> {
    let (candidate, source) = if let Some(path) = explicit {
        (path.to_path_buf(), "argument")
    } else if let Some(value) = env_value.filter(|value| !value.is_empty()) {
        (PathBuf::from(value), "env")
    } else if let Some(home) = exe.and_then(Path::parent).and_then(Path::parent) {
        (home.to_path_buf(), "executable")
    } else {
        return Err(ConfigError::HomeUnset);
    };

    if !candidate.is_dir() {
        return Err(ConfigError::HomeNotFound(candidate));
    }
    debug!(
        "event=home_resolve module=layout status=ok source={} home={}",
        source,
        candidate.display()
    );
    Ok(candidate)
}

fn is_contained_relative(root: &str) -> bool {
    let trimmed = root.trim();
    if trimmed.is_empty() {
        return false;
    }
    Path::new(trimmed)
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

/// Configuration errors raised before discovery starts.
#[derive(Debug)]
pub enum ConfigError {
    HomeUnset,
    HomeNotFound(PathBuf),
    ReadLayout {
        path: PathBuf,
        source: std::io::Error,
    },
    InvalidLayout {
        path: PathBuf,
        source: serde_json::Error,
    },
    InvalidRoot(String),
    EmptySuffix,
    InvalidEntryPoint(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HomeUnset => write!(
                f,
                "installation home is unset; pass --home or set {HOME_ENV_VAR}"
            ),
            Self::HomeNotFound(path) => {
                write!(f, "installation home is not a directory: {}", path.display())
            }
            Self::ReadLayout { path, source } => {
                write!(f, "failed to read layout `{}`: {source}", path.display())
            }
            Self::InvalidLayout { path, source } => {
                write!(f, "layout `{}` is invalid: {source}", path.display())
            }
            Self::InvalidRoot(value) => write!(
                f,
                "layout root must be a relative path inside the home: `{value}`"
            ),
            Self::EmptySuffix => write!(f, "layout library suffix must not be empty"),
            Self::InvalidEntryPoint(value) => {
                write!(f, "entry point is not a qualified type name: `{value}`")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ReadLayout { source, .. } => Some(source),
            Self::InvalidLayout { source, .. } => Some(source),
            _ => None,
        }
    }
}
