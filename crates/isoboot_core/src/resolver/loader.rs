//! Mapping from located library artifacts to the modules they provide.
//!
//! # Responsibility
//! - Describe what one artifact contributes: type constructors and embedded
//!   resources.
//! - Provide the catalog-backed loader used by the host binaries, where each
//!   module is linked into the host and enabled only when its artifact is
//!   present on disk.
//!
//! # Invariants
//! - A catalog never holds two modules with the same name.
//! - An artifact with no catalog module contributes nothing and is not an
//!   error.

use crate::locator::{ArtifactEntry, ArtifactKind};
use crate::resolver::{is_qualified_name, Constructor};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

// `name-1.2.3`, `name-2.0.0-rc1`, `name-1.0.SNAPSHOT`
static VERSION_TAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<name>.+?)-\d+(?:\.\d+)*(?:[.-][0-9A-Za-z]+)*$")
        .expect("version tail pattern is valid")
});

/// Types and resources provided by one artifact.
#[derive(Debug, Clone)]
pub struct ArtifactModule {
    name: String,
    types: Vec<(String, Constructor)>,
    resources: BTreeMap<String, &'static [u8]>,
}

impl ArtifactModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: Vec::new(),
            resources: BTreeMap::new(),
        }
    }

    pub fn with_type(mut self, name: impl Into<String>, constructor: Constructor) -> Self {
        self.types.push((name.into(), constructor));
        self
    }

    pub fn with_resource(mut self, name: impl Into<String>, contents: &'static [u8]) -> Self {
        self.resources.insert(name.into(), contents);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn types(&self) -> &[(String, Constructor)] {
        &self.types
    }

    pub fn resource(&self, name: &str) -> Option<&'static [u8]> {
        self.resources.get(name).copied()
    }

    fn validate(&self) -> Result<(), LoadError> {
        for (type_name, _) in &self.types {
            if !is_qualified_name(type_name) {
                return Err(LoadError::InvalidTypeName {
                    module: self.name.clone(),
                    type_name: type_name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Turns one located library artifact into the module it provides.
pub trait ArtifactLoader {
    /// Returns `Ok(None)` when the artifact provides nothing resolvable.
    fn load(&self, artifact: &ArtifactEntry) -> Result<Option<ArtifactModule>, LoadError>;
}

/// Loader backed by modules linked into the host, keyed by module name.
#[derive(Debug, Clone)]
pub struct ModuleCatalog {
    suffix: String,
    modules: BTreeMap<String, ArtifactModule>,
}

impl ModuleCatalog {
    /// Creates an empty catalog for artifacts ending in `suffix`.
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
            modules: BTreeMap::new(),
        }
    }

    /// Registers one module.
    ///
    /// # Errors
    /// - Returns an error when the module name is already registered.
    /// - Returns an error when a declared type name is malformed.
    pub fn register(&mut self, module: ArtifactModule) -> Result<(), LoadError> {
        module.validate()?;
        if self.modules.contains_key(module.name()) {
            return Err(LoadError::DuplicateModule(module.name().to_string()));
        }
        self.modules.insert(module.name().to_string(), module);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn module_names(&self) -> Vec<String> {
        self.modules.keys().cloned().collect()
    }
}

impl ArtifactLoader for ModuleCatalog {
    fn load(&self, artifact: &ArtifactEntry) -> Result<Option<ArtifactModule>, LoadError> {
        if artifact.kind() != ArtifactKind::Library {
            return Ok(None);
        }
        let file_name = artifact
            .file_name()
            .ok_or_else(|| LoadError::InvalidArtifactName(artifact.path().to_path_buf()))?;
        let Some(name) = module_name(file_name, &self.suffix) else {
            return Err(LoadError::InvalidArtifactName(artifact.path().to_path_buf()));
        };

        let module = self.modules.get(name).cloned();
        if module.is_none() {
            debug!(
                "event=module_load module=loader status=skip reason=not_in_catalog artifact={}",
                artifact.path().display()
            );
        }
        Ok(module)
    }
}

/// Derives a module name from an artifact file name.
///
/// Strips `suffix` and a trailing `-<version>` tail. Returns `None` when
/// nothing is left.
pub fn module_name<'a>(file_name: &'a str, suffix: &str) -> Option<&'a str> {
    let stem = file_name.strip_suffix(suffix).unwrap_or(file_name);
    let name = VERSION_TAIL
        .captures(stem)
        .and_then(|captures| captures.name("name"))
        .map_or(stem, |name| name.as_str());
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Artifact loading errors. Fatal while the isolated resolver is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    DuplicateModule(String),
    InvalidTypeName { module: String, type_name: String },
    InvalidArtifactName(PathBuf),
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateModule(name) => write!(f, "module already registered: {name}"),
            Self::InvalidTypeName { module, type_name } => {
                write!(f, "module `{module}` declares invalid type name `{type_name}`")
            }
            Self::InvalidArtifactName(path) => {
                write!(f, "artifact has no usable module name: {}", path.display())
            }
        }
    }
}

impl Error for LoadError {}

#[cfg(test)]
mod tests {
    use super::{module_name, ArtifactLoader, ArtifactModule, LoadError, ModuleCatalog};
    use crate::locator::ArtifactEntry;
    use crate::resolver::Constructor;

    #[test]
    fn module_name_strips_suffix_and_version() {
        assert_eq!(module_name("a.jar", ".jar"), Some("a"));
        assert_eq!(module_name("daemon-core-1.4.2.jar", ".jar"), Some("daemon-core"));
        assert_eq!(module_name("daemon-2.0.0-rc1.jar", ".jar"), Some("daemon"));
        assert_eq!(module_name("isoboot-smoke.jar", ".jar"), Some("isoboot-smoke"));
        assert_eq!(module_name(".jar", ".jar"), None);
    }

    #[test]
    fn catalog_loads_registered_module_only() {
        let mut catalog = ModuleCatalog::new(".jar");
        catalog
            .register(ArtifactModule::new("daemon").with_resource("daemon.properties", b"x=1"))
            .expect("register daemon");

        let known =
            ArtifactEntry::library("/opt/isoboot/extensions/daemon-1.0.0.jar", "extensions");
        let module = catalog
            .load(&known)
            .expect("load should succeed")
            .expect("daemon module");
        assert_eq!(module.name(), "daemon");
        assert_eq!(module.resource("daemon.properties"), Some(&b"x=1"[..]));

        let unknown = ArtifactEntry::library("/opt/isoboot/extensions/other.jar", "extensions");
        assert!(catalog.load(&unknown).expect("load should succeed").is_none());

        let resource_root = ArtifactEntry::resource_root("/opt/isoboot/config", "config");
        assert!(catalog
            .load(&resource_root)
            .expect("resource roots load as nothing")
            .is_none());
    }

    #[test]
    fn catalog_rejects_duplicates_and_bad_type_names() {
        let mut catalog = ModuleCatalog::new(".jar");
        catalog
            .register(ArtifactModule::new("daemon"))
            .expect("first registration");
        let err = catalog
            .register(ArtifactModule::new("daemon"))
            .expect_err("duplicate must fail");
        assert_eq!(err, LoadError::DuplicateModule("daemon".to_string()));

        let err = catalog
            .register(
                ArtifactModule::new("broken")
                    .with_type("broken type", Constructor::plain(|| Ok(()))),
            )
            .expect_err("invalid type name must fail");
        assert!(matches!(err, LoadError::InvalidTypeName { .. }));
    }
}
