//! Isolated resolver and the isolated-then-ambient chain.

use crate::locator::{ArtifactEntry, ArtifactKind};
use crate::resolver::{
    ArtifactLoader, ArtifactModule, Constructor, Resolve, ResolveError, ResourceLocation,
};
use log::{debug, info, warn};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Tier that answered a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Isolated,
    Ambient,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Isolated => "isolated",
            Self::Ambient => "ambient",
        }
    }
}

/// A lookup answer tagged with the tier that produced it.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    pub value: T,
    pub tier: Tier,
}

#[derive(Debug, Clone)]
struct IsolatedType {
    constructor: Constructor,
    origin: PathBuf,
}

#[derive(Debug, Clone)]
enum ResourceSource {
    Directory(PathBuf),
    Module(ArtifactModule),
}

/// Resolver built strictly from located artifacts.
#[derive(Debug, Clone, Default)]
pub struct IsolatedResolver {
    types: BTreeMap<String, IsolatedType>,
    sources: Vec<ResourceSource>,
}

impl IsolatedResolver {
    /// Builds the isolated set from located entries, in entry order.
    ///
    /// The first artifact defining a type name wins; later definitions are
    /// shadowed.
    ///
    /// # Errors
    /// - Returns [`ResolveError::Load`] when the loader rejects an artifact.
    pub fn build(
        entries: &[ArtifactEntry],
        loader: &dyn ArtifactLoader,
    ) -> Result<Self, ResolveError> {
        let mut resolver = Self::default();
        for entry in entries {
            match entry.kind() {
                ArtifactKind::Library => {
                    let Some(module) = loader.load(entry)? else {
                        continue;
                    };
                    resolver.add_module(entry.path(), module);
                }
                ArtifactKind::ResourceRoot => {
                    resolver
                        .sources
                        .push(ResourceSource::Directory(entry.path().to_path_buf()));
                }
            }
        }
        info!(
            "event=isolated_build module=resolver status=ok entries={} types={} sources={}",
            entries.len(),
            resolver.types.len(),
            resolver.sources.len()
        );
        Ok(resolver)
    }

    fn add_module(&mut self, origin: &Path, module: ArtifactModule) {
        for (name, constructor) in module.types() {
            match self.types.entry(name.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(IsolatedType {
                        constructor: constructor.clone(),
                        origin: origin.to_path_buf(),
                    });
                }
                Entry::Occupied(existing) => {
                    warn!(
                        "event=type_shadowed module=resolver type={} kept={} ignored={}",
                        name,
                        existing.get().origin.display(),
                        origin.display()
                    );
                }
            }
        }
        debug!(
            "event=module_add module=resolver module_name={} types={} origin={}",
            module.name(),
            module.types().len(),
            origin.display()
        );
        self.sources.push(ResourceSource::Module(module));
    }

    /// Artifact that supplied `name`, when it is defined in the isolated set.
    pub fn origin_of(&self, name: &str) -> Option<&Path> {
        self.types.get(name).map(|entry| entry.origin.as_path())
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }
}

impl Resolve for IsolatedResolver {
    fn find_type(&self, name: &str) -> Option<Constructor> {
        self.types.get(name).map(|entry| entry.constructor.clone())
    }

    fn find_resource(&self, name: &str) -> Option<ResourceLocation> {
        if !is_relative_resource_name(name) {
            return None;
        }
        self.sources.iter().find_map(|source| match source {
            ResourceSource::Directory(dir) => {
                let candidate = dir.join(name);
                candidate
                    .is_file()
                    .then_some(ResourceLocation::File(candidate))
            }
            ResourceSource::Module(module) => {
                module
                    .resource(name)
                    .map(|contents| ResourceLocation::Embedded {
                        owner: module.name().to_string(),
                        name: name.to_string(),
                        contents,
                    })
            }
        })
    }
}

fn is_relative_resource_name(name: &str) -> bool {
    !name.is_empty()
        && Path::new(name)
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
}

/// Isolated resolver backed by the host's ambient resolver.
#[derive(Clone)]
pub struct ResolverChain {
    isolated: IsolatedResolver,
    fallback: Arc<dyn Resolve>,
}

impl ResolverChain {
    pub fn new(isolated: IsolatedResolver, fallback: Arc<dyn Resolve>) -> Self {
        Self { isolated, fallback }
    }

    /// Builds the isolated tier from `entries` and chains it to `fallback`.
    ///
    /// # Errors
    /// - Returns [`ResolveError::Load`] when any artifact fails to load.
    pub fn build(
        entries: &[ArtifactEntry],
        loader: &dyn ArtifactLoader,
        fallback: Arc<dyn Resolve>,
    ) -> Result<Self, ResolveError> {
        let isolated = IsolatedResolver::build(entries, loader)?;
        Ok(Self::new(isolated, fallback))
    }

    pub fn isolated(&self) -> &IsolatedResolver {
        &self.isolated
    }

    /// Resolves a type name, isolated tier first.
    ///
    /// # Errors
    /// - Returns [`ResolveError::TypeNotFound`] when neither tier knows `name`.
    pub fn resolve_type(&self, name: &str) -> Result<Resolved<Constructor>, ResolveError> {
        if let Some(value) = self.isolated.find_type(name) {
            debug!(
                "event=type_resolve module=resolver status=ok type={} tier=isolated",
                name
            );
            return Ok(Resolved {
                value,
                tier: Tier::Isolated,
            });
        }
        match self.fallback.find_type(name) {
            Some(value) => {
                debug!(
                    "event=type_resolve module=resolver status=ok type={} tier=ambient",
                    name
                );
                Ok(Resolved {
                    value,
                    tier: Tier::Ambient,
                })
            }
            None => {
                debug!(
                    "event=type_resolve module=resolver status=miss type={}",
                    name
                );
                Err(ResolveError::TypeNotFound(name.to_string()))
            }
        }
    }

    /// Resolves a resource name, isolated tier first. Misses are `None`.
    ///
    /// Names that are empty, absolute, or carry `.`/`..` components miss in
    /// both tiers.
    pub fn resolve_resource(&self, name: &str) -> Option<Resolved<ResourceLocation>> {
        if !is_relative_resource_name(name) {
            debug!(
                "event=resource_resolve module=resolver status=reject resource={}",
                name
            );
            return None;
        }
        if let Some(value) = self.isolated.find_resource(name) {
            return Some(Resolved {
                value,
                tier: Tier::Isolated,
            });
        }
        self.fallback.find_resource(name).map(|value| Resolved {
            value,
            tier: Tier::Ambient,
        })
    }
}

impl Resolve for ResolverChain {
    fn find_type(&self, name: &str) -> Option<Constructor> {
        self.resolve_type(name).ok().map(|resolved| resolved.value)
    }

    fn find_resource(&self, name: &str) -> Option<ResourceLocation> {
        self.resolve_resource(name).map(|resolved| resolved.value)
    }
}

impl Debug for ResolverChain {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverChain")
            .field("isolated", &self.isolated)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::is_relative_resource_name;

    #[test]
    fn resource_names_stay_inside_roots() {
        assert!(is_relative_resource_name("logging.properties"));
        assert!(is_relative_resource_name("logging/logback.xml"));
        assert!(!is_relative_resource_name(""));
        assert!(!is_relative_resource_name("/etc/passwd"));
        assert!(!is_relative_resource_name("../secrets"));
        assert!(!is_relative_resource_name("./daemon.properties"));
    }
}
