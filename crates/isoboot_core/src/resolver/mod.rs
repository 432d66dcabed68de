//! Two-tier type and resource resolution.
//!
//! # Responsibility
//! - Resolve type names to zero-argument constructors and resource names to
//!   locations.
//! - Consult the isolated set built from located artifacts first, then the
//!   host's ambient resolver.
//!
//! # Invariants
//! - The isolated tier has no parent; it never consults the ambient tier
//!   itself.
//! - A resource miss in both tiers is `None`, never an error.
//! - A type miss in both tiers is [`ResolveError::TypeNotFound`].

mod chain;
mod loader;
mod table;

pub use chain::{IsolatedResolver, Resolved, ResolverChain, Tier};
pub use loader::{module_name, ArtifactLoader, ArtifactModule, LoadError, ModuleCatalog};
pub use table::{Constructor, Instance, ResourceLocation, TypeTable};

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static QUALIFIED_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*$")
        .expect("qualified name pattern is valid")
});

/// Returns whether `value` is a dotted identifier such as `isoboot.daemon.Server`.
pub fn is_qualified_name(value: &str) -> bool {
    QUALIFIED_NAME.is_match(value)
}

/// One resolution tier.
pub trait Resolve: Send + Sync {
    fn find_type(&self, name: &str) -> Option<Constructor>;
    fn find_resource(&self, name: &str) -> Option<ResourceLocation>;
}

/// Resolution errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    TypeNotFound(String),
    InvalidTypeName(String),
    DuplicateType(String),
    Load(LoadError),
}

impl Display for ResolveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TypeNotFound(name) => {
                write!(f, "type not found in isolated or ambient resolver: {name}")
            }
            Self::InvalidTypeName(name) => write!(f, "type name is invalid: {name}"),
            Self::DuplicateType(name) => write!(f, "type already registered: {name}"),
            Self::Load(err) => write!(f, "artifact load failed: {err}"),
        }
    }
}

impl Error for ResolveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Load(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LoadError> for ResolveError {
    fn from(value: LoadError) -> Self {
        Self::Load(value)
    }
}
