//! Name-keyed constructor and resource tables.

use crate::lifecycle::{Server, ServerError};
use crate::resolver::{is_qualified_name, Resolve, ResolveError};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::path::PathBuf;
use std::sync::Arc;

type ServerCtor = dyn Fn() -> Result<Box<dyn Server>, ServerError> + Send + Sync;
type PlainCtor = dyn Fn() -> Result<Box<dyn Any + Send>, ServerError> + Send + Sync;

/// Zero-argument constructor registered under a type name.
///
/// `Server` constructors produce values carrying both lifecycle capabilities;
/// `Plain` constructors produce values that carry neither and are rejected as
/// entry points.
#[derive(Clone)]
pub enum Constructor {
    Server(Arc<ServerCtor>),
    Plain(Arc<PlainCtor>),
}

impl Constructor {
    pub fn server<S, F>(factory: F) -> Self
    where
        S: Server + 'static,
        F: Fn() -> Result<S, ServerError> + Send + Sync + 'static,
    {
        Self::Server(Arc::new(move || {
            factory().map(|server| Box::new(server) as Box<dyn Server>)
        }))
    }

    /// Constructor backed by `S::default()`.
    pub fn of_default<S>() -> Self
    where
        S: Server + Default + 'static,
    {
        Self::server(|| Ok(S::default()))
    }

    pub fn plain<T, F>(factory: F) -> Self
    where
        T: Any + Send,
        F: Fn() -> Result<T, ServerError> + Send + Sync + 'static,
    {
        Self::Plain(Arc::new(move || {
            factory().map(|value| Box::new(value) as Box<dyn Any + Send>)
        }))
    }

    /// Invokes the constructor.
    pub fn construct(&self) -> Result<Instance, ServerError> {
        match self {
            Self::Server(factory) => factory().map(Instance::Server),
            Self::Plain(factory) => factory().map(Instance::Plain),
        }
    }
}

impl Debug for Constructor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Server(_) => write!(f, "Constructor::Server(..)"),
            Self::Plain(_) => write!(f, "Constructor::Plain(..)"),
        }
    }
}

/// Freshly constructed value.
pub enum Instance {
    Server(Box<dyn Server>),
    Plain(Box<dyn Any + Send>),
}

impl Instance {
    /// Returns the server when the value carries both lifecycle capabilities.
    pub fn into_server(self) -> Option<Box<dyn Server>> {
        match self {
            Self::Server(server) => Some(server),
            Self::Plain(_) => None,
        }
    }
}

/// Where a resolved resource lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceLocation {
    /// File beneath a resource root.
    File(PathBuf),
    /// Bytes linked into a module or the host.
    Embedded {
        owner: String,
        name: String,
        contents: &'static [u8],
    },
}

impl ResourceLocation {
    pub fn read(&self) -> std::io::Result<Vec<u8>> {
        match self {
            Self::File(path) => std::fs::read(path),
            Self::Embedded { contents, .. } => Ok(contents.to_vec()),
        }
    }
}

/// Flat lookup table; the host process uses one as its ambient resolver.
#[derive(Debug, Clone)]
pub struct TypeTable {
    owner: String,
    types: BTreeMap<String, Constructor>,
    resources: BTreeMap<String, &'static [u8]>,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::named("host")
    }
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty table whose embedded resources report `owner`.
    pub fn named(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            types: BTreeMap::new(),
            resources: BTreeMap::new(),
        }
    }

    /// Registers one constructor.
    ///
    /// # Errors
    /// - Returns an error when `name` is not a dotted identifier.
    /// - Returns an error when `name` is already registered.
    pub fn register_type(
        &mut self,
        name: &str,
        constructor: Constructor,
    ) -> Result<(), ResolveError> {
        if !is_qualified_name(name) {
            return Err(ResolveError::InvalidTypeName(name.to_string()));
        }
        if self.types.contains_key(name) {
            return Err(ResolveError::DuplicateType(name.to_string()));
        }
        self.types.insert(name.to_string(), constructor);
        Ok(())
    }

    /// Registers one embedded resource; a later registration replaces it.
    pub fn register_resource(&mut self, name: impl Into<String>, contents: &'static [u8]) {
        self.resources.insert(name.into(), contents);
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Resolve for TypeTable {
    fn find_type(&self, name: &str) -> Option<Constructor> {
        self.types.get(name).cloned()
    }

    fn find_resource(&self, name: &str) -> Option<ResourceLocation> {
        self.resources
            .get(name)
            .map(|contents| ResourceLocation::Embedded {
                owner: self.owner.clone(),
                name: name.to_string(),
                contents: *contents,
            })
    }
}
