//! Isolated-environment bootstrap for long-running servers.
//!
//! Discovers extension artifacts under an installation home, builds an
//! isolated-then-ambient resolver over them, and drives the entry point found
//! through it from construction to guaranteed close.

pub mod bootstrap;
pub mod error;
pub mod layout;
pub mod lifecycle;
pub mod locator;
pub mod logging;
pub mod resolver;

pub use bootstrap::{ambient_table, launch, BootstrapReport, Bootstrapper};
pub use error::{BootstrapError, BootstrapResult, BootstrapStage};
pub use layout::{resolve_home, ConfigError, LayoutConfig, RootSet, ENTRY_POINT_TYPE};
pub use lifecycle::{
    run_scoped, Closeable, LifecycleError, Runnable, Server, ServerError, ServerHandle,
    ServerState,
};
pub use locator::{locate, ArtifactEntry, ArtifactFilter, ArtifactKind, LocateError};
pub use logging::{default_log_level, flush_logging, init_logging, logging_status, LoggingError};
pub use resolver::{
    ArtifactLoader, ArtifactModule, Constructor, Instance, IsolatedResolver, LoadError,
    ModuleCatalog, Resolve, ResolveError, Resolved, ResolverChain, ResourceLocation, Tier,
    TypeTable,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
