//! Bootstrap orchestration: discovery, chain construction, entry-point launch.
//!
//! # Responsibility
//! - Run locator -> resolver chain -> lifecycle strictly in sequence.
//! - Tag every stage of one run with that run's `run_id` in the log stream.
//!
//! # Invariants
//! - Any failure before `run` aborts immediately; nothing is retried.
//! - Once an entry point is constructed it is closed exactly once.
//! - An unresolved entry point is never constructed.

use crate::error::{BootstrapError, BootstrapResult};
use crate::layout::LayoutConfig;
use crate::lifecycle::{run_scoped, ServerHandle};
use crate::locator::{locate, ArtifactEntry};
use crate::resolver::{ArtifactLoader, Resolve, ResolverChain, Tier, TypeTable};
use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Summary of a bootstrap whose entry point ran and closed cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    pub run_id: Uuid,
    pub entries: usize,
    pub entry_point_tier: Tier,
}

/// Drives bootstraps over an installation home.
pub struct Bootstrapper<L: ArtifactLoader> {
    home: PathBuf,
    layout: LayoutConfig,
    loader: L,
    ambient: Arc<dyn Resolve>,
}

impl<L: ArtifactLoader> Bootstrapper<L> {
    pub fn new(home: impl Into<PathBuf>, layout: LayoutConfig, loader: L) -> Self {
        Self {
            home: home.into(),
            layout,
            loader,
            ambient: Arc::new(ambient_table()),
        }
    }

    /// Replaces the host's ambient resolver.
    pub fn with_ambient(mut self, ambient: impl Resolve + 'static) -> Self {
        self.ambient = Arc::new(ambient);
        self
    }

    /// Step 1: locates artifacts under the home.
    pub fn locate(&self) -> BootstrapResult<Vec<ArtifactEntry>> {
        self.discover().map_err(|err| fail(None, err))
    }

    /// Steps 1-2: locates artifacts and builds the resolver chain.
    pub fn build_chain(&self) -> BootstrapResult<(Vec<ArtifactEntry>, ResolverChain)> {
        self.assemble().map_err(|err| fail(None, err))
    }

    /// Runs the full bootstrap and returns once the entry point has closed.
    ///
    /// Every call is a separate run with its own `run_id`.
    ///
    /// # Errors
    /// - Returns the [`BootstrapError`] of the first failed stage; after `run`
    ///   has started, see [`launch`].
    pub fn run(&self) -> BootstrapResult<BootstrapReport> {
        let run_id = Uuid::new_v4();
        let started_at = Instant::now();
        info!(
            "event=bootstrap module=bootstrap status=start run_id={} home={} entry_point={}",
            run_id,
            self.home.display(),
            self.layout.entry_point
        );

        let (entries, chain) = self.assemble().map_err(|err| fail(Some(run_id), err))?;
        let tier =
            launch(&chain, &self.layout.entry_point).map_err(|err| fail(Some(run_id), err))?;

        info!(
            "event=bootstrap module=bootstrap status=ok run_id={} entries={} tier={} duration_ms={}",
            run_id,
            entries.len(),
            tier.as_str(),
            started_at.elapsed().as_millis()
        );
        Ok(BootstrapReport {
            run_id,
            entries: entries.len(),
            entry_point_tier: tier,
        })
    }

    fn discover(&self) -> BootstrapResult<Vec<ArtifactEntry>> {
        let entries = locate(
            &self.home,
            &self.layout.root_set(),
            &self.layout.artifact_filter(),
        )?;
        Ok(entries)
    }

    fn assemble(&self) -> BootstrapResult<(Vec<ArtifactEntry>, ResolverChain)> {
        let entries = self.discover()?;
        let chain = ResolverChain::build(&entries, &self.loader, Arc::clone(&self.ambient))?;
        Ok((entries, chain))
    }
}

fn fail(run_id: Option<Uuid>, err: BootstrapError) -> BootstrapError {
    let run_id = run_id.map_or_else(|| "none".to_string(), |id| id.to_string());
    error!(
        "event=bootstrap module=bootstrap status=error run_id={} stage={} error={}",
        run_id,
        err.stage().as_str(),
        err
    );
    err
}

/// Resolves, constructs and runs `entry_point` through `chain`.
///
/// Returns the tier the entry point was resolved from.
///
/// # Errors
/// - [`BootstrapError::Resolution`] when neither tier defines `entry_point`.
/// - [`BootstrapError::Construction`] when its constructor fails.
/// - [`BootstrapError::Capability`] when the value lacks run/close.
/// - [`BootstrapError::Execution`] / [`BootstrapError::Release`] from the run.
pub fn launch(chain: &ResolverChain, entry_point: &str) -> BootstrapResult<Tier> {
    let resolved = chain.resolve_type(entry_point)?;
    info!(
        "event=entry_resolve module=bootstrap status=ok entry_point={} tier={}",
        entry_point,
        resolved.tier.as_str()
    );

    let instance =
        resolved
            .value
            .construct()
            .map_err(|source| BootstrapError::Construction {
                entry_point: entry_point.to_string(),
                source,
            })?;
    let server = instance
        .into_server()
        .ok_or_else(|| BootstrapError::Capability {
            entry_point: entry_point.to_string(),
        })?;

    run_scoped(ServerHandle::new(server), chain)?;
    Ok(resolved.tier)
}

/// Ambient resolver of the host process itself.
///
/// Holds resources linked into the host; entry points are expected to come
/// from the isolated tier.
pub fn ambient_table() -> TypeTable {
    let mut table = TypeTable::named("isoboot_core");
    table.register_resource(
        "isoboot/build.properties",
        concat!("version=", env!("CARGO_PKG_VERSION"), "\n").as_bytes(),
    );
    table
}
