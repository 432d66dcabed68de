//! Entry-point lifecycle contract and scoped release.
//!
//! # Responsibility
//! - Define the run/close capabilities an entry point must implement.
//! - Drive one server instance through create -> run -> close.
//!
//! # Invariants
//! - `close` reaches the server at most once per handle.
//! - A handle that leaves scope without being closed (including by unwinding)
//!   closes the server in `Drop`.
//! - A run failure is never replaced by a close failure; the close failure is
//!   carried as suppressed.

use crate::resolver::ResolverChain;
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Execution capability: the server's blocking main loop.
///
/// The resolver chain the server was found through is passed in explicitly so
/// the server can resolve further types and resources with the same
/// isolated-then-ambient precedence.
pub trait Runnable {
    fn run(&mut self, resolver: &ResolverChain) -> Result<(), ServerError>;
}

/// Scoped release capability.
pub trait Closeable {
    fn close(&mut self) -> Result<(), ServerError>;
}

/// A type carrying both lifecycle capabilities.
pub trait Server: Runnable + Closeable + Send {}

impl<T: Runnable + Closeable + Send> Server for T {}

/// Failure raised by an entry point's constructor, `run` or `close`.
#[derive(Debug)]
pub struct ServerError {
    message: String,
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
}

impl ServerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn Error + Send + Sync + 'static>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for ServerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {source}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl Error for ServerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn Error + 'static))
    }
}

/// Lifecycle state of one server handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Created,
    Running,
    Closed,
}

impl ServerState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Closed => "closed",
        }
    }
}

/// Exclusive owner of one instantiated entry point.
pub struct ServerHandle {
    server: Box<dyn Server>,
    state: ServerState,
}

impl ServerHandle {
    pub fn new(server: Box<dyn Server>) -> Self {
        Self {
            server,
            state: ServerState::Created,
        }
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Invokes the execution capability.
    ///
    /// # Errors
    /// - Returns an error when the handle is not in `Created` state.
    /// - Returns whatever the server's `run` returns.
    pub fn run(&mut self, resolver: &ResolverChain) -> Result<(), ServerError> {
        if self.state != ServerState::Created {
            return Err(ServerError::new(format!(
                "server cannot run from state `{}`",
                self.state.as_str()
            )));
        }
        self.state = ServerState::Running;
        self.server.run(resolver)
    }

    /// Invokes the release capability once; later calls are no-ops.
    pub fn close(&mut self) -> Result<(), ServerError> {
        if self.state == ServerState::Closed {
            return Ok(());
        }
        // Marked first so a panicking close is not retried from Drop.
        self.state = ServerState::Closed;
        self.server.close()
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if self.state == ServerState::Closed {
            return;
        }
        if let Err(err) = self.close() {
            warn!(
                "event=server_close module=lifecycle status=error trigger=drop error={}",
                err
            );
        }
    }
}

/// Outcome of a run that did not complete cleanly.
#[derive(Debug)]
pub enum LifecycleError {
    /// `run` failed; `suppressed` holds a close failure that followed it.
    Execution {
        source: ServerError,
        suppressed: Option<ServerError>,
    },
    /// `run` succeeded but `close` failed.
    Release(ServerError),
}

impl Display for LifecycleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Execution {
                source,
                suppressed: None,
            } => write!(f, "server run failed: {source}"),
            Self::Execution {
                source,
                suppressed: Some(suppressed),
            } => write!(
                f,
                "server run failed: {source} (suppressed close failure: {suppressed})"
            ),
            Self::Release(source) => write!(f, "server close failed: {source}"),
        }
    }
}

impl Error for LifecycleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Execution { source, .. } => Some(source),
            Self::Release(source) => Some(source),
        }
    }
}

/// Runs `handle` and closes it exactly once, whatever `run` returns.
///
/// # Errors
/// - [`LifecycleError::Execution`] when `run` fails, with any close failure
///   attached as suppressed.
/// - [`LifecycleError::Release`] when only `close` fails.
pub fn run_scoped(
    mut handle: ServerHandle,
    resolver: &ResolverChain,
) -> Result<(), LifecycleError> {
    let started_at = Instant::now();
    info!("event=server_run module=lifecycle status=start");
    let run_result = handle.run(resolver);
    match &run_result {
        Ok(()) => info!(
            "event=server_run module=lifecycle status=ok duration_ms={}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=server_run module=lifecycle status=error duration_ms={} error={}",
            started_at.elapsed().as_millis(),
            err
        ),
    }

    let close_result = handle.close();
    match &close_result {
        Ok(()) => debug!("event=server_close module=lifecycle status=ok trigger=scope"),
        Err(err) => error!(
            "event=server_close module=lifecycle status=error trigger=scope error={}",
            err
        ),
    }

    match (run_result, close_result) {
        (Ok(()), Ok(())) => Ok(()),
        (Ok(()), Err(close_err)) => Err(LifecycleError::Release(close_err)),
        (Err(run_err), close_result) => Err(LifecycleError::Execution {
            source: run_err,
            suppressed: close_result.err(),
        }),
    }
}
