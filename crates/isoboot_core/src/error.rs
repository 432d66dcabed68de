//! Bootstrap error taxonomy.

use crate::layout::ConfigError;
use crate::lifecycle::{LifecycleError, ServerError};
use crate::locator::LocateError;
use crate::resolver::ResolveError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type BootstrapResult<T> = Result<T, BootstrapError>;

/// Bootstrap stage a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStage {
    Config,
    Discovery,
    Resolution,
    Construction,
    Capability,
    Execution,
    Release,
}

impl BootstrapStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Discovery => "discovery",
            Self::Resolution => "resolution",
            Self::Construction => "construction",
            Self::Capability => "capability",
            Self::Execution => "execution",
            Self::Release => "release",
        }
    }
}

#[derive(Debug)]
pub enum BootstrapError {
    Config(ConfigError),
    Discovery(LocateError),
    Resolution(ResolveError),
    Construction {
        entry_point: String,
        source: ServerError,
    },
    Capability {
        entry_point: String,
    },
    /// The server's `run` failed. A close failure that followed it is kept as
    /// `suppressed` and never replaces `source`.
    Execution {
        source: ServerError,
        suppressed: Option<ServerError>,
    },
    Release(ServerError),
}

impl BootstrapError {
    pub fn stage(&self) -> BootstrapStage {
        match self {
            Self::Config(_) => BootstrapStage::Config,
            Self::Discovery(_) => BootstrapStage::Discovery,
            Self::Resolution(_) => BootstrapStage::Resolution,
            Self::Construction { .. } => BootstrapStage::Construction,
            Self::Capability { .. } => BootstrapStage::Capability,
            Self::Execution { .. } => BootstrapStage::Execution,
            Self::Release(_) => BootstrapStage::Release,
        }
    }

    /// Close failure suppressed behind a run failure, if any.
    pub fn suppressed(&self) -> Option<&ServerError> {
        match self {
            Self::Execution { suppressed, .. } => suppressed.as_ref(),
            _ => None,
        }
    }
}

impl Display for BootstrapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "configuration failed: {err}"),
            Self::Discovery(err) => write!(f, "artifact discovery failed: {err}"),
            Self::Resolution(err) => write!(f, "resolution failed: {err}"),
            Self::Construction {
                entry_point,
                source,
            } => write!(f, "could not construct `{entry_point}`: {source}"),
            Self::Capability { entry_point } => write!(
                f,
                "`{entry_point}` does not provide the run and close capabilities"
            ),
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
            Self::Release(err) => write!(f, "server close failed: {err}"),
        }
    }
}

impl Error for BootstrapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Discovery(err) => Some(err),
            Self::Resolution(err) => Some(err),
            Self::Construction { source, .. } => Some(source),
            Self::Capability { .. } => None,
            Self::Execution { source, .. } => Some(source),
            Self::Release(err) => Some(err),
        }
    }
}

impl From<ConfigError> for BootstrapError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<LocateError> for BootstrapError {
    fn from(value: LocateError) -> Self {
        Self::Discovery(value)
    }
}

impl From<ResolveError> for BootstrapError {
    fn from(value: ResolveError) -> Self {
        Self::Resolution(value)
    }
}

impl From<LifecycleError> for BootstrapError {
    fn from(value: LifecycleError) -> Self {
        match value {
            LifecycleError::Execution { source, suppressed } => {
                Self::Execution { source, suppressed }
            }
            LifecycleError::Release(source) => Self::Release(source),
        }
    }
}
