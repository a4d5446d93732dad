//! Runs smart charging cycles: loads what a site needs through a
//! [`SiteRepository`], exchanges the request with the optimizer through an
//! [`OptimizerTransport`] and turns the answer into charging profiles.

mod cycle;
mod http;
mod memory;
mod repository;
mod transport;

pub use crate::cycle::{PreparedRequest, SmartChargingCycle};
pub use crate::http::{HttpOptimizer, OptimizerSettings};
pub use crate::memory::{MemoryStore, MeterValues};
pub use crate::repository::SiteRepository;
pub use crate::transport::{OptimizerTransport, TransportSettings};

use chargeplan_core::{ErrorKind, SmartChargingError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Optimizer configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    SmartCharging(#[from] SmartChargingError),
    #[error("Optimizer answered {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("Optimizer unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Who is to blame for an [`EngineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    Configuration,
    Validation,
    NotFound,
    Upstream,
    Storage,
}

impl EngineError {
    pub fn kind(&self) -> EngineErrorKind {
        match self {
            EngineError::Configuration(_) => EngineErrorKind::Configuration,
            EngineError::SmartCharging(error) => match error.kind() {
                ErrorKind::Validation => EngineErrorKind::Validation,
                ErrorKind::NotFound => EngineErrorKind::NotFound,
            },
            EngineError::Upstream { .. } | EngineError::Transport(_) => EngineErrorKind::Upstream,
            EngineError::Storage(_) => EngineErrorKind::Storage,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
