//! Error types for the simulation harness.

use orbnet_core::RegistryError;
use orbnet_env::EnvError;
use thiserror::Error;

/// Errors surfaced by the harness before or after a run.
///
/// Collaborator failures during a tick are logged and counted, not
/// returned; see [`TickReport::rejected`](crate::TickReport).
#[derive(Debug, Error)]
pub enum SimError {
    /// The body registry is malformed
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// The network simulator rejected a query or command
    #[error("Network error: {0}")]
    Env(#[from] EnvError),

    /// Start time, step, length or carrier frequency are unusable
    #[error("Invalid loop parameters: {0}")]
    InvalidLoopParameters(String),

    /// The named scenario does not exist
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    /// Writing an export failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding an export failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Writing a CSV table failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl SimError {
    /// Creates an invalid-parameters error.
    pub fn invalid_parameters(msg: impl Into<String>) -> Self {
        Self::InvalidLoopParameters(msg.into())
    }
}
