//! Error types for pv-migrate

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::migrator::AttemptResult;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while migrating a volume
#[derive(Error, Debug)]
pub enum Error {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Kubeconfig could not be loaded or resolved
    #[error("Kubeconfig error: {0}")]
    Kubeconfig(String),

    /// Invalid request or strategy selection; no attempt was made
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// PersistentVolumeClaim does not exist
    #[error("PersistentVolumeClaim {namespace}/{name} not found")]
    ClaimNotFound { namespace: String, name: String },

    // =========================================================================
    // Attempt Failures
    // =========================================================================
    /// The cluster rejected or failed to create an ephemeral resource
    #[error("Failed to provision {resource}: {reason}")]
    ProvisioningFailed { resource: String, reason: String },

    /// A provisioned resource never became ready
    #[error("{resource} did not become ready within {waited:?}")]
    ReadinessTimeout { resource: String, waited: Duration },

    /// The transfer tool did not finish successfully
    #[error("Transfer in {pod} failed: {reason}")]
    TransferFailed { pod: String, reason: String },

    /// An ephemeral resource could not be removed
    #[error("Failed to delete {resource}: {reason}")]
    TeardownFailed { resource: String, reason: String },

    /// The attempt was interrupted from outside
    #[error("Operation cancelled")]
    Cancelled,

    // =========================================================================
    // Request Outcomes
    // =========================================================================
    /// Every candidate strategy failed or was not applicable
    #[error("All strategies failed: {}", render_attempts(.attempts))]
    Exhausted { attempts: Vec<AttemptResult> },

    /// The migration was interrupted; later candidates were not evaluated
    #[error("Migration cancelled after {} attempt(s): {}", .attempts.len(), render_attempts(.attempts))]
    MigrationCancelled { attempts: Vec<AttemptResult> },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of an attempt failure, recorded in attempt results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    Configuration,
    Cluster,
    ProvisioningFailed,
    ReadinessTimeout,
    TransferFailed,
    TeardownFailed,
    Cancelled,
    Internal,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Configuration => write!(f, "ConfigurationError"),
            FailureKind::Cluster => write!(f, "ClusterError"),
            FailureKind::ProvisioningFailed => write!(f, "ProvisioningFailed"),
            FailureKind::ReadinessTimeout => write!(f, "ReadinessTimeout"),
            FailureKind::TransferFailed => write!(f, "TransferFailed"),
            FailureKind::TeardownFailed => write!(f, "TeardownFailed"),
            FailureKind::Cancelled => write!(f, "Cancelled"),
            FailureKind::Internal => write!(f, "Internal"),
        }
    }
}

impl Error {
    /// Classify this error for attempt bookkeeping.
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Kube(_) | Error::Kubeconfig(_) | Error::ClaimNotFound { .. } => {
                FailureKind::Cluster
            }
            Error::Configuration(_) => FailureKind::Configuration,
            Error::ProvisioningFailed { .. } => FailureKind::ProvisioningFailed,
            Error::ReadinessTimeout { .. } => FailureKind::ReadinessTimeout,
            Error::TransferFailed { .. } => FailureKind::TransferFailed,
            Error::TeardownFailed { .. } => FailureKind::TeardownFailed,
            Error::Cancelled | Error::MigrationCancelled { .. } => FailureKind::Cancelled,
            Error::Exhausted { .. } | Error::Internal(_) => FailureKind::Internal,
        }
    }

    /// True for errors raised before any strategy was attempted.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    /// True if the error came from an external interruption.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled | Error::MigrationCancelled { .. })
    }

    /// Attempt results carried by a request-level failure.
    pub fn attempts(&self) -> &[AttemptResult] {
        match self {
            Error::Exhausted { attempts } | Error::MigrationCancelled { attempts } => attempts,
            _ => &[],
        }
    }
}

fn render_attempts(attempts: &[AttemptResult]) -> String {
    if attempts.is_empty() {
        return "no strategy was attempted".to_string();
    }
    attempts
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
