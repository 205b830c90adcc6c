//! Import reconcile error types

use std::fmt;
use std::time::Duration;

use importer_common::ApiError;

/// Remote operation that failed while updating the status annotation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusOp {
    /// Writing the claim
    Updating,
    /// Re-reading the claim after a conflict
    Getting,
}

impl fmt::Display for StatusOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusOp::Updating => write!(f, "updating"),
            StatusOp::Getting => write!(f, "getting"),
        }
    }
}

/// Why a status annotation could not be written
#[derive(Debug, thiserror::Error)]
pub enum StatusUpdateFailure {
    /// A non-conflict API error aborted the update
    #[error("error {op} claim: {source}")]
    Api { op: StatusOp, source: ApiError },

    /// Conflicts kept occurring until the retry budget was spent
    #[error("conflicting writers persisted past the {0:?} retry budget")]
    Timeout(Duration),
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("annotation {annotation:?} in claim {namespace}/{name} is missing or blank")]
    MissingEndpoint {
        namespace: String,
        name: String,
        annotation: &'static str,
    },

    #[error("error getting secret {secret:?} defined in claim {namespace}/{name}: {source}")]
    CredentialLookup {
        namespace: String,
        name: String,
        secret: String,
        source: ApiError,
    },

    #[error("status update of claim {namespace}/{name} failed: {reason}")]
    StatusUpdate {
        namespace: String,
        name: String,
        reason: StatusUpdateFailure,
    },

    #[error("creating importer pod {pod:?} for claim {namespace}/{name} failed: {source}")]
    WorkerCreation {
        namespace: String,
        name: String,
        pod: String,
        source: ApiError,
    },

    #[error("invalid claim key {0:?}, expected namespace/name")]
    InvalidKey(String),

    #[error("claim {0} has no namespace")]
    MissingNamespace(String),
}

impl ImportError {
    /// Whether the outer loop should requeue the claim.
    ///
    /// A missing endpoint or a malformed claim needs a user edit first.
    /// API failures follow [`ApiError::is_retryable`]; a status update that
    /// ran out of budget is retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            ImportError::MissingEndpoint { .. } => false,
            ImportError::CredentialLookup { source, .. } => source.is_retryable(),
            ImportError::StatusUpdate { reason, .. } => match reason {
                StatusUpdateFailure::Api { source, .. } => source.is_retryable(),
                StatusUpdateFailure::Timeout(_) => true,
            },
            ImportError::WorkerCreation { source, .. } => source.is_retryable(),
            ImportError::InvalidKey(_) => false,
            ImportError::MissingNamespace(_) => false,
        }
    }

    /// True for a status update that gave up after its retry budget
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ImportError::StatusUpdate {
                reason: StatusUpdateFailure::Timeout(_),
                ..
            }
        )
    }

    /// `namespace/name` of the claim this error is about, when known
    pub fn claim(&self) -> Option<String> {
        match self {
            ImportError::MissingEndpoint {
                namespace, name, ..
            }
            | ImportError::CredentialLookup {
                namespace, name, ..
            }
            | ImportError::StatusUpdate {
                namespace, name, ..
            }
            | ImportError::WorkerCreation {
                namespace, name, ..
            } => Some(format!("{}/{}", namespace, name)),
            ImportError::InvalidKey(_) => None,
            ImportError::MissingNamespace(name) => Some(name.clone()),
        }
    }
}
