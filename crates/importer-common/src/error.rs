//! Classification of Kubernetes API failures
//!
//! Callers of the API need to tell a handful of outcomes apart (missing
//! objects, stale writes) from everything else. `ApiError` turns the raw
//! `kube::Error` into those cases once, at the client boundary.

use thiserror::Error;

/// Outcome of a failed Kubernetes API call
#[derive(Debug, Error)]
pub enum ApiError {
    /// The object does not exist (HTTP 404)
    #[error("not found: {0}")]
    NotFound(String),

    /// The write was rejected because the stored object changed, or the
    /// object already exists (HTTP 409)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Any other status returned by the API server
    #[error("api error ({code}): {message}")]
    Status {
        /// HTTP status code
        code: u16,
        /// Message from the API server
        message: String,
    },

    /// Transport, serialization or client-side failure
    #[error("kubernetes error: {0}")]
    Kube(kube::Error),
}

impl ApiError {
    /// True when the object was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }

    /// True when the request conflicted with the stored object
    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::Conflict(_))
    }

    /// Whether retrying the same request later may succeed
    ///
    /// 4xx statuses other than conflicts need the request or the cluster
    /// state to change first.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::NotFound(_) => false,
            ApiError::Conflict(_) => true,
            ApiError::Status { code, .. } => !(400..500).contains(code) || *code == 429,
            ApiError::Kube(_) => true,
        }
    }
}

impl From<kube::Error> for ApiError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(ae) if ae.code == 404 => ApiError::NotFound(ae.message),
            kube::Error::Api(ae) if ae.code == 409 => ApiError::Conflict(ae.message),
            kube::Error::Api(ae) => ApiError::Status {
                code: ae.code,
                message: ae.message,
            },
            other => ApiError::Kube(other),
        }
    }
}
