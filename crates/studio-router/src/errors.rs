use std::time::Duration;

use crate::content::MediaError;
use crate::model::BackendId;

/// Errors returned by a backend or adapter before the router attaches the
/// model that handled the request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Backend reported a failed precondition. This is the only transient class.
    #[error("precondition failed ({backend}): {message}")]
    PreconditionFailed { backend: BackendId, message: String },
    /// Backend returned an application-level failure (HTTP status, auth, etc.).
    #[error("backend error ({backend}): {message}")]
    Provider {
        backend: BackendId,
        message: String,
        status_code: Option<u16>,
    },
    /// Transport or I/O failed.
    #[error("transport error ({backend}): {message}")]
    Transport { backend: BackendId, message: String },
    /// Response shape was invalid or a required field was missing.
    #[error("protocol error ({backend}): {message}")]
    Protocol { backend: BackendId, message: String },
    /// Backend answered but declined to produce media (safety filter, refusal).
    #[error("no media produced ({backend}): {message}")]
    NoMediaProduced { backend: BackendId, message: String },
    /// A long-running operation finished with an error payload.
    #[error("operation {operation} failed ({backend}): {message}")]
    OperationFailed {
        backend: BackendId,
        operation: String,
        message: String,
    },
    /// A long-running operation did not finish within the poll budget.
    #[error("operation {operation} timed out after {elapsed:?} ({backend})")]
    OperationTimedOut {
        backend: BackendId,
        operation: String,
        elapsed: Duration,
    },
}

impl BackendError {
    /// Creates a provider-level error.
    pub fn provider(
        backend: impl Into<BackendId>,
        message: impl Into<String>,
        status_code: Option<u16>,
    ) -> Self {
        Self::Provider {
            backend: backend.into(),
            message: message.into(),
            status_code,
        }
    }

    /// Creates a transport-level error.
    pub fn transport(backend: impl Into<BackendId>, message: impl Into<String>) -> Self {
        Self::Transport {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Creates a protocol-level error.
    pub fn protocol(backend: impl Into<BackendId>, message: impl Into<String>) -> Self {
        Self::Protocol {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Creates a transient precondition-failed error.
    pub fn precondition_failed(backend: impl Into<BackendId>, message: impl Into<String>) -> Self {
        Self::PreconditionFailed {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Creates a no-media error.
    pub fn no_media(backend: impl Into<BackendId>, message: impl Into<String>) -> Self {
        Self::NoMediaProduced {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Returns the backend associated with this error.
    pub fn backend_id(&self) -> &BackendId {
        match self {
            Self::PreconditionFailed { backend, .. }
            | Self::Provider { backend, .. }
            | Self::Transport { backend, .. }
            | Self::Protocol { backend, .. }
            | Self::NoMediaProduced { backend, .. }
            | Self::OperationFailed { backend, .. }
            | Self::OperationTimedOut { backend, .. } => backend,
        }
    }

    /// Only a failed precondition is retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::PreconditionFailed { .. })
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PreconditionFailed { .. } => ErrorKind::TransientBackend,
            Self::Provider { .. } | Self::Transport { .. } | Self::Protocol { .. } => {
                ErrorKind::FatalBackend
            }
            Self::NoMediaProduced { .. } => ErrorKind::NoMediaProduced,
            Self::OperationFailed { .. } => ErrorKind::OperationFailed,
            Self::OperationTimedOut { .. } => ErrorKind::OperationTimedOut,
        }
    }
}

/// Error taxonomy used for retry decisions and caller-facing reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    Validation,
    NoMediaProduced,
    TransientBackend,
    FatalBackend,
    OperationFailed,
    OperationTimedOut,
    Internal,
}

/// Top-level error type for the public studio API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StudioError {
    /// Invalid or missing configuration (for example a missing API key).
    #[error("config error: {0}")]
    Config(String),
    /// Malformed or empty input caught before dispatch.
    #[error("validation error: {0}")]
    Validation(String),
    /// A backend failed while serving the request.
    #[error("{label} ({model}): {source}")]
    Backend {
        label: String,
        model: String,
        #[source]
        source: BackendError,
    },
    /// Invariant violation inside the pipeline.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StudioError {
    pub(crate) fn backend(label: &str, model: &str, source: BackendError) -> Self {
        Self::Backend {
            label: label.to_string(),
            model: model.to_string(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Backend { source, .. } => source.kind(),
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Backend { source, .. } if source.is_transient())
    }

    /// Message shown to the end user.
    ///
    /// Validation errors are reported verbatim; refusals get a friendlier text.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Backend {
                label,
                source: BackendError::NoMediaProduced { message, .. },
                ..
            } => format!(
                "{label} did not produce any media, possibly because of safety filters: {message}"
            ),
            other => other.to_string(),
        }
    }
}

impl From<MediaError> for StudioError {
    fn from(value: MediaError) -> Self {
        StudioError::Validation(value.to_string())
    }
}
