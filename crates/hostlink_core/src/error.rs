//! Error types for the facade.

use thiserror::Error;

/// Result type for facade operations.
pub type FacadeResult<T> = Result<T, FacadeError>;

/// Result type for calls into a [`crate::BackendService`].
pub type ServiceResult<T> = Result<T, ServiceError>;

/// An error reported by the hosted backend, passed through verbatim.
///
/// The facade never reinterprets these. `status` is the HTTP-style status
/// code when the service produced one; it is `None` when the request never
/// reached the service (connection refused, DNS failure, and so on).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ServiceError {
    /// Status code reported by the service, if any.
    pub status: Option<u16>,
    /// Machine-readable error code reported by the service, if any.
    pub code: Option<String>,
    /// Human-readable message, unmodified.
    pub message: String,
}

impl ServiceError {
    /// Creates an error carrying a service status code.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            code: None,
            message: message.into(),
        }
    }

    /// Creates an error for a request that never got a service response.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: None,
            message: message.into(),
        }
    }

    /// Attaches a machine-readable error code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Returns true if the service rejected the request (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(self.status, Some(400..=499))
    }

    /// Returns true if the service failed internally (5xx).
    pub fn is_server_error(&self) -> bool {
        matches!(self.status, Some(500..=599))
    }

    /// Returns true if no response was received from the service.
    pub fn is_transport(&self) -> bool {
        self.status.is_none()
    }
}

/// Errors returned by [`crate::BackendFacade`] and [`crate::FacadeSlot`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FacadeError {
    /// An operation was invoked on a slot whose facade has not been created.
    #[error("not initialized")]
    NotInitialized,

    /// The hosted service reported a failure.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl FacadeError {
    /// Returns the underlying service error, if this is one.
    pub fn as_service(&self) -> Option<&ServiceError> {
        match self {
            FacadeError::Service(err) => Some(err),
            FacadeError::NotInitialized => None,
        }
    }
}

/// Errors raised while resolving [`crate::FacadeConfig`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required setting was absent or blank.
    #[error("missing configuration value: {0}")]
    Missing(&'static str),

    /// The service base URL could not be used.
    #[error("invalid base url {url:?}: {reason}")]
    InvalidUrl {
        /// The offending value.
        url: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Errors from a [`crate::SessionStore`].
#[derive(Error, Debug)]
pub enum SessionStoreError {
    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted session could not be decoded.
    #[error("corrupt session file: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_initialized_display() {
        assert_eq!(FacadeError::NotInitialized.to_string(), "not initialized");
    }

    #[test]
    fn service_message_passes_through() {
        let err: FacadeError = ServiceError::new(422, "User already registered").into();
        assert_eq!(err.to_string(), "User already registered");
        assert_eq!(err.as_service().and_then(|e| e.status), Some(422));
    }

    #[test]
    fn error_classification() {
        assert!(ServiceError::new(404, "Object not found").is_client_error());
        assert!(ServiceError::new(503, "unavailable").is_server_error());
        assert!(ServiceError::transport("connection refused").is_transport());
        assert!(!ServiceError::new(400, "bad").is_transport());
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::Missing("HOSTLINK_URL");
        assert!(err.to_string().contains("HOSTLINK_URL"));
    }
}
