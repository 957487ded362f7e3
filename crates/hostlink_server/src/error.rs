//! Error types for the reference backend.

use hostlink_core::storage::INVALID_KEY_CODE;
use hostlink_core::ServiceError;
use thiserror::Error;

/// Result type for backend operations.
pub type HostResult<T> = Result<T, HostError>;

/// Errors produced by [`crate::HostedService`].
///
/// Messages and codes mirror what the hosted service reports, so code
/// written against this backend sees the same errors it will see live.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// Unknown email or wrong password (deliberately indistinguishable).
    #[error("Invalid login credentials")]
    InvalidCredentials,

    /// Sign-up with an email that already has an account.
    #[error("User already registered")]
    UserExists,

    /// Sign-up password below the minimum length.
    #[error("Password should be at least {min} characters.")]
    WeakPassword {
        /// Minimum length.
        min: usize,
    },

    /// Sign-in before the account's email was confirmed.
    #[error("Email not confirmed")]
    EmailNotConfirmed,

    /// Sign-up email that is not an address.
    #[error("Unable to validate email address: invalid format")]
    InvalidEmail,

    /// Missing, malformed, expired or revoked access token.
    #[error("invalid JWT: {0}")]
    InvalidToken(String),

    /// Unknown or already used refresh token.
    #[error("Invalid Refresh Token: Refresh Token Not Found")]
    InvalidRefreshToken,

    /// No such table.
    #[error("relation \"public.{0}\" does not exist")]
    UnknownTable(String),

    /// No such column in the select list.
    #[error("column {table}.{column} does not exist")]
    UnknownColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// Anonymous access to a table requiring a signed-in user.
    #[error("new row violates row-level security policy for table \"{0}\"")]
    PolicyViolation(String),

    /// No such bucket.
    #[error("Bucket not found")]
    BucketNotFound,

    /// Upload to an occupied path without upsert.
    #[error("The resource already exists")]
    ObjectExists,

    /// No object at the path.
    #[error("Object not found")]
    ObjectNotFound,

    /// The path cannot name an object.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Anonymous access to a private bucket.
    #[error("new row violates row-level security policy")]
    StorageUnauthorized,

    /// The request lacked an API key.
    #[error("No API key found in request")]
    MissingApiKey,

    /// The request's API key is not this project's.
    #[error("Invalid API key")]
    InvalidApiKey,

    /// Malformed request.
    #[error("{0}")]
    InvalidRequest(String),

    /// No route for the request.
    #[error("route {0} not found")]
    RouteNotFound(String),
}

impl HostError {
    /// Returns the HTTP status for this error.
    pub fn status(&self) -> u16 {
        match self {
            HostError::InvalidCredentials
            | HostError::EmailNotConfirmed
            | HostError::InvalidEmail
            | HostError::InvalidRefreshToken
            | HostError::UnknownColumn { .. }
            | HostError::StorageUnauthorized
            | HostError::InvalidKey(_)
            | HostError::InvalidRequest(_) => 400,
            HostError::InvalidToken(_)
            | HostError::PolicyViolation(_)
            | HostError::MissingApiKey
            | HostError::InvalidApiKey => 401,
            HostError::UnknownTable(_)
            | HostError::BucketNotFound
            | HostError::ObjectNotFound
            | HostError::RouteNotFound(_) => 404,
            HostError::ObjectExists => 409,
            HostError::UserExists | HostError::WeakPassword { .. } => 422,
        }
    }

    /// Returns the machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            HostError::InvalidCredentials => "invalid_credentials",
            HostError::UserExists => "user_already_exists",
            HostError::EmailNotConfirmed => "email_not_confirmed",
            HostError::WeakPassword { .. } => "weak_password",
            HostError::InvalidEmail => "validation_failed",
            HostError::InvalidToken(_) => "bad_jwt",
            HostError::InvalidRefreshToken => "refresh_token_not_found",
            HostError::UnknownTable(_) => "42P01",
            HostError::UnknownColumn { .. } => "42703",
            HostError::PolicyViolation(_) => "42501",
            HostError::BucketNotFound => "NoSuchBucket",
            HostError::ObjectExists => "Duplicate",
            HostError::ObjectNotFound => "NoSuchKey",
            HostError::InvalidKey(_) => INVALID_KEY_CODE,
            HostError::StorageUnauthorized => "Unauthorized",
            HostError::MissingApiKey | HostError::InvalidApiKey => "no_api_key",
            HostError::InvalidRequest(_) => "bad_request",
            HostError::RouteNotFound(_) => "not_found",
        }
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status())
    }
}

impl From<HostError> for ServiceError {
    fn from(err: HostError) -> Self {
        ServiceError::new(err.status(), err.to_string()).with_code(err.code())
    }
}
