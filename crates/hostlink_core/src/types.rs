//! Data model shared by the facade and its service implementations.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A table row: a JSON object keyed by column name.
pub type Row = Map<String, Value>;

/// Column list meaning "all columns".
pub const ALL_COLUMNS: &str = "*";

/// Returns the current Unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Sign-up credentials.
///
/// Opaque to the facade and handed to the service verbatim. The password
/// is wiped when the value is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    /// Account email.
    #[zeroize(skip)]
    pub email: String,
    /// Account password.
    pub password: String,
    /// Arbitrary metadata attached to the identity.
    #[zeroize(skip)]
    pub metadata: Map<String, Value>,
}

impl Credentials {
    /// Creates credentials with empty metadata.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            metadata: Map::new(),
        }
    }

    /// Replaces the attached metadata.
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("metadata", &self.metadata)
            .finish()
    }
}

/// An identity as reported by the hosted service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Service-assigned identifier.
    pub id: String,
    /// Account email.
    pub email: String,
    /// Metadata supplied at sign-up.
    #[serde(default, rename = "user_metadata")]
    pub metadata: Map<String, Value>,
    /// Creation timestamp, as formatted by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// An authenticated session.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token for authenticated requests.
    pub access_token: String,
    /// Token type, normally `bearer`.
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Single-use token exchanged for a fresh session.
    pub refresh_token: String,
    /// Lifetime of the access token in seconds.
    pub expires_in: u64,
    /// Unix time (seconds) at which the access token expires.
    #[serde(default)]
    pub expires_at: u64,
    /// The signed-in user.
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    /// Fills `expires_at` from `expires_in` when the service omitted it.
    pub fn normalized(mut self) -> Self {
        if self.expires_at == 0 {
            self.expires_at = unix_now().saturating_add(self.expires_in);
        }
        self
    }

    /// Returns true if the access token has expired at `now`.
    pub fn is_expired_at(&self, now: u64) -> bool {
        now >= self.expires_at
    }

    /// Returns true if the access token has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(unix_now())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// Outcome of a successful sign-up.
///
/// `session` is present when the service signs the new identity in
/// immediately (no email confirmation step).
#[derive(Debug, Clone, PartialEq)]
pub struct SignUp {
    /// The registered identity.
    pub user: User,
    /// Session, if the service issued one.
    pub session: Option<Session>,
}

/// Equality predicate scoping a table operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Column name.
    pub column: String,
    /// Required value.
    pub value: Value,
}

impl Filter {
    /// Creates a `column = value` filter.
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Returns true if `row` satisfies this filter.
    pub fn matches(&self, row: &Row) -> bool {
        row.get(&self.column) == Some(&self.value)
    }

    /// Renders the value the way it appears in a query string.
    pub fn value_text(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            Value::Null => "null".to_string(),
            other => other.to_string(),
        }
    }
}

/// Options for an upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadOptions {
    /// Replace an existing object at the same path.
    pub upsert: bool,
    /// MIME type recorded with the object.
    pub content_type: Option<String>,
}

/// A stored blob's location as acknowledged by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredObject {
    /// Bucket name.
    pub bucket: String,
    /// Path inside the bucket.
    pub path: String,
    /// Fully qualified key (`bucket/path`).
    #[serde(rename = "Key")]
    pub key: String,
}

impl StoredObject {
    /// Creates a stored-object record for `bucket/path`.
    pub fn new(bucket: impl Into<String>, path: impl Into<String>) -> Self {
        let bucket = bucket.into();
        let path = path.into();
        let key = format!("{bucket}/{path}");
        Self { bucket, path, key }
    }
}

/// Authentication state transitions delivered to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// A session was established.
    SignedIn,
    /// The session ended.
    SignedOut,
    /// The session was replaced using its refresh token.
    TokenRefreshed,
}

impl AuthEvent {
    /// Returns the event name used by the hosted service's clients.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthEvent::SignedIn => "SIGNED_IN",
            AuthEvent::SignedOut => "SIGNED_OUT",
            AuthEvent::TokenRefreshed => "TOKEN_REFRESHED",
        }
    }
}
