//! Reference backend configuration.

use std::collections::BTreeMap;
use std::time::Duration;

/// Access rules for a table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TablePolicy {
    /// Reject calls made without a signed-in user.
    pub require_auth: bool,
}

/// Access rules for a bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BucketPolicy {
    /// Objects are readable through the public URL.
    pub public: bool,
    /// Reject uploads and downloads made without a signed-in user.
    pub require_auth: bool,
}

/// Configuration for a [`crate::HostedService`].
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Public (anon) key accepted by the HTTP router.
    pub public_key: String,
    /// Secret key for signing access tokens.
    pub jwt_secret: Vec<u8>,
    /// Access token lifetime.
    pub token_expiry: Duration,
    /// Minimum password length at sign-up.
    pub min_password_length: usize,
    /// Issue a session at sign-up instead of waiting for email confirmation.
    pub autoconfirm: bool,
    /// Declared tables.
    pub tables: BTreeMap<String, TablePolicy>,
    /// Declared buckets.
    pub buckets: BTreeMap<String, BucketPolicy>,
}

impl HostConfig {
    /// Creates a configuration with no tables or buckets.
    pub fn new(public_key: impl Into<String>, jwt_secret: Vec<u8>) -> Self {
        Self {
            public_key: public_key.into(),
            jwt_secret,
            token_expiry: Duration::from_secs(60 * 60), // 1 hour
            min_password_length: 6,
            autoconfirm: true,
            tables: BTreeMap::new(),
            buckets: BTreeMap::new(),
        }
    }

    /// Sets the access token lifetime.
    pub fn with_token_expiry(mut self, expiry: Duration) -> Self {
        self.token_expiry = expiry;
        self
    }

    /// Sets the minimum password length.
    pub fn with_min_password_length(mut self, len: usize) -> Self {
        self.min_password_length = len;
        self
    }

    /// Requires email confirmation before a session is issued.
    pub fn with_email_confirmation(mut self) -> Self {
        self.autoconfirm = false;
        self
    }

    /// Declares a table.
    pub fn with_table(mut self, name: impl Into<String>, policy: TablePolicy) -> Self {
        self.tables.insert(name.into(), policy);
        self
    }

    /// Declares a bucket.
    pub fn with_bucket(mut self, name: impl Into<String>, policy: BucketPolicy) -> Self {
        self.buckets.insert(name.into(), policy);
        self
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self::new("anon-key", b"reference-backend-signing-secret".to_vec())
    }
}
