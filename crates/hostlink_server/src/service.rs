//! The reference backend.

use crate::accounts::Accounts;
use crate::buckets::Buckets;
use crate::config::HostConfig;
use crate::error::HostResult;
use crate::tables::Tables;
use async_trait::async_trait;
use bytes::Bytes;
use hostlink_core::{
    BackendService, Credentials, Filter, Row, ServiceError, ServiceResult, Session, SignUp,
    StoredObject, UploadOptions, User,
};
use tracing::debug;

/// An in-memory implementation of the hosted backend.
///
/// Serves [`BackendService`] directly and the REST surface through
/// [`crate::Router`]. Both views share the same accounts, tables and
/// buckets.
///
/// # Example
///
/// ```
/// use hostlink_server::{HostConfig, HostedService, TablePolicy};
///
/// let config = HostConfig::default().with_table("listings", TablePolicy::default());
/// let service = HostedService::new(config);
/// assert_eq!(service.tables().row_count("listings"), Some(0));
/// ```
pub struct HostedService {
    config: HostConfig,
    accounts: Accounts,
    tables: Tables,
    buckets: Buckets,
}

impl HostedService {
    /// Creates a backend with the declared tables and buckets, all empty.
    pub fn new(config: HostConfig) -> Self {
        let accounts = Accounts::new(&config);
        let tables = Tables::new(&config.tables);
        let buckets = Buckets::new(&config.buckets);
        Self {
            config,
            accounts,
            tables,
            buckets,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Returns the account registry.
    pub fn accounts(&self) -> &Accounts {
        &self.accounts
    }

    /// Returns the tables.
    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    /// Returns the buckets.
    pub fn buckets(&self) -> &Buckets {
        &self.buckets
    }

    /// Confirms an account's email. Returns false for unknown emails.
    pub fn confirm_email(&self, email: &str) -> bool {
        self.accounts.confirm_email(email)
    }

    /// Resolves whether `bearer` identifies a signed-in user.
    ///
    /// No bearer, or the public key, is anonymous. Any other bearer must be
    /// a live access token.
    pub fn authenticated(&self, bearer: Option<&str>) -> HostResult<bool> {
        match bearer {
            None => Ok(false),
            Some(token) if token == self.config.public_key => Ok(false),
            Some(token) => self.accounts.user_for(token).map(|_| true),
        }
    }
}

fn traced<T>(op: &'static str, result: HostResult<T>) -> ServiceResult<T> {
    result.map_err(|err| {
        debug!(op, status = err.status(), error = %err, "request rejected");
        ServiceError::from(err)
    })
}

#[async_trait]
impl BackendService for HostedService {
    async fn sign_up(&self, credentials: &Credentials) -> ServiceResult<SignUp> {
        traced("sign_up", self.accounts.sign_up(credentials))
    }

    async fn sign_in(&self, email: &str, password: &str) -> ServiceResult<Session> {
        traced("sign_in", self.accounts.sign_in(email, password))
    }

    async fn refresh_session(&self, refresh_token: &str) -> ServiceResult<Session> {
        traced("refresh_session", self.accounts.refresh(refresh_token))
    }

    async fn sign_out(&self, access_token: &str) -> ServiceResult<()> {
        traced("sign_out", self.accounts.sign_out(access_token))
    }

    async fn get_user(&self, access_token: &str) -> ServiceResult<User> {
        traced("get_user", self.accounts.user_for(access_token))
    }

    async fn select(
        &self,
        bearer: Option<&str>,
        table: &str,
        columns: &str,
        filters: &[Filter],
    ) -> ServiceResult<Vec<Row>> {
        traced(
            "select",
            self.authenticated(bearer)
                .and_then(|auth| self.tables.select(table, columns, filters, auth)),
        )
    }

    async fn insert(
        &self,
        bearer: Option<&str>,
        table: &str,
        rows: Vec<Row>,
    ) -> ServiceResult<Vec<Row>> {
        traced(
            "insert",
            self.authenticated(bearer)
                .and_then(|auth| self.tables.insert(table, rows, auth)),
        )
    }

    async fn update(
        &self,
        bearer: Option<&str>,
        table: &str,
        patch: Row,
        filters: &[Filter],
    ) -> ServiceResult<Vec<Row>> {
        traced(
            "update",
            self.authenticated(bearer)
                .and_then(|auth| self.tables.update(table, &patch, filters, auth)),
        )
    }

    async fn delete(
        &self,
        bearer: Option<&str>,
        table: &str,
        filters: &[Filter],
    ) -> ServiceResult<Vec<Row>> {
        traced(
            "delete",
            self.authenticated(bearer)
                .and_then(|auth| self.tables.delete(table, filters, auth)),
        )
    }

    async fn upload(
        &self,
        bearer: Option<&str>,
        bucket: &str,
        path: &str,
        blob: Bytes,
        options: &UploadOptions,
    ) -> ServiceResult<StoredObject> {
        traced(
            "upload",
            self.authenticated(bearer)
                .and_then(|auth| self.buckets.upload(bucket, path, blob, options, auth)),
        )
    }

    async fn download(
        &self,
        bearer: Option<&str>,
        bucket: &str,
        path: &str,
    ) -> ServiceResult<Bytes> {
        traced(
            "download",
            self.authenticated(bearer)
                .and_then(|auth| self.buckets.download(bucket, path, auth))
                .map(|object| object.data),
        )
    }
}
