//! The seam between the facade and the hosted backend.

use crate::error::{ServiceError, ServiceResult};
use crate::types::{Credentials, Filter, Row, Session, SignUp, StoredObject, UploadOptions, User};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// A hosted backend: authentication, table access and blob storage.
///
/// Implementations are stateless with respect to sessions: every call that
/// acts on behalf of a user receives the bearer token explicitly. `None`
/// means the call is made with the public key only.
///
/// # Implementors
///
/// - `hostlink_http::HttpBackend` - the hosted REST surface
/// - `hostlink_server::HostedService` - in-memory reference backend
/// - [`MockService`] - scripted responses for unit tests
#[async_trait]
pub trait BackendService: Send + Sync {
    /// Registers a new identity.
    async fn sign_up(&self, credentials: &Credentials) -> ServiceResult<SignUp>;

    /// Exchanges email and password for a session.
    async fn sign_in(&self, email: &str, password: &str) -> ServiceResult<Session>;

    /// Exchanges a refresh token for a new session.
    async fn refresh_session(&self, refresh_token: &str) -> ServiceResult<Session>;

    /// Revokes the session behind `access_token`.
    async fn sign_out(&self, access_token: &str) -> ServiceResult<()>;

    /// Returns the user behind `access_token`.
    async fn get_user(&self, access_token: &str) -> ServiceResult<User>;

    /// Reads rows.
    async fn select(
        &self,
        bearer: Option<&str>,
        table: &str,
        columns: &str,
        filters: &[Filter],
    ) -> ServiceResult<Vec<Row>>;

    /// Inserts rows, returning them as stored.
    async fn insert(
        &self,
        bearer: Option<&str>,
        table: &str,
        rows: Vec<Row>,
    ) -> ServiceResult<Vec<Row>>;

    /// Applies `patch` to matching rows, returning the updated rows.
    async fn update(
        &self,
        bearer: Option<&str>,
        table: &str,
        patch: Row,
        filters: &[Filter],
    ) -> ServiceResult<Vec<Row>>;

    /// Deletes matching rows, returning them.
    async fn delete(
        &self,
        bearer: Option<&str>,
        table: &str,
        filters: &[Filter],
    ) -> ServiceResult<Vec<Row>>;

    /// Stores a blob at `bucket/path`.
    async fn upload(
        &self,
        bearer: Option<&str>,
        bucket: &str,
        path: &str,
        blob: Bytes,
        options: &UploadOptions,
    ) -> ServiceResult<StoredObject>;

    /// Fetches the blob at `bucket/path`.
    async fn download(
        &self,
        bearer: Option<&str>,
        bucket: &str,
        path: &str,
    ) -> ServiceResult<Bytes>;
}

#[async_trait]
impl<T: BackendService + ?Sized> BackendService for Arc<T> {
    async fn sign_up(&self, credentials: &Credentials) -> ServiceResult<SignUp> {
        (**self).sign_up(credentials).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> ServiceResult<Session> {
        (**self).sign_in(email, password).await
    }

    async fn refresh_session(&self, refresh_token: &str) -> ServiceResult<Session> {
        (**self).refresh_session(refresh_token).await
    }

    async fn sign_out(&self, access_token: &str) -> ServiceResult<()> {
        (**self).sign_out(access_token).await
    }

    async fn get_user(&self, access_token: &str) -> ServiceResult<User> {
        (**self).get_user(access_token).await
    }

    async fn select(
        &self,
        bearer: Option<&str>,
        table: &str,
        columns: &str,
        filters: &[Filter],
    ) -> ServiceResult<Vec<Row>> {
        (**self).select(bearer, table, columns, filters).await
    }

    async fn insert(
        &self,
        bearer: Option<&str>,
        table: &str,
        rows: Vec<Row>,
    ) -> ServiceResult<Vec<Row>> {
        (**self).insert(bearer, table, rows).await
    }

    async fn update(
        &self,
        bearer: Option<&str>,
        table: &str,
        patch: Row,
        filters: &[Filter],
    ) -> ServiceResult<Vec<Row>> {
        (**self).update(bearer, table, patch, filters).await
    }

    async fn delete(
        &self,
        bearer: Option<&str>,
        table: &str,
        filters: &[Filter],
    ) -> ServiceResult<Vec<Row>> {
        (**self).delete(bearer, table, filters).await
    }

    async fn upload(
        &self,
        bearer: Option<&str>,
        bucket: &str,
        path: &str,
        blob: Bytes,
        options: &UploadOptions,
    ) -> ServiceResult<StoredObject> {
        (**self).upload(bearer, bucket, path, blob, options).await
    }

    async fn download(
        &self,
        bearer: Option<&str>,
        bucket: &str,
        path: &str,
    ) -> ServiceResult<Bytes> {
        (**self).download(bearer, bucket, path).await
    }
}

/// A call recorded by [`MockService`].
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    /// `sign_up` for the given email.
    SignUp(String),
    /// `sign_in` for the given email.
    SignIn(String),
    /// `refresh_session`.
    Refresh,
    /// `sign_out`.
    SignOut,
    /// `get_user`.
    GetUser,
    /// `select` on a table with the given columns.
    Select(String, String),
    /// `insert` into a table.
    Insert(String),
    /// `update` on a table.
    Update(String),
    /// `delete` on a table.
    Delete(String),
    /// `upload` to `bucket/path`.
    Upload(String, String),
    /// `download` from `bucket/path`.
    Download(String, String),
}

/// Scripted response for [`MockService`].
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Reply for `sign_up`.
    SignUp(ServiceResult<SignUp>),
    /// Reply for `sign_in` and `refresh_session`.
    Session(ServiceResult<Session>),
    /// Reply for `get_user`.
    User(ServiceResult<User>),
    /// Reply for `sign_out`.
    Unit(ServiceResult<()>),
    /// Reply for table operations.
    Rows(ServiceResult<Vec<Row>>),
    /// Reply for `upload`.
    Stored(ServiceResult<StoredObject>),
    /// Reply for `download`.
    Blob(ServiceResult<Bytes>),
}

/// A backend returning queued replies and recording every call.
///
/// A call whose next queued reply has the wrong shape, or with an empty
/// queue, fails with a 500 service error naming the call.
#[derive(Debug, Default)]
pub struct MockService {
    replies: Mutex<VecDeque<MockReply>>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockService {
    /// Creates a mock with no queued replies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a reply.
    pub fn push_reply(&self, reply: MockReply) {
        self.replies.lock().push_back(reply);
    }

    /// Returns the calls made so far.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    /// Returns the number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn record(&self, call: MockCall) -> Option<MockReply> {
        let label = format!("{call:?}");
        self.calls.lock().push(call);
        let reply = self.replies.lock().pop_front();
        if reply.is_none() {
            tracing::debug!(call = %label, "mock service has no queued reply");
        }
        reply
    }
}

fn unexpected<T>(call: &str) -> ServiceResult<T> {
    Err(ServiceError::new(500, format!("no mock reply for {call}")))
}

#[async_trait]
impl BackendService for MockService {
    async fn sign_up(&self, credentials: &Credentials) -> ServiceResult<SignUp> {
        match self.record(MockCall::SignUp(credentials.email.clone())) {
            Some(MockReply::SignUp(reply)) => reply,
            _ => unexpected("sign_up"),
        }
    }

    async fn sign_in(&self, email: &str, _password: &str) -> ServiceResult<Session> {
        match self.record(MockCall::SignIn(email.to_string())) {
            Some(MockReply::Session(reply)) => reply,
            _ => unexpected("sign_in"),
        }
    }

    async fn refresh_session(&self, _refresh_token: &str) -> ServiceResult<Session> {
        match self.record(MockCall::Refresh) {
            Some(MockReply::Session(reply)) => reply,
            _ => unexpected("refresh_session"),
        }
    }

    async fn sign_out(&self, _access_token: &str) -> ServiceResult<()> {
        match self.record(MockCall::SignOut) {
            Some(MockReply::Unit(reply)) => reply,
            _ => unexpected("sign_out"),
        }
    }

    async fn get_user(&self, _access_token: &str) -> ServiceResult<User> {
        match self.record(MockCall::GetUser) {
            Some(MockReply::User(reply)) => reply,
            _ => unexpected("get_user"),
        }
    }

    async fn select(
        &self,
        _bearer: Option<&str>,
        table: &str,
        columns: &str,
        _filters: &[Filter],
    ) -> ServiceResult<Vec<Row>> {
        match self.record(MockCall::Select(table.to_string(), columns.to_string())) {
            Some(MockReply::Rows(reply)) => reply,
            _ => unexpected("select"),
        }
    }

    async fn insert(
        &self,
        _bearer: Option<&str>,
        table: &str,
        _rows: Vec<Row>,
    ) -> ServiceResult<Vec<Row>> {
        match self.record(MockCall::Insert(table.to_string())) {
            Some(MockReply::Rows(reply)) => reply,
            _ => unexpected("insert"),
        }
    }

    async fn update(
        &self,
        _bearer: Option<&str>,
        table: &str,
        _patch: Row,
        _filters: &[Filter],
    ) -> ServiceResult<Vec<Row>> {
        match self.record(MockCall::Update(table.to_string())) {
            Some(MockReply::Rows(reply)) => reply,
            _ => unexpected("update"),
        }
    }

    async fn delete(
        &self,
        _bearer: Option<&str>,
        table: &str,
        _filters: &[Filter],
    ) -> ServiceResult<Vec<Row>> {
        match self.record(MockCall::Delete(table.to_string())) {
            Some(MockReply::Rows(reply)) => reply,
            _ => unexpected("delete"),
        }
    }

    async fn upload(
        &self,
        _bearer: Option<&str>,
        bucket: &str,
        path: &str,
        _blob: Bytes,
        _options: &UploadOptions,
    ) -> ServiceResult<StoredObject> {
        match self.record(MockCall::Upload(bucket.to_string(), path.to_string())) {
            Some(MockReply::Stored(reply)) => reply,
            _ => unexpected("upload"),
        }
    }

    async fn download(
        &self,
        _bearer: Option<&str>,
        bucket: &str,
        path: &str,
    ) -> ServiceResult<Bytes> {
        match self.record(MockCall::Download(bucket.to_string(), path.to_string())) {
            Some(MockReply::Blob(reply)) => reply,
            _ => unexpected("download"),
        }
    }
}
