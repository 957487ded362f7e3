//! The backend facade.

use crate::config::FacadeConfig;
use crate::error::{FacadeResult, ServiceError};
use crate::events::{AuthListeners, AuthSubscription};
use crate::service::BackendService;
use crate::session::{FileSessionStore, MemorySessionStore, SessionStore};
use crate::storage;
use crate::types::{
    AuthEvent, Credentials, Filter, Row, Session, SignUp, StoredObject, UploadOptions, User,
    ALL_COLUMNS,
};
use bytes::Bytes;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};
use url::Url;

/// Uniform access to a hosted backend's auth, tables and storage.
///
/// The facade owns the service handle and the current session. Every
/// operation returns a `Result`; service failures are passed through
/// unmodified and leave the facade usable.
///
/// # Example
///
/// ```rust,ignore
/// use hostlink_core::{BackendFacade, FacadeConfig};
///
/// let config = FacadeConfig::from_env()?;
/// let facade = BackendFacade::new(config, service);
///
/// facade.sign_in("agent@example.com", "secret").await?;
/// let listings = facade.select_all("listings").await?;
/// ```
pub struct BackendFacade<S: BackendService> {
    config: FacadeConfig,
    service: S,
    session: RwLock<Option<Session>>,
    store: Arc<dyn SessionStore>,
    listeners: AuthListeners,
    /// Held for the duration of a refresh so a refresh token is spent once.
    refreshing: AsyncMutex<()>,
}

impl<S: BackendService> BackendFacade<S> {
    /// Creates a facade, restoring a persisted session when enabled.
    ///
    /// The session store is a [`FileSessionStore`] when the config names a
    /// session path and persistence is on, otherwise a [`MemorySessionStore`].
    pub fn new(config: FacadeConfig, service: S) -> Self {
        let store: Arc<dyn SessionStore> = match (&config.session_path, config.auth.persist_session)
        {
            (Some(path), true) => Arc::new(FileSessionStore::new(path)),
            _ => Arc::new(MemorySessionStore::new()),
        };
        Self::with_session_store(config, service, store)
    }

    /// Creates a facade with an explicit session store.
    pub fn with_session_store(
        config: FacadeConfig,
        service: S,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        let restored = if config.auth.persist_session {
            match store.load() {
                Ok(session) => session,
                Err(e) => {
                    warn!(error = %e, "ignoring unreadable persisted session");
                    None
                }
            }
        } else {
            None
        };

        if let Some(session) = &restored {
            debug!(user = %session.user.id, "restored persisted session");
        }

        Self {
            config,
            service,
            session: RwLock::new(restored),
            store,
            listeners: AuthListeners::new(),
            refreshing: AsyncMutex::new(()),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &FacadeConfig {
        &self.config
    }

    /// Returns the underlying service.
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Returns the current session, if any.
    pub fn session(&self) -> Option<Session> {
        self.session.read().clone()
    }

    // ---------------------------------------------------------------------
    // Authentication
    // ---------------------------------------------------------------------

    /// Registers a new identity with attached metadata.
    ///
    /// Service errors such as a duplicate email or a weak password are
    /// returned unmodified. If the service signs the new user in right away,
    /// the session is adopted and listeners receive [`AuthEvent::SignedIn`].
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Map<String, Value>,
    ) -> FacadeResult<SignUp> {
        let credentials = Credentials::new(email, password).with_metadata(metadata);
        debug!(email, "sign up");

        let outcome = self
            .service
            .sign_up(&credentials)
            .await
            .map_err(|e| log_failure("sign up", e))?;

        let mut outcome = outcome;
        if let Some(session) = outcome.session.take() {
            let session = session.normalized();
            self.adopt(session.clone(), AuthEvent::SignedIn);
            outcome.session = Some(session);
        }
        Ok(outcome)
    }

    /// Exchanges credentials for a session.
    pub async fn sign_in(&self, email: &str, password: &str) -> FacadeResult<Session> {
        debug!(email, "sign in");
        let session = self
            .service
            .sign_in(email, password)
            .await
            .map_err(|e| log_failure("sign in", e))?
            .normalized();

        self.adopt(session.clone(), AuthEvent::SignedIn);
        Ok(session)
    }

    /// Ends the current session.
    ///
    /// Idempotent: without an active session this returns `Ok(())` and
    /// makes no request. The local session is cleared even when the service
    /// fails to revoke it. A service answer that the session is already
    /// gone (401, 403, 404) counts as success; other failures are returned.
    pub async fn sign_out(&self) -> FacadeResult<()> {
        let Some(session) = self.session.write().take() else {
            debug!("sign out without active session");
            return Ok(());
        };

        self.clear_store();
        let revoked = self.service.sign_out(&session.access_token).await;

        info!(user = %session.user.id, "signed out");
        self.listeners.emit(AuthEvent::SignedOut, None);

        match revoked {
            Err(e) if matches!(e.status, Some(401 | 403 | 404)) => {
                debug!(status = ?e.status, "session already ended at the service");
                Ok(())
            }
            other => other.map_err(|e| log_failure("sign out", e)),
        }
    }

    /// Returns the user behind the active session, or `None` without one.
    ///
    /// Without a session no request is made. An expired session is
    /// refreshed first when auto-refresh is on.
    pub async fn get_current_user(&self) -> FacadeResult<Option<User>> {
        let Some(token) = self.access_token().await? else {
            return Ok(None);
        };

        let user = self
            .service
            .get_user(&token)
            .await
            .map_err(|e| log_failure("get user", e))?;
        Ok(Some(user))
    }

    /// Replaces the session using its refresh token.
    ///
    /// Fails with a 401 service error when there is no session. A rejected
    /// refresh ends the session and notifies listeners, unless another
    /// refresh replaced the session in the meantime. Refreshes never overlap.
    pub async fn refresh_session(&self) -> FacadeResult<Session> {
        let _refreshing = self.refreshing.lock().await;
        self.refresh_exclusive().await
    }

    /// Refreshes while `refreshing` is held.
    async fn refresh_exclusive(&self) -> FacadeResult<Session> {
        let refresh_token = self
            .session
            .read()
            .as_ref()
            .map(|s| s.refresh_token.clone())
            .ok_or_else(|| ServiceError::new(401, "Auth session missing!"))?;

        match self.service.refresh_session(&refresh_token).await {
            Ok(session) => {
                let session = session.normalized();
                self.adopt(session.clone(), AuthEvent::TokenRefreshed);
                Ok(session)
            }
            Err(e) => {
                let ended = {
                    let mut current = self.session.write();
                    let spent = current
                        .as_ref()
                        .is_some_and(|s| s.refresh_token == refresh_token);
                    spent && current.take().is_some()
                };
                if ended {
                    self.clear_store();
                    self.listeners.emit(AuthEvent::SignedOut, None);
                }
                Err(log_failure("refresh session", e))
            }
        }
    }

    /// Registers a listener for sign-in, sign-out and refresh transitions.
    ///
    /// Listeners run in registration order, once per transition.
    pub fn on_auth_state_change<F>(&self, callback: F) -> AuthSubscription
    where
        F: Fn(AuthEvent, Option<&Session>) + Send + Sync + 'static,
    {
        self.listeners.subscribe(callback)
    }

    /// Adopts a session carried in a redirect URL's fragment or query.
    ///
    /// Returns `Ok(None)` when URL detection is disabled or the URL carries
    /// no tokens. An `error_description` parameter is returned as a service
    /// error.
    pub async fn session_from_url(&self, redirect: &str) -> FacadeResult<Option<Session>> {
        if !self.config.auth.detect_session_in_url {
            return Ok(None);
        }

        let Some(params) = UrlSession::parse(redirect)? else {
            return Ok(None);
        };

        let user = self
            .service
            .get_user(&params.access_token)
            .await
            .map_err(|e| log_failure("get user", e))?;

        let session = Session {
            access_token: params.access_token,
            token_type: "bearer".to_string(),
            refresh_token: params.refresh_token,
            expires_in: params.expires_in,
            expires_at: params.expires_at,
            user,
        }
        .normalized();

        self.adopt(session.clone(), AuthEvent::SignedIn);
        Ok(Some(session))
    }

    // ---------------------------------------------------------------------
    // Tables
    // ---------------------------------------------------------------------

    /// Reads `columns` from every visible row of `table`.
    pub async fn select(&self, table: &str, columns: &str) -> FacadeResult<Vec<Row>> {
        self.select_where(table, columns, &[]).await
    }

    /// Reads all columns of every visible row of `table`.
    pub async fn select_all(&self, table: &str) -> FacadeResult<Vec<Row>> {
        self.select(table, ALL_COLUMNS).await
    }

    /// Reads `columns` from rows matching every filter.
    pub async fn select_where(
        &self,
        table: &str,
        columns: &str,
        filters: &[Filter],
    ) -> FacadeResult<Vec<Row>> {
        let bearer = self.access_token().await?;
        debug!(table, columns, filters = filters.len(), "select");
        self.service
            .select(bearer.as_deref(), table, columns, filters)
            .await
            .map_err(|e| log_table_failure("select", table, e))
    }

    /// Inserts one row, returning it as stored.
    pub async fn insert(&self, table: &str, row: Row) -> FacadeResult<Vec<Row>> {
        self.insert_many(table, vec![row]).await
    }

    /// Inserts several rows in one request.
    pub async fn insert_many(&self, table: &str, rows: Vec<Row>) -> FacadeResult<Vec<Row>> {
        let bearer = self.access_token().await?;
        debug!(table, rows = rows.len(), "insert");
        self.service
            .insert(bearer.as_deref(), table, rows)
            .await
            .map_err(|e| log_table_failure("insert", table, e))
    }

    /// Applies `patch` to every row the service lets this caller update.
    pub async fn update(&self, table: &str, patch: Row) -> FacadeResult<Vec<Row>> {
        self.update_where(table, patch, &[]).await
    }

    /// Applies `patch` to rows matching every filter.
    pub async fn update_where(
        &self,
        table: &str,
        patch: Row,
        filters: &[Filter],
    ) -> FacadeResult<Vec<Row>> {
        let bearer = self.access_token().await?;
        debug!(table, filters = filters.len(), "update");
        self.service
            .update(bearer.as_deref(), table, patch, filters)
            .await
            .map_err(|e| log_table_failure("update", table, e))
    }

    /// Deletes every row the service lets this caller delete.
    pub async fn delete(&self, table: &str) -> FacadeResult<Vec<Row>> {
        self.delete_where(table, &[]).await
    }

    /// Deletes rows matching every filter.
    pub async fn delete_where(&self, table: &str, filters: &[Filter]) -> FacadeResult<Vec<Row>> {
        let bearer = self.access_token().await?;
        debug!(table, filters = filters.len(), "delete");
        self.service
            .delete(bearer.as_deref(), table, filters)
            .await
            .map_err(|e| log_table_failure("delete", table, e))
    }

    // ---------------------------------------------------------------------
    // Storage
    // ---------------------------------------------------------------------

    /// Stores `blob` at `bucket/path` with the service's default overwrite rules.
    pub async fn upload(
        &self,
        bucket: &str,
        path: &str,
        blob: impl Into<Bytes>,
    ) -> FacadeResult<StoredObject> {
        self.upload_with(bucket, path, blob, &UploadOptions::default())
            .await
    }

    /// Stores `blob` at `bucket/path` with explicit options.
    pub async fn upload_with(
        &self,
        bucket: &str,
        path: &str,
        blob: impl Into<Bytes>,
        options: &UploadOptions,
    ) -> FacadeResult<StoredObject> {
        let blob = blob.into();
        let bearer = self.access_token().await?;
        debug!(bucket, path, bytes = blob.len(), upsert = options.upsert, "upload");
        self.service
            .upload(bearer.as_deref(), bucket, path, blob, options)
            .await
            .map_err(|e| log_failure("upload", e))
    }

    /// Fetches the blob at `bucket/path`.
    pub async fn download(&self, bucket: &str, path: &str) -> FacadeResult<Bytes> {
        let bearer = self.access_token().await?;
        debug!(bucket, path, "download");
        self.service
            .download(bearer.as_deref(), bucket, path)
            .await
            .map_err(|e| log_failure("download", e))
    }

    /// Returns the public URL of `bucket/path`. Makes no request.
    pub fn get_public_url(&self, bucket: &str, path: &str) -> String {
        storage::public_url(&self.config.base_url, bucket, path)
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    /// Returns the bearer token for the next request, refreshing first when
    /// the session has expired and auto-refresh is on.
    async fn access_token(&self) -> FacadeResult<Option<String>> {
        match self.current_token() {
            Some((token, expired)) if !expired || !self.config.auth.auto_refresh_token => {
                return Ok(Some(token));
            }
            Some(_) => {}
            None => return Ok(None),
        }

        let _refreshing = self.refreshing.lock().await;
        // A refresh that finished while this call waited already replaced
        // the session.
        match self.current_token() {
            Some((_, true)) => {
                debug!("access token expired, refreshing");
                let session = self.refresh_exclusive().await?;
                Ok(Some(session.access_token))
            }
            Some((token, false)) => Ok(Some(token)),
            None => Ok(None),
        }
    }

    fn current_token(&self) -> Option<(String, bool)> {
        self.session
            .read()
            .as_ref()
            .map(|s| (s.access_token.clone(), s.is_expired()))
    }

    fn adopt(&self, session: Session, event: AuthEvent) {
        if self.config.auth.persist_session {
            if let Err(e) = self.store.save(&session) {
                warn!(error = %e, "failed to persist session");
            }
        }
        info!(user = %session.user.id, event = event.as_str(), "session updated");
        *self.session.write() = Some(session.clone());
        self.listeners.emit(event, Some(&session));
    }

    fn clear_store(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "failed to clear persisted session");
        }
    }
}

fn log_failure(operation: &str, err: ServiceError) -> crate::FacadeError {
    warn!(operation, status = ?err.status, error = %err.message, "service call failed");
    err.into()
}

fn log_table_failure(operation: &str, table: &str, err: ServiceError) -> crate::FacadeError {
    warn!(operation, table, status = ?err.status, error = %err.message, "table call failed");
    err.into()
}

/// Session tokens carried by an auth redirect.
#[derive(Debug, PartialEq)]
struct UrlSession {
    access_token: String,
    refresh_token: String,
    expires_in: u64,
    expires_at: u64,
}

impl UrlSession {
    const DEFAULT_EXPIRES_IN: u64 = 3600;

    fn parse(redirect: &str) -> Result<Option<Self>, ServiceError> {
        let url = Url::parse(redirect)
            .map_err(|e| ServiceError::new(400, format!("invalid redirect url: {e}")))?;

        let mut params = std::collections::HashMap::new();
        let sources = [url.query(), url.fragment()];
        for source in sources.into_iter().flatten() {
            params.extend(url::form_urlencoded::parse(source.as_bytes()).into_owned());
        }

        if let Some(description) = params.get("error_description") {
            let mut err = ServiceError::new(400, description.clone());
            if let Some(code) = params.get("error_code").or(params.get("error")) {
                err = err.with_code(code.clone());
            }
            return Err(err);
        }

        let (Some(access_token), Some(refresh_token)) =
            (params.remove("access_token"), params.remove("refresh_token"))
        else {
            return Ok(None);
        };

        let number = |key: &str| params.get(key).and_then(|v| v.parse::<u64>().ok());
        Ok(Some(Self {
            access_token,
            refresh_token,
            expires_in: number("expires_in").unwrap_or(Self::DEFAULT_EXPIRES_IN),
            expires_at: number("expires_at").unwrap_or(0),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthOptions;
    use crate::service::{MockCall, MockReply, MockService};
    use crate::types::unix_now;
    use parking_lot::Mutex;
    use serde_json::json;

    fn config() -> FacadeConfig {
        FacadeConfig::new("https://project.example.com", "anon-key")
            .unwrap()
            .with_auth_options(AuthOptions::default().with_persist_session(false))
    }

    fn user() -> User {
        User {
            id: "u1".into(),
            email: "agent@example.com".into(),
            metadata: Map::new(),
            created_at: None,
        }
    }

    fn session(access: &str, expires_at: u64) -> Session {
        Session {
            access_token: access.into(),
            token_type: "bearer".into(),
            refresh_token: format!("{access}-refresh"),
            expires_in: 3600,
            expires_at,
            user: user(),
        }
    }

    fn facade() -> BackendFacade<MockService> {
        BackendFacade::new(config(), MockService::new())
    }

    #[tokio::test]
    async fn sign_in_adopts_session() {
        let facade = facade();
        facade
            .service()
            .push_reply(MockReply::Session(Ok(session("t1", unix_now() + 3600))));

        let session = facade.sign_in("agent@example.com", "pw").await.unwrap();
        assert_eq!(session.access_token, "t1");
        assert_eq!(facade.session().unwrap().access_token, "t1");
    }

    #[tokio::test]
    async fn sign_in_error_passes_through() {
        let facade = facade();
        facade.service().push_reply(MockReply::Session(Err(ServiceError::new(
            400,
            "Invalid login credentials",
        ))));

        let err = facade.sign_in("agent@example.com", "bad").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid login credentials");
        assert!(facade.session().is_none());
    }

    #[tokio::test]
    async fn sign_out_without_session_is_noop() {
        let facade = facade();
        facade.sign_out().await.unwrap();
        facade.sign_out().await.unwrap();
        assert_eq!(facade.service().call_count(), 0);
    }

    #[tokio::test]
    async fn sign_out_clears_session_even_on_failure() {
        let facade = facade();
        facade
            .service()
            .push_reply(MockReply::Session(Ok(session("t1", unix_now() + 3600))));
        facade.sign_in("agent@example.com", "pw").await.unwrap();

        facade
            .service()
            .push_reply(MockReply::Unit(Err(ServiceError::transport("offline"))));
        let err = facade.sign_out().await.unwrap_err();
        assert!(err.as_service().unwrap().is_transport());
        assert!(facade.session().is_none());
    }

    #[tokio::test]
    async fn sign_out_of_ended_session_succeeds() {
        for status in [401, 403, 404] {
            let facade = facade();
            facade
                .service()
                .push_reply(MockReply::Session(Ok(session("t1", 1))));
            facade.sign_in("agent@example.com", "pw").await.unwrap();

            facade.service().push_reply(MockReply::Unit(Err(ServiceError::new(
                status,
                "invalid JWT: token is expired",
            ))));
            facade.sign_out().await.unwrap();
            assert!(facade.session().is_none());
        }
    }

    #[tokio::test]
    async fn sign_up_session_is_normalized() {
        let facade = facade();
        let mut issued = session("t1", 0);
        issued.expires_in = 600;
        facade.service().push_reply(MockReply::SignUp(Ok(SignUp {
            user: user(),
            session: Some(issued),
        })));

        let outcome = facade
            .sign_up("agent@example.com", "pw", Map::new())
            .await
            .unwrap();
        let adopted = facade.session().unwrap();
        assert!(adopted.expires_at >= unix_now() + 590);
        assert!(!adopted.is_expired());
        assert_eq!(outcome.session, Some(adopted));
    }

    #[tokio::test]
    async fn current_user_without_session_makes_no_request() {
        let facade = facade();
        assert_eq!(facade.get_current_user().await.unwrap(), None);
        assert_eq!(facade.service().call_count(), 0);
    }

    #[tokio::test]
    async fn expired_session_is_refreshed() {
        let facade = facade();
        facade
            .service()
            .push_reply(MockReply::Session(Ok(session("old", 1))));
        facade.sign_in("agent@example.com", "pw").await.unwrap();

        let events = Arc::new(Mutex::new(Vec::new()));
        let e = Arc::clone(&events);
        facade.on_auth_state_change(move |event, _| e.lock().push(event));

        facade
            .service()
            .push_reply(MockReply::Session(Ok(session("new", unix_now() + 3600))));
        facade.service().push_reply(MockReply::User(Ok(user())));

        let current = facade.get_current_user().await.unwrap();
        assert_eq!(current, Some(user()));
        assert_eq!(facade.session().unwrap().access_token, "new");
        assert_eq!(*events.lock(), vec![AuthEvent::TokenRefreshed]);
        assert_eq!(
            facade.service().calls(),
            vec![
                MockCall::SignIn("agent@example.com".into()),
                MockCall::Refresh,
                MockCall::GetUser,
            ]
        );
    }

    #[tokio::test]
    async fn failed_refresh_signs_out() {
        let facade = facade();
        facade
            .service()
            .push_reply(MockReply::Session(Ok(session("old", 1))));
        facade.sign_in("agent@example.com", "pw").await.unwrap();
        facade.service().push_reply(MockReply::Session(Err(ServiceError::new(
            400,
            "Invalid Refresh Token",
        ))));

        let err = facade.get_current_user().await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid Refresh Token");
        assert!(facade.session().is_none());
    }

    #[tokio::test]
    async fn expired_session_kept_without_auto_refresh() {
        let config = config().with_auth_options(
            AuthOptions::default()
                .with_persist_session(false)
                .with_auto_refresh(false),
        );
        let facade = BackendFacade::new(config, MockService::new());
        facade
            .service()
            .push_reply(MockReply::Session(Ok(session("old", 1))));
        facade.sign_in("agent@example.com", "pw").await.unwrap();
        facade.service().push_reply(MockReply::Rows(Ok(vec![])));

        facade.select_all("listings").await.unwrap();
        assert_eq!(
            facade.service().calls().last(),
            Some(&MockCall::Select("listings".into(), "*".into()))
        );
    }

    #[tokio::test]
    async fn refresh_without_session_fails() {
        let facade = facade();
        let err = facade.refresh_session().await.unwrap_err();
        assert_eq!(err.as_service().unwrap().status, Some(401));
    }

    #[tokio::test]
    async fn select_defaults_to_all_columns() {
        let facade = facade();
        let row: Row = serde_json::from_value(json!({"id": 1})).unwrap();
        facade
            .service()
            .push_reply(MockReply::Rows(Ok(vec![row.clone()])));

        let rows = facade.select_all("listings").await.unwrap();
        assert_eq!(rows, vec![row]);
        assert_eq!(
            facade.service().calls(),
            vec![MockCall::Select("listings".into(), "*".into())]
        );
    }

    #[tokio::test]
    async fn table_errors_leave_facade_usable() {
        let facade = facade();
        facade.service().push_reply(MockReply::Rows(Err(ServiceError::new(
            404,
            "relation \"nope\" does not exist",
        ))));
        facade.service().push_reply(MockReply::Rows(Ok(vec![])));

        assert!(facade.insert("nope", Row::new()).await.is_err());
        assert!(facade.delete("listings").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn public_url_makes_no_request() {
        let facade = facade();
        let a = facade.get_public_url("listings", "front.jpg");
        let b = facade.get_public_url("listings", "front.jpg");
        assert_eq!(a, b);
        assert_eq!(
            a,
            "https://project.example.com/storage/v1/object/public/listings/front.jpg"
        );
        assert_eq!(facade.service().call_count(), 0);
    }

    #[tokio::test]
    async fn persisted_session_is_restored() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let config = FacadeConfig::new("https://project.example.com", "anon-key").unwrap();

        let first =
            BackendFacade::with_session_store(config.clone(), MockService::new(), Arc::clone(&store));
        first
            .service()
            .push_reply(MockReply::Session(Ok(session("t1", unix_now() + 3600))));
        first.sign_in("agent@example.com", "pw").await.unwrap();

        let second = BackendFacade::with_session_store(config, MockService::new(), store);
        assert_eq!(second.session().unwrap().access_token, "t1");
    }

    #[tokio::test]
    async fn session_from_url_can_be_disabled() {
        let config = config().with_auth_options(
            AuthOptions::default()
                .with_persist_session(false)
                .with_detect_session_in_url(false),
        );
        let facade = BackendFacade::new(config, MockService::new());
        let found = facade
            .session_from_url("https://site.example.com/#access_token=a&refresh_token=r")
            .await
            .unwrap();
        assert!(found.is_none());
        assert_eq!(facade.service().call_count(), 0);
    }

    #[tokio::test]
    async fn session_from_url_adopts_tokens() {
        let config = config().with_auth_options(
            AuthOptions::default().with_persist_session(false),
        );
        let facade = BackendFacade::new(config, MockService::new());
        facade.service().push_reply(MockReply::User(Ok(user())));

        let session = facade
            .session_from_url(
                "https://site.example.com/welcome#access_token=a&refresh_token=r&expires_in=60",
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.access_token, "a");
        assert_eq!(session.expires_in, 60);
        assert!(session.expires_at > 0);
        assert_eq!(facade.session(), Some(session));
    }

    #[test]
    fn url_session_error_description() {
        let err = UrlSession::parse(
            "https://site.example.com/#error=access_denied&error_code=otp_expired&error_description=Email+link+is+invalid",
        )
        .unwrap_err();
        assert_eq!(err.message, "Email link is invalid");
        assert_eq!(err.code.as_deref(), Some("otp_expired"));
    }

    #[test]
    fn url_session_without_tokens() {
        assert_eq!(UrlSession::parse("https://site.example.com/?page=2").unwrap(), None);
    }
}
