//! Lazily initialized facade.

use crate::error::{FacadeError, FacadeResult};
use crate::events::AuthSubscription;
use crate::facade::BackendFacade;
use crate::service::BackendService;
use crate::types::{AuthEvent, Filter, Row, Session, SignUp, StoredObject, User};
use bytes::Bytes;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::sync::Arc;

/// A facade that may not exist yet.
///
/// Used where the service client becomes available only at some later
/// point. Every operation on an empty slot returns
/// [`FacadeError::NotInitialized`] instead of panicking. Once filled, the
/// slot never changes.
pub struct FacadeSlot<S: BackendService> {
    facade: RwLock<Option<Arc<BackendFacade<S>>>>,
}

impl<S: BackendService> Default for FacadeSlot<S> {
    fn default() -> Self {
        Self {
            facade: RwLock::new(None),
        }
    }
}

impl<S: BackendService> FacadeSlot<S> {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fills the slot using `provider` unless it is already filled.
    ///
    /// `provider` returns `None` when the client cannot be created yet; the
    /// slot then stays empty and initialization may be retried. Concurrent
    /// callers settle on a single facade. Returns true if the slot is filled
    /// when the call returns.
    pub fn initialize<F>(&self, provider: F) -> bool
    where
        F: FnOnce() -> Option<BackendFacade<S>>,
    {
        if self.facade.read().is_some() {
            return true;
        }

        let mut slot = self.facade.write();
        if slot.is_some() {
            return true;
        }

        match provider() {
            Some(facade) => {
                tracing::info!(base_url = %facade.config().base_url, "backend facade initialized");
                *slot = Some(Arc::new(facade));
                true
            }
            None => {
                tracing::debug!("backend client unavailable, initialization deferred");
                false
            }
        }
    }

    /// Returns true once the slot holds a facade.
    pub fn is_initialized(&self) -> bool {
        self.facade.read().is_some()
    }

    /// Returns the facade, or [`FacadeError::NotInitialized`].
    pub fn get(&self) -> FacadeResult<Arc<BackendFacade<S>>> {
        self.facade
            .read()
            .as_ref()
            .map(Arc::clone)
            .ok_or(FacadeError::NotInitialized)
    }

    /// See [`BackendFacade::sign_up`].
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Map<String, Value>,
    ) -> FacadeResult<SignUp> {
        self.get()?.sign_up(email, password, metadata).await
    }

    /// See [`BackendFacade::sign_in`].
    pub async fn sign_in(&self, email: &str, password: &str) -> FacadeResult<Session> {
        self.get()?.sign_in(email, password).await
    }

    /// See [`BackendFacade::sign_out`].
    pub async fn sign_out(&self) -> FacadeResult<()> {
        self.get()?.sign_out().await
    }

    /// See [`BackendFacade::get_current_user`].
    pub async fn get_current_user(&self) -> FacadeResult<Option<User>> {
        self.get()?.get_current_user().await
    }

    /// See [`BackendFacade::on_auth_state_change`].
    pub fn on_auth_state_change<F>(&self, callback: F) -> FacadeResult<AuthSubscription>
    where
        F: Fn(AuthEvent, Option<&Session>) + Send + Sync + 'static,
    {
        Ok(self.get()?.on_auth_state_change(callback))
    }

    /// See [`BackendFacade::select`].
    pub async fn select(&self, table: &str, columns: &str) -> FacadeResult<Vec<Row>> {
        self.get()?.select(table, columns).await
    }

    /// See [`BackendFacade::select_where`].
    pub async fn select_where(
        &self,
        table: &str,
        columns: &str,
        filters: &[Filter],
    ) -> FacadeResult<Vec<Row>> {
        self.get()?.select_where(table, columns, filters).await
    }

    /// See [`BackendFacade::insert`].
    pub async fn insert(&self, table: &str, row: Row) -> FacadeResult<Vec<Row>> {
        self.get()?.insert(table, row).await
    }

    /// See [`BackendFacade::update`].
    pub async fn update(&self, table: &str, patch: Row) -> FacadeResult<Vec<Row>> {
        self.get()?.update(table, patch).await
    }

    /// See [`BackendFacade::delete`].
    pub async fn delete(&self, table: &str) -> FacadeResult<Vec<Row>> {
        self.get()?.delete(table).await
    }

    /// See [`BackendFacade::upload`].
    pub async fn upload(
        &self,
        bucket: &str,
        path: &str,
        blob: impl Into<Bytes>,
    ) -> FacadeResult<StoredObject> {
        self.get()?.upload(bucket, path, blob).await
    }

    /// See [`BackendFacade::download`].
    pub async fn download(&self, bucket: &str, path: &str) -> FacadeResult<Bytes> {
        self.get()?.download(bucket, path).await
    }

    /// See [`BackendFacade::get_public_url`]. Without a facade there is no
    /// base URL, so this too reports [`FacadeError::NotInitialized`].
    pub fn get_public_url(&self, bucket: &str, path: &str) -> FacadeResult<String> {
        Ok(self.get()?.get_public_url(bucket, path))
    }
}
