//! Test fixtures and backend helpers.
//!
//! Provides a reference backend with a standard set of tables and buckets,
//! and facades wired to it.

use hostlink_core::{
    AuthOptions, BackendFacade, FacadeConfig, FileSessionStore, Row, SessionStore,
};
use hostlink_http::{HttpBackend, LoopbackClient};
use hostlink_server::{BucketPolicy, HostConfig, HostedService, Router, TablePolicy};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Base URL used by fixtures. Nothing listens there.
pub const TEST_URL: &str = "http://localhost:54321";

/// Public key the fixture backend accepts.
pub const TEST_PUBLIC_KEY: &str = "test-anon-key";

/// Table anyone may read and write.
pub const OPEN_TABLE: &str = "listings";

/// Table that requires a signed-in user.
pub const PROTECTED_TABLE: &str = "leads";

/// Bucket readable through public URLs.
pub const PUBLIC_BUCKET: &str = "listings";

/// Bucket that requires a signed-in user.
pub const PRIVATE_BUCKET: &str = "documents";

/// A facade calling the reference backend directly.
pub type DirectFacade = BackendFacade<Arc<HostedService>>;

/// The HTTP backend as wired by [`TestBackend::http_backend`].
pub type LoopbackBackend = HttpBackend<LoopbackClient<Router>>;

/// A facade calling the reference backend through its REST surface.
pub type LoopbackFacade = BackendFacade<LoopbackBackend>;

/// Returns the standard backend configuration.
pub fn reference_config() -> HostConfig {
    HostConfig::new(TEST_PUBLIC_KEY, b"testkit-signing-secret".to_vec())
        .with_table(OPEN_TABLE, TablePolicy::default())
        .with_table(PROTECTED_TABLE, TablePolicy { require_auth: true })
        .with_bucket(
            PUBLIC_BUCKET,
            BucketPolicy {
                public: true,
                require_auth: false,
            },
        )
        .with_bucket(
            PRIVATE_BUCKET,
            BucketPolicy {
                public: false,
                require_auth: true,
            },
        )
}

/// Returns a facade configuration pointing at [`TEST_URL`].
pub fn facade_config() -> FacadeConfig {
    FacadeConfig::new(TEST_URL, TEST_PUBLIC_KEY).expect("Fixture config must be valid")
}

/// A reference backend shared by any number of facades.
#[derive(Clone)]
pub struct TestBackend {
    /// The backend. Inspect it to check what a facade did.
    pub service: Arc<HostedService>,
}

impl TestBackend {
    /// Creates a backend from [`reference_config`].
    pub fn new() -> Self {
        Self::with_config(reference_config())
    }

    /// Creates a backend from `config`.
    pub fn with_config(config: HostConfig) -> Self {
        Self {
            service: Arc::new(HostedService::new(config)),
        }
    }

    /// Returns a facade calling the backend directly.
    pub fn facade(&self) -> DirectFacade {
        BackendFacade::new(facade_config(), Arc::clone(&self.service))
    }

    /// Returns a facade with the given auth options.
    pub fn facade_with_options(&self, auth: AuthOptions) -> DirectFacade {
        BackendFacade::new(
            facade_config().with_auth_options(auth),
            Arc::clone(&self.service),
        )
    }

    /// Returns a facade persisting its session to `store`.
    pub fn facade_with_store(&self, store: Arc<dyn SessionStore>) -> DirectFacade {
        BackendFacade::with_session_store(facade_config(), Arc::clone(&self.service), store)
    }

    /// Returns an HTTP backend looped back into this backend's router.
    pub fn http_backend(&self) -> LoopbackBackend {
        let router = Router::new(Arc::clone(&self.service));
        HttpBackend::from_config(&facade_config(), LoopbackClient::new(router))
    }

    /// Returns a facade speaking HTTP to this backend.
    pub fn http_facade(&self) -> LoopbackFacade {
        BackendFacade::new(facade_config(), self.http_backend())
    }
}

impl Default for TestBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// A session file in a temporary directory, removed on drop.
pub struct TempSessionFile {
    /// Path of the session file (not created until a session is saved).
    pub path: PathBuf,
    _temp_dir: TempDir,
}

impl TempSessionFile {
    /// Creates a fresh temporary directory for a session file.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("session.json");
        Self {
            path,
            _temp_dir: temp_dir,
        }
    }

    /// Returns a store backed by the file.
    pub fn store(&self) -> Arc<dyn SessionStore> {
        Arc::new(FileSessionStore::new(&self.path))
    }
}

impl Default for TempSessionFile {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts a JSON object literal into a [`Row`].
///
/// # Panics
///
/// Panics if `value` is not an object.
pub fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("Row must be a JSON object, got {other}"),
    }
}
