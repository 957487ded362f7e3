//! # Hostlink Core
//!
//! A facade over a hosted backend service offering authentication,
//! relational tables and blob storage.
//!
//! This crate provides:
//! - [`BackendFacade`] - uniform auth, table and storage operations
//! - [`FacadeSlot`] - a facade created lazily, failing fast until then
//! - [`BackendService`] - the seam implemented by concrete backends
//! - Session persistence and auth state listeners
//! - Public URL derivation for stored objects
//!
//! ## Error policy
//!
//! Every fallible operation returns a `Result`. Failures reported by the
//! hosted service are passed through as [`ServiceError`] without being
//! reinterpreted; the only locally produced error is
//! [`FacadeError::NotInitialized`], and only a [`FacadeSlot`] can produce it.
//!
//! ## Key Invariants
//!
//! - A constructed facade always has a service handle
//! - Public URLs are computed without network I/O
//! - Signing out without a session succeeds
//! - Listeners fire once per auth transition, in registration order

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod events;
mod facade;
mod service;
mod session;
mod slot;
pub mod storage;
mod types;

pub use config::{AuthOptions, FacadeConfig, ENV_PUBLIC_KEY, ENV_SESSION_FILE, ENV_URL};
pub use error::{ConfigError, FacadeError, FacadeResult, ServiceError, ServiceResult, SessionStoreError};
pub use events::{AuthListeners, AuthSubscription};
pub use facade::BackendFacade;
pub use service::{BackendService, MockCall, MockReply, MockService};
pub use session::{FileSessionStore, MemorySessionStore, SessionStore};
pub use slot::FacadeSlot;
pub use types::{
    unix_now, AuthEvent, Credentials, Filter, Row, Session, SignUp, StoredObject, UploadOptions,
    User, ALL_COLUMNS,
};

/// Re-exported so implementors of [`BackendService`] use the same macro.
pub use async_trait::async_trait;
