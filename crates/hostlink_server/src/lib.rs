//! # Hostlink Server
//!
//! An in-memory reference implementation of the hosted backend.
//!
//! This crate provides:
//! - [`HostedService`] - accounts, tables and buckets behind the
//!   [`hostlink_core::BackendService`] seam
//! - [`Router`] - the same backend behind the REST surface, for
//!   loopback HTTP tests
//! - Signed, expiring access tokens and single-use refresh tokens
//!
//! ## Example
//!
//! ```
//! use hostlink_server::{HostConfig, HostedService, Router, TablePolicy};
//! use std::sync::Arc;
//!
//! let config = HostConfig::default().with_table("listings", TablePolicy::default());
//! let service = Arc::new(HostedService::new(config));
//! let router = Router::new(Arc::clone(&service));
//! assert_eq!(router.service().tables().row_count("listings"), Some(0));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod accounts;
mod auth;
mod buckets;
mod config;
mod error;
mod router;
mod service;
mod tables;

pub use accounts::Accounts;
pub use auth::{PasswordHash, TokenClaims, TokenSigner};
pub use buckets::{Buckets, Object, DEFAULT_CONTENT_TYPE};
pub use config::{BucketPolicy, HostConfig, TablePolicy};
pub use error::{HostError, HostResult};
pub use router::Router;
pub use service::HostedService;
pub use tables::{Tables, ID_COLUMN};
