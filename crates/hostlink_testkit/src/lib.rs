//! # Hostlink Testkit
//!
//! Test utilities for hostlink.
//!
//! This crate provides:
//! - Fixtures wiring a facade to the in-memory reference backend, either
//!   directly or through the REST surface over a loopback client
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hostlink_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn signs_in() {
//!     let backend = TestBackend::new();
//!     let facade = backend.facade();
//!     facade.sign_up("ann@example.com", "secret1", Default::default()).await.unwrap();
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
