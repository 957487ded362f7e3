//! # Hostlink HTTP
//!
//! HTTP transport for the hostlink backend facade.
//!
//! This crate provides:
//! - [`HttpBackend`] - a `BackendService` mapping auth, table and storage
//!   operations onto the hosted service's REST endpoints
//! - [`HttpClient`] - the network seam, with a reqwest implementation
//!   ([`ReqwestClient`]) and an in-process one ([`LoopbackClient`])
//! - Wire values ([`HttpRequest`], [`HttpResponse`]) and error body decoding
//!
//! ## Endpoints
//!
//! | operation | request |
//! |-----------|---------|
//! | sign up   | `POST /auth/v1/signup` |
//! | sign in   | `POST /auth/v1/token?grant_type=password` |
//! | refresh   | `POST /auth/v1/token?grant_type=refresh_token` |
//! | sign out  | `POST /auth/v1/logout` |
//! | user      | `GET /auth/v1/user` |
//! | tables    | `GET/POST/PATCH/DELETE /rest/v1/{table}` |
//! | objects   | `POST/GET /storage/v1/object/{bucket}/{path}` |

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod client;
pub mod wire;

pub use backend::HttpBackend;
pub use client::{HttpClient, LoopbackClient, LoopbackServer, ReqwestClient};
pub use wire::{ErrorBody, HttpRequest, HttpResponse, Method};
