//! REST API client module for the catalog service.
//!
//! This module provides the `ApiClient` for the password-grant login and
//! the tenant-scoped product endpoints, plus the error types those calls
//! return.
//!
//! Login is form-encoded and answers with `{access_token, token_type}`;
//! every other call sends and receives JSON.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::{AuthError, FetchError, Operation, LOGIN_FAILED};
