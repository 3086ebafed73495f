//! Catalog Core - session-authenticated client for a tenant-scoped product catalog.
//!
//! This crate contains all business logic for the admin client:
//! - Password-grant login and bearer token persistence
//! - Session state with a single writer and watch-based readers
//! - Route table and the guard for protected routes
//! - Product form/response validation
//! - Tenant-scoped product CRUD over HTTP
//! - Configuration management
//! - Display formatting utilities
//!
//! Front-ends (the CLI) depend on this crate and add their own presentation.

#![allow(async_fn_in_trait)]

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod resources;
pub mod routes;
pub mod schema;
pub mod utils;

pub use api::{ApiClient, AuthError, FetchError, Operation};
pub use auth::{
    Authenticator, ClaimsPolicy, CredentialStore, Session, SessionManager, SessionPhase,
};
pub use config::{Config, CredentialBackend};
pub use models::{Product, ProductId, ProductInput};
pub use resources::{ProductResource, TenantResolver};
pub use routes::{navigate, Navigation, Route};
pub use schema::{Credentials, LoginForm, ProductForm, ValidationErrors};
