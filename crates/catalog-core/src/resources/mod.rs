//! Session-aware resource clients.
//!
//! `ProductResource` resolves the tenant and bearer token from the current
//! session on every call and delegates the HTTP exchange to `ApiClient`.

pub mod products;

pub use products::{ProductResource, TenantResolver};
