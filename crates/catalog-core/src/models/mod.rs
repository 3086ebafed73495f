//! Data models for catalog entities.
//!
//! - `Product`: a catalog record as returned by the API
//! - `ProductInput`: the create/update shape (a product without its id)

pub mod product;

pub use product::{Product, ProductId, ProductInput};
