//! Products
//!
//! The catalog store. Listings are soft-deleted by flipping their status; rows
//! are only removed by an explicit purge, which cascades to cart lines.

pub mod data;
pub mod errors;
pub mod records;
pub(crate) mod repository;
pub mod service;

pub use errors::ProductsServiceError;
pub use service::*;
