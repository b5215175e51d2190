//! Carts
//!
//! One line per (user, product). Repeat adds merge into the existing line at
//! the unit price captured by the first add; reads only surface lines whose
//! product is still purchasable.

pub mod data;
pub mod errors;
pub mod guard;
pub mod pricing;
pub mod records;
mod repositories;
pub mod service;

pub use errors::CartsServiceError;
pub use service::*;
