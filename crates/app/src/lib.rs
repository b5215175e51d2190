//! EcoFinds marketplace core: users, the product catalog and shopping carts
//! that stay consistent with catalog changes.

pub mod config;
pub mod context;
pub mod database;
pub mod domain;
pub mod observability;

#[cfg(test)]
mod test;

mod uuids;

pub use domain::{carts, products, users};
