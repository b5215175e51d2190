//! Carts service errors.

use std::fmt;

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

use crate::database;

#[derive(Debug, Error)]
pub enum CartsServiceError {
    #[error("{0} not found")]
    NotFound(Resource),

    #[error("cart line belongs to another user")]
    Forbidden,

    #[error("rejected: {0}")]
    Rejected(RejectionReason),

    /// Concurrent adds for the same product kept colliding after every retry.
    #[error("cart line conflict")]
    Conflict,

    #[error("invalid data")]
    InvalidData,

    #[error("storage unavailable")]
    StorageUnavailable(#[source] Error),

    #[error("storage error")]
    Sql(#[source] Error),
}

impl CartsServiceError {
    /// Whether retrying the same call may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_) | Self::Conflict)
    }
}

impl From<RejectionReason> for CartsServiceError {
    fn from(reason: RejectionReason) -> Self {
        Self::Rejected(reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    User,
    Product,
    CartLine,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::User => "user",
            Self::Product => "product",
            Self::CartLine => "cart line",
        })
    }
}

/// Business rules an add or update can break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    InvalidQuantity,
    QuantityOutOfRange,
    ProductUnavailable,
    SelfPurchase,
    InactiveUser,
}

impl RejectionReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidQuantity => "invalid_quantity",
            Self::QuantityOutOfRange => "quantity_out_of_range",
            Self::ProductUnavailable => "product_unavailable",
            Self::SelfPurchase => "self_purchase",
            Self::InactiveUser => "inactive_user",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Error> for CartsServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound(Resource::CartLine);
        }

        if database::is_unavailable(&error) {
            return Self::StorageUnavailable(error);
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::Conflict,
            // Users are share-locked before every write, leaving the product
            // as the only reference that can vanish.
            Some(ErrorKind::ForeignKeyViolation) => Self::NotFound(Resource::Product),
            Some(ErrorKind::CheckViolation | ErrorKind::NotNullViolation) => Self::InvalidData,
            Some(ErrorKind::Other | _) | None => Self::Sql(error),
        }
    }
}
