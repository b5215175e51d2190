//! Cart visibility
//!
//! A cart line is visible while its product is purchasable. The database side
//! of this rule is the `visible_cart_lines` view, which both the cart listing
//! and the summary read from.

use crate::domain::products::records::ProductStatus;

/// Whether lines holding a product in `status` appear in carts. Products that
/// fail this check also cannot be added.
#[must_use]
pub const fn is_visible(status: ProductStatus) -> bool {
    matches!(status, ProductStatus::Active)
}
