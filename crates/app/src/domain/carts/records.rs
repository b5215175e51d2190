//! Cart Records

use jiff::Timestamp;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    domain::{
        products::records::{Category, Condition, ProductUuid},
        users::records::UserUuid,
    },
    uuids::TypedUuid,
};

/// Cart Line UUID
pub type CartLineUuid = TypedUuid<CartLineRecord>;

/// Cart Line Record
///
/// `total` is stored and always equals `quantity * unit_price`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartLineRecord {
    pub uuid: CartLineUuid,
    pub user: UserUuid,
    pub product: ProductUuid,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total: Decimal,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A visible cart line joined with live product display fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartLineView {
    #[serde(flatten)]
    pub line: CartLineRecord,
    pub product_title: String,
    pub product_image_url: Option<String>,
    pub product_category: Category,
    pub product_condition: Condition,
    pub product_brand: Option<String>,
}

/// Aggregate over a user's visible cart lines. An empty cart is all zeros.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CartSummary {
    pub item_count: u64,
    pub total_quantity: u64,
    pub subtotal: Decimal,
}
