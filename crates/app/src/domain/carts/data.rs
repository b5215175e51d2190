//! Cart Data

use rust_decimal::Decimal;

use crate::domain::{
    carts::records::CartLineUuid, products::records::ProductUuid, users::records::UserUuid,
};

/// New Cart Line Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewCartLine {
    pub uuid: CartLineUuid,
    pub user: UserUuid,
    pub product: ProductUuid,
    pub quantity: u32,

    /// Product price at the moment of the add.
    pub unit_price: Decimal,
    pub total: Decimal,
}
