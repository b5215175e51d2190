//! Test Helpers

use rust_decimal::Decimal;

use crate::domain::products::{
    data::NewProduct,
    records::{Category, Condition, ProductAttributes, ProductUuid},
};

/// A minimal valid listing.
pub(crate) fn new_product(title: &str, price: Decimal) -> NewProduct {
    NewProduct {
        uuid: ProductUuid::new(),
        title: title.to_string(),
        description: None,
        category: Category::Electronics,
        price,
        quantity: None,
        condition: Condition::Good,
        attributes: ProductAttributes {
            brand: Some("Acme".to_string()),
            ..ProductAttributes::default()
        },
        image_url: Some(format!("https://img.example.com/{}.jpg", title.len())),
    }
}
