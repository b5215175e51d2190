//! Product Records

use std::{fmt, str::FromStr};

use jiff::Timestamp;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    domain::{UnknownVariant, users::records::UserUuid},
    uuids::TypedUuid,
};

/// Product UUID
pub type ProductUuid = TypedUuid<ProductRecord>;

/// Listing category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Category {
    Electronics,
    Clothing,
    Books,
    #[serde(rename = "Home & Garden")]
    HomeAndGarden,
    Sports,
    Toys,
    Vehicles,
    Other,
}

impl Category {
    pub const ALL: [Self; 8] = [
        Self::Electronics,
        Self::Clothing,
        Self::Books,
        Self::HomeAndGarden,
        Self::Sports,
        Self::Toys,
        Self::Vehicles,
        Self::Other,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Electronics => "Electronics",
            Self::Clothing => "Clothing",
            Self::Books => "Books",
            Self::HomeAndGarden => "Home & Garden",
            Self::Sports => "Sports",
            Self::Toys => "Toys",
            Self::Vehicles => "Vehicles",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == value)
            .ok_or_else(|| UnknownVariant::new("category", value))
    }
}

/// Physical condition of the listed item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Condition {
    New,
    #[serde(rename = "Like New")]
    LikeNew,
    Good,
    Fair,
    Poor,
}

impl Condition {
    pub const ALL: [Self; 5] = [
        Self::New,
        Self::LikeNew,
        Self::Good,
        Self::Fair,
        Self::Poor,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::LikeNew => "Like New",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Poor => "Poor",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|condition| condition.as_str() == value)
            .ok_or_else(|| UnknownVariant::new("condition", value))
    }
}

/// Listing lifecycle. `Active` is the only state from which a product can be
/// put in a cart; `Sold` and `Inactive` rows are kept for history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Active,
    Sold,
    Inactive,
}

impl ProductStatus {
    pub const ALL: [Self; 3] = [Self::Active, Self::Sold, Self::Inactive];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Sold => "sold",
            Self::Inactive => "inactive",
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| UnknownVariant::new("product status", value))
    }
}

/// Optional descriptive details supplied by the seller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProductAttributes {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub dimensions: Option<String>,
    pub weight: Option<String>,
    pub material: Option<String>,
    pub manufacture_year: Option<i16>,
    pub original_packaging: bool,
    pub manual_included: bool,
    pub condition_description: Option<String>,
}

/// Product Record
#[derive(Debug, Clone, Serialize)]
pub struct ProductRecord {
    pub uuid: ProductUuid,
    pub seller: UserUuid,
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub price: Decimal,
    pub quantity: u32,
    pub condition: Condition,
    #[serde(flatten)]
    pub attributes: ProductAttributes,
    pub image_url: Option<String>,
    pub status: ProductStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ProductRecord {
    /// Whether the listing can currently be bought.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == ProductStatus::Active
    }

    /// The selling user. Fixed at creation.
    #[must_use]
    pub fn owner(&self) -> UserUuid {
        self.seller
    }
}
