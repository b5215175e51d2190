//! Products Data

use rust_decimal::Decimal;

use crate::domain::{
    products::{
        errors::InvalidProduct,
        records::{Category, Condition, ProductAttributes, ProductUuid},
    },
    users::records::UserUuid,
};

pub const DEFAULT_LIST_LIMIT: i64 = 10;
pub const MAX_LIST_LIMIT: i64 = 50;

/// Largest price a `NUMERIC(12, 2)` column holds.
pub const MAX_PRICE: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// New Product Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub uuid: ProductUuid,
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub price: Decimal,

    /// Units on offer; `None` lists a single item.
    pub quantity: Option<u32>,
    pub condition: Condition,
    pub attributes: ProductAttributes,
    pub image_url: Option<String>,
}

/// Product Update Data
///
/// `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub price: Option<Decimal>,
    pub quantity: Option<u32>,
    pub condition: Option<Condition>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub dimensions: Option<String>,
    pub weight: Option<String>,
    pub material: Option<String>,
    pub manufacture_year: Option<i16>,
    pub original_packaging: Option<bool>,
    pub manual_included: Option<bool>,
    pub condition_description: Option<String>,
    pub image_url: Option<String>,
}

/// Listing filters. Only active products are ever returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    pub category: Option<Category>,
    pub condition: Option<Condition>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub search: Option<String>,
    pub seller: Option<UserUuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ProductFilter {
    #[must_use]
    pub fn limit(&self) -> i64 {
        self.limit
            .map_or(DEFAULT_LIST_LIMIT, |limit| limit.clamp(1, MAX_LIST_LIMIT))
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    /// The search term as an `ILIKE` pattern, with wildcards in the input
    /// matched literally.
    #[must_use]
    pub fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(|term| format!("%{}%", escape_like(term)))
    }
}

impl NewProduct {
    /// Checks field rules that the schema alone cannot express.
    ///
    /// # Errors
    ///
    /// Returns the first rule the payload breaks.
    pub fn validate(&self, current_year: i16) -> Result<(), InvalidProduct> {
        validate_title(&self.title)?;
        validate_price(self.price)?;

        if self.quantity == Some(0) {
            return Err(InvalidProduct::Quantity);
        }

        validate_manufacture_year(self.attributes.manufacture_year, current_year)
    }
}

impl ProductUpdate {
    /// A price-only update.
    #[must_use]
    pub fn price(price: Decimal) -> Self {
        Self {
            price: Some(price),
            ..Self::default()
        }
    }

    /// Applies the creation rules to the fields being changed.
    ///
    /// # Errors
    ///
    /// Returns the first rule the payload breaks.
    pub fn validate(&self, current_year: i16) -> Result<(), InvalidProduct> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }

        if let Some(price) = self.price {
            validate_price(price)?;
        }

        if self.quantity == Some(0) {
            return Err(InvalidProduct::Quantity);
        }

        validate_manufacture_year(self.manufacture_year, current_year)
    }
}

const MIN_MANUFACTURE_YEAR: i16 = 1900;

fn validate_title(title: &str) -> Result<(), InvalidProduct> {
    let length = title.trim().chars().count();

    if (3..=200).contains(&length) {
        Ok(())
    } else {
        Err(InvalidProduct::Title)
    }
}

fn validate_price(price: Decimal) -> Result<(), InvalidProduct> {
    if price > Decimal::ZERO && price <= MAX_PRICE && price.normalize().scale() <= 2 {
        Ok(())
    } else {
        Err(InvalidProduct::Price)
    }
}

fn validate_manufacture_year(year: Option<i16>, current_year: i16) -> Result<(), InvalidProduct> {
    match year {
        Some(year) if !(MIN_MANUFACTURE_YEAR..=current_year).contains(&year) => {
            Err(InvalidProduct::ManufactureYear)
        }
        _ => Ok(()),
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());

    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }

        escaped.push(c);
    }

    escaped
}
