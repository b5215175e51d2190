//! Products Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as, query_scalar};

use crate::domain::{
    decode_column,
    products::{
        data::{NewProduct, ProductFilter, ProductUpdate},
        records::{
            Category, Condition, ProductAttributes, ProductRecord, ProductStatus, ProductUuid,
        },
    },
    users::records::UserUuid,
};

const GET_PRODUCT_SQL: &str = include_str!("sql/get_product.sql");
const FIND_PRODUCT_SQL: &str = include_str!("sql/find_product.sql");
const LOCK_PRODUCT_SQL: &str = include_str!("sql/lock_product.sql");
const LIST_PRODUCTS_SQL: &str = include_str!("sql/list_products.sql");
const CREATE_PRODUCT_SQL: &str = include_str!("sql/create_product.sql");
const DUPLICATE_PRODUCT_EXISTS_SQL: &str = include_str!("sql/duplicate_product_exists.sql");
const UPDATE_PRODUCT_SQL: &str = include_str!("sql/update_product.sql");
const SET_PRODUCT_STATUS_SQL: &str = include_str!("sql/set_product_status.sql");
const PURGE_PRODUCT_SQL: &str = include_str!("sql/purge_product.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgProductsRepository;

impl PgProductsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn get_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
    ) -> Result<ProductRecord, sqlx::Error> {
        query_as::<Postgres, ProductRecord>(GET_PRODUCT_SQL)
            .bind(product)
            .fetch_one(&mut **tx)
            .await
    }

    /// Reads the current price, status and owner of a product and holds a
    /// share lock on the row until the transaction ends. A concurrent delist,
    /// price change or purge waits for the caller to finish.
    pub(crate) async fn find_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
    ) -> Result<Option<ProductRecord>, sqlx::Error> {
        query_as::<Postgres, ProductRecord>(FIND_PRODUCT_SQL)
            .bind(product)
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn lock_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
    ) -> Result<ProductRecord, sqlx::Error> {
        query_as::<Postgres, ProductRecord>(LOCK_PRODUCT_SQL)
            .bind(product)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn list_products(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        filter: &ProductFilter,
    ) -> Result<Vec<ProductRecord>, sqlx::Error> {
        query_as::<Postgres, ProductRecord>(LIST_PRODUCTS_SQL)
            .bind(filter.category.map(Category::as_str))
            .bind(filter.condition.map(Condition::as_str))
            .bind(filter.min_price)
            .bind(filter.max_price)
            .bind(filter.search_pattern())
            .bind(filter.seller)
            .bind(filter.limit())
            .bind(filter.offset())
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn duplicate_exists(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        seller: UserUuid,
        title: &str,
        price: Decimal,
    ) -> Result<bool, sqlx::Error> {
        query_scalar::<Postgres, bool>(DUPLICATE_PRODUCT_EXISTS_SQL)
            .bind(seller)
            .bind(title)
            .bind(price)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn create_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        seller: UserUuid,
        product: NewProduct,
    ) -> Result<ProductRecord, sqlx::Error> {
        let quantity = encode_quantity(product.quantity.unwrap_or(1))?;
        let attributes = product.attributes;

        query_as::<Postgres, ProductRecord>(CREATE_PRODUCT_SQL)
            .bind(product.uuid)
            .bind(seller)
            .bind(product.title.trim())
            .bind(product.description)
            .bind(product.category.as_str())
            .bind(product.price)
            .bind(quantity)
            .bind(product.condition.as_str())
            .bind(attributes.brand)
            .bind(attributes.model)
            .bind(attributes.dimensions)
            .bind(attributes.weight)
            .bind(attributes.material)
            .bind(attributes.manufacture_year)
            .bind(attributes.original_packaging)
            .bind(attributes.manual_included)
            .bind(attributes.condition_description)
            .bind(product.image_url)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn update_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
        update: ProductUpdate,
    ) -> Result<ProductRecord, sqlx::Error> {
        let quantity = update.quantity.map(encode_quantity).transpose()?;

        query_as::<Postgres, ProductRecord>(UPDATE_PRODUCT_SQL)
            .bind(product)
            .bind(update.title.as_deref().map(str::trim))
            .bind(update.description)
            .bind(update.category.map(Category::as_str))
            .bind(update.price)
            .bind(quantity)
            .bind(update.condition.map(Condition::as_str))
            .bind(update.brand)
            .bind(update.model)
            .bind(update.dimensions)
            .bind(update.weight)
            .bind(update.material)
            .bind(update.manufacture_year)
            .bind(update.original_packaging)
            .bind(update.manual_included)
            .bind(update.condition_description)
            .bind(update.image_url)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn set_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
        status: ProductStatus,
    ) -> Result<ProductRecord, sqlx::Error> {
        query_as::<Postgres, ProductRecord>(SET_PRODUCT_STATUS_SQL)
            .bind(product)
            .bind(status.as_str())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn purge_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(PURGE_PRODUCT_SQL)
            .bind(product)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}

fn encode_quantity(quantity: u32) -> Result<i32, sqlx::Error> {
    i32::try_from(quantity).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

impl<'r> FromRow<'r, PgRow> for ProductRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let quantity: i32 = row.try_get("quantity")?;

        let quantity = u32::try_from(quantity).map_err(|e| sqlx::Error::ColumnDecode {
            index: "quantity".to_string(),
            source: Box::new(e),
        })?;

        Ok(Self {
            uuid: row.try_get("uuid")?,
            seller: row.try_get("seller_uuid")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            category: decode_column::<Category>(row, "category")?,
            price: row.try_get("price")?,
            quantity,
            condition: decode_column::<Condition>(row, "condition")?,
            attributes: ProductAttributes {
                brand: row.try_get("brand")?,
                model: row.try_get("model")?,
                dimensions: row.try_get("dimensions")?,
                weight: row.try_get("weight")?,
                material: row.try_get("material")?,
                manufacture_year: row.try_get("manufacture_year")?,
                original_packaging: row.try_get("original_packaging")?,
                manual_included: row.try_get("manual_included")?,
                condition_description: row.try_get("condition_description")?,
            },
            image_url: row.try_get("image_url")?,
            status: decode_column::<ProductStatus>(row, "status")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
