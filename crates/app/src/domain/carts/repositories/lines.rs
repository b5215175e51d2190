//! Cart Lines Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use rust_decimal::Decimal;
use sqlx::{
    FromRow, Postgres, Row, Transaction, error::ErrorKind, postgres::PgRow, query, query_as,
};

use crate::domain::{
    carts::{
        data::NewCartLine,
        records::{CartLineRecord, CartLineUuid, CartLineView},
    },
    decode_column,
    products::records::{Category, Condition, ProductUuid},
    users::records::UserUuid,
};

const FIND_LINE_FOR_UPDATE_SQL: &str = include_str!("../sql/find_line_for_update.sql");
const LOCK_LINE_SQL: &str = include_str!("../sql/lock_line.sql");
const INSERT_LINE_SQL: &str = include_str!("../sql/insert_line.sql");
const UPDATE_LINE_SQL: &str = include_str!("../sql/update_line.sql");
const DELETE_LINE_SQL: &str = include_str!("../sql/delete_line.sql");
const CLEAR_CART_SQL: &str = include_str!("../sql/clear_cart.sql");
const LIST_VISIBLE_LINES_SQL: &str = include_str!("../sql/list_visible_lines.sql");
const SAVEPOINT_SQL: &str = include_str!("../sql/savepoint.sql");
const ROLLBACK_TO_SAVEPOINT_SQL: &str = include_str!("../sql/rollback_to_savepoint.sql");
const RELEASE_SAVEPOINT_SQL: &str = include_str!("../sql/release_savepoint.sql");

const USER_PRODUCT_KEY: &str = "cart_lines_user_product_key";

/// Result of trying to open a new line.
#[derive(Debug)]
pub(crate) enum InsertOutcome {
    Inserted(CartLineRecord),

    /// Another transaction committed a line for the same (user, product)
    /// first. The surrounding transaction is still usable.
    Raced,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCartLinesRepository;

impl PgCartLinesRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// The user's line for `product`, locked against concurrent merges.
    pub(crate) async fn find_line_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
        product: ProductUuid,
    ) -> Result<Option<CartLineRecord>, sqlx::Error> {
        query_as::<Postgres, CartLineRecord>(FIND_LINE_FOR_UPDATE_SQL)
            .bind(user)
            .bind(product)
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn lock_line(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        line: CartLineUuid,
    ) -> Result<Option<CartLineRecord>, sqlx::Error> {
        query_as::<Postgres, CartLineRecord>(LOCK_LINE_SQL)
            .bind(line)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Inserts under a savepoint so that losing the race on the
    /// (user, product) key only undoes this statement.
    pub(crate) async fn insert_line(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        line: NewCartLine,
    ) -> Result<InsertOutcome, sqlx::Error> {
        let quantity = encode_quantity(line.quantity)?;

        query(SAVEPOINT_SQL).execute(&mut **tx).await?;

        let inserted = query_as::<Postgres, CartLineRecord>(INSERT_LINE_SQL)
            .bind(line.uuid)
            .bind(line.user)
            .bind(line.product)
            .bind(quantity)
            .bind(line.unit_price)
            .bind(line.total)
            .fetch_one(&mut **tx)
            .await;

        match inserted {
            Ok(record) => {
                query(RELEASE_SAVEPOINT_SQL).execute(&mut **tx).await?;

                Ok(InsertOutcome::Inserted(record))
            }
            Err(error) if violates_user_product_key(&error) => {
                query(ROLLBACK_TO_SAVEPOINT_SQL).execute(&mut **tx).await?;

                Ok(InsertOutcome::Raced)
            }
            Err(error) => Err(error),
        }
    }

    pub(crate) async fn update_line(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        line: CartLineUuid,
        quantity: u32,
        total: Decimal,
    ) -> Result<CartLineRecord, sqlx::Error> {
        query_as::<Postgres, CartLineRecord>(UPDATE_LINE_SQL)
            .bind(line)
            .bind(encode_quantity(quantity)?)
            .bind(total)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn delete_line(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        line: CartLineUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DELETE_LINE_SQL)
            .bind(line)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    /// Removes every line the user holds, visible or not.
    pub(crate) async fn clear_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(CLEAR_CART_SQL)
            .bind(user)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn list_visible_lines(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
    ) -> Result<Vec<CartLineView>, sqlx::Error> {
        query_as::<Postgres, CartLineView>(LIST_VISIBLE_LINES_SQL)
            .bind(user)
            .fetch_all(&mut **tx)
            .await
    }
}

fn violates_user_product_key(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .is_some_and(|e| {
            matches!(e.kind(), ErrorKind::UniqueViolation) && e.constraint() == Some(USER_PRODUCT_KEY)
        })
}

fn encode_quantity(quantity: u32) -> Result<i32, sqlx::Error> {
    i32::try_from(quantity).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

impl<'r> FromRow<'r, PgRow> for CartLineRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let quantity: i32 = row.try_get("quantity")?;

        let quantity = u32::try_from(quantity).map_err(|e| sqlx::Error::ColumnDecode {
            index: "quantity".to_string(),
            source: Box::new(e),
        })?;

        Ok(Self {
            uuid: row.try_get("uuid")?,
            user: row.try_get("user_uuid")?,
            product: row.try_get("product_uuid")?,
            quantity,
            unit_price: row.try_get("unit_price")?,
            total: row.try_get("total")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for CartLineView {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            line: CartLineRecord::from_row(row)?,
            product_title: row.try_get("product_title")?,
            product_image_url: row.try_get("product_image_url")?,
            product_category: decode_column::<Category>(row, "product_category")?,
            product_condition: decode_column::<Condition>(row, "product_condition")?,
            product_brand: row.try_get("product_brand")?,
        })
    }
}
