//! Cart Summaries Repository

use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as};

use crate::domain::{carts::records::CartSummary, users::records::UserUuid};

const SUMMARIZE_VISIBLE_LINES_SQL: &str = include_str!("../sql/summarize_visible_lines.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCartSummariesRepository;

impl PgCartSummariesRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Aggregates over the same rows the cart listing returns. Nothing is
    /// cached; every call recomputes from the lines.
    pub(crate) async fn summarize(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
    ) -> Result<CartSummary, sqlx::Error> {
        query_as::<Postgres, CartSummary>(SUMMARIZE_VISIBLE_LINES_SQL)
            .bind(user)
            .fetch_one(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for CartSummary {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            item_count: try_get_count(row, "item_count")?,
            total_quantity: try_get_count(row, "total_quantity")?,
            subtotal: row.try_get("subtotal")?,
        })
    }
}

fn try_get_count(row: &PgRow, column: &str) -> sqlx::Result<u64> {
    let value: i64 = row.try_get(column)?;

    u64::try_from(value).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}
