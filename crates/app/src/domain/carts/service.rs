//! Carts service.

use async_trait::async_trait;
use mockall::automock;
use sqlx::{Postgres, Transaction};
use tracing::{debug, info, warn};

use crate::{
    config::CartConfig,
    database::Db,
    domain::{
        carts::{
            data::NewCartLine,
            errors::{CartsServiceError, RejectionReason, Resource},
            guard, pricing,
            records::{CartLineRecord, CartLineUuid, CartLineView, CartSummary},
            repositories::{InsertOutcome, PgCartLinesRepository, PgCartSummariesRepository},
        },
        products::{records::ProductUuid, repository::PgProductsRepository},
        users::{records::UserUuid, repository::PgUsersRepository},
    },
};

#[derive(Debug, Clone)]
pub struct PgCartsService {
    db: Db,
    config: CartConfig,
    users_repository: PgUsersRepository,
    products_repository: PgProductsRepository,
    lines_repository: PgCartLinesRepository,
    summaries_repository: PgCartSummariesRepository,
}

impl PgCartsService {
    #[must_use]
    pub fn new(db: Db, config: CartConfig) -> Self {
        Self {
            db,
            config,
            users_repository: PgUsersRepository::new(),
            products_repository: PgProductsRepository::new(),
            lines_repository: PgCartLinesRepository::new(),
            summaries_repository: PgCartSummariesRepository::new(),
        }
    }

    /// Adds `added` units to a locked line, keeping its captured unit price.
    async fn merge_into(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        line: CartLineRecord,
        added: u32,
    ) -> Result<CartLineRecord, CartsServiceError> {
        let quantity = pricing::merged_quantity(line.quantity, added)?;
        let total = pricing::line_total(quantity, line.unit_price)?;

        let merged = self
            .lines_repository
            .update_line(tx, line.uuid, quantity, total)
            .await?;

        Ok(merged)
    }

    /// Locks a line and checks that `user` owns it.
    async fn owned_line(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        line: CartLineUuid,
        user: UserUuid,
    ) -> Result<CartLineRecord, CartsServiceError> {
        let record = self
            .lines_repository
            .lock_line(tx, line)
            .await?
            .ok_or(CartsServiceError::NotFound(Resource::CartLine))?;

        if record.user != user {
            return Err(CartsServiceError::Forbidden);
        }

        Ok(record)
    }
}

#[async_trait]
impl CartsService for PgCartsService {
    #[tracing::instrument(
        name = "carts.service.add_to_cart",
        skip(self),
        fields(user_uuid = %user, product_uuid = %product),
        err
    )]
    async fn add_to_cart(
        &self,
        user: UserUuid,
        product: ProductUuid,
        quantity: i32,
    ) -> Result<CartLineRecord, CartsServiceError> {
        let quantity = pricing::requested_quantity(quantity)?;

        let mut tx = self.db.begin().await?;

        let buyer = self
            .users_repository
            .lock_user(&mut tx, user)
            .await?
            .ok_or(CartsServiceError::NotFound(Resource::User))?;

        if !buyer.is_active() {
            return Err(RejectionReason::InactiveUser.into());
        }

        let listing = self
            .products_repository
            .find_product(&mut tx, product)
            .await?
            .ok_or(CartsServiceError::NotFound(Resource::Product))?;

        if !guard::is_visible(listing.status) {
            return Err(RejectionReason::ProductUnavailable.into());
        }

        if listing.owner() == user {
            return Err(RejectionReason::SelfPurchase.into());
        }

        let attempts = self.config.merge_retry_limit.max(1);

        for attempt in 1..=attempts {
            if let Some(existing) = self
                .lines_repository
                .find_line_for_update(&mut tx, user, product)
                .await?
            {
                let merged = self.merge_into(&mut tx, existing, quantity).await?;

                tx.commit().await?;

                debug!(
                    line_uuid = %merged.uuid,
                    quantity = merged.quantity,
                    total = %merged.total,
                    "merged into existing cart line"
                );

                return Ok(merged);
            }

            let line = NewCartLine {
                uuid: CartLineUuid::new(),
                user,
                product,
                quantity,
                unit_price: listing.price,
                total: pricing::line_total(quantity, listing.price)?,
            };

            match self.lines_repository.insert_line(&mut tx, line).await? {
                InsertOutcome::Inserted(created) => {
                    tx.commit().await?;

                    info!(
                        line_uuid = %created.uuid,
                        unit_price = %created.unit_price,
                        "opened cart line"
                    );

                    return Ok(created);
                }
                InsertOutcome::Raced => {
                    debug!(attempt, "concurrent add committed first; merging instead");
                }
            }
        }

        warn!(attempts, "gave up merging after repeated insert races");

        Err(CartsServiceError::Conflict)
    }

    #[tracing::instrument(
        name = "carts.service.update_quantity",
        skip(self),
        fields(line_uuid = %line, user_uuid = %user),
        err
    )]
    async fn update_quantity(
        &self,
        line: CartLineUuid,
        user: UserUuid,
        quantity: i32,
    ) -> Result<CartLineRecord, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let current = self.owned_line(&mut tx, line, user).await?;

        let quantity = pricing::requested_quantity(quantity)?;
        let total = pricing::line_total(quantity, current.unit_price)?;

        let updated = self
            .lines_repository
            .update_line(&mut tx, line, quantity, total)
            .await?;

        tx.commit().await?;

        Ok(updated)
    }

    #[tracing::instrument(
        name = "carts.service.remove_line",
        skip(self),
        fields(line_uuid = %line, user_uuid = %user),
        err
    )]
    async fn remove_line(&self, line: CartLineUuid, user: UserUuid) -> Result<(), CartsServiceError> {
        let mut tx = self.db.begin().await?;

        self.owned_line(&mut tx, line, user).await?;
        self.lines_repository.delete_line(&mut tx, line).await?;

        tx.commit().await?;

        Ok(())
    }

    #[tracing::instrument(
        name = "carts.service.clear_cart",
        skip(self),
        fields(user_uuid = %user),
        err
    )]
    async fn clear_cart(&self, user: UserUuid) -> Result<u64, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let removed = self.lines_repository.clear_cart(&mut tx, user).await?;

        tx.commit().await?;

        info!(removed, "cleared cart");

        Ok(removed)
    }

    async fn list_cart(&self, user: UserUuid) -> Result<Vec<CartLineView>, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let lines = self
            .lines_repository
            .list_visible_lines(&mut tx, user)
            .await?;

        tx.commit().await?;

        Ok(lines)
    }

    async fn get_summary(&self, user: UserUuid) -> Result<CartSummary, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let summary = self.summaries_repository.summarize(&mut tx, user).await?;

        tx.commit().await?;

        Ok(summary)
    }
}

#[automock]
#[async_trait]
pub trait CartsService: Send + Sync {
    /// Adds `quantity` units of `product` to the user's cart, merging into the
    /// existing line when there is one.
    async fn add_to_cart(
        &self,
        user: UserUuid,
        product: ProductUuid,
        quantity: i32,
    ) -> Result<CartLineRecord, CartsServiceError>;

    /// Replaces a line's quantity and recomputes its total.
    async fn update_quantity(
        &self,
        line: CartLineUuid,
        user: UserUuid,
        quantity: i32,
    ) -> Result<CartLineRecord, CartsServiceError>;

    /// Deletes one line.
    async fn remove_line(&self, line: CartLineUuid, user: UserUuid) -> Result<(), CartsServiceError>;

    /// Deletes every line the user holds and returns how many went.
    async fn clear_cart(&self, user: UserUuid) -> Result<u64, CartsServiceError>;

    /// Lines whose product is still active, newest first.
    async fn list_cart(&self, user: UserUuid) -> Result<Vec<CartLineView>, CartsServiceError>;

    /// Totals over exactly the lines [`CartsService::list_cart`] returns.
    async fn get_summary(&self, user: UserUuid) -> Result<CartSummary, CartsServiceError>;
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rust_decimal::Decimal;
    use sqlx::PgPool;
    use testresult::TestResult;

    use crate::{
        domain::{
            products::{ProductsService, data::ProductUpdate, records::ProductStatus},
            users::UsersService,
        },
        test::TestContext,
    };

    use super::*;

    fn price(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    /// Inserts a line in a transaction left open, so a concurrent add cannot
    /// see it yet but collides with it on the (user, product) key.
    async fn open_uncommitted_line(
        pool: &PgPool,
        user: UserUuid,
        product: ProductUuid,
        quantity: i32,
        unit_price: Decimal,
    ) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "INSERT INTO cart_lines (uuid, user_uuid, product_uuid, quantity, unit_price, total) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(CartLineUuid::new())
        .bind(user)
        .bind(product)
        .bind(quantity)
        .bind(unit_price)
        .bind(unit_price * Decimal::from(quantity))
        .execute(&mut *tx)
        .await?;

        Ok(tx)
    }

    /// Waits until some session in this database is blocked on a lock.
    async fn wait_for_lock_waiter(pool: &PgPool) -> TestResult {
        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let waiting: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM pg_stat_activity \
                     WHERE datname = current_database() AND wait_event_type = 'Lock'",
                )
                .fetch_one(pool)
                .await?;

                if waiting > 0 {
                    return Ok::<(), sqlx::Error>(());
                }

                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await??;

        Ok(())
    }

    #[tokio::test]
    async fn add_to_cart_captures_current_price() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = ctx.create_user("seller").await;
        let buyer = ctx.create_user("buyer").await;
        let product = ctx.create_product(seller, price(2000)).await;

        let line = ctx.carts.add_to_cart(buyer, product, 3).await?;

        assert_eq!(line.user, buyer);
        assert_eq!(line.product, product);
        assert_eq!(line.quantity, 3);
        assert_eq!(line.unit_price, price(2000));
        assert_eq!(line.total, price(6000));

        Ok(())
    }

    #[tokio::test]
    async fn repeat_add_merges_into_one_line() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = ctx.create_user("seller").await;
        let buyer = ctx.create_user("buyer").await;
        let product = ctx.create_product(seller, price(1250)).await;

        let first = ctx.carts.add_to_cart(buyer, product, 2).await?;
        let second = ctx.carts.add_to_cart(buyer, product, 5).await?;

        assert_eq!(second.uuid, first.uuid);
        assert_eq!(second.quantity, 7);
        assert_eq!(second.total, price(1250) * Decimal::from(7));
        assert_eq!(ctx.count_stored_lines(buyer).await, 1);

        Ok(())
    }

    #[tokio::test]
    async fn merge_keeps_first_captured_price() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = ctx.create_user("seller").await;
        let buyer = ctx.create_user("buyer").await;
        let product = ctx.create_product(seller, price(1000)).await;

        ctx.carts.add_to_cart(buyer, product, 1).await?;

        ctx.products
            .update_product(seller, product, ProductUpdate::price(price(1500)))
            .await?;

        let merged = ctx.carts.add_to_cart(buyer, product, 1).await?;

        assert_eq!(merged.unit_price, price(1000));
        assert_eq!(merged.total, price(2000));

        Ok(())
    }

    #[tokio::test]
    async fn add_rejects_non_positive_quantity() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = ctx.create_user("seller").await;
        let buyer = ctx.create_user("buyer").await;
        let product = ctx.create_product(seller, price(1000)).await;

        for quantity in [0, -1] {
            let result = ctx.carts.add_to_cart(buyer, product, quantity).await;

            assert!(
                matches!(
                    result,
                    Err(CartsServiceError::Rejected(RejectionReason::InvalidQuantity))
                ),
                "expected InvalidQuantity, got {result:?}"
            );
        }

        assert_eq!(ctx.count_stored_lines(buyer).await, 0);

        Ok(())
    }

    #[tokio::test]
    async fn add_rejects_merge_past_storable_quantity() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = ctx.create_user("seller").await;
        let buyer = ctx.create_user("buyer").await;
        let product = ctx.create_product(seller, price(1)).await;

        ctx.carts.add_to_cart(buyer, product, i32::MAX).await?;

        let result = ctx.carts.add_to_cart(buyer, product, 1).await;

        assert!(
            matches!(
                result,
                Err(CartsServiceError::Rejected(RejectionReason::QuantityOutOfRange))
            ),
            "expected QuantityOutOfRange, got {result:?}"
        );

        let lines = ctx.carts.list_cart(buyer).await?;

        assert_eq!(lines[0].line.quantity, pricing::MAX_LINE_QUANTITY);

        Ok(())
    }

    #[tokio::test]
    async fn add_unknown_product_returns_not_found() {
        let ctx = TestContext::new().await;
        let buyer = ctx.create_user("buyer").await;

        let result = ctx.carts.add_to_cart(buyer, ProductUuid::new(), 1).await;

        assert!(
            matches!(result, Err(CartsServiceError::NotFound(Resource::Product))),
            "expected product NotFound, got {result:?}"
        );
    }

    #[tokio::test]
    async fn add_for_unknown_user_returns_not_found() {
        let ctx = TestContext::new().await;
        let seller = ctx.create_user("seller").await;
        let product = ctx.create_product(seller, price(1000)).await;

        let result = ctx.carts.add_to_cart(UserUuid::new(), product, 1).await;

        assert!(
            matches!(result, Err(CartsServiceError::NotFound(Resource::User))),
            "expected user NotFound, got {result:?}"
        );
    }

    #[tokio::test]
    async fn add_own_product_is_rejected() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = ctx.create_user("seller").await;
        let product = ctx.create_product(seller, price(1000)).await;

        let result = ctx.carts.add_to_cart(seller, product, 1).await;

        assert!(
            matches!(
                result,
                Err(CartsServiceError::Rejected(RejectionReason::SelfPurchase))
            ),
            "expected SelfPurchase, got {result:?}"
        );

        assert_eq!(ctx.count_stored_lines(seller).await, 0);

        Ok(())
    }

    #[tokio::test]
    async fn add_unavailable_product_is_rejected() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = ctx.create_user("seller").await;
        let buyer = ctx.create_user("buyer").await;
        let delisted = ctx.create_product(seller, price(1000)).await;
        let sold = ctx.create_product(seller, price(2000)).await;

        ctx.products.delist_product(seller, delisted).await?;
        ctx.products.mark_sold(sold).await?;

        for product in [delisted, sold] {
            let result = ctx.carts.add_to_cart(buyer, product, 1).await;

            assert!(
                matches!(
                    result,
                    Err(CartsServiceError::Rejected(RejectionReason::ProductUnavailable))
                ),
                "expected ProductUnavailable, got {result:?}"
            );
        }

        assert_eq!(ctx.count_stored_lines(buyer).await, 0);

        Ok(())
    }

    #[tokio::test]
    async fn inactive_user_cannot_add() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = ctx.create_user("seller").await;
        let buyer = ctx.create_user("buyer").await;
        let product = ctx.create_product(seller, price(1000)).await;

        ctx.users.deactivate_user(buyer).await?;

        let result = ctx.carts.add_to_cart(buyer, product, 1).await;

        assert!(
            matches!(
                result,
                Err(CartsServiceError::Rejected(RejectionReason::InactiveUser))
            ),
            "expected InactiveUser, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn update_quantity_recomputes_total() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = ctx.create_user("seller").await;
        let buyer = ctx.create_user("buyer").await;
        let product = ctx.create_product(seller, price(1999)).await;
        let line = ctx.carts.add_to_cart(buyer, product, 1).await?;

        for quantity in [4, 1, 9] {
            let updated = ctx.carts.update_quantity(line.uuid, buyer, quantity).await?;

            assert_eq!(updated.quantity, quantity.unsigned_abs());
            assert_eq!(
                updated.total,
                updated.unit_price * Decimal::from(updated.quantity)
            );
        }

        let listed = ctx.carts.list_cart(buyer).await?;

        assert_eq!(listed[0].line.total, price(1999) * Decimal::from(9));

        Ok(())
    }

    #[tokio::test]
    async fn update_quantity_rejects_zero_without_effect() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = ctx.create_user("seller").await;
        let buyer = ctx.create_user("buyer").await;
        let product = ctx.create_product(seller, price(500)).await;
        let line = ctx.carts.add_to_cart(buyer, product, 2).await?;

        let result = ctx.carts.update_quantity(line.uuid, buyer, 0).await;

        assert!(
            matches!(
                result,
                Err(CartsServiceError::Rejected(RejectionReason::InvalidQuantity))
            ),
            "expected InvalidQuantity, got {result:?}"
        );

        assert_eq!(ctx.carts.get_summary(buyer).await?.total_quantity, 2);

        Ok(())
    }

    #[tokio::test]
    async fn update_quantity_by_other_user_is_forbidden() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = ctx.create_user("seller").await;
        let buyer = ctx.create_user("buyer").await;
        let other = ctx.create_user("other").await;
        let product = ctx.create_product(seller, price(500)).await;
        let line = ctx.carts.add_to_cart(buyer, product, 2).await?;

        let result = ctx.carts.update_quantity(line.uuid, other, 5).await;

        assert!(
            matches!(result, Err(CartsServiceError::Forbidden)),
            "expected Forbidden, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn update_unknown_line_returns_not_found() {
        let ctx = TestContext::new().await;
        let buyer = ctx.create_user("buyer").await;

        let result = ctx
            .carts
            .update_quantity(CartLineUuid::new(), buyer, 1)
            .await;

        assert!(
            matches!(result, Err(CartsServiceError::NotFound(Resource::CartLine))),
            "expected cart line NotFound, got {result:?}"
        );
    }

    #[tokio::test]
    async fn removed_line_is_gone_and_second_remove_is_not_found() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = ctx.create_user("seller").await;
        let buyer = ctx.create_user("buyer").await;
        let kept = ctx.create_product(seller, price(500)).await;
        let dropped = ctx.create_product(seller, price(700)).await;

        ctx.carts.add_to_cart(buyer, kept, 1).await?;
        let line = ctx.carts.add_to_cart(buyer, dropped, 1).await?;

        ctx.carts.remove_line(line.uuid, buyer).await?;

        let listed = ctx.carts.list_cart(buyer).await?;

        assert!(listed.iter().all(|view| view.line.uuid != line.uuid));
        assert_eq!(listed.len(), 1);

        let again = ctx.carts.remove_line(line.uuid, buyer).await;

        assert!(
            matches!(again, Err(CartsServiceError::NotFound(Resource::CartLine))),
            "expected cart line NotFound, got {again:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn remove_line_by_other_user_is_forbidden() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = ctx.create_user("seller").await;
        let buyer = ctx.create_user("buyer").await;
        let other = ctx.create_user("other").await;
        let product = ctx.create_product(seller, price(500)).await;
        let line = ctx.carts.add_to_cart(buyer, product, 1).await?;

        let result = ctx.carts.remove_line(line.uuid, other).await;

        assert!(
            matches!(result, Err(CartsServiceError::Forbidden)),
            "expected Forbidden, got {result:?}"
        );

        assert_eq!(ctx.count_stored_lines(buyer).await, 1);

        Ok(())
    }

    #[tokio::test]
    async fn clear_cart_zeroes_summary() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = ctx.create_user("seller").await;
        let buyer = ctx.create_user("buyer").await;
        let first = ctx.create_product(seller, price(500)).await;
        let second = ctx.create_product(seller, price(900)).await;

        ctx.carts.add_to_cart(buyer, first, 2).await?;
        ctx.carts.add_to_cart(buyer, second, 1).await?;

        let removed = ctx.carts.clear_cart(buyer).await?;
        let summary = ctx.carts.get_summary(buyer).await?;

        assert_eq!(removed, 2);
        assert_eq!(summary, CartSummary::default());
        assert_eq!(summary.subtotal, Decimal::ZERO);

        Ok(())
    }

    #[tokio::test]
    async fn clear_empty_cart_succeeds() -> TestResult {
        let ctx = TestContext::new().await;
        let buyer = ctx.create_user("buyer").await;

        assert_eq!(ctx.carts.clear_cart(buyer).await?, 0);
        assert_eq!(ctx.carts.get_summary(buyer).await?, CartSummary::default());
        assert!(ctx.carts.list_cart(buyer).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn clear_cart_removes_hidden_lines() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = ctx.create_user("seller").await;
        let buyer = ctx.create_user("buyer").await;
        let product = ctx.create_product(seller, price(500)).await;

        ctx.carts.add_to_cart(buyer, product, 1).await?;
        ctx.products.delist_product(seller, product).await?;

        assert_eq!(ctx.carts.clear_cart(buyer).await?, 1);
        assert_eq!(ctx.count_stored_lines(buyer).await, 0);

        Ok(())
    }

    #[tokio::test]
    async fn listing_and_summary_agree_with_visibility_rule() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = ctx.create_user("seller").await;
        let buyer = ctx.create_user("buyer").await;

        for (cents, status) in [
            (100, ProductStatus::Active),
            (200, ProductStatus::Sold),
            (300, ProductStatus::Inactive),
        ] {
            let product = ctx.create_product(seller, price(cents)).await;

            ctx.carts.add_to_cart(buyer, product, 2).await?;

            match status {
                ProductStatus::Active => {}
                ProductStatus::Sold => {
                    ctx.products.mark_sold(product).await?;
                }
                ProductStatus::Inactive => {
                    ctx.products.delist_product(seller, product).await?;
                }
            }

            let listed = ctx
                .carts
                .list_cart(buyer)
                .await?
                .iter()
                .any(|view| view.line.product == product);

            assert_eq!(listed, guard::is_visible(status), "status {status}");
        }

        let lines = ctx.carts.list_cart(buyer).await?;
        let summary = ctx.carts.get_summary(buyer).await?;

        assert_eq!(summary.item_count, 1);
        assert_eq!(
            summary.total_quantity,
            lines.iter().map(|view| u64::from(view.line.quantity)).sum::<u64>()
        );
        assert_eq!(
            summary.subtotal,
            lines.iter().map(|view| view.line.total).sum::<Decimal>()
        );
        assert_eq!(ctx.count_stored_lines(buyer).await, 3);

        Ok(())
    }

    #[tokio::test]
    async fn list_cart_carries_product_display_fields() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = ctx.create_user("seller").await;
        let buyer = ctx.create_user("buyer").await;
        let product = ctx.create_product(seller, price(4200)).await;

        ctx.carts.add_to_cart(buyer, product, 1).await?;

        let lines = ctx.carts.list_cart(buyer).await?;
        let stored = ctx.products.get_product(product).await?;

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product_title, stored.title);
        assert_eq!(lines[0].product_category, stored.category);
        assert_eq!(lines[0].product_condition, stored.condition);
        assert_eq!(lines[0].product_brand, stored.attributes.brand);
        assert_eq!(lines[0].product_image_url, stored.image_url);

        Ok(())
    }

    #[tokio::test]
    async fn cart_is_private_to_its_owner() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = ctx.create_user("seller").await;
        let buyer = ctx.create_user("buyer").await;
        let other = ctx.create_user("other").await;
        let product = ctx.create_product(seller, price(4200)).await;

        ctx.carts.add_to_cart(buyer, product, 1).await?;

        assert!(ctx.carts.list_cart(other).await?.is_empty());
        assert_eq!(ctx.carts.get_summary(other).await?, CartSummary::default());

        Ok(())
    }

    #[tokio::test]
    async fn purging_product_cascades_to_cart_lines() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = ctx.create_user("seller").await;
        let buyer = ctx.create_user("buyer").await;
        let product = ctx.create_product(seller, price(500)).await;
        let line = ctx.carts.add_to_cart(buyer, product, 1).await?;

        ctx.products.purge_product(product).await?;

        assert_eq!(ctx.count_stored_lines(buyer).await, 0);

        let result = ctx.carts.remove_line(line.uuid, buyer).await;

        assert!(
            matches!(result, Err(CartsServiceError::NotFound(Resource::CartLine))),
            "expected cart line NotFound, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn deleting_seller_cascades_through_listings_to_cart_lines() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = ctx.create_user("seller").await;
        let buyer = ctx.create_user("buyer").await;
        let product = ctx.create_product(seller, price(500)).await;

        ctx.carts.add_to_cart(buyer, product, 1).await?;

        ctx.users.delete_user(seller).await?;

        assert_eq!(ctx.count_stored_lines(buyer).await, 0);

        Ok(())
    }

    #[tokio::test]
    async fn hidden_line_can_still_be_updated_and_removed_by_owner() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = ctx.create_user("seller").await;
        let buyer = ctx.create_user("buyer").await;
        let product = ctx.create_product(seller, price(500)).await;
        let line = ctx.carts.add_to_cart(buyer, product, 1).await?;

        ctx.products.delist_product(seller, product).await?;

        let updated = ctx.carts.update_quantity(line.uuid, buyer, 3).await?;

        assert_eq!(updated.total, price(1500));

        ctx.carts.remove_line(line.uuid, buyer).await?;

        assert_eq!(ctx.count_stored_lines(buyer).await, 0);

        Ok(())
    }

    #[tokio::test]
    async fn price_snapshot_and_delisting_scenario() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = ctx.create_user("alice").await;
        let buyer = ctx.create_user("bob").await;
        let product = ctx.create_product(seller, price(2000)).await;

        let line = ctx.carts.add_to_cart(buyer, product, 3).await?;

        assert_eq!(
            (line.quantity, line.unit_price, line.total),
            (3, price(2000), price(6000))
        );

        let merged = ctx.carts.add_to_cart(buyer, product, 2).await?;

        assert_eq!(merged.uuid, line.uuid);
        assert_eq!((merged.quantity, merged.total), (5, price(10_000)));

        ctx.products
            .update_product(seller, product, ProductUpdate::price(price(2500)))
            .await?;

        let listed = ctx.carts.list_cart(buyer).await?;

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].line.total, price(10_000));
        assert_eq!(listed[0].line.unit_price, price(2000));

        ctx.products.delist_product(seller, product).await?;

        assert!(ctx.carts.list_cart(buyer).await?.is_empty());
        assert_eq!(ctx.carts.get_summary(buyer).await?, CartSummary::default());
        assert_eq!(ctx.count_stored_lines(buyer).await, 1);

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adds_merge_into_one_line() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = ctx.create_user("seller").await;
        let buyer = ctx.create_user("buyer").await;
        let product = ctx.create_product(seller, price(1000)).await;

        for round in 1..=5_u32 {
            let first = {
                let carts = ctx.carts.clone();
                tokio::spawn(async move { carts.add_to_cart(buyer, product, 1).await })
            };
            let second = {
                let carts = ctx.carts.clone();
                tokio::spawn(async move { carts.add_to_cart(buyer, product, 1).await })
            };

            first.await??;
            second.await??;

            let lines = ctx.carts.list_cart(buyer).await?;

            assert_eq!(lines.len(), 1, "round {round}");
            assert_eq!(lines[0].line.quantity, round * 2, "round {round}");
            assert_eq!(
                lines[0].line.total,
                price(1000) * Decimal::from(round * 2),
                "round {round}"
            );
        }

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn add_losing_insert_race_merges_into_committed_line() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = ctx.create_user("seller").await;
        let buyer = ctx.create_user("buyer").await;
        let product = ctx.create_product(seller, price(1000)).await;

        let rival = open_uncommitted_line(ctx.db.pool(), buyer, product, 2, price(1000)).await?;

        let add = {
            let carts = ctx.carts.clone();
            tokio::spawn(async move { carts.add_to_cart(buyer, product, 1).await })
        };

        wait_for_lock_waiter(ctx.db.pool()).await?;
        rival.commit().await?;

        let merged = add.await??;

        assert_eq!(merged.quantity, 3);
        assert_eq!(merged.total, price(3000));
        assert_eq!(ctx.count_stored_lines(buyer).await, 1);

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn exhausted_merge_retries_surface_transient_conflict() -> TestResult {
        let ctx = TestContext::new().await;
        let seller = ctx.create_user("seller").await;
        let buyer = ctx.create_user("buyer").await;
        let product = ctx.create_product(seller, price(1000)).await;

        let carts = PgCartsService::new(
            Db::new(ctx.db.pool().clone()),
            CartConfig {
                merge_retry_limit: 1,
            },
        );

        let rival = open_uncommitted_line(ctx.db.pool(), buyer, product, 2, price(1000)).await?;

        let add = tokio::spawn(async move { carts.add_to_cart(buyer, product, 1).await });

        wait_for_lock_waiter(ctx.db.pool()).await?;
        rival.commit().await?;

        let result = add.await?;

        assert!(
            matches!(result, Err(CartsServiceError::Conflict)),
            "expected Conflict, got {result:?}"
        );
        assert!(
            result.is_err_and(|error| error.is_transient()),
            "conflict should be reported as retryable"
        );

        let lines = ctx.carts.list_cart(buyer).await?;

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].line.quantity, 2);

        Ok(())
    }
}
