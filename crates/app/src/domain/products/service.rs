//! Products service.

use async_trait::async_trait;
use jiff::Zoned;
use mockall::automock;
use tracing::{debug, info};

use crate::{
    database::Db,
    domain::{
        products::{
            data::{NewProduct, ProductFilter, ProductUpdate},
            errors::ProductsServiceError,
            records::{ProductRecord, ProductStatus, ProductUuid},
            repository::PgProductsRepository,
        },
        users::records::UserUuid,
    },
};

#[derive(Debug, Clone)]
pub struct PgProductsService {
    db: Db,
    repository: PgProductsRepository,
}

impl PgProductsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgProductsRepository::new(),
        }
    }

    /// Moves an active product to `status`. Repeating the same transition is a
    /// no-op; leaving any other terminal state is not allowed.
    async fn transition(
        &self,
        seller: Option<UserUuid>,
        product: ProductUuid,
        status: ProductStatus,
    ) -> Result<ProductRecord, ProductsServiceError> {
        let mut tx = self.db.begin().await?;

        let current = self.repository.lock_product(&mut tx, product).await?;

        if seller.is_some_and(|seller| seller != current.owner()) {
            return Err(ProductsServiceError::Forbidden);
        }

        if current.status == status {
            debug!(product_uuid = %product, %status, "status already set");

            return Ok(current);
        }

        if !current.is_active() {
            return Err(ProductsServiceError::NotActive);
        }

        let updated = self.repository.set_status(&mut tx, product, status).await?;

        tx.commit().await?;

        info!(product_uuid = %product, %status, "changed product status");

        Ok(updated)
    }
}

#[async_trait]
impl ProductsService for PgProductsService {
    #[tracing::instrument(
        name = "products.service.create_product",
        skip(self, product),
        fields(seller_uuid = %seller, product_uuid = %product.uuid),
        err
    )]
    async fn create_product(
        &self,
        seller: UserUuid,
        product: NewProduct,
    ) -> Result<ProductRecord, ProductsServiceError> {
        product.validate(Zoned::now().year())?;

        let mut tx = self.db.begin().await?;

        if self
            .repository
            .duplicate_exists(&mut tx, seller, product.title.trim(), product.price)
            .await?
        {
            return Err(ProductsServiceError::AlreadyExists);
        }

        let created = self
            .repository
            .create_product(&mut tx, seller, product)
            .await?;

        tx.commit().await?;

        info!(product_uuid = %created.uuid, price = %created.price, "created product");

        Ok(created)
    }

    async fn get_product(&self, product: ProductUuid) -> Result<ProductRecord, ProductsServiceError> {
        let mut tx = self.db.begin().await?;

        let product = self.repository.get_product(&mut tx, product).await?;

        tx.commit().await?;

        Ok(product)
    }

    async fn list_products(
        &self,
        filter: ProductFilter,
    ) -> Result<Vec<ProductRecord>, ProductsServiceError> {
        let mut tx = self.db.begin().await?;

        let products = self.repository.list_products(&mut tx, &filter).await?;

        tx.commit().await?;

        Ok(products)
    }

    #[tracing::instrument(
        name = "products.service.update_product",
        skip(self, update),
        fields(seller_uuid = %seller, product_uuid = %product),
        err
    )]
    async fn update_product(
        &self,
        seller: UserUuid,
        product: ProductUuid,
        update: ProductUpdate,
    ) -> Result<ProductRecord, ProductsServiceError> {
        update.validate(Zoned::now().year())?;

        let mut tx = self.db.begin().await?;

        let current = self.repository.lock_product(&mut tx, product).await?;

        if current.owner() != seller {
            return Err(ProductsServiceError::Forbidden);
        }

        let updated = self
            .repository
            .update_product(&mut tx, product, update)
            .await?;

        tx.commit().await?;

        if updated.price != current.price {
            info!(
                product_uuid = %product,
                old_price = %current.price,
                new_price = %updated.price,
                "repriced product; existing cart lines keep their captured price"
            );
        }

        Ok(updated)
    }

    #[tracing::instrument(
        name = "products.service.delist_product",
        skip(self),
        fields(seller_uuid = %seller, product_uuid = %product),
        err
    )]
    async fn delist_product(
        &self,
        seller: UserUuid,
        product: ProductUuid,
    ) -> Result<ProductRecord, ProductsServiceError> {
        self.transition(Some(seller), product, ProductStatus::Inactive)
            .await
    }

    #[tracing::instrument(
        name = "products.service.mark_sold",
        skip(self),
        fields(product_uuid = %product),
        err
    )]
    async fn mark_sold(&self, product: ProductUuid) -> Result<ProductRecord, ProductsServiceError> {
        self.transition(None, product, ProductStatus::Sold).await
    }

    #[tracing::instrument(
        name = "products.service.purge_product",
        skip(self),
        fields(product_uuid = %product),
        err
    )]
    async fn purge_product(&self, product: ProductUuid) -> Result<(), ProductsServiceError> {
        let mut tx = self.db.begin().await?;

        let rows_affected = self.repository.purge_product(&mut tx, product).await?;

        if rows_affected == 0 {
            return Err(ProductsServiceError::NotFound);
        }

        tx.commit().await?;

        info!(product_uuid = %product, "purged product and its cart lines");

        Ok(())
    }
}

#[automock]
#[async_trait]
pub trait ProductsService: Send + Sync {
    /// Lists a new, active product for `seller`.
    async fn create_product(
        &self,
        seller: UserUuid,
        product: NewProduct,
    ) -> Result<ProductRecord, ProductsServiceError>;

    /// Retrieve a single product in any status.
    async fn get_product(&self, product: ProductUuid) -> Result<ProductRecord, ProductsServiceError>;

    /// Active products matching `filter`, newest first.
    async fn list_products(
        &self,
        filter: ProductFilter,
    ) -> Result<Vec<ProductRecord>, ProductsServiceError>;

    /// Changes descriptive fields or price. Only the seller may do this.
    async fn update_product(
        &self,
        seller: UserUuid,
        product: ProductUuid,
        update: ProductUpdate,
    ) -> Result<ProductRecord, ProductsServiceError>;

    /// Soft-deletes a listing. The row is kept, but it stops appearing in
    /// listings and in every cart that holds it.
    async fn delist_product(
        &self,
        seller: UserUuid,
        product: ProductUuid,
    ) -> Result<ProductRecord, ProductsServiceError>;

    /// Records that the product has been sold.
    async fn mark_sold(&self, product: ProductUuid) -> Result<ProductRecord, ProductsServiceError>;

    /// Permanently deletes a product together with every cart line holding it.
    async fn purge_product(&self, product: ProductUuid) -> Result<(), ProductsServiceError>;
}
