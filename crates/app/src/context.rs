//! App Context

use std::sync::Arc;

use thiserror::Error;

use crate::{
    config::{CartConfig, DatabaseConfig},
    database::{self, Db},
    domain::{
        carts::{CartsService, PgCartsService},
        products::{PgProductsService, ProductsService},
        users::{PgUsersService, UsersService},
    },
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),
}

/// The services every inbound surface works through.
#[derive(Clone)]
pub struct AppContext {
    pub users: Arc<dyn UsersService>,
    pub products: Arc<dyn ProductsService>,
    pub carts: Arc<dyn CartsService>,
}

impl AppContext {
    /// Build application context from database settings.
    ///
    /// # Errors
    ///
    /// Returns an error when establishing a database connection fails.
    pub async fn connect(database: &DatabaseConfig, cart: CartConfig) -> Result<Self, AppInitError> {
        let pool = database::connect(database)
            .await
            .map_err(AppInitError::Database)?;

        Ok(Self::from_db(Db::new(pool), cart))
    }

    #[must_use]
    pub fn from_db(db: Db, cart: CartConfig) -> Self {
        Self {
            users: Arc::new(PgUsersService::new(db.clone())),
            products: Arc::new(PgProductsService::new(db.clone())),
            carts: Arc::new(PgCartsService::new(db, cart)),
        }
    }
}
