use clap::{Parser, Subcommand};
use serde::Serialize;
use sqlx::migrate::MigrateError;
use thiserror::Error;

use ecofinds_app::{
    carts::CartsServiceError,
    config::{CartConfig, DatabaseConfig, LoggingConfig},
    context::{AppContext, AppInitError},
    products::ProductsServiceError,
    users::UsersServiceError,
};

mod cart;
mod db;
mod product;
mod user;

#[derive(Debug, Parser)]
#[command(name = "ecofinds-app", about = "EcoFinds operator CLI", long_about = None)]
pub(crate) struct Cli {
    #[command(flatten)]
    logging: LoggingConfig,

    #[command(flatten)]
    database: DatabaseConfig,

    #[command(flatten)]
    cart: CartConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Db(db::DbCommand),
    User(user::UserCommand),
    Product(product::ProductCommand),
    Cart(cart::CartCommand),
}

#[derive(Debug, Error)]
pub(crate) enum CliError {
    #[error(transparent)]
    Init(#[from] AppInitError),

    #[error("failed to apply migrations")]
    Migrate(#[from] MigrateError),

    #[error(transparent)]
    Users(#[from] UsersServiceError),

    #[error(transparent)]
    Products(#[from] ProductsServiceError),

    #[error(transparent)]
    Carts(#[from] CartsServiceError),

    #[error("failed to render output")]
    Json(#[from] serde_json::Error),
}

impl Cli {
    pub(crate) fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    /// Runs the command and returns its JSON output.
    pub(crate) async fn run(self) -> Result<String, CliError> {
        match self.command {
            Commands::Db(command) => db::run(command, &self.database).await,
            Commands::User(command) => {
                user::run(command, &connect(&self.database, self.cart).await?).await
            }
            Commands::Product(command) => {
                product::run(command, &connect(&self.database, self.cart).await?).await
            }
            Commands::Cart(command) => {
                cart::run(command, &connect(&self.database, self.cart).await?).await
            }
        }
    }
}

async fn connect(database: &DatabaseConfig, cart: CartConfig) -> Result<AppContext, CliError> {
    Ok(AppContext::connect(database, cart).await?)
}

fn render<T: Serialize>(value: &T) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(value)?)
}
