use clap::{Args, Subcommand};
use ecofinds_app::{config::DatabaseConfig, context::AppInitError, database};
use serde_json::json;
use tracing::info;

use super::{CliError, render};

#[derive(Debug, Args)]
pub(crate) struct DbCommand {
    #[command(subcommand)]
    command: DbSubcommand,
}

#[derive(Debug, Subcommand)]
enum DbSubcommand {
    /// Apply pending schema migrations
    Migrate,
}

pub(crate) async fn run(command: DbCommand, config: &DatabaseConfig) -> Result<String, CliError> {
    match command.command {
        DbSubcommand::Migrate => {
            let pool = database::connect(config)
                .await
                .map_err(AppInitError::Database)?;

            database::migrate(&pool).await?;

            info!("database schema is up to date");

            render(&json!({ "migrated": true }))
        }
    }
}
