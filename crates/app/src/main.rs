//! EcoFinds operator CLI

use std::process;

use clap::Parser;
use ecofinds_app::observability;
use tracing::error;

mod cli;

#[tokio::main]
pub async fn main() {
    let _env = dotenvy::dotenv();

    let cli = cli::Cli::parse();

    if let Err(error) = observability::init_subscriber(cli.logging()) {
        eprintln!("{error}");
        process::exit(1);
    }

    match cli.run().await {
        Ok(output) => println!("{output}"),
        Err(error) => {
            error!(error = ?error, "command failed");
            process::exit(1);
        }
    }
}
