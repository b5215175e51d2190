use clap::{Args, Subcommand};
use ecofinds_app::{
    carts::records::CartLineUuid, context::AppContext, products::records::ProductUuid,
    users::records::UserUuid,
};
use serde_json::json;
use uuid::Uuid;

use super::{CliError, render};

#[derive(Debug, Args)]
pub(crate) struct CartCommand {
    #[command(subcommand)]
    command: CartSubcommand,
}

#[derive(Debug, Subcommand)]
enum CartSubcommand {
    /// Add units of a product, merging into an existing line
    Add {
        #[arg(long)]
        user: Uuid,

        #[arg(long)]
        product: Uuid,

        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        quantity: i32,
    },

    /// Set the quantity of a line
    Update {
        #[arg(long)]
        line: Uuid,

        #[arg(long)]
        user: Uuid,

        #[arg(long, allow_negative_numbers = true)]
        quantity: i32,
    },

    /// Remove one line
    Remove {
        #[arg(long)]
        line: Uuid,

        #[arg(long)]
        user: Uuid,
    },

    /// Remove every line in the user's cart
    Clear {
        #[arg(long)]
        user: Uuid,
    },

    /// Show the lines whose product is still available
    List {
        #[arg(long)]
        user: Uuid,
    },

    /// Show item count, total quantity and subtotal
    Summary {
        #[arg(long)]
        user: Uuid,
    },
}

pub(crate) async fn run(command: CartCommand, ctx: &AppContext) -> Result<String, CliError> {
    match command.command {
        CartSubcommand::Add {
            user,
            product,
            quantity,
        } => {
            let line = ctx
                .carts
                .add_to_cart(
                    UserUuid::from_uuid(user),
                    ProductUuid::from_uuid(product),
                    quantity,
                )
                .await?;

            render(&line)
        }
        CartSubcommand::Update {
            line,
            user,
            quantity,
        } => {
            let line = ctx
                .carts
                .update_quantity(
                    CartLineUuid::from_uuid(line),
                    UserUuid::from_uuid(user),
                    quantity,
                )
                .await?;

            render(&line)
        }
        CartSubcommand::Remove { line, user } => {
            ctx.carts
                .remove_line(CartLineUuid::from_uuid(line), UserUuid::from_uuid(user))
                .await?;

            render(&json!({ "removed": line }))
        }
        CartSubcommand::Clear { user } => {
            let removed = ctx.carts.clear_cart(UserUuid::from_uuid(user)).await?;

            render(&json!({ "removed": removed }))
        }
        CartSubcommand::List { user } => {
            render(&ctx.carts.list_cart(UserUuid::from_uuid(user)).await?)
        }
        CartSubcommand::Summary { user } => {
            render(&ctx.carts.get_summary(UserUuid::from_uuid(user)).await?)
        }
    }
}
