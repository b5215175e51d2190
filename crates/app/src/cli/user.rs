use clap::{Args, Subcommand};
use ecofinds_app::{
    context::AppContext,
    users::{data::NewUser, records::UserUuid},
};
use serde_json::json;
use uuid::Uuid;

use super::{CliError, render};

#[derive(Debug, Args)]
pub(crate) struct UserCommand {
    #[command(subcommand)]
    command: UserSubcommand,
}

#[derive(Debug, Subcommand)]
enum UserSubcommand {
    /// Register an active user
    Create {
        #[arg(long)]
        username: String,

        #[arg(long)]
        email: String,

        /// Optional user UUID; generated when omitted
        #[arg(long)]
        uuid: Option<Uuid>,
    },

    /// Stop a user from changing their cart
    Deactivate {
        #[arg(long)]
        user: Uuid,
    },

    /// Permanently delete a user with their listings and cart
    Delete {
        #[arg(long)]
        user: Uuid,
    },
}

pub(crate) async fn run(command: UserCommand, ctx: &AppContext) -> Result<String, CliError> {
    match command.command {
        UserSubcommand::Create {
            username,
            email,
            uuid,
        } => {
            let user = ctx
                .users
                .create_user(NewUser {
                    uuid: uuid.map_or_else(UserUuid::new, UserUuid::from_uuid),
                    username,
                    email,
                })
                .await?;

            render(&user)
        }
        UserSubcommand::Deactivate { user } => {
            render(&ctx.users.deactivate_user(UserUuid::from_uuid(user)).await?)
        }
        UserSubcommand::Delete { user } => {
            ctx.users.delete_user(UserUuid::from_uuid(user)).await?;

            render(&json!({ "deleted": user }))
        }
    }
}
