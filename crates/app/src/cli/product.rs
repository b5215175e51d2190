use clap::{Args, Subcommand};
use ecofinds_app::{
    context::AppContext,
    products::{
        data::{NewProduct, ProductFilter, ProductUpdate},
        records::{Category, Condition, ProductAttributes, ProductUuid},
    },
    users::records::UserUuid,
};
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use super::{CliError, render};

#[derive(Debug, Args)]
pub(crate) struct ProductCommand {
    #[command(subcommand)]
    command: ProductSubcommand,
}

#[derive(Debug, Subcommand)]
enum ProductSubcommand {
    /// List a new product for sale
    Create(CreateProductArgs),

    /// Show a product in any status
    Get {
        #[arg(long)]
        product: Uuid,
    },

    /// Search active products
    List(ListProductsArgs),

    /// Change the price of a listing; cart lines keep their captured price
    UpdatePrice {
        #[arg(long)]
        seller: Uuid,

        #[arg(long)]
        product: Uuid,

        #[arg(long)]
        price: Decimal,
    },

    /// Withdraw a listing without deleting it
    Delist {
        #[arg(long)]
        seller: Uuid,

        #[arg(long)]
        product: Uuid,
    },

    /// Record a listing as sold
    Sold {
        #[arg(long)]
        product: Uuid,
    },

    /// Permanently delete a listing and every cart line holding it
    Purge {
        #[arg(long)]
        product: Uuid,
    },
}

#[derive(Debug, Args)]
struct CreateProductArgs {
    #[arg(long)]
    seller: Uuid,

    #[arg(long)]
    title: String,

    #[arg(long)]
    price: Decimal,

    /// One of: Electronics, Clothing, Books, "Home & Garden", Sports, Toys, Vehicles, Other
    #[arg(long)]
    category: Category,

    /// One of: New, "Like New", Good, Fair, Poor
    #[arg(long)]
    condition: Condition,

    #[arg(long)]
    description: Option<String>,

    #[arg(long)]
    quantity: Option<u32>,

    #[arg(long)]
    brand: Option<String>,

    #[arg(long)]
    manufacture_year: Option<i16>,

    #[arg(long)]
    image_url: Option<String>,
}

#[derive(Debug, Args)]
struct ListProductsArgs {
    #[arg(long)]
    category: Option<Category>,

    #[arg(long)]
    condition: Option<Condition>,

    #[arg(long)]
    min_price: Option<Decimal>,

    #[arg(long)]
    max_price: Option<Decimal>,

    /// Case-insensitive match on title or description
    #[arg(long)]
    search: Option<String>,

    #[arg(long)]
    seller: Option<Uuid>,

    #[arg(long)]
    limit: Option<i64>,

    #[arg(long)]
    offset: Option<i64>,
}

impl From<CreateProductArgs> for NewProduct {
    fn from(args: CreateProductArgs) -> Self {
        Self {
            uuid: ProductUuid::new(),
            title: args.title,
            description: args.description,
            category: args.category,
            price: args.price,
            quantity: args.quantity,
            condition: args.condition,
            attributes: ProductAttributes {
                brand: args.brand,
                manufacture_year: args.manufacture_year,
                ..ProductAttributes::default()
            },
            image_url: args.image_url,
        }
    }
}

impl From<ListProductsArgs> for ProductFilter {
    fn from(args: ListProductsArgs) -> Self {
        Self {
            category: args.category,
            condition: args.condition,
            min_price: args.min_price,
            max_price: args.max_price,
            search: args.search,
            seller: args.seller.map(UserUuid::from_uuid),
            limit: args.limit,
            offset: args.offset,
        }
    }
}

pub(crate) async fn run(command: ProductCommand, ctx: &AppContext) -> Result<String, CliError> {
    match command.command {
        ProductSubcommand::Create(args) => {
            let seller = UserUuid::from_uuid(args.seller);

            render(&ctx.products.create_product(seller, args.into()).await?)
        }
        ProductSubcommand::Get { product } => {
            render(&ctx.products.get_product(ProductUuid::from_uuid(product)).await?)
        }
        ProductSubcommand::List(args) => render(&ctx.products.list_products(args.into()).await?),
        ProductSubcommand::UpdatePrice {
            seller,
            product,
            price,
        } => {
            let updated = ctx
                .products
                .update_product(
                    UserUuid::from_uuid(seller),
                    ProductUuid::from_uuid(product),
                    ProductUpdate::price(price),
                )
                .await?;

            render(&updated)
        }
        ProductSubcommand::Delist { seller, product } => {
            let delisted = ctx
                .products
                .delist_product(UserUuid::from_uuid(seller), ProductUuid::from_uuid(product))
                .await?;

            render(&delisted)
        }
        ProductSubcommand::Sold { product } => {
            render(&ctx.products.mark_sold(ProductUuid::from_uuid(product)).await?)
        }
        ProductSubcommand::Purge { product } => {
            ctx.products
                .purge_product(ProductUuid::from_uuid(product))
                .await?;

            render(&json!({ "purged": product }))
        }
    }
}
