//! Mercato CLI - drive the client core against a live backend.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (the session persists in MERCATO_STORAGE_DIR)
//! mercato login admin@example.com --password secret
//!
//! # Browse the catalog
//! mercato products list --page 2 --category Audio --sort price-low
//!
//! # Admin product management
//! mercato products add --name Lamp --price 39.90 --category Home
//! mercato products update 65f1c0a2 --stock 12
//!
//! # Check whether the current session may open a view
//! mercato guard /admin/products
//! ```
//!
//! # Commands
//!
//! - `login`, `register`, `logout`, `whoami` - Session management
//! - `products` - Catalog listing, detail and admin CRUD
//! - `users list` - Admin user directory
//! - `theme` - Light/dark preference
//! - `guard` - Navigation guard preview

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use mercato_client::catalog::SortKey;
use mercato_client::config::ClientConfig;
use mercato_client::state::AppContext;
use mercato_client::theme::Theme;
use mercato_core::{Money, ProductId};
use secrecy::SecretString;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "mercato")]
#[command(author, version, about = "Mercato storefront client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with an email or username
    Login {
        /// Email address or username
        identifier: String,

        #[arg(short, long, env = "MERCATO_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "MERCATO_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out the current session
    Logout,
    /// Show the signed-in identity
    Whoami,
    /// Browse and manage products
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Admin user directory
    Users {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Theme preference
    Theme {
        #[command(subcommand)]
        action: ThemeAction,
    },
    /// Check whether the current session may open a view
    Guard {
        /// View path, e.g. `/admin/dashboard`
        path: String,
    },
}

#[derive(Subcommand)]
enum ProductAction {
    /// List one catalog page
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Page size (defaults to `MERCATO_PAGE_SIZE`)
        #[arg(long)]
        limit: Option<u32>,

        #[arg(long)]
        category: Option<String>,

        /// name, price-low, price-high or rating
        #[arg(long, default_value = "name")]
        sort: SortKey,

        #[arg(long)]
        search: Option<String>,

        #[arg(long)]
        min_price: Option<Money>,

        #[arg(long)]
        max_price: Option<Money>,
    },
    /// Show one product
    Show { id: String },
    /// Create a product (admin)
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        price: Money,

        #[arg(long)]
        category: String,

        #[arg(long, default_value_t = 0)]
        stock: u32,

        #[arg(long, default_value = "")]
        image: String,

        #[arg(long, default_value = "")]
        description: String,
    },
    /// Update some fields of a product (admin)
    Update {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        price: Option<Money>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        stock: Option<u32>,

        #[arg(long)]
        image: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a product (admin)
    Delete { id: String },
}

#[derive(Subcommand)]
enum UserAction {
    /// List accounts, optionally filtered by username or email
    List {
        #[arg(long, default_value = "")]
        search: String,
    },
}

#[derive(Subcommand)]
enum ThemeAction {
    /// Print the current theme
    Show,
    /// Switch between light and dark
    Toggle,
    /// Set the theme
    Set { theme: Theme },
}

#[tokio::main]
async fn main() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "mercato=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = ClientConfig::from_env()?;
    let ctx = AppContext::from_config(config)?;

    match cli.command {
        Commands::Login {
            identifier,
            password,
        } => commands::auth::login(&ctx, &identifier, &SecretString::from(password)).await?,
        Commands::Register {
            username,
            email,
            password,
        } => {
            commands::auth::register(&ctx, &username, &email, &SecretString::from(password))
                .await?;
        }
        Commands::Logout => commands::auth::logout(&ctx).await?,
        Commands::Whoami => commands::auth::whoami(&ctx),
        Commands::Products { action } => match action {
            ProductAction::List {
                page,
                limit,
                category,
                sort,
                search,
                min_price,
                max_price,
            } => {
                let filters = commands::products::ListFilters {
                    category,
                    sort,
                    search,
                    min_price,
                    max_price,
                };
                let limit = limit.unwrap_or(ctx.config().page_size);
                commands::products::list(&ctx, page, limit, filters).await?;
            }
            ProductAction::Show { id } => {
                commands::products::show(&ctx, &ProductId::new(id)).await?;
            }
            ProductAction::Add {
                name,
                price,
                category,
                stock,
                image,
                description,
            } => {
                let draft = mercato_client::models::ProductDraft {
                    name,
                    price,
                    category,
                    stock,
                    image,
                    description,
                };
                commands::products::add(&ctx, &draft).await?;
            }
            ProductAction::Update {
                id,
                name,
                price,
                category,
                stock,
                image,
                description,
            } => {
                let patch = mercato_client::models::ProductPatch {
                    name,
                    price,
                    category,
                    stock,
                    image,
                    description,
                };
                commands::products::update(&ctx, &ProductId::new(id), &patch).await?;
            }
            ProductAction::Delete { id } => {
                commands::products::delete(&ctx, &ProductId::new(id)).await?;
            }
        },
        Commands::Users { action } => match action {
            UserAction::List { search } => commands::users::list(&ctx, &search).await?,
        },
        Commands::Theme { action } => match action {
            ThemeAction::Show => commands::theme::show(&ctx),
            ThemeAction::Toggle => commands::theme::toggle(&ctx),
            ThemeAction::Set { theme } => commands::theme::set(&ctx, theme),
        },
        Commands::Guard { path } => commands::guard::check(&ctx, &path),
    }
    Ok(())
}
