//! CLI entry and dispatch.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use foodshare_core::api::ApiClient;
use foodshare_core::config::Config;
use foodshare_core::session::SessionStore;

mod commands;

#[derive(Parser)]
#[command(name = "foodshare")]
#[command(version = "0.1")]
#[command(about = "FoodShare surplus-food sharing client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Sign in to the FoodShare service
    Login {
        /// Account email
        #[arg(long)]
        email: String,

        /// Account password
        #[arg(long)]
        password: String,
    },

    /// Create an account and sign in
    Register {
        /// Display name
        #[arg(long)]
        name: String,

        /// Account email
        #[arg(long)]
        email: String,

        /// Contact phone number
        #[arg(long)]
        phone: String,

        /// Account password (at least 6 characters)
        #[arg(long)]
        password: String,

        /// Account role
        #[arg(long, value_parser = ["donor", "receiver", "both"], default_value = "both")]
        role: String,

        /// Pickup address
        #[arg(long)]
        address: Option<String>,

        /// Pickup area pincode
        #[arg(long)]
        pincode: Option<String>,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in account
    Whoami,

    /// Browse and manage food listings
    Listings {
        #[command(subcommand)]
        command: ListingsCommands,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ListingsCommands {
    /// List surplus food near the account's location
    Nearby,

    /// Publish a listing
    Create {
        /// Short title, e.g. "Fresh Homemade Pasta"
        #[arg(long)]
        title: String,

        /// Category, e.g. "meals" or "vegetables"
        #[arg(long)]
        category: String,

        /// Quantity description, e.g. "4 servings"
        #[arg(long)]
        quantity: String,

        /// Longer description
        #[arg(long)]
        description: Option<String>,

        /// Pickup address
        #[arg(long)]
        address: Option<String>,
    },

    /// Claim a listing
    Claim {
        /// The ID of the listing to claim
        #[arg(value_name = "LISTING_ID")]
        id: String,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Config { command } => match command {
            ConfigCommands::Path => commands::config::path(),
            ConfigCommands::Init => commands::config::init(),
        },
        command => {
            let config = Config::load().context("load config")?;
            let store = Arc::new(SessionStore::with_default_storage());
            store.restore();
            let api =
                ApiClient::new(&config.api, Arc::clone(&store)).context("create API client")?;
            tracing::debug!(base_url = %api.base_url(), "using FoodShare service");

            match command {
                Commands::Login { email, password } => {
                    commands::auth::login(&store, &api, email, password).await
                }
                Commands::Register {
                    name,
                    email,
                    phone,
                    password,
                    role,
                    address,
                    pincode,
                } => {
                    commands::auth::register(
                        &store,
                        &api,
                        commands::auth::RegisterArgs {
                            name,
                            email,
                            phone,
                            password,
                            role,
                            address,
                            pincode,
                        },
                    )
                    .await
                }
                Commands::Logout => commands::auth::logout(&store),
                Commands::Whoami => commands::auth::whoami(&store),
                Commands::Listings { command } => match command {
                    ListingsCommands::Nearby => commands::listings::nearby(&api).await,
                    ListingsCommands::Create {
                        title,
                        category,
                        quantity,
                        description,
                        address,
                    } => {
                        commands::listings::create(
                            &api,
                            commands::listings::CreateArgs {
                                title,
                                category,
                                quantity,
                                description,
                                address,
                            },
                        )
                        .await
                    }
                    ListingsCommands::Claim { id } => commands::listings::claim(&api, &id).await,
                },
                Commands::Config { .. } => unreachable!("handled above"),
            }
        }
    }
}
