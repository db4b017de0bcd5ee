//! # hub-cli
//!
//! Product catalogue front end for model-hub.
//!
//! ## Commands
//!
//! - `list`: Fetch every product
//! - `get`: Read one product with a fetch strategy
//! - `create`: Create a product
//! - `update`: Edit a product and send it whole
//! - `patch`: Edit a product and send only what changed
//! - `delete`: Delete a product
//!
//! ## Example
//!
//! ```bash
//! # Against a REST server
//! hub-cli --base-url http://localhost:3000 list
//!
//! # Change one field
//! hub-cli patch 3 --price 175
//!
//! # Offline, against the built-in demo catalogue
//! hub-cli --mock get 1
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hub_client::{FetchStrategy, HubConfig, HubRegistry, MockTransport};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod commands;
mod demo;
mod product;

use commands::{create, delete, get, list, patch, update};
use product::{Product, ProductFields};

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG: &str = "hub.toml";

/// Product catalogue front end for model-hub.
#[derive(Parser, Debug)]
#[command(name = "hub-cli")]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML configuration file (default: ./hub.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the API base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Serve a built-in demo catalogue instead of calling a server
    #[arg(long, global = true)]
    mock: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// List every product
    List,

    /// Show one product
    Get {
        /// Product id
        id: String,

        /// store-then-api, fetch-from-store or fetch-from-api
        #[arg(long, short, default_value = "store-then-api")]
        strategy: FetchStrategy,
    },

    /// Create a product
    Create {
        #[command(flatten)]
        fields: ProductFields,
    },

    /// Edit a product and send it whole
    Update {
        /// Product id
        id: String,

        #[command(flatten)]
        fields: ProductFields,
    },

    /// Edit a product and send only the changed fields
    Patch {
        /// Product id
        id: String,

        #[command(flatten)]
        fields: ProductFields,
    },

    /// Delete a product
    Delete {
        /// Product id
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref(), cli.base_url.as_deref())?;
    tracing::debug!(base_url = %config.api.base_url, mock = cli.mock, "starting");

    let registry = if cli.mock {
        let transport = MockTransport::new();
        demo::seed(&transport, &cli.command)?;
        HubRegistry::new(config, transport)
    } else {
        HubRegistry::http(config).context("Failed to create HTTP client")?
    };
    registry.register::<Product>();

    match cli.command {
        Commands::List => {
            list::run(&registry).await?;
        }
        Commands::Get { id, strategy } => {
            get::run(&registry, &id, strategy).await?;
        }
        Commands::Create { fields } => {
            create::run(&registry, &fields).await?;
        }
        Commands::Update { id, fields } => {
            if fields.is_empty() {
                anyhow::bail!("Nothing to update: give at least one field");
            }
            update::run(&registry, &id, &fields).await?;
        }
        Commands::Patch { id, fields } => {
            if fields.is_empty() {
                anyhow::bail!("Nothing to patch: give at least one field");
            }
            patch::run(&registry, &id, &fields).await?;
        }
        Commands::Delete { id } => {
            delete::run(&registry, &id).await?;
        }
    }

    Ok(())
}

/// Resolve configuration from `--config`, `./hub.toml` or defaults, then
/// apply `--base-url`.
fn load_config(path: Option<&Path>, base_url: Option<&str>) -> Result<HubConfig> {
    let config = match path {
        Some(path) => HubConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG).exists() => {
            HubConfig::from_file(Path::new(DEFAULT_CONFIG)).context("Failed to load hub.toml")?
        }
        None => HubConfig::default(),
    };

    Ok(match base_url {
        Some(url) => config.with_base_url(url),
        None => config,
    })
}
