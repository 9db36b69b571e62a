use clap::{Parser, Subcommand};
use skin_advisor::Result;
use skin_advisor::commands::{chat_repl, recommend, run_ingest, search, serve, show_status};
use skin_advisor::config::{run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "skin-advisor")]
#[command(about = "Retrieval-augmented skincare advisory service")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection and settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Load the product catalog and condition profiles and compute embeddings
    Ingest {
        /// Drop and recreate the vector tables before ingesting
        #[arg(long)]
        rebuild: bool,
        /// Only ingest the product catalog
        #[arg(long)]
        products_only: bool,
        /// Only ingest the skin condition profiles
        #[arg(long)]
        conditions_only: bool,
    },
    /// Semantic search over the indexed collections
    Search {
        /// Free-text query
        query: String,
        /// Collection to search: products, conditions, or all
        #[arg(long, default_value = "products")]
        collection: String,
        /// Number of results to return
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Recommend products for skin concerns
    Recommend {
        /// Concern names, e.g. acne redness
        concerns: Vec<String>,
        /// Recommend for a stored skin condition profile instead
        #[arg(long)]
        condition: Option<String>,
    },
    /// Interactive chat with the advisor
    Chat,
    /// Start the HTTP API server
    Serve,
    /// Show item counts and provider health
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Ingest {
            rebuild,
            products_only,
            conditions_only,
        } => {
            run_ingest(rebuild, products_only, conditions_only).await?;
        }
        Commands::Search {
            query,
            collection,
            top_k,
        } => {
            search(query, collection, top_k).await?;
        }
        Commands::Recommend {
            concerns,
            condition,
        } => {
            recommend(concerns, condition).await?;
        }
        Commands::Chat => {
            chat_repl().await?;
        }
        Commands::Serve => {
            serve().await?;
        }
        Commands::Status => {
            show_status().await?;
        }
    }

    Ok(())
}
