use anyhow::{Context, Result};
use console::style;
use dialoguer::Input;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::advisor::{Advisor, RecommendationOutcome};
use crate::config::Config;
use crate::database::lancedb::vector_store::VectorStore;
use crate::database::lancedb::Collection;
use crate::database::sqlite::Database;
use crate::embeddings::OllamaClient;
use crate::generation::ChatClient;
use crate::ingest::{IngestOptions, Ingestor};
use crate::retrieval::Retriever;
use crate::server::run_server;

/// Wire the full pipeline together from config.
async fn build_advisor(config: &Config) -> Result<Advisor> {
    let database = Arc::new(
        Database::initialize(config)
            .await
            .context("Failed to initialize metadata database")?,
    );

    let store = Arc::new(
        VectorStore::new(config)
            .await
            .context("Failed to initialize vector store")?,
    );

    let embedder = Arc::new(
        OllamaClient::new(&config.ollama).context("Failed to initialize embedding client")?,
    );
    let generator =
        Arc::new(ChatClient::new(&config.ollama).context("Failed to initialize chat client")?);

    let retriever = Retriever::new(embedder, store);
    Ok(Advisor::new(
        retriever,
        generator,
        database,
        &config.retrieval,
    ))
}

/// Run the ingestion pipeline: catalog + condition profiles into the
/// metadata and vector stores.
#[inline]
pub async fn run_ingest(rebuild: bool, products_only: bool, conditions_only: bool) -> Result<()> {
    let config = Config::load()?;
    let ingestor = Ingestor::new(config)
        .await
        .context("Failed to initialize ingestor")?;

    let stats = ingestor
        .run(IngestOptions {
            rebuild,
            products_only,
            conditions_only,
        })
        .await?;

    println!("{}", style("Ingestion complete").bold().green());
    println!("  Products: {}", stats.products_ingested);
    println!("  Skin conditions: {}", stats.conditions_ingested);
    println!("  Embeddings computed: {}", stats.embeddings_computed);
    println!("  Embeddings reused from cache: {}", stats.embeddings_reused);

    Ok(())
}

fn parse_collections(name: &str) -> Result<Vec<Collection>> {
    match name {
        "products" => Ok(vec![Collection::Products]),
        "conditions" | "skin_conditions" => Ok(vec![Collection::SkinConditions]),
        "all" => Ok(Collection::ALL.to_vec()),
        other => Err(anyhow::anyhow!(
            "Unknown collection '{}' (expected products, conditions, or all)",
            other
        )),
    }
}

/// Ad-hoc semantic search over one or both collections.
#[inline]
pub async fn search(query: String, collection: String, top_k: Option<usize>) -> Result<()> {
    let config = Config::load()?;
    let collections = parse_collections(&collection)?;
    let top_k = top_k.unwrap_or(config.retrieval.search_top_k);

    let store = Arc::new(
        VectorStore::new(&config)
            .await
            .context("Failed to initialize vector store")?,
    );
    let embedder = Arc::new(
        OllamaClient::new(&config.ollama).context("Failed to initialize embedding client")?,
    );
    let retriever = Retriever::new(embedder, store);

    let outcome = retriever.retrieve(&query, &collections, top_k).await?;

    if outcome.results.is_empty() {
        println!("No matches found for '{}'.", query);
        return Ok(());
    }

    println!(
        "{}",
        style(format!("Top {} matches:", outcome.results.len())).bold()
    );
    for (i, result) in outcome.results.iter().enumerate() {
        println!(
            "{}. {} [{}] (similarity: {:.4})",
            i + 1,
            style(&result.name).cyan(),
            result.collection,
            result.similarity
        );
    }

    for failure in &outcome.failures {
        println!(
            "{}",
            style(format!(
                "⚠ Collection '{}' was unavailable: {}",
                failure.collection, failure.error
            ))
            .yellow()
        );
    }

    Ok(())
}

/// Product recommendations for named concerns or a stored skin
/// condition.
#[inline]
pub async fn recommend(concerns: Vec<String>, condition: Option<String>) -> Result<()> {
    let config = Config::load()?;
    let advisor = build_advisor(&config).await?;

    let payload = match condition {
        Some(condition_name) => advisor.recommend_for_condition(&condition_name).await?,
        None => advisor.recommend_for_concerns(&concerns).await?,
    };

    println!("{}", payload.render());

    if let RecommendationOutcome::Matches { products } = &payload.outcome {
        println!();
        for product in products {
            println!(
                "{}",
                style(format!(
                    "  {} (similarity: {:.4})",
                    product.name, product.similarity
                ))
                .dim()
            );
        }
    }

    Ok(())
}

/// Interactive terminal conversation with the advisor.
#[inline]
pub async fn chat_repl() -> Result<()> {
    let config = Config::load()?;
    let advisor = build_advisor(&config).await?;
    let session_id = Uuid::new_v4().to_string();

    println!(
        "{}",
        style("Skin advisor chat. Type 'exit' to leave.").bold().cyan()
    );

    loop {
        let message: String = Input::new().with_prompt("you").interact_text()?;
        let trimmed = message.trim();

        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
            break;
        }

        let outcome = advisor.answer(&session_id, trimmed).await?;

        println!();
        println!("{}", outcome.answer);

        if !outcome.sources.is_empty() {
            println!();
            println!("{}", style("Sources:").dim());
            for source in &outcome.sources {
                println!(
                    "{}",
                    style(format!("  - {} ({:.4})", source.label, source.similarity)).dim()
                );
            }
        }

        if !outcome.using_rag() {
            println!(
                "{}",
                style("(offline answer: retrieval is currently unavailable)").yellow()
            );
        }
        println!();
    }

    Ok(())
}

/// Start the HTTP server.
#[inline]
pub async fn serve() -> Result<()> {
    let config = Config::load()?;
    info!(
        "Starting advisor server on {}:{}",
        config.server.host, config.server.port
    );
    run_server(config).await
}

/// Show counts, provider reachability, and storage paths.
#[inline]
pub async fn show_status() -> Result<()> {
    let config = Config::load()?;

    println!("{}", style("📋 Advisor Status").bold().cyan());
    println!();

    let database = Database::initialize(&config)
        .await
        .context("Failed to open metadata database")?;
    println!("{}", style("Metadata:").bold().yellow());
    println!("  Products: {}", database.count_products().await?);
    println!(
        "  Skin conditions: {}",
        database.count_skin_conditions().await?
    );

    println!();
    println!("{}", style("Vectors:").bold().yellow());
    match VectorStore::new(&config).await {
        Ok(store) => {
            for collection in Collection::ALL {
                match store.count_embeddings(collection).await {
                    Ok(count) => println!("  {}: {}", collection, count),
                    Err(e) => println!("  {}: unavailable ({})", collection, e),
                }
            }
        }
        Err(e) => println!("  Vector store unavailable: {}", e),
    }

    println!();
    println!("{}", style("Providers:").bold().yellow());
    let embedder =
        OllamaClient::new(&config.ollama).context("Failed to initialize embedding client")?;
    match embedder.ping() {
        Ok(()) => println!("  Ollama: {}", style("reachable").green()),
        Err(e) => println!("  Ollama: {} ({:#})", style("unreachable").red(), e),
    }

    println!();
    println!(
        "Data directory: {}",
        style(config.get_base_dir().display()).dim()
    );

    Ok(())
}
