#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod store;

use std::io::Write;
use std::path::Path;
use std::process;
use std::sync::Arc;

use anyhow::Context;
use vsearch_core::{Document, Restriction, StaticTokenProvider, TokenProvider};
use vsearch_reqwest::{ReqwestClient, VertexEmbedder, VertexIndexClient};
use vsearch_vector::{Collaborators, IndexerOptions, RetrieverOptions, VectorSearch};

use crate::config::{Cli, Command};
use crate::store::JsonFileStore;

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "vsearch_cli::startup";
pub const TRACING_TARGET_CONFIG: &str = "vsearch_cli::config";
pub const TRACING_TARGET_COMMAND: &str = "vsearch_cli::command";
pub const TRACING_TARGET_STORE: &str = "vsearch_cli::store";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_STARTUP,
            error = %error,
            "command failed"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    Cli::init_tracing();
    log_startup_info();
    cli.log_config();

    cli.vector
        .validate_config()
        .context("invalid vector search configuration")?;

    let store = JsonFileStore::open(&cli.session.store_path, cli.vector.document_id_field())
        .await
        .context("failed to open document store")?;
    let search = create_service(&cli, Arc::new(store))?;

    match cli.command {
        Command::Index { file } => index(&search, &file).await,
        Command::Query { text, k, restricts } => query(&search, text, k, restricts).await,
    }
}

/// Wires the HTTP collaborators and the document store into the service.
fn create_service(cli: &Cli, store: Arc<JsonFileStore>) -> anyhow::Result<VectorSearch> {
    let client = ReqwestClient::new(cli.http.clone()).context("failed to create HTTP client")?;
    let tokens: Arc<dyn TokenProvider> =
        Arc::new(StaticTokenProvider::new(cli.session.access_token.clone()));

    let embedder = VertexEmbedder::new(
        client.clone(),
        tokens.clone(),
        cli.vector.project_id.clone(),
        cli.vector.location.clone(),
        cli.embedding.clone(),
    );

    let collaborators = Collaborators {
        embedder: Arc::new(embedder),
        token_provider: tokens.clone(),
        index_service: Arc::new(VertexIndexClient::new(client.clone(), tokens)),
        neighbor_search: Arc::new(client),
        document_indexer: store.clone(),
        document_retriever: store,
    };

    VectorSearch::new(cli.vector.clone(), collaborators)
        .context("failed to create vector search service")
}

/// Indexes every document in `file`.
async fn index(search: &VectorSearch, file: &Path) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let documents = parse_documents(&content)
        .with_context(|| format!("failed to parse {}", file.display()))?;

    tracing::info!(
        target: TRACING_TARGET_COMMAND,
        file = %file.display(),
        documents = documents.len(),
        "indexing documents"
    );

    search
        .index(&documents, IndexerOptions::default())
        .await
        .context("indexing failed")?;

    tracing::info!(
        target: TRACING_TARGET_COMMAND,
        documents = documents.len(),
        "indexing finished"
    );

    Ok(())
}

/// Prints the documents nearest to `text` as JSON lines on stdout.
async fn query(
    search: &VectorSearch,
    text: String,
    k: u32,
    restricts: Vec<Restriction>,
) -> anyhow::Result<()> {
    let options = RetrieverOptions {
        k,
        restricts,
        ..RetrieverOptions::default()
    };

    let documents = search
        .retrieve(&Document::text(text), options)
        .await
        .context("query failed")?;

    tracing::info!(
        target: TRACING_TARGET_COMMAND,
        k,
        matches = documents.len(),
        "query finished"
    );

    let mut stdout = std::io::stdout().lock();
    for document in &documents {
        serde_json::to_writer(&mut stdout, document)?;
        writeln!(stdout)?;
    }
    stdout.flush()?;

    Ok(())
}

/// Reads documents from a JSON array or from JSON lines.
fn parse_documents(content: &str) -> anyhow::Result<Vec<Document>> {
    if content.trim_start().starts_with('[') {
        return Ok(serde_json::from_str(content)?);
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(number, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("invalid document on line {}", number + 1))
        })
        .collect()
}

/// Logs startup information.
fn log_startup_info() {
    tracing::debug!(
        target: TRACING_TARGET_STARTUP,
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        features = ?enabled_features(),
        "starting vsearch"
    );
}

/// Returns a list of enabled compile-time features.
fn enabled_features() -> Vec<&'static str> {
    [cfg!(feature = "dotenv").then_some("dotenv")]
        .into_iter()
        .flatten()
        .collect()
}
