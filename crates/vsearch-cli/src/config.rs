//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── vector: VectorSearchConfig       # Project, index, endpoint, failure policy
//! ├── http: ReqwestConfig              # Timeout, user agent, API endpoint
//! ├── embedding: VertexEmbedderConfig  # Model and dimensionality
//! ├── access_token / store_path
//! └── command: Command                 # index | query
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use vsearch_core::Restriction;
use vsearch_reqwest::{ReqwestConfig, VertexEmbedderConfig};
use vsearch_vector::{DEFAULT_K, VectorSearchConfig};

use crate::TRACING_TARGET_CONFIG;

/// Default location of the local document store.
pub const DEFAULT_STORE_PATH: &str = "vsearch-documents.json";

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "vsearch")]
#[command(about = "Index and query documents in a managed vector-search index")]
#[command(version)]
pub struct Cli {
    /// Vector search deployment configuration.
    #[clap(flatten)]
    pub vector: VectorSearchConfig,

    /// HTTP client configuration.
    #[clap(flatten)]
    pub http: ReqwestConfig,

    /// Text embedding model configuration.
    #[clap(flatten)]
    pub embedding: VertexEmbedderConfig,

    /// Credentials and local storage.
    #[clap(flatten)]
    pub session: SessionConfig,

    /// Operation to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Credentials and local document storage.
#[derive(Debug, Clone, Args)]
pub struct SessionConfig {
    /// OAuth bearer token for the index and embedding APIs
    #[arg(long = "access-token", env = "VSEARCH_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: String,

    /// JSON file holding indexed documents
    #[arg(long = "store-path", env = "VSEARCH_STORE_PATH", default_value = DEFAULT_STORE_PATH)]
    pub store_path: PathBuf,
}

/// Operations exposed by the binary.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Index documents from a JSON array or JSON-lines file.
    Index {
        /// File of `{"content": ..., "metadata": {...}}` documents
        file: PathBuf,
    },
    /// Print the documents nearest to a query as JSON lines.
    Query {
        /// Query text
        text: String,

        /// Number of neighbours to request
        #[arg(short = 'k', long = "k", default_value_t = DEFAULT_K)]
        k: u32,

        /// Token restrict, `namespace=allow1,allow2` or `namespace!=deny1,deny2`
        #[arg(long = "restrict", value_parser = parse_restrict)]
        restricts: Vec<Restriction>,
    },
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Initializes tracing on stderr with environment-based filtering.
    ///
    /// Stdout is reserved for query results.
    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    /// Logs the effective configuration without secrets.
    pub fn log_config(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            project_id = %self.vector.project_id,
            location = %self.vector.location,
            index = %self.vector.vector_search_options.index,
            index_endpoint = %self.vector.vector_search_options.index_endpoint,
            deployed_index_id = %self.vector.vector_search_options.deployed_index_id,
            failure_policy = %self.vector.failure_policy,
            embedding_model = %self.embedding.model,
            http_timeout_secs = self.http.http_timeout,
            store_path = %self.session.store_path.display(),
            "configuration loaded"
        );
    }
}

/// Parses `namespace=a,b` into an allow restrict and `namespace!=a,b` into a deny restrict.
fn parse_restrict(value: &str) -> Result<Restriction, String> {
    let (namespace, tokens, deny) = match value.split_once("!=") {
        Some((namespace, tokens)) => (namespace, tokens, true),
        None => match value.split_once('=') {
            Some((namespace, tokens)) => (namespace, tokens, false),
            None => return Err(format!("expected `namespace=tokens`, got `{value}`")),
        },
    };

    let namespace = namespace.trim();
    if namespace.is_empty() {
        return Err(format!("missing namespace in `{value}`"));
    }

    let tokens: Vec<&str> = tokens
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect();
    if tokens.is_empty() {
        return Err(format!("no tokens in `{value}`"));
    }

    let restrict = Restriction::new(namespace);
    Ok(if deny {
        restrict.deny(tokens)
    } else {
        restrict.allow(tokens)
    })
}
