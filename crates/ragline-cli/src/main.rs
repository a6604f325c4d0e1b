//! ragline: command-line front end for the hybrid retrieval engine.
//!
//! Backends are configured from the environment (a `.env` file is loaded
//! if present). See `ragline --help` for the available commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use ragline_backends::{ElasticsearchBackend, OllamaEmbedder, QdrantStore, RedisCache};
use ragline_core::{defaults, EmbeddingBackend, LexicalBackend, VectorStore};
use ragline_search::{
    spawn_refresh, CacheConfig, HybridRetrieval, HybridRetriever, IngestDocument, Indexer,
    RefreshEvent, ResultCache, RetrieverConfig,
};

#[derive(Parser)]
#[command(name = "ragline")]
#[command(author, version, about = "Hybrid vector + lexical retrieval")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a hybrid query and print the fused results
    Query {
        /// Query text
        text: String,

        /// Number of results to return
        #[arg(short = 'k', long, default_value_t = 5)]
        top_k: usize,

        /// Bypass the result cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Chunk, embed and index a text file
    Ingest {
        /// File to ingest
        file: PathBuf,

        /// Document title (defaults to the file name)
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Rebuild the lexical fallback snapshot and print the health report
    Refresh {
        /// Keep refreshing on this interval (seconds) until interrupted
        #[arg(long)]
        watch: Option<u64>,
    },
}

/// Backends shared by every command.
struct Backends {
    embedder: Arc<dyn EmbeddingBackend>,
    vectors: Arc<dyn VectorStore>,
    lexical: Arc<dyn LexicalBackend>,
}

impl Backends {
    fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            embedder: Arc::new(OllamaEmbedder::from_env()?),
            vectors: Arc::new(QdrantStore::from_env()?),
            lexical: Arc::new(ElasticsearchBackend::from_env()?),
        })
    }

    async fn retriever(&self) -> anyhow::Result<HybridRetriever> {
        let redis = RedisCache::from_env().await;
        let cache = if redis.is_connected() {
            ResultCache::new(Arc::new(redis), CacheConfig::from_env())
        } else {
            ResultCache::disabled()
        };

        let retriever = HybridRetriever::new(
            self.embedder.clone(),
            self.vectors.clone(),
            Some(self.lexical.clone()),
            cache,
            RetrieverConfig::from_env(),
        )?;
        Ok(retriever)
    }
}

/// Initialize tracing.
///
/// Environment variables:
///   RAGLINE_LOG_FORMAT - "json" or "text" (default: "text")
///   RAGLINE_LOG_FILE   - path to log file (optional, enables file logging)
///   RUST_LOG           - standard env filter (default: "ragline=info,ragline_search=info,...")
///
/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_format = std::env::var("RAGLINE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("RAGLINE_LOG_FILE").ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "ragline=info,ragline_search=info,ragline_backends=info".into()
    });
    let registry = tracing_subscriber::registry().with(env_filter);

    if let Some(ref path) = log_file {
        let file_dir = Path::new(path).parent().unwrap_or(Path::new("."));
        let file_name = Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("ragline.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(non_blocking),
                )
                .init();
        }
        Some(guard)
    } else if log_format == "json" {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
        None
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
        None
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let _file_guard = init_tracing();

    let cli = Cli::parse();
    let backends = Backends::from_env()?;

    match cli.command {
        Commands::Query {
            text,
            top_k,
            no_cache,
        } => cmd_query(&backends, &text, top_k, !no_cache).await,
        Commands::Ingest { file, title } => cmd_ingest(&backends, &file, title).await,
        Commands::Refresh { watch } => cmd_refresh(&backends, watch).await,
    }
}

async fn cmd_query(
    backends: &Backends,
    text: &str,
    top_k: usize,
    use_cache: bool,
) -> anyhow::Result<()> {
    let retriever = backends.retriever().await?;
    if let Err(e) = retriever.initialize().await {
        warn!(error = %e, "Fallback snapshot unavailable");
    }

    let results = retriever.retrieve(text, top_k, use_cache).await?;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

async fn cmd_ingest(backends: &Backends, file: &Path, title: Option<String>) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let title = title.or_else(|| {
        file.file_name()
            .and_then(|f| f.to_str())
            .map(str::to_string)
    });
    let file_type = file
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("text")
        .to_lowercase();

    let mut document = IngestDocument::new(content).with_file_type(file_type);
    if let Some(title) = title {
        document = document.with_title(title);
    }

    let indexer = Indexer::new(
        backends.embedder.clone(),
        backends.vectors.clone(),
        Some(backends.lexical.clone()),
    );
    let report = indexer.ingest(document).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn cmd_refresh(backends: &Backends, watch: Option<u64>) -> anyhow::Result<()> {
    let retriever = Arc::new(backends.retriever().await?);

    let Some(interval_secs) = watch else {
        let outcome = retriever.initialize().await?;
        let output = serde_json::json!({
            "outcome": outcome,
            "health": retriever.health(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    };

    let interval = Duration::from_secs(if interval_secs == 0 {
        defaults::REFRESH_INTERVAL_SECS
    } else {
        interval_secs
    });
    let handle = spawn_refresh(retriever.clone(), interval);
    let mut events = handle.events();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received, stopping refresh");
                break;
            }
            event = events.recv() => match event {
                Ok(RefreshEvent::Refreshed { documents }) => {
                    info!(document_count = documents, "Fallback snapshot refreshed");
                }
                Ok(RefreshEvent::Failed { error }) => {
                    warn!(error = %error, "Refresh failed");
                }
                Ok(RefreshEvent::Stopped) | Err(RecvError::Closed) => break,
                Ok(_) | Err(RecvError::Lagged(_)) => {}
            },
        }
    }

    handle.shutdown().await?;
    println!("{}", serde_json::to_string_pretty(&retriever.health())?);
    Ok(())
}
