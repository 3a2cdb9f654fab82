use clap::Parser;
use contextdb_core::{config, HnswIndex, MetadataStore, VectorStore};
use contextdb_server::api;
use contextdb_server::api::handlers::AppState;
use contextdb_server::cli;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Unified entry point: `--cmd` runs a single CLI command and exits,
/// otherwise the HTTP server starts on `--addr`.
#[derive(Parser)]
#[command(name = "context-db", about = "Embeddable semantic-retrieval engine")]
struct Args {
    /// Listen address (e.g. 127.0.0.1:8080). Defaults to :8080 when
    /// empty and --cmd is unset.
    #[arg(long, default_value = "")]
    addr: String,

    /// Single-shot command: ingest_message | ingest_document | retrieve
    #[arg(long, default_value = "")]
    cmd: String,

    /// Data directory holding vectors.bin and metadata.db
    #[arg(long, default_value = "data", env = "VOX_DATA_DIR")]
    data: String,

    /// Vector dimension
    #[arg(long, default_value_t = 1536, env = "VOX_DIM")]
    dim: usize,

    /// JSON input payload for CLI mode (stdin when empty)
    #[arg(long, default_value = "")]
    input: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    std::fs::create_dir_all(&args.data)?;
    let data_dir = Path::new(&args.data);

    let vectors = Arc::new(VectorStore::open(
        data_dir.join(config::VECTORS_FILENAME),
        args.dim,
    )?);
    let metadata = Arc::new(MetadataStore::open(data_dir.join(config::METADATA_FILENAME))?);

    if !args.cmd.is_empty() {
        return cli::run(&args.cmd, &args.input, vectors, metadata);
    }

    // The ANN graph is in-memory only; rebuild it by replaying the store
    // in append order.
    let index = Arc::new(HnswIndex::new(Arc::clone(&vectors)));
    let indexed = index.rebuild()?;
    tracing::info!(indexed, "index rebuilt from vector store");

    let state = AppState::new(vectors, metadata, index);
    let app = api::create_router(state);

    let addr = normalize_addr(if args.addr.is_empty() {
        config::DEFAULT_ADDR
    } else {
        &args.addr
    });
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, data = %args.data, dim = args.dim, "context-db listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_signal())
        .await?;

    tracing::info!("shut down cleanly");
    Ok(())
}

/// Go-style `:8080` shorthand binds all interfaces.
fn normalize_addr(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    }
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received SIGINT"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }

    tracing::info!("shutting down, draining in-flight requests...");
}
