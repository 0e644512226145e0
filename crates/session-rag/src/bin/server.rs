//! Session RAG server binary
//!
//! Run with: cargo run -p session-rag --bin session-rag-server -- --config session-rag.toml

use clap::Parser;
use session_rag::{config::RagConfig, server::RagServer};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "session-rag-server", version, about = "Session-scoped RAG backend")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "SESSION_RAG_CONFIG")]
    config: Option<PathBuf>,

    /// Override the bind host
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "session_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // Load configuration
    let mut config = RagConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Configuration loaded");
    tracing::info!("  - API: {}", config.llm.base_url);
    tracing::info!("  - Embedding model: {}", config.llm.embed_model);
    tracing::info!("  - Chat model: {}", config.llm.chat_model);
    tracing::info!(
        "  - Chunking: {} chars, {} overlap",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );

    let server = RagServer::new(config).await?;
    if !server.state().is_ready() {
        tracing::warn!("Set OPENAI_API_KEY to enable indexing and answers");
    }

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/embed  - Index a session's documents");
    println!("  POST /api/query  - Ask about a session's documents");
    println!("  POST /api/chat   - Chat without documents");
    println!("  POST /api/ask    - Ask, indexing first when needed");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
