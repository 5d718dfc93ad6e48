//! Code execution server: forwards non-JavaScript runs to Piston and AI
//! completion prompts to a generative-text API.

mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::Router;
use clap::Parser;
use codenova::io::config::RemoteConfig;
use codenova::io::remote::PistonClient;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::state::{AppState, CompletionConfig};

const DEFAULT_COMPLETION_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent";

#[derive(Parser)]
#[command(name = "codenova-server")]
#[command(about = "HTTP endpoint for remote code execution and AI completion")]
struct Args {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value = "3001")]
    port: u16,

    /// Base URL of the Piston API (without `/execute`)
    #[arg(long, default_value = "https://emkc.org/api/v2/piston")]
    piston_url: String,

    /// Piston request timeout in seconds (0 = client default)
    #[arg(long, default_value = "0")]
    piston_timeout_secs: u64,

    /// Generative-text endpoint for `/api/ai/completion`
    #[arg(long, default_value = DEFAULT_COMPLETION_URL)]
    completion_url: String,

    /// Directory containing UI static files
    #[arg(long)]
    ui_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("codenova_server=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let remote = RemoteConfig {
        api_base: args.piston_url,
        timeout_secs: args.piston_timeout_secs,
    };
    let piston = PistonClient::new(&remote)?;
    info!(url = piston.execute_url(), "forwarding runs to piston");

    let api_key = std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty());
    if api_key.is_none() {
        warn!("GEMINI_API_KEY not set, /api/ai/completion will fail");
    }
    let state = AppState::new(
        piston,
        CompletionConfig {
            url: args.completion_url,
            api_key,
        },
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .nest("/api", routes::api_router())
        .layer(cors)
        .with_state(state);

    if let Some(ui_dir) = args.ui_dir {
        if ui_dir.exists() {
            info!(ui_dir = %ui_dir.display(), "serving static UI files");
            app = app
                .fallback_service(ServeDir::new(ui_dir).append_index_html_on_directories(true));
        } else {
            warn!(ui_dir = %ui_dir.display(), "UI directory not found, API-only mode");
        }
    }

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
