//! Shared application state for the HTTP server.

use std::sync::Arc;

use codenova::io::remote::PistonClient;

/// Where completion prompts are forwarded, and with which key.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub url: String,
    /// Read from `GEMINI_API_KEY` at startup; requests fail with 500 without it.
    pub api_key: Option<String>,
}

/// Shared state accessible from all request handlers.
///
/// Nothing here changes after startup; each request is independent.
#[derive(Clone)]
pub struct AppState {
    pub piston: Arc<PistonClient>,
    pub http: reqwest::Client,
    pub completion: Arc<CompletionConfig>,
}

impl AppState {
    pub fn new(piston: PistonClient, completion: CompletionConfig) -> Self {
        Self {
            piston: Arc::new(piston),
            http: reqwest::Client::new(),
            completion: Arc::new(completion),
        }
    }
}
