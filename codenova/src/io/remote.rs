//! Client for the Piston remote code-execution service.
//!
//! One request per run, no retries. A failure to obtain a well-formed answer
//! is a [`TransportFailure`]; a program that ran and failed is a normal
//! [`RunOutcome`] with a non-zero code.

use async_trait::async_trait;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::core::language::RemoteTarget;
use crate::core::normalize::RunOutcome;
use crate::io::config::RemoteConfig;

/// The service could not run the code.
#[derive(Debug, Error)]
pub enum TransportFailure {
    #[error("request to execution service failed: {0}")]
    Network(String),
    #[error("execution service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response from execution service: {0}")]
    Malformed(String),
}

/// Runs source text on a remote runtime.
#[async_trait]
pub trait RemoteExecutor {
    async fn execute(
        &self,
        target: &RemoteTarget,
        source: &str,
    ) -> Result<RunOutcome, TransportFailure>;
}

#[derive(Debug, Serialize)]
struct ExecuteRequest<'a> {
    language: &'a str,
    version: &'a str,
    files: [SourceFile<'a>; 1],
}

#[derive(Debug, Serialize)]
struct SourceFile<'a> {
    name: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ExecuteResponse {
    #[serde(default)]
    compile: Option<Stage>,
    #[serde(default)]
    run: Option<Stage>,
}

#[derive(Debug, Deserialize)]
struct Stage {
    #[serde(default)]
    stdout: String,
    #[serde(default)]
    stderr: String,
    code: Option<i32>,
    signal: Option<String>,
}

impl From<Stage> for RunOutcome {
    fn from(stage: Stage) -> Self {
        RunOutcome {
            stdout: stage.stdout,
            stderr: stage.stderr,
            code: stage.code,
            signal: stage.signal,
        }
    }
}

/// HTTP client for `POST {api_base}/execute`.
#[derive(Debug, Clone)]
pub struct PistonClient {
    http: reqwest::Client,
    execute_url: String,
}

impl PistonClient {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("build http client")?;
        Ok(Self {
            http,
            execute_url: format!("{}/execute", config.api_base.trim_end_matches('/')),
        })
    }

    pub fn execute_url(&self) -> &str {
        &self.execute_url
    }
}

#[async_trait]
impl RemoteExecutor for PistonClient {
    #[instrument(skip_all, fields(language = target.language, version = target.version))]
    async fn execute(
        &self,
        target: &RemoteTarget,
        source: &str,
    ) -> Result<RunOutcome, TransportFailure> {
        let body = ExecuteRequest {
            language: target.language,
            version: target.version,
            files: [SourceFile {
                name: target.filename,
                content: source,
            }],
        };
        debug!(url = %self.execute_url, file = target.filename, "submitting code");

        let response = self
            .http
            .post(&self.execute_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportFailure::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportFailure::Network(format!("read response: {e}")))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "execution service rejected request");
            return Err(TransportFailure::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: ExecuteResponse =
            serde_json::from_str(&text).map_err(|e| TransportFailure::Malformed(e.to_string()))?;
        outcome_from_response(parsed)
    }
}

/// A failed compile stage stands in for the run stage.
fn outcome_from_response(response: ExecuteResponse) -> Result<RunOutcome, TransportFailure> {
    if let Some(compile) = response.compile
        && (compile.code != Some(0) || compile.signal.is_some())
    {
        debug!(code = ?compile.code, "compile stage failed");
        return Ok(compile.into());
    }
    let run = response
        .run
        .ok_or_else(|| TransportFailure::Malformed("missing run stage".to_string()))?;
    debug!(code = ?run.code, signal = ?run.signal, "run finished");
    Ok(run.into())
}
