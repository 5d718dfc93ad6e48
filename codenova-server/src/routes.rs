//! HTTP route handlers for the execution API.

use axum::Router;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use codenova::core::language::{Language, RemoteTarget, RunnerKind};
use codenova::core::normalize::{RunOutcome, combine_output};
use codenova::io::remote::RemoteExecutor;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, info, instrument};

use crate::state::AppState;

type ApiError = (StatusCode, Json<Value>);

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/execute", post(execute))
        .route("/ai/completion", post(completion))
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExecuteRequest {
    language: Option<String>,
    code: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteResponse {
    output: String,
    exit_code: Option<i32>,
    /// Stderr whenever the exit code is not 0.
    error: Option<String>,
}

impl From<RunOutcome> for ExecuteResponse {
    fn from(outcome: RunOutcome) -> Self {
        let output = combine_output(&outcome.stdout, &outcome.stderr, outcome.code == Some(0));
        let error = (outcome.code != Some(0)).then_some(outcome.stderr);
        Self {
            output,
            exit_code: outcome.code,
            error,
        }
    }
}

fn error_body(status: StatusCode, message: &str) -> ApiError {
    (status, Json(json!({ "error": message })))
}

/// POST /api/execute - run non-JavaScript code on Piston.
#[instrument(skip_all)]
async fn execute(
    State(state): State<AppState>,
    payload: Result<Json<ExecuteRequest>, JsonRejection>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| error_body(StatusCode::BAD_REQUEST, &e.body_text()))?;
    let (Some(language), Some(code)) = (
        request.language.filter(|l| !l.is_empty()),
        request.code.filter(|c| !c.is_empty()),
    ) else {
        return Err(error_body(
            StatusCode::BAD_REQUEST,
            "Code and language are required",
        ));
    };

    let target = remote_target(&language)?;
    info!(language = target.language, bytes = code.len(), "forwarding run");

    match state.piston.execute(&target, &code).await {
        Ok(outcome) => Ok(Json(outcome.into())),
        Err(err) => {
            error!(err = %err, "code execution failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Failed to execute code",
                    "details": err.to_string(),
                })),
            ))
        }
    }
}

fn remote_target(language: &str) -> Result<RemoteTarget, ApiError> {
    match Language::from_id(language).and_then(Language::runner) {
        Some(RunnerKind::Remote(target)) => Ok(target),
        Some(RunnerKind::Local) => Err(error_body(
            StatusCode::BAD_REQUEST,
            "JavaScript should be executed client-side",
        )),
        None => Err(error_body(
            StatusCode::BAD_REQUEST,
            &format!("Unsupported language: {language}"),
        )),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CompletionRequest {
    prompt: Option<String>,
}

/// POST /api/ai/completion - pass a prompt through to the generative-text API.
///
/// The upstream JSON is returned unchanged.
#[instrument(skip_all)]
async fn completion(
    State(state): State<AppState>,
    payload: Result<Json<CompletionRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload.map_err(|e| error_body(StatusCode::BAD_REQUEST, &e.body_text()))?;
    let Some(prompt) = request.prompt.filter(|p| !p.is_empty()) else {
        return Err(error_body(StatusCode::BAD_REQUEST, "Prompt is required"));
    };
    let Some(api_key) = state.completion.api_key.as_deref() else {
        return Err(error_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            "API key not configured",
        ));
    };

    let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });
    let result = async {
        state
            .http
            .post(&state.completion.url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?
            .json::<Value>()
            .await
    }
    .await;

    result.map(Json).map_err(|err| {
        error!(err = %err, "completion request failed");
        error_body(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
    })
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    use axum::body::Body;
    use axum::extract::Query;
    use axum::http::Request;
    use codenova::core::normalize::SUCCESS_NO_OUTPUT;
    use codenova::io::config::RemoteConfig;
    use codenova::io::remote::PistonClient;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::state::CompletionConfig;

    #[derive(Clone, Default)]
    struct Upstream {
        run: Value,
        seen: Arc<Mutex<Vec<Value>>>,
    }

    async fn piston_execute(State(up): State<Upstream>, Json(req): Json<Value>) -> Json<Value> {
        up.seen.lock().expect("lock").push(req);
        Json(json!({ "run": up.run }))
    }

    async fn gemini(
        Query(query): Query<std::collections::HashMap<String, String>>,
        Json(req): Json<Value>,
    ) -> Json<Value> {
        Json(json!({ "key": query.get("key"), "echo": req }))
    }

    async fn serve_upstream(run: Value) -> (SocketAddr, Arc<Mutex<Vec<Value>>>) {
        let upstream = Upstream {
            run,
            ..Upstream::default()
        };
        let seen = upstream.seen.clone();
        let app = Router::new()
            .route("/piston/execute", post(piston_execute))
            .route("/gemini", post(gemini))
            .with_state(upstream);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });
        (addr, seen)
    }

    fn app(addr: SocketAddr, api_key: Option<&str>) -> Router {
        let piston = PistonClient::new(&RemoteConfig {
            api_base: format!("http://{addr}/piston"),
            timeout_secs: 5,
        })
        .expect("client");
        let state = AppState::new(
            piston,
            CompletionConfig {
                url: format!("http://{addr}/gemini"),
                api_key: api_key.map(str::to_string),
            },
        );
        Router::new().nest("/api", api_router()).with_state(state)
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request");
        let response = app.oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    fn unreachable_addr() -> SocketAddr {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr")
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let request = Request::builder()
            .uri("/api/health")
            .body(Body::empty())
            .expect("request");
        let response = app(unreachable_addr(), None)
            .oneshot(request)
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn execute_forwards_canonical_file() {
        let (addr, seen) = serve_upstream(
            json!({"stdout": "Hello\n", "stderr": "", "code": 0, "signal": null}),
        )
        .await;
        let (status, body) = post_json(
            app(addr, None),
            "/api/execute",
            json!({"language": "cpp", "code": "int main() {}"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"output": "Hello\n", "exitCode": 0, "error": null})
        );
        let requests = seen.lock().expect("lock");
        assert_eq!(requests[0]["files"][0]["name"], "main.cpp");
        assert_eq!(requests[0]["version"], "10.2.0");
    }

    #[tokio::test]
    async fn execute_reports_program_failure_with_stderr() {
        let (addr, _) = serve_upstream(
            json!({"stdout": "", "stderr": "Exception in thread \"main\"\n", "code": 1, "signal": null}),
        )
        .await;
        let (status, body) = post_json(
            app(addr, None),
            "/api/execute",
            json!({"language": "java", "code": "class Main {}"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["exitCode"], 1);
        assert_eq!(body["error"], "Exception in thread \"main\"\n");
        assert_eq!(body["output"], "Exception in thread \"main\"\n");
    }

    #[tokio::test]
    async fn execute_empty_success_uses_placeholder() {
        let (addr, _) =
            serve_upstream(json!({"stdout": "", "stderr": "", "code": 0, "signal": null})).await;
        let (_, body) = post_json(
            app(addr, None),
            "/api/execute",
            json!({"language": "python", "code": "pass"}),
        )
        .await;
        assert_eq!(body["output"], SUCCESS_NO_OUTPUT);
    }

    #[tokio::test]
    async fn execute_rejects_bad_requests() {
        let addr = unreachable_addr();
        let cases = [
            (json!({"language": "python"}), "Code and language are required"),
            (json!({"language": "", "code": "x"}), "Code and language are required"),
            (
                json!({"language": "javascript", "code": "1"}),
                "JavaScript should be executed client-side",
            ),
            (
                json!({"language": "ruby", "code": "puts 1"}),
                "Unsupported language: ruby",
            ),
            (
                json!({"language": "plaintext", "code": "hi"}),
                "Unsupported language: plaintext",
            ),
        ];
        for (request, message) in cases {
            let (status, body) = post_json(app(addr, None), "/api/execute", request).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], message);
        }
    }

    #[tokio::test]
    async fn execute_upstream_failure_is_500() {
        let (status, body) = post_json(
            app(unreachable_addr(), None),
            "/api/execute",
            json!({"language": "c", "code": "int main() {}"}),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to execute code");
        assert!(body["details"].as_str().is_some_and(|d| !d.is_empty()));
    }

    #[tokio::test]
    async fn completion_passes_prompt_and_key_through() {
        let (addr, _) = serve_upstream(Value::Null).await;
        let (status, body) = post_json(
            app(addr, Some("secret")),
            "/api/ai/completion",
            json!({"prompt": "complete me"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["key"], "secret");
        assert_eq!(body["echo"]["contents"][0]["parts"][0]["text"], "complete me");
    }

    #[tokio::test]
    async fn completion_requires_prompt_and_key() {
        let addr = unreachable_addr();
        let (status, body) =
            post_json(app(addr, Some("k")), "/api/ai/completion", json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Prompt is required");

        let (status, body) =
            post_json(app(addr, None), "/api/ai/completion", json!({"prompt": "x"})).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "API key not configured");
    }
}
