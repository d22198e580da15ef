//! HTTP server and request handlers.
//!
//! Routes the SkillWise front end calls, all JSON over HTTP:
//!
//! | Method | Path | Auth | Description |
//! |--------|------|------|-------------|
//! | `GET`  | `/health` | no | Liveness check (status, version, time) |
//! | `POST` | `/api/file/upload` | yes | Multipart document upload → extract → store |
//! | `POST` | `/api/file/ask` | yes | Answer a question from the stored document |
//! | `POST` | `/api/quiz/generate` | yes | Generate a multiple-choice quiz |
//! | `POST` | `/api/chat` | yes | Free-form mentor chat |
//!
//! # Error Contract
//!
//! Every failure returns the same body schema:
//!
//! ```json
//! { "error": { "code": "no_document", "message": "no document uploaded yet; upload a file first" } }
//! ```
//!
//! Codes follow [`ApiError::kind`]. Status mapping: validation errors → 400,
//! `unauthorized` → 401, `no_document` → 404, `timeout` → 408,
//! `upstream_error` → 502, `internal` → 500. Internal details are logged,
//! never returned to the client.
//!
//! # Upload lifecycle
//!
//! The declared content type is checked against the allowed set before any
//! byte is staged. Accepted uploads are spooled to a [`tempfile::NamedTempFile`],
//! extracted on the blocking pool under a timeout, and written to the store
//! only on full success. The temp file is removed on every exit path by RAII;
//! a failed upload leaves the store exactly as it was.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, FromRequestParts, Multipart, State},
    http::{header, request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, info, warn};

use crate::auth::{bearer_token, TokenVerifier};
use crate::completion::CompletionClient;
use crate::config::Config;
use crate::error::ApiError;
use crate::extract::{self, MIME_DOCX, MIME_PDF};
use crate::prompt::{
    build_quiz_prompt, compose_chat_prompt, compose_document_prompt, difficulty_label,
    PromptConfig, CHAT_PERSONA, DOCUMENT_PERSONA,
};
use crate::store::DocumentStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: Arc<DocumentStore>,
    completion: Arc<CompletionClient>,
    verifier: Arc<TokenVerifier>,
}

/// Builds the application router from configuration.
///
/// Split from [`run_server`] so integration tests can serve the exact
/// production router on an ephemeral port.
pub fn build_app(config: Arc<Config>) -> anyhow::Result<Router> {
    let completion = CompletionClient::new(&config.completion)?;
    let verifier = TokenVerifier::from_env(&config.auth.secret_env)?;
    let cors = cors_layer(&config.server.allowed_origins)?;
    // Headroom over max_bytes for multipart framing.
    let body_limit = config.upload.max_bytes + 64 * 1024;

    let state = AppState {
        config,
        store: Arc::new(DocumentStore::new()),
        completion: Arc::new(completion),
        verifier: Arc::new(verifier),
    };

    Ok(Router::new()
        .route("/health", get(handle_health))
        .route("/api/file/upload", post(handle_upload))
        .route("/api/file/ask", post(handle_ask))
        .route("/api/quiz/generate", post(handle_quiz))
        .route("/api/chat", post(handle_chat))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state))
}

/// Starts the server on the configured bind address and runs until the
/// process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = build_app(Arc::new(config.clone()))?;

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

fn cors_layer(allowed_origins: &[String]) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed_origins.iter().any(|o| o == "*") {
        return Ok(layer.allow_origin(Any));
    }
    let origins = allowed_origins
        .iter()
        .map(|o| {
            o.parse::<HeaderValue>()
                .map_err(|_| anyhow::anyhow!("invalid origin in server.allowed_origins: {}", o))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(layer.allow_origin(AllowOrigin::list(origins)))
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

/// Inner error detail with a machine-readable code and human-readable message.
#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an HTTP response.
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Constructs a 400 Bad Request error with an explicit code.
fn bad_request(code: &str, message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: code.to_string(),
        message: message.into(),
    }
}

/// Maps pipeline errors to HTTP responses. This conversion is the single
/// place where errors are logged; handlers just propagate with `?`.
impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        let status = match &err {
            ApiError::UnsupportedFormat(_)
            | ApiError::ExtractionFailed(_)
            | ApiError::EmptyExtraction
            | ApiError::EmptyQuestion
            | ApiError::EmptyMessage
            | ApiError::MissingFile => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NoDocument => StatusCode::NOT_FOUND,
            ApiError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            ApiError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        match &err {
            ApiError::Upstream { .. } | ApiError::Timeout(_) => {
                error!(kind = err.kind(), "{}", err);
            }
            ApiError::Internal(detail) => {
                error!(kind = err.kind(), detail = %detail, "internal failure");
            }
            _ => {
                warn!(kind = err.kind(), "{}", err);
            }
        }

        // Internal details stay in the logs.
        let message = match &err {
            ApiError::Internal(_) => "internal server error".to_string(),
            _ => err.to_string(),
        };

        AppError {
            status,
            code: err.kind().to_string(),
            message,
        }
    }
}

// ============ Authentication ============

/// Verified owner identity, extracted from the `Authorization` header
/// before any handler body runs. Requests without a valid bearer token
/// are rejected with 401 and never processed.
pub struct OwnerId(pub String);

impl FromRequestParts<AppState> for OwnerId {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        let token = bearer_token(header)?;
        let owner_id = state.verifier.verify(token)?;
        Ok(OwnerId(owner_id))
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    time: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        time: chrono::Utc::now().to_rfc3339(),
    })
}

// ============ POST /api/file/upload ============

#[derive(Serialize)]
struct UploadResponse {
    success: bool,
    message: String,
}

/// Human-readable label for the upload success message.
fn format_label(content_type: &str) -> &'static str {
    if content_type.starts_with(MIME_PDF) {
        "PDF"
    } else if content_type.starts_with(MIME_DOCX) {
        "DOCX"
    } else {
        "Text file"
    }
}

/// Handler for `POST /api/file/upload`.
///
/// Reads the `file` field from the multipart body, extracts its text, and
/// replaces the owner's stored document. Either the whole pipeline succeeds
/// and the store is updated, or it fails and the store is untouched.
async fn handle_upload(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    // Find the `file` field; other fields are ignored.
    let mut file: Option<(String, axum::body::Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request("bad_request", format!("invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| "application/octet-stream".to_string());

        // Reject unsupported formats before staging anything to disk.
        if !extract::is_supported(&content_type) {
            return Err(ApiError::UnsupportedFormat(content_type).into());
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request("bad_request", format!("failed to read upload: {}", e)))?;
        file = Some((content_type, bytes));
        break;
    }
    let (content_type, bytes) = file.ok_or(ApiError::MissingFile)?;

    // Stage the upload to disk. The NamedTempFile handle guarantees removal
    // on every exit path below, including errors and timeouts.
    let staged = tempfile::NamedTempFile::new()
        .map_err(|e| ApiError::Internal(format!("failed to create temp file: {}", e)))?;
    tokio::fs::write(staged.path(), &bytes)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to stage upload: {}", e)))?;
    drop(bytes);

    // Extraction is CPU-bound; run it off the async runtime, under a budget.
    let path = staged.path().to_path_buf();
    let declared_type = content_type.clone();
    let extraction = tokio::task::spawn_blocking(move || {
        let staged_bytes = std::fs::read(&path)
            .map_err(|e| ApiError::Internal(format!("failed to read staged upload: {}", e)))?;
        extract::extract_text(&staged_bytes, &declared_type)
    });

    let budget = Duration::from_secs(state.config.upload.extract_timeout_secs);
    let text = match tokio::time::timeout(budget, extraction).await {
        Err(_) => return Err(ApiError::Timeout("text extraction".to_string()).into()),
        Ok(Err(join_err)) => return Err(ApiError::Internal(join_err.to_string()).into()),
        Ok(Ok(result)) => result?,
    };

    info!(owner = %owner_id, chars = text.len(), "document stored");
    state.store.put(&owner_id, text);

    Ok(Json(UploadResponse {
        success: true,
        message: format!("{} uploaded and processed", format_label(&content_type)),
    }))
}

// ============ POST /api/file/ask ============

#[derive(Deserialize)]
struct AskRequest {
    #[serde(default)]
    question: String,
}

#[derive(Serialize)]
struct AskResponse {
    answer: String,
}

/// Handler for `POST /api/file/ask`.
///
/// Composes a prompt from the owner's stored document and the question,
/// then forwards it to the completion gateway. All validation happens
/// before the upstream call.
async fn handle_ask(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    let document = state.store.get(&owner_id);
    let prompt_config = PromptConfig::new(DOCUMENT_PERSONA, state.config.prompt.document_budget);
    let prompt = compose_document_prompt(
        &prompt_config,
        document.as_ref().map(|d| d.text.as_str()).unwrap_or(""),
        &req.question,
    )?;

    let answer = state
        .completion
        .complete(&prompt, state.config.completion.chat_temperature)
        .await?;

    Ok(Json(AskResponse { answer }))
}

// ============ POST /api/quiz/generate ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuizRequest {
    #[serde(default)]
    topic: String,
    #[serde(default = "default_num_questions")]
    num_questions: u32,
    #[serde(default = "default_difficulty")]
    difficulty: String,
}

fn default_num_questions() -> u32 {
    10
}
fn default_difficulty() -> String {
    "mid".to_string()
}

/// One generated multiple-choice question.
#[derive(Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    /// Index of the correct option (0 to 3).
    pub answer: u32,
}

#[derive(Serialize)]
struct QuizResponse {
    success: bool,
    quiz: Vec<QuizQuestion>,
}

/// Handler for `POST /api/quiz/generate`.
///
/// Question quality is the model's responsibility; this handler only
/// guarantees the completion parses as the documented quiz JSON shape.
async fn handle_quiz(
    State(state): State<AppState>,
    OwnerId(_owner_id): OwnerId,
    Json(req): Json<QuizRequest>,
) -> Result<Json<QuizResponse>, AppError> {
    if req.topic.trim().is_empty() {
        return Err(bad_request("bad_request", "topic is required"));
    }
    if req.num_questions == 0 {
        return Err(bad_request("bad_request", "numQuestions must be at least 1"));
    }

    let prompt = build_quiz_prompt(&req.topic, req.num_questions, difficulty_label(&req.difficulty));
    let text = state
        .completion
        .complete(&prompt, state.config.completion.quiz_temperature)
        .await?;

    let quiz: Vec<QuizQuestion> = serde_json::from_str(&text).map_err(|_| {
        ApiError::upstream_transport("completion output did not parse as quiz JSON")
    })?;

    Ok(Json(QuizResponse {
        success: true,
        quiz,
    }))
}

// ============ POST /api/chat ============

#[derive(Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: String,
    context: Option<String>,
}

#[derive(Serialize)]
struct ChatResponse {
    reply: String,
}

/// Handler for `POST /api/chat`.
async fn handle_chat(
    State(state): State<AppState>,
    OwnerId(_owner_id): OwnerId,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let prompt = compose_chat_prompt(
        CHAT_PERSONA,
        &req.message,
        req.context.as_deref(),
        state.config.prompt.context_budget,
    )?;

    let reply = state
        .completion
        .complete(&prompt, state.config.completion.chat_temperature)
        .await?;

    Ok(Json(ChatResponse { reply }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_labels() {
        assert_eq!(format_label(MIME_PDF), "PDF");
        assert_eq!(format_label(MIME_DOCX), "DOCX");
        assert_eq!(format_label("text/plain"), "Text file");
        assert_eq!(format_label("text/plain; charset=utf-8"), "Text file");
    }

    #[test]
    fn cors_rejects_unparseable_origins() {
        assert!(cors_layer(&["http://localhost:5173".to_string()]).is_ok());
        assert!(cors_layer(&["*".to_string()]).is_ok());
        assert!(cors_layer(&["\u{0}bad".to_string()]).is_err());
    }

    #[test]
    fn quiz_request_defaults() {
        let req: QuizRequest = serde_json::from_str(r#"{"topic":"rust"}"#).unwrap();
        assert_eq!(req.num_questions, 10);
        assert_eq!(req.difficulty, "mid");

        let req: QuizRequest =
            serde_json::from_str(r#"{"topic":"rust","numQuestions":5,"difficulty":"tuff"}"#)
                .unwrap();
        assert_eq!(req.num_questions, 5);
        assert_eq!(req.difficulty, "tuff");
    }
}
