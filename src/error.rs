//! Typed error taxonomy for the request pipeline.
//!
//! Every failure a handler can surface is one of these variants. Each carries
//! a stable machine-readable code (see [`ApiError::kind`]) so clients can
//! branch on it; the HTTP status mapping lives in the server layer.
//!
//! Validation errors are produced before any call to the completion service,
//! and upstream detail bodies are truncated before they are stored so error
//! values are always safe to log. Secrets (API keys, bearer tokens) never
//! appear in any variant.

/// Maximum bytes of an upstream response body kept for diagnostics.
const MAX_UPSTREAM_DETAIL: usize = 512;

/// All failures the request pipeline can surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Declared content type is not in the allowed set (PDF, DOCX, TXT).
    UnsupportedFormat(String),
    /// Extraction ran but the parser rejected the document.
    ExtractionFailed(String),
    /// Extraction succeeded but produced no usable text.
    EmptyExtraction,
    /// An ask was issued with no document stored for that owner.
    NoDocument,
    /// The `question` field was missing or blank.
    EmptyQuestion,
    /// The chat `message` field was missing or blank.
    EmptyMessage,
    /// The multipart request carried no `file` field.
    MissingFile,
    /// Missing, malformed, or forged bearer credential.
    Unauthorized(String),
    /// The completion service returned a non-success status or a payload
    /// that did not match the documented shape.
    Upstream {
        status: Option<u16>,
        detail: String,
    },
    /// The completion call or extraction exceeded its time budget.
    Timeout(String),
    /// Unexpected failure; details go to logs, not to the client.
    Internal(String),
}

impl ApiError {
    /// Builds an [`ApiError::Upstream`] from an HTTP status and response
    /// body, truncating the body to a log-safe length.
    pub fn upstream(status: u16, body: &str) -> Self {
        ApiError::Upstream {
            status: Some(status),
            detail: truncate_detail(body),
        }
    }

    /// Builds an [`ApiError::Upstream`] for transport-level failures that
    /// never produced an HTTP status.
    pub fn upstream_transport(detail: impl Into<String>) -> Self {
        ApiError::Upstream {
            status: None,
            detail: truncate_detail(&detail.into()),
        }
    }

    /// Stable machine-readable error code, used in response bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::UnsupportedFormat(_) => "unsupported_format",
            ApiError::ExtractionFailed(_) => "extraction_failed",
            ApiError::EmptyExtraction => "empty_extraction",
            ApiError::NoDocument => "no_document",
            ApiError::EmptyQuestion => "empty_question",
            ApiError::EmptyMessage => "empty_message",
            ApiError::MissingFile => "missing_file",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Upstream { .. } => "upstream_error",
            ApiError::Timeout(_) => "timeout",
            ApiError::Internal(_) => "internal",
        }
    }
}

fn truncate_detail(body: &str) -> String {
    if body.len() <= MAX_UPSTREAM_DETAIL {
        return body.to_string();
    }
    let mut end = MAX_UPSTREAM_DETAIL;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::UnsupportedFormat(ct) => write!(
                f,
                "unsupported file format: {}. Only PDF, DOCX, and TXT files are allowed",
                ct
            ),
            ApiError::ExtractionFailed(e) => write!(f, "failed to extract text: {}", e),
            ApiError::EmptyExtraction => {
                write!(f, "text extraction yielded empty content")
            }
            ApiError::NoDocument => write!(f, "no document uploaded yet; upload a file first"),
            ApiError::EmptyQuestion => write!(f, "question is required"),
            ApiError::EmptyMessage => write!(f, "message is required"),
            ApiError::MissingFile => write!(f, "no file uploaded"),
            ApiError::Unauthorized(reason) => write!(f, "unauthorized: {}", reason),
            ApiError::Upstream {
                status: Some(code),
                detail,
            } => write!(f, "completion service error {}: {}", code, detail),
            ApiError::Upstream {
                status: None,
                detail,
            } => write!(f, "completion service unreachable: {}", detail),
            ApiError::Timeout(what) => write!(f, "{} timed out", what),
            ApiError::Internal(e) => write!(f, "internal error: {}", e),
        }
    }
}

impl std::error::Error for ApiError {}
