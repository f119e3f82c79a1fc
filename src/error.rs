use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    /// A required configuration value (named by its environment variable) is absent.
    Config(String),
    /// No usable stored token; the caller must go through /tiktok/login.
    NotAuthorized,
    /// No token record persisted yet (token-info endpoint only).
    NoTokens,
    /// The provider redirected back with an error.
    OAuthDenied {
        error: String,
        description: Option<String>,
        state: Option<String>,
    },
    /// Callback state did not match the tt_state cookie.
    InvalidState { state: Option<String> },
    /// Authorization code was already consumed within the TTL window.
    CodeReused,
    /// Callback arrived without an authorization code.
    MissingCode { state: Option<String> },
    MissingUrl,
    MissingImages,
    MissingPublishId,
    FileNotFound,
    /// Publish init rejected or returned an incomplete payload; body passes through.
    InitFailed { status: StatusCode, body: Value },
    /// Binary upload returned a status outside {200, 201, 204}.
    UploadFailed { status: StatusCode, body: String },
    /// Token endpoint failure during refresh; body passes through as token_response.
    TokenEndpoint { status: StatusCode, body: Value },
    Fetch(String),
    Synthesis(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(name) => write!(f, "Missing environment variable: {}", name),
            AppError::NotAuthorized => write!(f, "Not authorized yet. Visit /tiktok/login"),
            AppError::NoTokens => write!(f, "No tokens stored yet"),
            AppError::OAuthDenied { error, .. } => write!(f, "OAuth denied: {}", error),
            AppError::InvalidState { .. } => write!(f, "Invalid state"),
            AppError::CodeReused => write!(f, "Code already used"),
            AppError::MissingCode { .. } => write!(f, "Missing code"),
            AppError::MissingUrl => write!(f, "Missing url"),
            AppError::MissingImages => write!(f, "Missing image_urls"),
            AppError::MissingPublishId => write!(f, "Missing publish_id"),
            AppError::FileNotFound => write!(f, "Missing file_path or file not found"),
            AppError::InitFailed { status, .. } => write!(f, "Publish init failed: {}", status),
            AppError::UploadFailed { status, .. } => write!(f, "Upload failed: {}", status),
            AppError::TokenEndpoint { status, .. } => {
                write!(f, "Token endpoint failed: {}", status)
            }
            AppError::Fetch(msg) => write!(f, "Media fetch failed: {}", msg),
            AppError::Synthesis(msg) => write!(f, "Video synthesis failed: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Config(name) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"ok": false, "error": format!("Missing environment variable: {}", name)}),
            ),
            AppError::NotAuthorized => (
                StatusCode::UNAUTHORIZED,
                json!({"ok": false, "error": "Not authorized yet. Visit /tiktok/login"}),
            ),
            AppError::NoTokens => (
                StatusCode::NOT_FOUND,
                json!({"ok": false, "error": "No tokens stored yet"}),
            ),
            AppError::OAuthDenied {
                error,
                description,
                state,
            } => (
                StatusCode::BAD_REQUEST,
                json!({
                    "ok": false,
                    "error": error,
                    "error_description": description,
                    "state": state,
                }),
            ),
            AppError::InvalidState { state } => (
                StatusCode::BAD_REQUEST,
                json!({"ok": false, "error": "Invalid state", "state": state}),
            ),
            AppError::CodeReused => (
                StatusCode::BAD_REQUEST,
                json!({"ok": false, "error": "Code already used"}),
            ),
            AppError::MissingCode { state } => (
                StatusCode::BAD_REQUEST,
                json!({"ok": false, "error": "Missing code", "state": state}),
            ),
            AppError::MissingUrl => (
                StatusCode::BAD_REQUEST,
                json!({"ok": false, "error": "Missing url"}),
            ),
            AppError::MissingImages => (
                StatusCode::BAD_REQUEST,
                json!({"ok": false, "error": "Missing image_urls"}),
            ),
            AppError::MissingPublishId => (
                StatusCode::BAD_REQUEST,
                json!({"ok": false, "error": "Missing publish_id"}),
            ),
            AppError::FileNotFound => (
                StatusCode::BAD_REQUEST,
                json!({"ok": false, "error": "Missing file_path or file not found"}),
            ),
            AppError::InitFailed { status, body } => (
                status,
                json!({"ok": false, "step": "init", "response": body}),
            ),
            AppError::UploadFailed { status, body } => (
                StatusCode::BAD_REQUEST,
                json!({
                    "ok": false,
                    "step": "upload",
                    "status_code": status.as_u16(),
                    "text": body,
                }),
            ),
            AppError::TokenEndpoint { status, body } => {
                (status, json!({"ok": false, "token_response": body}))
            }
            AppError::Fetch(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"ok": false, "error": msg}),
            ),
            AppError::Synthesis(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"ok": false, "error": msg}),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"ok": false, "error": msg}),
            ),
        };

        (status, Json(body)).into_response()
    }
}
