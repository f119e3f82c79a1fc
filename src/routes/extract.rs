use crate::{error::AppError, server::Server};
use axum::{Router, extract::State, response::Json, routing::post};
use serde::Deserialize;
use serde_json::{Value, json};

pub fn create_extract_routes() -> Router<Server> {
    Router::new()
        .route("/extract", post(extract))
        .route("/extract/", post(extract))
}

#[derive(Debug, Deserialize)]
struct ExtractRequest {
    url: Option<String>,
}

/// Download a remote video into the files directory and hand back a link a
/// phone or browser can fetch. The public base URL is checked before the
/// download starts so a misconfigured deployment fails fast.
async fn extract(
    State(server): State<Server>,
    Json(request): Json<ExtractRequest>,
) -> Result<Json<Value>, AppError> {
    let url = request
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or(AppError::MissingUrl)?;

    let public_base = server
        .config
        .media
        .public_base_url
        .as_deref()
        .map(|base| base.trim_end_matches('/').to_string())
        .ok_or_else(|| AppError::Config("PUBLIC_BASE_URL".to_string()))?;

    let media = server
        .fetcher
        .fetch(url)
        .await
        .map_err(|e| AppError::Fetch(e.to_string()))?;

    Ok(Json(json!({
        "ok": true,
        "file_id": media.file_id,
        "fileUrl": format!("{}/files/{}.mp4", public_base, media.file_id),
    })))
}
