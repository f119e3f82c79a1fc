use crate::{
    error::AppError,
    publish::{DEFAULT_VIDEO_PRIVACY, PublishService},
    server::Server,
};
use axum::{Router, extract::State, response::Json, routing::post};
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::Path;
use uuid::Uuid;

pub fn create_deal_routes() -> Router<Server> {
    Router::new()
        .route("/publish_video_deal", post(publish_video_deal))
        .route("/publish_video_deal/", post(publish_video_deal))
}

const DEFAULT_DEAL_TITLE: &str = "Deal!";

#[derive(Debug, Deserialize)]
struct PublishDealRequest {
    deal: Option<Value>,
    title: Option<String>,
    #[serde(alias = "privacylevel")]
    privacy_level: Option<String>,
}

/// End-to-end deal pipeline: render a clip from the deal data, then run the
/// regular video publish on the result.
async fn publish_video_deal(
    State(server): State<Server>,
    Json(request): Json<PublishDealRequest>,
) -> Result<Json<Value>, AppError> {
    let synthesizer = server
        .synthesizer
        .as_ref()
        .ok_or_else(|| AppError::Synthesis("No synthesizer command configured".to_string()))?;

    let deal = request
        .deal
        .filter(|d| d.is_object())
        .ok_or_else(|| AppError::Synthesis("Missing deal object".to_string()))?;

    let file_id = Uuid::new_v4().to_string();
    let output = Path::new(&server.config.media.files_dir).join(format!("{}.mp4", file_id));

    synthesizer
        .synthesize(&deal, &output)
        .await
        .map_err(|e| AppError::Synthesis(e.to_string()))?;

    let access_token = server.oauth.valid_access_token().await?;

    // A caller-supplied title wins, then the deal's own title.
    let title = request
        .title
        .as_deref()
        .or_else(|| deal.get("title").and_then(Value::as_str));
    let title = PublishService::normalize_title(title, DEFAULT_DEAL_TITLE);
    let privacy =
        PublishService::normalize_privacy(request.privacy_level.as_deref(), DEFAULT_VIDEO_PRIVACY);

    let outcome = server
        .publish
        .publish_video(&access_token, &output, title, privacy)
        .await?;

    Ok(Json(json!({
        "ok": true,
        "file_id": file_id,
        "publish_id": outcome.publish_id,
        "init": outcome.init,
        "upload_http_status": outcome.upload_http_status.as_u16(),
        "status": outcome.status,
    })))
}
