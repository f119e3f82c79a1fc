use crate::{
    error::AppError,
    publish::{
        DEFAULT_PHOTO_PRIVACY, DEFAULT_PHOTO_TITLE, DEFAULT_VIDEO_PRIVACY, DEFAULT_VIDEO_TITLE,
        PublishService,
    },
    server::Server,
};
use axum::{
    Router,
    extract::{Query, State},
    http::{
        HeaderMap, Method, StatusCode,
        header::{COOKIE, LOCATION, SET_COOKIE},
    },
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};

/// CSRF state cookie set at login and checked at the callback.
const STATE_COOKIE: &str = "tt_state";
const STATE_COOKIE_MAX_AGE: u32 = 600;

pub fn create_tiktok_routes() -> Router<Server> {
    Router::new()
        .route("/tiktok/login", get(login))
        .route("/tiktok/login/", get(login))
        // get() also matches HEAD, which health probes use on the callback.
        .route("/tiktok/callback", get(callback))
        .route("/tiktok/callback/", get(callback))
        .route("/tiktok/token", get(token_info))
        .route("/tiktok/token/", get(token_info))
        .route("/tiktok/publish", post(publish_video))
        .route("/tiktok/publish/", post(publish_video))
        .route("/tiktok/publish_photo", post(publish_photo))
        .route("/tiktok/publish_photo/", post(publish_photo))
        .route("/tiktok/status", post(publish_status))
        .route("/tiktok/status/", post(publish_status))
}

fn state_cookie(state: &str) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; Secure; SameSite=Lax; Max-Age={}",
        STATE_COOKIE, state, STATE_COOKIE_MAX_AGE
    )
}

fn clear_state_cookie() -> String {
    format!(
        "{}=; Path=/; HttpOnly; Secure; SameSite=Lax; Max-Age=0",
        STATE_COOKIE
    )
}

/// Pull the CSRF state out of the Cookie header, if present.
fn state_from_cookies(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        pair.trim()
            .strip_prefix(STATE_COOKIE)
            .and_then(|rest| rest.strip_prefix('='))
            .map(str::to_string)
    })
}

async fn login(State(server): State<Server>) -> Result<Response, AppError> {
    let (url, state) = server.oauth.authorize_url()?;
    tracing::info!("redirecting to provider authorization page");

    Ok((
        StatusCode::FOUND,
        [
            (LOCATION, url),
            (SET_COOKIE, state_cookie(&state)),
        ],
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// OAuth redirect target. Validation order matters: provider errors first,
/// then the missing-code case, then CSRF state, then the replay guard, and
/// only then the code exchange. The state cookie is cleared on the exchange
/// response so a stale cookie cannot satisfy a later callback.
async fn callback(
    State(server): State<Server>,
    method: Method,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, AppError> {
    // Link scanners probe with HEAD; answer without consuming the code.
    if method == Method::HEAD {
        return Ok(Json(json!({"ok": true})).into_response());
    }

    if let Some(error) = query.error {
        return Err(AppError::OAuthDenied {
            error,
            description: query.error_description,
            state: query.state,
        });
    }

    let code = query.code.ok_or(AppError::MissingCode {
        state: query.state.clone(),
    })?;

    let expected = state_from_cookies(&headers);
    if query.state.is_none() || query.state != expected {
        return Err(AppError::InvalidState { state: query.state });
    }
    let state = query.state.unwrap_or_default();

    if !server.replay_guard.try_consume(&code).await {
        return Err(AppError::CodeReused);
    }

    let (status, body) = server.oauth.exchange_code(&code).await?;

    Ok((
        status,
        [(SET_COOKIE, clear_state_cookie())],
        Json(json!({
            "ok": status == StatusCode::OK,
            "state": state,
            "token_response": body,
        })),
    )
        .into_response())
}

/// Token metadata for operators. Never exposes the tokens themselves.
async fn token_info(State(server): State<Server>) -> Result<Json<Value>, AppError> {
    let record = server
        .token_store
        .load()
        .await
        .map_err(|e| AppError::Internal(format!("Token store: {}", e)))?
        .ok_or(AppError::NoTokens)?;

    Ok(Json(json!({
        "ok": true,
        "open_id": record.open_id,
        "scope": record.scope,
        "expires_at": record.expires_at,
        "refresh_expires_at": record.refresh_expires_at,
    })))
}

#[derive(Debug, Deserialize)]
struct PublishRequest {
    #[serde(alias = "fileid")]
    file_id: Option<String>,
    #[serde(alias = "filepath")]
    file_path: Option<String>,
    title: Option<String>,
    #[serde(alias = "privacylevel")]
    privacy_level: Option<String>,
}

async fn publish_video(
    State(server): State<Server>,
    Json(request): Json<PublishRequest>,
) -> Result<Json<Value>, AppError> {
    let access_token = server.oauth.valid_access_token().await?;
    let path = server
        .publish
        .resolve_file(request.file_id.as_deref(), request.file_path.as_deref())
        .await?;

    let title = PublishService::normalize_title(request.title.as_deref(), DEFAULT_VIDEO_TITLE);
    let privacy =
        PublishService::normalize_privacy(request.privacy_level.as_deref(), DEFAULT_VIDEO_PRIVACY);

    let outcome = server
        .publish
        .publish_video(&access_token, &path, title, privacy)
        .await?;

    Ok(Json(json!({
        "ok": true,
        "publish_id": outcome.publish_id,
        "init": outcome.init,
        "upload_http_status": outcome.upload_http_status.as_u16(),
        "status": outcome.status,
    })))
}

#[derive(Debug, Deserialize)]
struct PublishPhotoRequest {
    image_urls: Option<Value>,
    image_url: Option<Value>,
    title: Option<String>,
    #[serde(alias = "privacylevel")]
    privacy_level: Option<String>,
}

fn urls_from_value(raw: Option<&Value>) -> Vec<String> {
    match raw {
        Some(Value::String(url)) if !url.trim().is_empty() => vec![url.trim().to_string()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Accept `image_urls` (list or single string), falling back to `image_url`
/// whenever it yields no usable entries, including an empty string or list.
fn collect_image_urls(request: &PublishPhotoRequest) -> Vec<String> {
    let urls = urls_from_value(request.image_urls.as_ref());
    if !urls.is_empty() {
        return urls;
    }
    urls_from_value(request.image_url.as_ref())
}

async fn publish_photo(
    State(server): State<Server>,
    Json(request): Json<PublishPhotoRequest>,
) -> Result<Json<Value>, AppError> {
    let urls = collect_image_urls(&request);
    if urls.is_empty() {
        return Err(AppError::MissingImages);
    }

    let access_token = server.oauth.valid_access_token().await?;
    let title = PublishService::normalize_title(request.title.as_deref(), DEFAULT_PHOTO_TITLE);
    let privacy =
        PublishService::normalize_privacy(request.privacy_level.as_deref(), DEFAULT_PHOTO_PRIVACY);

    let outcome = server
        .publish
        .publish_photos(&access_token, urls, title, privacy)
        .await?;

    Ok(Json(json!({
        "ok": true,
        "publish_id": outcome.publish_id,
        "init": outcome.init,
        "status": outcome.status,
    })))
}

#[derive(Debug, Deserialize)]
struct StatusRequest {
    publish_id: Option<String>,
}

async fn publish_status(
    State(server): State<Server>,
    Json(request): Json<StatusRequest>,
) -> Result<Response, AppError> {
    let publish_id = request
        .publish_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(AppError::MissingPublishId)?;

    let access_token = server.oauth.valid_access_token().await?;
    let (status, body) = server.publish.fetch_status(&access_token, publish_id).await?;

    Ok((status, Json(json!({"ok": true, "response": body}))).into_response())
}
