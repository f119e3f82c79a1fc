//! The three-step publish protocol: init, binary upload, status fetch.
//!
//! Each step's inputs come from the previous step's output, so the pipeline
//! is strictly sequential within one call. Provider failures pass through to
//! the caller with the original status and body; nothing is retried.

use crate::{config::Config, error::AppError};
use axum::http::StatusCode;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Value, json};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

/// Provider-side cap on pull-from-URL photo posts.
pub const MAX_PHOTO_IMAGES: usize = 35;

pub const DEFAULT_VIDEO_TITLE: &str = "Posted via API";
pub const DEFAULT_PHOTO_TITLE: &str = "Check out this deal!";
pub const DEFAULT_VIDEO_PRIVACY: &str = "PRIVATE";
pub const DEFAULT_PHOTO_PRIVACY: &str = "PUBLIC";

const INIT_TIMEOUT: Duration = Duration::from_secs(60);
const STATUS_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct PostInfo {
    title: String,
    privacy_level: String,
}

/// Single-chunk upload declaration: chunk_size always equals video_size and
/// total_chunk_count is 1. This is a hard constraint of the service — files
/// beyond the provider's single-chunk ceiling are unsupported.
#[derive(Debug, Serialize)]
struct VideoSourceInfo {
    source: &'static str,
    video_size: u64,
    chunk_size: u64,
    total_chunk_count: u32,
}

#[derive(Debug, Serialize)]
struct VideoInitRequest {
    post_info: PostInfo,
    source_info: VideoSourceInfo,
}

#[derive(Debug, Serialize)]
struct PhotoImage {
    url: String,
}

#[derive(Debug, Serialize)]
struct PhotoSourceInfo {
    source: &'static str,
    photo_cover_index: u32,
    photo_images: Vec<PhotoImage>,
}

#[derive(Debug, Serialize)]
struct PhotoInitRequest {
    post_info: PostInfo,
    source_info: PhotoSourceInfo,
}

/// Typed result of a successful init call. `upload_url` is present for direct
/// file uploads and absent for pull-from-URL posts.
#[derive(Debug, Clone)]
pub struct InitResult {
    pub publish_id: String,
    pub upload_url: Option<String>,
    pub raw: Value,
}

#[derive(Debug)]
pub struct VideoPublishOutcome {
    pub publish_id: String,
    pub init: Value,
    pub upload_http_status: StatusCode,
    pub status: Value,
}

#[derive(Debug)]
pub struct PhotoPublishOutcome {
    pub publish_id: String,
    pub init: Value,
    pub status: Value,
}

pub struct PublishService {
    config: Arc<Config>,
    http: Client,
}

impl PublishService {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    /// Resolve a publish input to an existing local file: a file identifier
    /// maps to `{files_dir}/{id}.mp4`, otherwise an explicit path is used.
    pub async fn resolve_file(
        &self,
        file_id: Option<&str>,
        file_path: Option<&str>,
    ) -> Result<PathBuf, AppError> {
        let path = match (file_id, file_path) {
            (Some(id), _) => Path::new(&self.config.media.files_dir).join(format!("{}.mp4", id)),
            (None, Some(path)) => PathBuf::from(path),
            (None, None) => return Err(AppError::FileNotFound),
        };

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            _ => Err(AppError::FileNotFound),
        }
    }

    /// Trim the title, falling back to a non-empty default.
    pub fn normalize_title(raw: Option<&str>, default: &str) -> String {
        let trimmed = raw.unwrap_or("").trim();
        if trimmed.is_empty() {
            default.to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// Trim the privacy level, falling back to the provider default.
    pub fn normalize_privacy(raw: Option<&str>, default: &str) -> String {
        let trimmed = raw.unwrap_or("").trim();
        if trimmed.is_empty() {
            default.to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// Direct video publish: init, one PUT spanning the whole file, then a
    /// single status fetch. Callers poll /tiktok/status for the terminal
    /// state.
    pub async fn publish_video(
        &self,
        access_token: &str,
        path: &Path,
        title: String,
        privacy_level: String,
    ) -> Result<VideoPublishOutcome, AppError> {
        let video_size = tokio::fs::metadata(path)
            .await
            .map_err(|_| AppError::FileNotFound)?
            .len();

        let init = self
            .init_video(access_token, title, privacy_level, video_size)
            .await?;
        let upload_url = init.upload_url.clone().ok_or_else(|| AppError::InitFailed {
            status: StatusCode::OK,
            body: init.raw.clone(),
        })?;

        let upload_http_status = self.upload_video(&upload_url, path, video_size).await?;

        let (_, status_body) = self.fetch_status(access_token, &init.publish_id).await?;

        Ok(VideoPublishOutcome {
            publish_id: init.publish_id,
            init: init.raw,
            upload_http_status,
            status: status_body,
        })
    }

    /// Photo publish via pull-from-URL: the provider fetches the images, so
    /// there is no upload step. The image list is capped at the provider
    /// maximum.
    pub async fn publish_photos(
        &self,
        access_token: &str,
        image_urls: Vec<String>,
        title: String,
        privacy_level: String,
    ) -> Result<PhotoPublishOutcome, AppError> {
        if image_urls.is_empty() {
            return Err(AppError::MissingImages);
        }

        let photo_images = image_urls
            .into_iter()
            .take(MAX_PHOTO_IMAGES)
            .map(|url| PhotoImage { url })
            .collect();

        let request = PhotoInitRequest {
            post_info: PostInfo {
                title,
                privacy_level,
            },
            source_info: PhotoSourceInfo {
                source: "PULL_FROM_URL",
                photo_cover_index: 0,
                photo_images,
            },
        };

        let init = self
            .init_call(
                access_token,
                "/v2/post/publish/content/init/",
                &request,
                false,
            )
            .await?;

        let (_, status_body) = self.fetch_status(access_token, &init.publish_id).await?;

        Ok(PhotoPublishOutcome {
            publish_id: init.publish_id,
            init: init.raw,
            status: status_body,
        })
    }

    /// One status-fetch call, returned verbatim with the provider's status
    /// code. Pure passthrough; the provider is the system of record.
    pub async fn fetch_status(
        &self,
        access_token: &str,
        publish_id: &str,
    ) -> Result<(StatusCode, Value), AppError> {
        let url = format!(
            "{}/v2/post/publish/status/fetch/",
            self.config.tiktok.api_base_url
        );
        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&json!({"publish_id": publish_id}))
            .timeout(STATUS_TIMEOUT)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Status fetch request failed: {}", e)))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Status fetch returned non-JSON: {}", e)))?;
        Ok((status, body))
    }

    async fn init_video(
        &self,
        access_token: &str,
        title: String,
        privacy_level: String,
        video_size: u64,
    ) -> Result<InitResult, AppError> {
        let request = VideoInitRequest {
            post_info: PostInfo {
                title,
                privacy_level,
            },
            source_info: VideoSourceInfo {
                source: "FILE_UPLOAD",
                video_size,
                chunk_size: video_size,
                total_chunk_count: 1,
            },
        };
        self.init_call(access_token, "/v2/post/publish/video/init/", &request, true)
            .await
    }

    async fn init_call<T: Serialize>(
        &self,
        access_token: &str,
        endpoint: &str,
        request: &T,
        require_upload_url: bool,
    ) -> Result<InitResult, AppError> {
        let url = format!("{}{}", self.config.tiktok.api_base_url, endpoint);
        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(request)
            .timeout(INIT_TIMEOUT)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Publish init request failed: {}", e)))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Publish init returned non-JSON: {}", e)))?;

        let data = body.get("data").cloned().unwrap_or(Value::Null);
        let publish_id = data
            .get("publish_id")
            .and_then(Value::as_str)
            .map(str::to_string);
        let upload_url = data
            .get("upload_url")
            .and_then(Value::as_str)
            .map(str::to_string);

        let complete = publish_id.is_some() && (!require_upload_url || upload_url.is_some());
        if status != StatusCode::OK || !complete {
            return Err(AppError::InitFailed { status, body });
        }

        Ok(InitResult {
            publish_id: publish_id.unwrap_or_default(),
            upload_url,
            raw: body,
        })
    }

    /// One binary PUT of the entire file. The Content-Range spans the whole
    /// file and matches Content-Length. Deliberately no timeout: large files
    /// may take arbitrarily long, and a hung upload blocks only its own
    /// request.
    async fn upload_video(
        &self,
        upload_url: &str,
        path: &Path,
        video_size: u64,
    ) -> Result<StatusCode, AppError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read video file: {}", e)))?;

        let content_range = format!("bytes 0-{}/{}", video_size.saturating_sub(1), video_size);
        let response = self
            .http
            .put(upload_url)
            .header("Content-Type", "video/mp4")
            .header("Content-Range", content_range)
            .header("Content-Length", video_size.to_string())
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Upload request failed: {}", e)))?;

        let status = response.status();
        if !matches!(
            status,
            StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT
        ) {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::UploadFailed { status, body });
        }
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_title() {
        assert_eq!(
            PublishService::normalize_title(Some("  My video  "), DEFAULT_VIDEO_TITLE),
            "My video"
        );
        assert_eq!(
            PublishService::normalize_title(Some("   "), DEFAULT_VIDEO_TITLE),
            DEFAULT_VIDEO_TITLE
        );
        assert_eq!(
            PublishService::normalize_title(None, DEFAULT_PHOTO_TITLE),
            DEFAULT_PHOTO_TITLE
        );
    }

    #[test]
    fn test_normalize_privacy() {
        assert_eq!(
            PublishService::normalize_privacy(Some(" PUBLIC "), DEFAULT_VIDEO_PRIVACY),
            "PUBLIC"
        );
        assert_eq!(
            PublishService::normalize_privacy(None, DEFAULT_VIDEO_PRIVACY),
            "PRIVATE"
        );
        assert_eq!(
            PublishService::normalize_privacy(Some(""), DEFAULT_PHOTO_PRIVACY),
            "PUBLIC"
        );
    }

    #[test]
    fn test_video_init_request_wire_shape() {
        let request = VideoInitRequest {
            post_info: PostInfo {
                title: "t".to_string(),
                privacy_level: "PRIVATE".to_string(),
            },
            source_info: VideoSourceInfo {
                source: "FILE_UPLOAD",
                video_size: 2_097_152,
                chunk_size: 2_097_152,
                total_chunk_count: 1,
            },
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["post_info"]["title"], "t");
        assert_eq!(value["source_info"]["source"], "FILE_UPLOAD");
        assert_eq!(value["source_info"]["video_size"], 2_097_152);
        assert_eq!(value["source_info"]["chunk_size"], 2_097_152);
        assert_eq!(value["source_info"]["total_chunk_count"], 1);
    }

    #[test]
    fn test_photo_init_request_wire_shape() {
        let request = PhotoInitRequest {
            post_info: PostInfo {
                title: "t".to_string(),
                privacy_level: "PUBLIC".to_string(),
            },
            source_info: PhotoSourceInfo {
                source: "PULL_FROM_URL",
                photo_cover_index: 0,
                photo_images: vec![PhotoImage {
                    url: "http://x/1.jpg".to_string(),
                }],
            },
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["source_info"]["source"], "PULL_FROM_URL");
        assert_eq!(value["source_info"]["photo_cover_index"], 0);
        assert_eq!(value["source_info"]["photo_images"][0]["url"], "http://x/1.jpg");
    }

    #[tokio::test]
    async fn test_resolve_file_prefers_file_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.media.files_dir = dir.path().to_string_lossy().into_owned();
        tokio::fs::write(dir.path().join("abc.mp4"), b"video")
            .await
            .unwrap();

        let service = PublishService::new(Arc::new(config));
        let path = service.resolve_file(Some("abc"), None).await.unwrap();
        assert_eq!(path, dir.path().join("abc.mp4"));

        // An explicit path is ignored once a file_id is present.
        let path = service
            .resolve_file(Some("abc"), Some("/nope.mp4"))
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("abc.mp4"));
    }

    #[tokio::test]
    async fn test_resolve_file_missing_inputs_or_file() {
        let service = PublishService::new(Arc::new(Config::default()));

        assert!(matches!(
            service.resolve_file(None, None).await,
            Err(AppError::FileNotFound)
        ));
        assert!(matches!(
            service.resolve_file(Some("no-such-id"), None).await,
            Err(AppError::FileNotFound)
        ));
        assert!(matches!(
            service.resolve_file(None, Some("/no/such/file.mp4")).await,
            Err(AppError::FileNotFound)
        ));
    }

    #[tokio::test]
    async fn test_publish_photos_rejects_empty_list() {
        let service = PublishService::new(Arc::new(Config::default()));
        let result = service
            .publish_photos("act", Vec::new(), "t".to_string(), "PUBLIC".to_string())
            .await;
        assert!(matches!(result, Err(AppError::MissingImages)));
    }
}
