//! Builders for wiring a fully assembled server against in-memory and mock
//! backends in tests.

use crate::{
    auth::{
        OAuthService, ReplayGuard,
        tokens::{TokenEndpointResponse, TokenRecord},
    },
    config::Config,
    media::{FetchedMedia, MediaError, MediaFetcher, MediaSynthesizer},
    publish::PublishService,
    server::Server,
    storage::{MemoryTokenStore, TokenStore},
};
use chrono::Utc;
use serde_json::Value;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

/// Fetcher that writes a small placeholder file instead of shelling out.
pub struct StubFetcher {
    files_dir: PathBuf,
}

#[async_trait::async_trait]
impl MediaFetcher for StubFetcher {
    async fn fetch(&self, _url: &str) -> Result<FetchedMedia, MediaError> {
        let file_id = uuid::Uuid::new_v4().to_string();
        let path = self.files_dir.join(format!("{}.mp4", file_id));
        tokio::fs::write(&path, b"stub video bytes")
            .await
            .map_err(|e| MediaError::Spawn(e.to_string()))?;
        Ok(FetchedMedia { file_id, path })
    }
}

/// Fetcher that always fails, for exercising error paths.
pub struct FailingFetcher;

#[async_trait::async_trait]
impl MediaFetcher for FailingFetcher {
    async fn fetch(&self, _url: &str) -> Result<FetchedMedia, MediaError> {
        Err(MediaError::Failed {
            program: "yt-dlp".to_string(),
            stderr: "ERROR: unsupported URL".to_string(),
        })
    }
}

/// Synthesizer that writes the deal JSON to the output path.
pub struct StubSynthesizer;

#[async_trait::async_trait]
impl MediaSynthesizer for StubSynthesizer {
    async fn synthesize(&self, deal: &Value, output: &Path) -> Result<(), MediaError> {
        let bytes = serde_json::to_vec(deal).map_err(|e| MediaError::Spawn(e.to_string()))?;
        tokio::fs::write(output, bytes)
            .await
            .map_err(|e| MediaError::Spawn(e.to_string()))
    }
}

/// Build a token record the way a successful code exchange would.
pub fn seeded_token_record(expires_in: i64) -> TokenRecord {
    let response: TokenEndpointResponse = serde_json::from_value(serde_json::json!({
        "access_token": "act.test-token",
        "refresh_token": "rft.test-token",
        "expires_in": expires_in,
        "refresh_expires_in": 31536000,
        "scope": "user.info.basic,video.upload,video.publish",
        "open_id": "open-id-test",
    }))
    .expect("valid token response");
    TokenRecord::from_response(response, Utc::now().timestamp()).expect("record")
}

pub struct TestServerBuilder {
    config: Config,
    token_store: Arc<dyn TokenStore>,
    fetcher: Option<Arc<dyn MediaFetcher>>,
    synthesizer: Option<Arc<dyn MediaSynthesizer>>,
}

impl TestServerBuilder {
    pub fn new() -> Self {
        // A per-builder scratch dir under the OS temp root; tests do not need
        // to clean it up.
        let files_dir =
            std::env::temp_dir().join(format!("ttproxy-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&files_dir).expect("create test files dir");

        let mut config = Config::default();
        config.media.files_dir = files_dir.to_string_lossy().into_owned();
        config.tiktok.client_key = Some("test-client-key".to_string());
        config.tiktok.client_secret = Some("test-client-secret".to_string());
        config.tiktok.redirect_uri = Some("https://example.com/tiktok/callback".to_string());
        config.media.public_base_url = Some("https://media.example.com".to_string());

        Self {
            config,
            token_store: Arc::new(MemoryTokenStore::new()),
            fetcher: None,
            synthesizer: None,
        }
    }

    pub fn with_config(mut self, mutate: impl FnOnce(&mut Config)) -> Self {
        mutate(&mut self.config);
        self
    }

    pub fn with_token_record(self, record: TokenRecord) -> Self {
        self.with_token_store(Arc::new(MemoryTokenStore::with_record(record)))
    }

    pub fn with_token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.token_store = store;
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn MediaFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn MediaSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Assemble the server directly, bypassing filesystem-backed defaults.
    pub fn build(self) -> Server {
        let config = Arc::new(self.config);
        let files_dir = PathBuf::from(&config.media.files_dir);

        let fetcher = self
            .fetcher
            .unwrap_or_else(|| Arc::new(StubFetcher { files_dir }));

        Server {
            config: config.clone(),
            token_store: self.token_store.clone(),
            replay_guard: Arc::new(ReplayGuard::new()),
            oauth: Arc::new(OAuthService::new(config.clone(), self.token_store)),
            publish: Arc::new(PublishService::new(config)),
            fetcher,
            synthesizer: self.synthesizer,
        }
    }
}

impl Default for TestServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
