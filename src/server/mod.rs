use crate::{
    auth::{OAuthService, ReplayGuard},
    config::Config,
    error::AppError,
    media::{CommandSynthesizer, MediaFetcher, MediaSynthesizer, YtDlpFetcher},
    publish::PublishService,
    routes,
    storage::{FileTokenStore, TokenStore},
};
use axum::Router;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing::info;

/// Shared application state. Cloning is cheap; every service sits behind an
/// Arc and the router clones the state per request.
#[derive(Clone)]
pub struct Server {
    pub config: Arc<Config>,
    pub token_store: Arc<dyn TokenStore>,
    pub replay_guard: Arc<ReplayGuard>,
    pub oauth: Arc<OAuthService>,
    pub publish: Arc<PublishService>,
    pub fetcher: Arc<dyn MediaFetcher>,
    pub synthesizer: Option<Arc<dyn MediaSynthesizer>>,
}

impl Server {
    pub async fn new(config: Config) -> Result<Self, AppError> {
        let config = Arc::new(config);

        tokio::fs::create_dir_all(&config.media.files_dir)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create files dir: {}", e)))?;

        let token_store: Arc<dyn TokenStore> =
            Arc::new(FileTokenStore::new(&config.storage.tokens_path));
        let oauth = Arc::new(OAuthService::new(config.clone(), token_store.clone()));
        let publish = Arc::new(PublishService::new(config.clone()));
        let fetcher: Arc<dyn MediaFetcher> = Arc::new(YtDlpFetcher::new(
            &config.media.files_dir,
            &config.media.downloader,
        ));
        let synthesizer = config
            .media
            .synthesizer_command
            .as_deref()
            .map(|command| Arc::new(CommandSynthesizer::new(command)) as Arc<dyn MediaSynthesizer>);

        Ok(Self {
            config,
            token_store,
            replay_guard: Arc::new(ReplayGuard::new()),
            oauth,
            publish,
            fetcher,
            synthesizer,
        })
    }

    /// Assemble the full router: API routes plus static serving of the media
    /// directory under /files.
    pub fn create_app(&self) -> Router {
        Router::new()
            .merge(routes::create_health_routes())
            .merge(routes::create_extract_routes())
            .merge(routes::create_tiktok_routes())
            .merge(routes::create_deal_routes())
            .nest_service("/files", ServeDir::new(&self.config.media.files_dir))
            .with_state(self.clone())
    }

    pub async fn run(self) -> Result<(), AppError> {
        let addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to bind to address: {}", e)))?;

        info!("Server listening on http://{}", addr);

        let app = self.create_app();
        axum::serve(listener, app)
            .await
            .map_err(|e| AppError::Internal(format!("Server error: {}", e)))?;
        Ok(())
    }
}
