use crate::{
    auth::tokens::{TokenEndpointResponse, TokenRecord},
    config::Config,
    error::AppError,
    storage::TokenStore,
};
use axum::http::StatusCode;
use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use url::Url;
use uuid::Uuid;

/// Bounded timeout for token-endpoint calls.
const TOKEN_ENDPOINT_TIMEOUT: Duration = Duration::from_secs(30);

/// Drives the OAuth2 authorization-code flow against the provider: builds the
/// authorization redirect, exchanges codes for tokens, and refreshes
/// proactively before expiry.
pub struct OAuthService {
    config: Arc<Config>,
    http: Client,
    store: Arc<dyn TokenStore>,
}

impl OAuthService {
    pub fn new(config: Arc<Config>, store: Arc<dyn TokenStore>) -> Self {
        Self {
            config,
            http: Client::new(),
            store,
        }
    }

    fn client_key(&self) -> Result<&str, AppError> {
        self.config
            .tiktok
            .client_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| AppError::Config("TIKTOK_CLIENT_KEY".to_string()))
    }

    fn client_secret(&self) -> Result<&str, AppError> {
        self.config
            .tiktok
            .client_secret
            .as_deref()
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| AppError::Config("TIKTOK_CLIENT_SECRET".to_string()))
    }

    fn redirect_uri(&self) -> Result<&str, AppError> {
        self.config
            .tiktok
            .redirect_uri
            .as_deref()
            .filter(|uri| !uri.is_empty())
            .ok_or_else(|| AppError::Config("TIKTOK_REDIRECT_URI".to_string()))
    }

    /// Build the provider authorization URL and a fresh CSRF state token.
    pub fn authorize_url(&self) -> Result<(String, String), AppError> {
        let client_key = self.client_key()?;
        let redirect_uri = self.redirect_uri()?;

        let state = Uuid::new_v4().to_string();
        let mut url = Url::parse(&format!(
            "{}/v2/auth/authorize/",
            self.config.tiktok.auth_base_url
        ))
        .map_err(|e| AppError::Internal(format!("Invalid auth base URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("client_key", client_key)
            .append_pair("scope", &self.config.tiktok.scope)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("state", &state);

        Ok((url.into(), state))
    }

    /// Exchange an authorization code for tokens. The provider's status and
    /// body are returned verbatim for the callback response; a token record is
    /// persisted only on HTTP 200 with a non-empty access token.
    pub async fn exchange_code(&self, code: &str) -> Result<(StatusCode, Value), AppError> {
        let client_key = self.client_key()?.to_string();
        let client_secret = self.client_secret()?.to_string();
        let redirect_uri = self.redirect_uri()?.to_string();

        let form = [
            ("client_key", client_key.as_str()),
            ("client_secret", client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            // Must match the URI used at authorization time byte for byte.
            ("redirect_uri", redirect_uri.as_str()),
        ];
        let (status, body) = self.post_token_endpoint(&form).await?;

        if status == StatusCode::OK {
            let response: TokenEndpointResponse = serde_json::from_value(body.clone())
                .map_err(|e| AppError::Internal(format!("Unreadable token response: {}", e)))?;
            if let Some(record) = TokenRecord::from_response(response, Utc::now().timestamp()) {
                self.save(&record).await?;
                tracing::info!(
                    open_id = record.open_id.as_deref().unwrap_or(""),
                    "stored token record from code exchange"
                );
            }
        }

        Ok((status, body))
    }

    /// Refresh the stored token. On success the new fields are applied to the
    /// existing record and persisted; on failure the stored record is left
    /// untouched and the provider response is surfaced.
    pub async fn refresh(&self) -> Result<TokenRecord, AppError> {
        let mut record = self.load().await?.ok_or(AppError::NotAuthorized)?;
        if !record.has_refresh_token() {
            return Err(AppError::NotAuthorized);
        }
        let refresh_token = record.refresh_token.clone().unwrap_or_default();

        let client_key = self.client_key()?.to_string();
        let client_secret = self.client_secret()?.to_string();
        let form = [
            ("client_key", client_key.as_str()),
            ("client_secret", client_secret.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
        ];
        let (status, body) = self.post_token_endpoint(&form).await?;

        let response: TokenEndpointResponse = serde_json::from_value(body.clone())
            .map_err(|e| AppError::Internal(format!("Unreadable token response: {}", e)))?;
        if status != StatusCode::OK || !response.has_access_token() {
            return Err(AppError::TokenEndpoint { status, body });
        }

        record.apply(response, Utc::now().timestamp());
        self.save(&record).await?;
        tracing::debug!("refreshed access token");
        Ok(record)
    }

    /// Return a usable access token, refreshing first when the stored one is
    /// within the skew window of expiry.
    pub async fn valid_access_token(&self) -> Result<String, AppError> {
        let record = self.load().await?.ok_or(AppError::NotAuthorized)?;
        if record.access_token.is_empty() {
            return Err(AppError::NotAuthorized);
        }

        if record.is_expired(Utc::now().timestamp()) {
            let refreshed = self.refresh().await?;
            return Ok(refreshed.access_token);
        }
        Ok(record.access_token)
    }

    async fn post_token_endpoint(
        &self,
        form: &[(&str, &str)],
    ) -> Result<(StatusCode, Value), AppError> {
        let url = format!("{}/v2/oauth/token/", self.config.tiktok.api_base_url);
        let response = self
            .http
            .post(&url)
            .form(form)
            .timeout(TOKEN_ENDPOINT_TIMEOUT)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Token endpoint request failed: {}", e)))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Token endpoint returned non-JSON: {}", e)))?;
        Ok((status, body))
    }

    async fn load(&self) -> Result<Option<TokenRecord>, AppError> {
        self.store
            .load()
            .await
            .map_err(|e| AppError::Internal(format!("Token store: {}", e)))
    }

    async fn save(&self, record: &TokenRecord) -> Result<(), AppError> {
        self.store
            .save(record)
            .await
            .map_err(|e| AppError::Internal(format!("Token store: {}", e)))
    }
}
