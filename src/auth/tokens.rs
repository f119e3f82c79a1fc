use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Refresh this many seconds before the access token actually expires, so a
/// token can never lapse mid-request.
pub const TOKEN_SKEW_SECONDS: i64 = 120;

/// The persisted OAuth token document. One record per deployment, replaced
/// wholesale on every exchange or refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Absolute unix timestamp (seconds).
    pub expires_at: i64,
    #[serde(default)]
    pub refresh_expires_at: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub open_id: Option<String>,
    /// Any other provider fields, preserved opaquely.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of a successful (or failed) call to the provider's token endpoint.
/// TikTok uses non-standard names: client_key, refresh_expires_in, open_id.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenEndpointResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub open_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenEndpointResponse {
    pub fn has_access_token(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

impl TokenRecord {
    /// Build a fresh record from a code-exchange response. Returns None when
    /// the response carries no access token; no partial record is ever created.
    pub fn from_response(response: TokenEndpointResponse, now: i64) -> Option<Self> {
        if !response.has_access_token() {
            return None;
        }
        let access_token = response.access_token.unwrap_or_default();
        Some(Self {
            access_token,
            refresh_token: response.refresh_token,
            expires_at: now + response.expires_in.unwrap_or(0),
            refresh_expires_at: response.refresh_expires_in.map(|s| now + s),
            scope: response.scope,
            open_id: response.open_id,
            extra: response.extra,
        })
    }

    /// Field-by-field refresh update rule. Fields the response omits keep
    /// their stored values (notably open_id, which refresh responses drop);
    /// expiry timestamps are always recomputed from now.
    pub fn apply(&mut self, response: TokenEndpointResponse, now: i64) {
        if let Some(token) = response.access_token {
            if !token.is_empty() {
                self.access_token = token;
            }
        }
        if response.refresh_token.is_some() {
            self.refresh_token = response.refresh_token;
        }
        self.expires_at = now + response.expires_in.unwrap_or(0);
        if let Some(seconds) = response.refresh_expires_in {
            self.refresh_expires_at = Some(now + seconds);
        }
        if response.scope.is_some() {
            self.scope = response.scope;
        }
        if response.open_id.is_some() {
            self.open_id = response.open_id;
        }
        for (key, value) in response.extra {
            self.extra.insert(key, value);
        }
    }

    /// True once the access token is within the skew window of expiry.
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at - TOKEN_SKEW_SECONDS
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn exchange_response() -> TokenEndpointResponse {
        serde_json::from_value(json!({
            "access_token": "act.initial",
            "refresh_token": "rft.initial",
            "expires_in": 86400,
            "refresh_expires_in": 31536000,
            "scope": "user.info.basic,video.upload,video.publish",
            "open_id": "open-id-123",
            "token_type": "Bearer",
        }))
        .unwrap()
    }

    #[test]
    fn test_from_response_populates_all_fields() {
        let record = TokenRecord::from_response(exchange_response(), 1_000).unwrap();

        assert_eq!(record.access_token, "act.initial");
        assert_eq!(record.refresh_token.as_deref(), Some("rft.initial"));
        assert_eq!(record.expires_at, 1_000 + 86400);
        assert_eq!(record.refresh_expires_at, Some(1_000 + 31536000));
        assert_eq!(record.open_id.as_deref(), Some("open-id-123"));
        assert_eq!(record.extra.get("token_type"), Some(&json!("Bearer")));
    }

    #[test]
    fn test_from_response_rejects_missing_access_token() {
        let response: TokenEndpointResponse = serde_json::from_value(json!({
            "error": "invalid_grant",
            "error_description": "Authorization code is expired.",
        }))
        .unwrap();
        assert!(TokenRecord::from_response(response, 1_000).is_none());

        let response: TokenEndpointResponse =
            serde_json::from_value(json!({"access_token": ""})).unwrap();
        assert!(TokenRecord::from_response(response, 1_000).is_none());
    }

    #[test]
    fn test_apply_preserves_fields_the_refresh_omits() {
        let mut record = TokenRecord::from_response(exchange_response(), 1_000).unwrap();

        let refresh: TokenEndpointResponse = serde_json::from_value(json!({
            "access_token": "act.refreshed",
            "expires_in": 86400,
        }))
        .unwrap();
        record.apply(refresh, 50_000);

        assert_eq!(record.access_token, "act.refreshed");
        assert_eq!(record.expires_at, 50_000 + 86400);
        // Omitted by the refresh response, carried over from the exchange.
        assert_eq!(record.refresh_token.as_deref(), Some("rft.initial"));
        assert_eq!(record.refresh_expires_at, Some(1_000 + 31536000));
        assert_eq!(record.open_id.as_deref(), Some("open-id-123"));
        assert_eq!(
            record.scope.as_deref(),
            Some("user.info.basic,video.upload,video.publish")
        );
    }

    #[test]
    fn test_expiry_skew_boundary() {
        let record = TokenRecord::from_response(exchange_response(), 0).unwrap();
        // expires_at = 86400, skew = 120
        assert!(!record.is_expired(86400 - TOKEN_SKEW_SECONDS - 1));
        assert!(record.is_expired(86400 - TOKEN_SKEW_SECONDS));
        assert!(record.is_expired(86400));
        assert!(record.is_expired(100_000));
    }

    #[test]
    fn test_record_round_trips_through_json() {
        let record = TokenRecord::from_response(exchange_response(), 1_000).unwrap();
        let text = serde_json::to_string_pretty(&record).unwrap();
        let back: TokenRecord = serde_json::from_str(&text).unwrap();

        assert_eq!(back.access_token, record.access_token);
        assert_eq!(back.expires_at, record.expires_at);
        assert_eq!(back.extra.get("token_type"), Some(&json!("Bearer")));
    }
}
