use super::{StorageResult, TokenStore};
use crate::auth::tokens::TokenRecord;
use std::path::PathBuf;
use tokio::fs;

/// Whole-document JSON token store at a configured path.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> StorageResult<Option<TokenRecord>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let record = serde_json::from_slice(&bytes)?;
        Ok(Some(record))
    }

    async fn save(&self, record: &TokenRecord) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(record)?;
        fs::write(&self.path, bytes).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tokens::TokenEndpointResponse;
    use serde_json::json;

    fn sample_record() -> TokenRecord {
        let response: TokenEndpointResponse = serde_json::from_value(json!({
            "access_token": "act.stored",
            "refresh_token": "rft.stored",
            "expires_in": 86400,
            "refresh_expires_in": 31536000,
            "scope": "user.info.basic",
            "open_id": "open-id-xyz",
        }))
        .unwrap();
        TokenRecord::from_response(response, 1_700_000_000).unwrap()
    }

    #[tokio::test]
    async fn test_load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("tokens.json"));

        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("tokens.json"));

        let record = sample_record();
        store.save(&record).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.access_token, "act.stored");
        assert_eq!(loaded.open_id.as_deref(), Some("open-id-xyz"));
        assert_eq!(loaded.expires_at, record.expires_at);
    }

    #[tokio::test]
    async fn test_save_replaces_document_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("tokens.json"));

        let mut record = sample_record();
        store.save(&record).await.unwrap();

        record.access_token = "act.second".to_string();
        record.extra.remove("scope");
        store.save(&record).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.access_token, "act.second");
    }

    #[tokio::test]
    async fn test_corrupt_document_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        tokio::fs::write(&path, b"not json").await.unwrap();

        let store = FileTokenStore::new(path);
        assert!(store.load().await.is_err());
    }
}
