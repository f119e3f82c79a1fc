use super::{StorageResult, TokenStore};
use crate::auth::tokens::TokenRecord;
use tokio::sync::RwLock;

/// In-memory token store for tests.
pub struct MemoryTokenStore {
    record: RwLock<Option<TokenRecord>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self {
            record: RwLock::new(None),
        }
    }

    pub fn with_record(record: TokenRecord) -> Self {
        Self {
            record: RwLock::new(Some(record)),
        }
    }
}

impl Default for MemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> StorageResult<Option<TokenRecord>> {
        Ok(self.record.read().await.clone())
    }

    async fn save(&self, record: &TokenRecord) -> StorageResult<()> {
        *self.record.write().await = Some(record.clone());
        Ok(())
    }
}
