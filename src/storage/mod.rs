//! Token persistence. One JSON document per deployment, read and written
//! whole; the store is the only component that touches it.

pub mod file;
pub mod memory;

pub use file::FileTokenStore;
pub use memory::MemoryTokenStore;

use crate::auth::tokens::TokenRecord;
use std::fmt;

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Serialization(serde_json::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "Storage I/O error: {}", err),
            StorageError::Serialization(err) => write!(f, "Storage serialization error: {}", err),
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err)
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait::async_trait]
pub trait TokenStore: Send + Sync {
    /// Load the stored record, or None when nothing has been persisted yet.
    async fn load(&self) -> StorageResult<Option<TokenRecord>>;

    /// Replace the stored record wholesale.
    async fn save(&self, record: &TokenRecord) -> StorageResult<()>;
}
