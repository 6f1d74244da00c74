#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("cache storage failed: {0}")]
    Kv(#[from] sled::Error),

    #[error("search index storage failed: {0}")]
    Index(#[from] rusqlite::Error),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
