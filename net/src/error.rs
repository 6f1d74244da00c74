#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cache storage failed: {0}")]
    Store(#[from] store::StoreError),

    #[error("{0}")]
    Other(String),
}

pub type NetResult<T> = Result<T, NetError>;

impl From<String> for NetError {
    fn from(msg: String) -> Self {
        NetError::Other(msg)
    }
}
