#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("manifest decode failed: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("pack process error: {0}")]
    Process(String),

    #[error("network error: {0}")]
    Net(#[from] reqwest::Error),

    #[error("downloaded archive hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },
}

pub type PackResult<T> = Result<T, PackError>;
