use std::sync::Arc;

/// Error surfaced by any provider call. Kept as a boxed, cloneable,
/// type-erased error so `ScheduleProvider`/`ArchiveProvider` stay
/// trait-object friendly across the pack runtime, the cache wrappers, and
/// the favorites overlay, each of which has its own concrete failure
/// modes (HTTP, subprocess I/O, decode).
#[derive(Clone, Debug, thiserror::Error)]
#[error("{0}")]
pub struct ProviderError(Arc<str>);

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(Arc::from(message.into()))
    }
}

impl From<String> for ProviderError {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for ProviderError {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
