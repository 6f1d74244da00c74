use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A monotonically-increasing request token shared between the UI thread
/// and whatever issued a superseded-able background operation (spec §5,
/// Design Notes "request-token freshness"). The UI issues a new value
/// before starting work; a completion handler only applies its result if
/// the token it captured is still current.
#[derive(Clone, Debug, Default)]
pub struct RequestTokenSource {
    current: Arc<AtomicU64>,
}

/// A snapshot of the source at the moment work started.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RequestToken(u64);

impl RequestTokenSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a new token, superseding any previously issued one.
    pub fn issue(&self) -> RequestToken {
        let value = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        RequestToken(value)
    }

    /// True if `token` is still the most recently issued one.
    pub fn is_current(&self, token: RequestToken) -> bool {
        self.current.load(Ordering::SeqCst) == token.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn superseded_token_is_stale() {
        let src = RequestTokenSource::new();
        let first = src.issue();
        assert!(src.is_current(first));
        let second = src.issue();
        assert!(!src.is_current(first));
        assert!(src.is_current(second));
    }
}
