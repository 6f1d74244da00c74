use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use store::KvCache;
use tokio::sync::Mutex;

use crate::error::NetResult;

/// Shared HTTP client over a single connection pool, write-through cached
/// in the KV cache (spec §4.1). The teacher's `threading.Lock` around
/// `session.get`/`session.post` becomes a `tokio::sync::Mutex` serializing
/// outbound requests — a single "session-global" politeness lock, not one
/// per origin.
pub struct HttpFetcher {
    client: Client,
    cache: Arc<KvCache>,
    lock: Mutex<()>,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, cache: Arc<KvCache>) -> NetResult<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            reqwest::header::HeaderValue::from_static("pl,en;q=0.8"),
        );
        let client = Client::builder()
            .user_agent(user_agent.to_owned())
            .default_headers(headers)
            .build()?;
        Ok(Self { client, cache, lock: Mutex::new(()) })
    }

    pub async fn get_text(
        &self,
        url: &str,
        cache_key: Option<&str>,
        ttl_seconds: Option<i64>,
        force_refresh: bool,
        timeout_seconds: f64,
    ) -> NetResult<String> {
        if let (Some(key), false) = (cache_key, force_refresh) {
            if let Ok(Some(cached)) = self.cache.get_text(key) {
                return Ok(cached);
            }
        }

        let text = {
            let _guard = self.lock.lock().await;
            let resp = self
                .client
                .get(url)
                .timeout(Duration::from_secs_f64(timeout_seconds))
                .send()
                .await?;
            resp.error_for_status()?.text().await?
        };

        if let (Some(key), Some(ttl)) = (cache_key, ttl_seconds) {
            if let Err(err) = self.cache.set_text(key, &text, ttl) {
                tracing::warn!(error = %err, key, "failed to write http cache entry");
            }
        }
        Ok(text)
    }

    pub async fn post_form_text(
        &self,
        url: &str,
        data: &HashMap<String, String>,
        cache_key: Option<&str>,
        ttl_seconds: Option<i64>,
        force_refresh: bool,
        timeout_seconds: f64,
    ) -> NetResult<String> {
        if let (Some(key), false) = (cache_key, force_refresh) {
            if let Ok(Some(cached)) = self.cache.get_text(key) {
                return Ok(cached);
            }
        }

        let text = {
            let _guard = self.lock.lock().await;
            let resp = self
                .client
                .post(url)
                .form(data)
                .timeout(Duration::from_secs_f64(timeout_seconds))
                .send()
                .await?;
            resp.error_for_status()?.text().await?
        };

        if let (Some(key), Some(ttl)) = (cache_key, ttl_seconds) {
            if let Err(err) = self.cache.set_text(key, &text, ttl) {
                tracing::warn!(error = %err, key, "failed to write http cache entry");
            }
        }
        Ok(text)
    }

    pub fn client(&self) -> Client {
        self.client.clone()
    }
}

/// Free function, not a worker method — the original is a bare `@staticmethod`.
pub async fn polite_delay(seconds: f64) {
    if seconds <= 0.0 {
        return;
    }
    tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> (HttpFetcher, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(KvCache::open_standalone(dir.path().join("http.sled")).unwrap());
        (HttpFetcher::new("programista-test/1.0", cache).unwrap(), dir)
    }

    #[tokio::test]
    async fn cache_hit_skips_the_request_entirely() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/guide"))
            .respond_with(ResponseTemplate::new(200).set_body_string("fresh"))
            .expect(1)
            .mount(&server)
            .await;

        let (fetcher, _dir) = fetcher();
        let url = format!("{}/guide", server.uri());

        let first = fetcher.get_text(&url, Some("guide"), Some(60), false, 5.0).await.unwrap();
        assert_eq!(first, "fresh");

        let second = fetcher.get_text(&url, Some("guide"), Some(60), false, 5.0).await.unwrap();
        assert_eq!(second, "fresh");
    }

    #[tokio::test]
    async fn force_refresh_bypasses_the_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/guide"))
            .respond_with(ResponseTemplate::new(200).set_body_string("second"))
            .expect(2)
            .mount(&server)
            .await;

        let (fetcher, _dir) = fetcher();
        let url = format!("{}/guide", server.uri());

        fetcher.get_text(&url, Some("guide"), Some(60), false, 5.0).await.unwrap();
        let refreshed = fetcher.get_text(&url, Some("guide"), Some(60), true, 5.0).await.unwrap();
        assert_eq!(refreshed, "second");
    }

    #[tokio::test]
    async fn non_2xx_status_raises() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let (fetcher, _dir) = fetcher();
        let url = format!("{}/missing", server.uri());
        assert!(fetcher.get_text(&url, None, None, false, 5.0).await.is_err());
    }
}
