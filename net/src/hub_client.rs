use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use model::{AccessibilityFeature, Kind, SearchResult};
use reqwest::Client;
use serde_json::Value;
use store::SettingsStore;

use crate::error::{NetError, NetResult};

pub const DEFAULT_HUB_BASE_URL: &str = "https://tyflo.eu.org/programista/api";
pub const DEFAULT_API_KEY_HEADER: &str = "X-Programista-Key";

struct HubRegistration {
    api_key: String,
}

/// Remote search/details client, talking to the same hub API the original's
/// `hub_api.py` does (spec §4.10). Holds a `reqwest::Client` with its own
/// connection pool (distinct from [`crate::http_fetcher::HttpFetcher`] —
/// this traffic is never cached at the KV layer, only the API key is
/// persisted) and an `Arc<SettingsStore>` for key issuance/storage.
pub struct HubClient {
    settings: Arc<SettingsStore>,
    base_url: String,
    app_version: String,
    client: Client,
    api_key_header: String,
}

impl HubClient {
    pub fn new(settings: Arc<SettingsStore>, base_url: Option<&str>, app_version: &str, user_agent: &str) -> NetResult<Self> {
        let client = Client::builder().user_agent(user_agent.to_owned()).build()?;
        let base_url = base_url
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_HUB_BASE_URL)
            .trim_end_matches('/')
            .to_owned();
        Ok(Self {
            settings,
            base_url,
            app_version: app_version.to_owned(),
            client,
            api_key_header: DEFAULT_API_KEY_HEADER.to_owned(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn get_api_key(&self) -> Option<String> {
        self.settings.get_hub_api_key()
    }

    /// Returns the persisted key, registering a new one if none exists.
    /// Registration failures (network down, server error) surface as
    /// `None`, never a raised error (spec §4.10/§7).
    pub async fn ensure_api_key(&self) -> Option<String> {
        if let Some(existing) = self.get_api_key() {
            return Some(existing);
        }
        let install_id = self.settings.get_or_create_hub_install_id().ok()?;
        let reg = self.register(&install_id).await?;
        self.settings.set_hub_api_key(&reg.api_key).ok()?;
        Some(reg.api_key)
    }

    async fn register(&self, install_id: &str) -> Option<HubRegistration> {
        let payload = serde_json::json!({
            "install_id": install_id,
            "app_version": self.app_version,
            "platform": std::env::consts::OS,
        });
        let resp = self
            .client
            .post(format!("{}/register", self.base_url))
            .json(&payload)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .ok()?;
        let obj: Value = resp.error_for_status().ok()?.json().await.ok()?;
        let api_key = obj.get("api_key")?.as_str()?.trim().to_owned();
        if api_key.is_empty() {
            return None;
        }
        Some(HubRegistration { api_key })
    }

    /// Searches the remote index. An empty `kinds` set means "all four
    /// kinds"; a blank query short-circuits without a request (spec §4.10,
    /// Testable Property 10).
    pub async fn search(&self, query: &str, kinds: &[Kind], limit: usize, cursor: Option<i64>) -> NetResult<Vec<SearchResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let api_key = self
            .ensure_api_key()
            .await
            .ok_or_else(|| NetError::Other("brak klucza API".into()))?;

        let mut kinds: Vec<&str> = if kinds.is_empty() {
            vec!["tv", "radio", "tv_accessibility", "archive"]
        } else {
            kinds.iter().map(Kind::as_str).collect()
        };
        kinds.sort_unstable();

        let mut payload = serde_json::json!({
            "query": query,
            "kinds": kinds,
            "limit": limit.clamp(1, 200),
        });
        if let Some(cursor) = cursor {
            payload["cursor"] = serde_json::json!(cursor);
        }

        let mut resp = self.post_with_key(&format!("{}/search", self.base_url), &payload, &api_key).await?;
        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            let _ = self.settings.clear_hub_api_key();
            let api_key = self
                .ensure_api_key()
                .await
                .ok_or_else(|| NetError::Other("brak klucza API".into()))?;
            resp = self.post_with_key(&format!("{}/search", self.base_url), &payload, &api_key).await?;
        }

        let data: Value = resp.error_for_status()?.json().await?;
        let rows = data.as_array().ok_or_else(|| NetError::Other("nieprawidłowa odpowiedź serwera".into()))?;

        let mut out: Vec<SearchResult> = rows.iter().filter_map(decode_hub_row).collect();
        out.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        Ok(out)
    }

    /// `404` decodes to "no details" (`Ok(None)`); every other failure —
    /// transport, non-2xx, decode, a persistent 401 — bubbles up rather
    /// than collapsing into the same `None` (spec §4.10/§7).
    pub async fn get_details_text(&self, provider_id: &str, details_ref: &str) -> NetResult<Option<String>> {
        let provider_id = provider_id.trim();
        let details_ref = details_ref.trim();
        if provider_id.is_empty() || details_ref.is_empty() {
            return Ok(None);
        }
        let api_key = self
            .ensure_api_key()
            .await
            .ok_or_else(|| NetError::Other("brak klucza API".into()))?;
        let payload = serde_json::json!({ "provider_id": provider_id, "details_ref": details_ref });

        let mut resp = self.post_with_key(&format!("{}/details", self.base_url), &payload, &api_key).await?;
        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            let _ = self.settings.clear_hub_api_key();
            let api_key = self
                .ensure_api_key()
                .await
                .ok_or_else(|| NetError::Other("brak klucza API".into()))?;
            resp = self.post_with_key(&format!("{}/details", self.base_url), &payload, &api_key).await?;
        }
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let obj: Value = resp.error_for_status()?.json().await?;
        let text = obj.get("text").and_then(Value::as_str).unwrap_or("").trim();
        Ok(if text.is_empty() { None } else { Some(text.to_owned()) })
    }

    async fn post_with_key(&self, url: &str, payload: &Value, api_key: &str) -> NetResult<reqwest::Response> {
        Ok(self
            .client
            .post(url)
            .header(self.api_key_header.as_str(), api_key)
            .json(payload)
            .timeout(Duration::from_secs(15))
            .send()
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings() -> (Arc<SettingsStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SettingsStore::open(dir.path().join("settings.json")).unwrap());
        (store, dir)
    }

    #[tokio::test]
    async fn blank_query_never_issues_a_request() {
        let server = MockServer::start().await;
        // No mocks registered: any request would fail to match and panic the server.
        let (settings, _dir) = settings();
        let client = HubClient::new(settings, Some(&server.uri()), "1.0.0", "programista-test/1.0").unwrap();

        let result = client.search("   ", &[], 20, None).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn search_registers_lazily_then_reuses_the_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/register"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"api_key": "k1"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header(DEFAULT_API_KEY_HEADER, "k1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(2)
            .mount(&server)
            .await;

        let (settings, _dir) = settings();
        let client = HubClient::new(settings, Some(&server.uri()), "1.0.0", "programista-test/1.0").unwrap();

        client.search("news", &[Kind::Tv], 20, None).await.unwrap();
        client.search("sport", &[Kind::Tv], 20, None).await.unwrap();
        assert_eq!(client.get_api_key().as_deref(), Some("k1"));
    }

    #[tokio::test]
    async fn a_401_clears_and_reissues_the_key_exactly_once_then_retries() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/register"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"api_key": "k1"})))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/register"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"api_key": "k2"})))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header(DEFAULT_API_KEY_HEADER, "k1"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header(DEFAULT_API_KEY_HEADER, "k2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let (settings, _dir) = settings();
        let client = HubClient::new(settings, Some(&server.uri()), "1.0.0", "programista-test/1.0").unwrap();

        client.search("news", &[Kind::Tv], 20, None).await.unwrap();
        assert_eq!(client.get_api_key().as_deref(), Some("k2"));

        // Third call reuses "k2" without hitting /register again.
        client.search("news", &[Kind::Tv], 20, None).await.unwrap();
    }

    #[tokio::test]
    async fn search_rows_are_normalized_and_sorted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/register"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"api_key": "k1"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "kind": "tv", "provider_id": "teleman", "source_id": "tvp1",
                    "source_name": "TVP1", "day": "2026-01-05", "start_time": "19:00:00",
                    "title": "Evening News", "accessibility": ["AD", "bogus"], "item_id": 9,
                },
                {
                    "kind": "tv", "provider_id": "teleman", "source_id": "tvp1",
                    "source_name": "TVP1", "day": "2026-01-05", "start_time": "08:00",
                    "title": "Morning News", "accessibility": [], "item_id": 10,
                },
                { "kind": "tv", "title": "" },
            ])))
            .mount(&server)
            .await;

        let (settings, _dir) = settings();
        let client = HubClient::new(settings, Some(&server.uri()), "1.0.0", "programista-test/1.0").unwrap();

        let rows = client.search("news", &[Kind::Tv], 20, None).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].title, "Morning News");
        assert_eq!(rows[0].start, "08:00");
        assert_eq!(rows[1].title, "Evening News");
        assert_eq!(rows[1].accessibility, vec![AccessibilityFeature::AudioDescription]);
    }

    #[tokio::test]
    async fn details_404_returns_none_without_erroring() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/register"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"api_key": "k1"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/details"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let (settings, _dir) = settings();
        let client = HubClient::new(settings, Some(&server.uri()), "1.0.0", "programista-test/1.0").unwrap();
        assert_eq!(client.get_details_text("teleman", "ref-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn details_server_error_bubbles_up_instead_of_collapsing_to_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/register"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"api_key": "k1"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/details"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (settings, _dir) = settings();
        let client = HubClient::new(settings, Some(&server.uri()), "1.0.0", "programista-test/1.0").unwrap();
        assert!(client.get_details_text("teleman", "ref-1").await.is_err());
    }
}

fn decode_hub_row(row: &Value) -> Option<SearchResult> {
    let obj = row.as_object()?;
    let kind: Kind = obj.get("kind")?.as_str()?.parse().ok()?;
    let provider_id = obj.get("provider_id")?.as_str()?.trim().to_owned();
    let source_id = obj.get("source_id")?.as_str()?.trim().to_owned();
    let source_name = obj.get("source_name")?.as_str()?.trim().to_owned();
    let title = obj.get("title")?.as_str()?.trim().to_owned();
    if provider_id.is_empty() || source_id.is_empty() || source_name.is_empty() || title.is_empty() {
        return None;
    }

    let day_raw = obj.get("day")?.as_str()?;
    let day = NaiveDate::parse_from_str(day_raw, "%Y-%m-%d").ok()?;

    let start_raw = obj.get("start_time").and_then(Value::as_str).unwrap_or("").trim();
    let start = if start_raw.len() >= 5 { start_raw[..5].to_owned() } else { start_raw.to_owned() };

    let subtitle = obj.get("subtitle").and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned);
    let details_ref = obj.get("details_ref").and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned);
    let details_summary = obj
        .get("details_summary")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned);
    let item_id = obj.get("item_id").and_then(Value::as_i64);

    let accessibility: Vec<AccessibilityFeature> = obj
        .get("accessibility")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .filter_map(|s| s.trim().parse().ok())
                .collect()
        })
        .unwrap_or_default();

    Some(SearchResult {
        kind,
        provider_id,
        source_id,
        source_name,
        day,
        start,
        title,
        subtitle,
        details_ref,
        details_summary,
        accessibility,
        item_id,
    })
}
