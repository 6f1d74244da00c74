use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use model::{ArchiveProvider, ProviderId, ProviderResult, ScheduleItem, ScheduleProvider, Source};
use serde::{Deserialize, Serialize};

use crate::kv_cache::KvCache;

/// `(kind, provider_id, source_id, day)` cache key, spec §4.4:
/// `schedule:v1:<kind>:<provider_id>:<source_id>:<YYYY-MM-DD>`.
fn schedule_cache_key(kind: &str, source: &Source, day: NaiveDate) -> String {
    format!(
        "schedule:v1:{kind}:{}:{}:{day}",
        source.provider_id.as_str(),
        source.id.as_str(),
    )
}

#[derive(Serialize, Deserialize)]
struct CachedItem {
    start: Option<String>,
    end: Option<String>,
    title: String,
    subtitle: Option<String>,
    details_ref: Option<String>,
    details_summary: Option<String>,
    accessibility: Vec<model::AccessibilityFeature>,
}

fn encode_items(items: &[ScheduleItem]) -> Vec<CachedItem> {
    items
        .iter()
        .map(|it| CachedItem {
            start: it.start_time.map(|t| t.format("%H:%M").to_string()),
            end: it.end_time.map(|t| t.format("%H:%M").to_string()),
            title: it.title.clone(),
            subtitle: it.subtitle.clone(),
            details_ref: it.details_ref.clone(),
            details_summary: it.details_summary.clone(),
            accessibility: it.accessibility.clone(),
        })
        .collect()
}

/// Rehydrates cached items against the *caller's* `source`/`day` identity,
/// never the one that was cached (spec §4.4). Entries with no title, or
/// that fail to decode, are dropped — and if the whole list decodes to
/// nothing usable the caller is expected to treat it as a miss via the
/// `Option` return.
fn decode_items(raw: &[CachedItem], source: &Source, day: NaiveDate) -> Vec<ScheduleItem> {
    raw.iter()
        .filter(|c| !c.title.trim().is_empty())
        .map(|c| ScheduleItem {
            provider_id: source.provider_id.clone(),
            source: source.clone(),
            day,
            start_time: c.start.as_deref().and_then(parse_hhmm),
            end_time: c.end.as_deref().and_then(parse_hhmm),
            title: c.title.clone(),
            subtitle: c.subtitle.clone(),
            details_ref: c.details_ref.clone(),
            details_summary: c.details_summary.clone(),
            accessibility: c.accessibility.clone(),
        })
        .collect()
}

fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M").ok()
}

/// Memoizing decorator over a [`ScheduleProvider`] (spec §4.4). `list_*`
/// calls pass straight through (the underlying HTTP fetcher already
/// caches); only `get_schedule` is write-through cached, keyed per
/// `(kind, source, day)`.
pub struct CachedScheduleProvider {
    delegate: Arc<dyn ScheduleProvider>,
    cache: Arc<KvCache>,
    kind: &'static str,
    ttl_seconds: i64,
}

impl CachedScheduleProvider {
    pub fn new(delegate: Arc<dyn ScheduleProvider>, cache: Arc<KvCache>, kind: &'static str, ttl_seconds: i64) -> Self {
        Self { delegate, cache, kind, ttl_seconds }
    }
}

#[async_trait]
impl ScheduleProvider for CachedScheduleProvider {
    fn provider_id(&self) -> ProviderId {
        self.delegate.provider_id()
    }

    fn display_name(&self) -> String {
        self.delegate.display_name()
    }

    async fn list_sources(&self, force_refresh: bool) -> ProviderResult<Vec<Source>> {
        self.delegate.list_sources(force_refresh).await
    }

    async fn list_days(&self, force_refresh: bool) -> ProviderResult<Vec<NaiveDate>> {
        self.delegate.list_days(force_refresh).await
    }

    async fn list_days_for_provider(&self, provider_id: &str, force_refresh: bool) -> ProviderResult<Vec<NaiveDate>> {
        self.delegate.list_days_for_provider(provider_id, force_refresh).await
    }

    async fn get_schedule(&self, source: &Source, day: NaiveDate, force_refresh: bool) -> ProviderResult<Vec<ScheduleItem>> {
        let key = schedule_cache_key(self.kind, source, day);
        if !force_refresh {
            if let Ok(Some(raw)) = self.cache.get_json::<Vec<CachedItem>>(&key) {
                return Ok(decode_items(&raw, source, day));
            }
        }

        let items = self.delegate.get_schedule(source, day, force_refresh).await?;
        let encoded = encode_items(&items);
        if let Err(err) = self.cache.set_json(&key, &encoded, self.ttl_seconds) {
            tracing::warn!(error = %err, key, "failed to write schedule cache entry");
        }
        Ok(items)
    }

    async fn get_item_details(&self, item: &ScheduleItem, force_refresh: bool) -> ProviderResult<String> {
        self.delegate.get_item_details(item, force_refresh).await
    }
}

/// Memoizing decorator over an [`ArchiveProvider`] (spec §4.4), always
/// keyed under `kind = "archive"`.
pub struct CachedArchiveProvider {
    delegate: Arc<dyn ArchiveProvider>,
    cache: Arc<KvCache>,
    ttl_seconds: i64,
}

impl CachedArchiveProvider {
    pub fn new(delegate: Arc<dyn ArchiveProvider>, cache: Arc<KvCache>, ttl_seconds: i64) -> Self {
        Self { delegate, cache, ttl_seconds }
    }
}

#[async_trait]
impl ArchiveProvider for CachedArchiveProvider {
    fn provider_id(&self) -> ProviderId {
        self.delegate.provider_id()
    }

    fn display_name(&self) -> String {
        self.delegate.display_name()
    }

    async fn list_years(&self) -> ProviderResult<Vec<i32>> {
        self.delegate.list_years().await
    }

    async fn list_days_in_month(&self, year: i32, month: u32, force_refresh: bool) -> ProviderResult<Vec<NaiveDate>> {
        self.delegate.list_days_in_month(year, month, force_refresh).await
    }

    async fn list_sources_for_day(&self, day: NaiveDate, force_refresh: bool) -> ProviderResult<Vec<Source>> {
        self.delegate.list_sources_for_day(day, force_refresh).await
    }

    async fn get_schedule(&self, source: &Source, day: NaiveDate, force_refresh: bool) -> ProviderResult<Vec<ScheduleItem>> {
        let key = schedule_cache_key("archive", source, day);
        if !force_refresh {
            if let Ok(Some(raw)) = self.cache.get_json::<Vec<CachedItem>>(&key) {
                return Ok(decode_items(&raw, source, day));
            }
        }

        let items = self.delegate.get_schedule(source, day, force_refresh).await?;
        let encoded = encode_items(&items);
        if let Err(err) = self.cache.set_json(&key, &encoded, self.ttl_seconds) {
            tracing::warn!(error = %err, key, "failed to write archive cache entry");
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingStub {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ScheduleProvider for CountingStub {
        fn provider_id(&self) -> ProviderId {
            ProviderId::from("stub")
        }
        fn display_name(&self) -> String {
            "Stub".into()
        }
        async fn list_sources(&self, _force_refresh: bool) -> ProviderResult<Vec<Source>> {
            Ok(vec![])
        }
        async fn list_days(&self, _force_refresh: bool) -> ProviderResult<Vec<NaiveDate>> {
            Ok(vec![])
        }
        async fn get_schedule(&self, source: &Source, day: NaiveDate, _force_refresh: bool) -> ProviderResult<Vec<ScheduleItem>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![ScheduleItem {
                provider_id: source.provider_id.clone(),
                source: source.clone(),
                day,
                start_time: NaiveTime::parse_from_str("10:00", "%H:%M").ok(),
                end_time: None,
                title: "Hello".into(),
                subtitle: None,
                details_ref: None,
                details_summary: None,
                accessibility: vec![],
            }])
        }
        async fn get_item_details(&self, _item: &ScheduleItem, _force_refresh: bool) -> ProviderResult<String> {
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn second_call_within_ttl_does_not_invoke_delegate() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(KvCache::open_standalone(dir.path().join("cache.sled")).unwrap());
        let stub = Arc::new(CountingStub { calls: AtomicUsize::new(0) });
        let cached = CachedScheduleProvider::new(stub.clone(), cache, "tv", 60);

        let source = Source::new("x", "y", "Y");
        let day = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();

        let first = cached.get_schedule(&source, day, false).await.unwrap();
        let second = cached.get_schedule(&source, day, false).await.unwrap();

        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        assert_eq!(first[0].title, "Hello");
    }
}
