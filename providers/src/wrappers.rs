use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use model::{ArchiveProvider, ProviderId, ProviderResult, ScheduleItem, ScheduleProvider, Source};
use tokio::sync::RwLock;

/// Returns empty collections for every query (spec §4.5) — the bootstrap
/// delegate every `Reloadable*` starts with before a pack is loaded.
pub struct EmptyScheduleProvider;

#[async_trait]
impl ScheduleProvider for EmptyScheduleProvider {
    fn provider_id(&self) -> ProviderId {
        ProviderId::from("empty")
    }

    fn display_name(&self) -> String {
        "Brak dostawców".into()
    }

    async fn list_sources(&self, _force_refresh: bool) -> ProviderResult<Vec<Source>> {
        Ok(Vec::new())
    }

    async fn list_days(&self, _force_refresh: bool) -> ProviderResult<Vec<NaiveDate>> {
        Ok(Vec::new())
    }

    async fn get_schedule(&self, _source: &Source, _day: NaiveDate, _force_refresh: bool) -> ProviderResult<Vec<ScheduleItem>> {
        Ok(Vec::new())
    }

    async fn get_item_details(&self, _item: &ScheduleItem, _force_refresh: bool) -> ProviderResult<String> {
        Ok(String::new())
    }
}

pub struct EmptyArchiveProvider;

#[async_trait]
impl ArchiveProvider for EmptyArchiveProvider {
    fn provider_id(&self) -> ProviderId {
        ProviderId::from("empty-archive")
    }

    fn display_name(&self) -> String {
        "Brak dostawców".into()
    }

    async fn list_years(&self) -> ProviderResult<Vec<i32>> {
        Ok(Vec::new())
    }

    async fn list_days_in_month(&self, _year: i32, _month: u32, _force_refresh: bool) -> ProviderResult<Vec<NaiveDate>> {
        Ok(Vec::new())
    }

    async fn list_sources_for_day(&self, _day: NaiveDate, _force_refresh: bool) -> ProviderResult<Vec<Source>> {
        Ok(Vec::new())
    }

    async fn get_schedule(&self, _source: &Source, _day: NaiveDate, _force_refresh: bool) -> ProviderResult<Vec<ScheduleItem>> {
        Ok(Vec::new())
    }
}

/// Dispatches `get_*` by matching `source.provider_id`/`item.provider_id`
/// against the wrapped providers; merges `list_*` results (spec §4.5).
pub struct CompositeScheduleProvider {
    providers: Vec<Arc<dyn ScheduleProvider>>,
}

impl CompositeScheduleProvider {
    pub fn new(providers: Vec<Arc<dyn ScheduleProvider>>) -> Self {
        Self { providers }
    }

    fn find(&self, provider_id: &str) -> Option<&Arc<dyn ScheduleProvider>> {
        self.providers.iter().find(|p| p.provider_id().as_str() == provider_id)
    }
}

#[async_trait]
impl ScheduleProvider for CompositeScheduleProvider {
    fn provider_id(&self) -> ProviderId {
        ProviderId::from("composite")
    }

    fn display_name(&self) -> String {
        "Dostawcy".into()
    }

    async fn list_sources(&self, force_refresh: bool) -> ProviderResult<Vec<Source>> {
        let mut sources = Vec::new();
        for p in &self.providers {
            sources.extend(p.list_sources(force_refresh).await?);
        }
        sources.sort_by_key(|s| s.name.to_lowercase());
        Ok(sources)
    }

    async fn list_days(&self, force_refresh: bool) -> ProviderResult<Vec<NaiveDate>> {
        let mut days = BTreeSet::new();
        for p in &self.providers {
            days.extend(p.list_days(force_refresh).await?);
        }
        Ok(days.into_iter().collect())
    }

    /// Dispatches to whichever wrapped provider owns `provider_id`, rather
    /// than falling back to the default trait method's self-id check (which
    /// would only ever match the synthetic `"composite"` id and starve
    /// every real provider's per-provider day list).
    async fn list_days_for_provider(&self, provider_id: &str, force_refresh: bool) -> ProviderResult<Vec<NaiveDate>> {
        match self.find(provider_id) {
            Some(p) => p.list_days_for_provider(provider_id, force_refresh).await,
            None => Ok(Vec::new()),
        }
    }

    async fn get_schedule(&self, source: &Source, day: NaiveDate, force_refresh: bool) -> ProviderResult<Vec<ScheduleItem>> {
        match self.find(source.provider_id.as_str()) {
            Some(p) => p.get_schedule(source, day, force_refresh).await,
            None => Ok(Vec::new()),
        }
    }

    async fn get_item_details(&self, item: &ScheduleItem, force_refresh: bool) -> ProviderResult<String> {
        match self.find(item.provider_id.as_str()) {
            Some(p) => p.get_item_details(item, force_refresh).await,
            None => Ok(String::new()),
        }
    }
}

pub struct CompositeArchiveProvider {
    providers: Vec<Arc<dyn ArchiveProvider>>,
}

impl CompositeArchiveProvider {
    pub fn new(providers: Vec<Arc<dyn ArchiveProvider>>) -> Self {
        Self { providers }
    }

    fn find(&self, provider_id: &str) -> Option<&Arc<dyn ArchiveProvider>> {
        self.providers.iter().find(|p| p.provider_id().as_str() == provider_id)
    }
}

#[async_trait]
impl ArchiveProvider for CompositeArchiveProvider {
    fn provider_id(&self) -> ProviderId {
        ProviderId::from("composite-archive")
    }

    fn display_name(&self) -> String {
        "Programy archiwalne".into()
    }

    async fn list_years(&self) -> ProviderResult<Vec<i32>> {
        let mut years = BTreeSet::new();
        for p in &self.providers {
            years.extend(p.list_years().await?);
        }
        Ok(years.into_iter().collect())
    }

    async fn list_days_in_month(&self, year: i32, month: u32, force_refresh: bool) -> ProviderResult<Vec<NaiveDate>> {
        let mut days = BTreeSet::new();
        for p in &self.providers {
            days.extend(p.list_days_in_month(year, month, force_refresh).await?);
        }
        Ok(days.into_iter().collect())
    }

    async fn list_sources_for_day(&self, day: NaiveDate, force_refresh: bool) -> ProviderResult<Vec<Source>> {
        let mut sources = Vec::new();
        for p in &self.providers {
            sources.extend(p.list_sources_for_day(day, force_refresh).await?);
        }
        sources.sort_by_key(|s| s.name.to_lowercase());
        Ok(sources)
    }

    async fn get_schedule(&self, source: &Source, day: NaiveDate, force_refresh: bool) -> ProviderResult<Vec<ScheduleItem>> {
        match self.find(source.provider_id.as_str()) {
            Some(p) => p.get_schedule(source, day, force_refresh).await,
            None => Ok(Vec::new()),
        }
    }
}

/// A mutex-guarded holder whose [`Self::set_delegate`] atomically replaces
/// the underlying provider; every read observes one consistent snapshot
/// (spec §4.5). `tokio::sync::RwLock` stands in for the original's
/// `threading.RLock`, since every call here is already `async`.
pub struct ReloadableScheduleProvider {
    delegate: RwLock<Arc<dyn ScheduleProvider>>,
}

impl ReloadableScheduleProvider {
    pub fn new(delegate: Arc<dyn ScheduleProvider>) -> Self {
        Self { delegate: RwLock::new(delegate) }
    }

    pub async fn set_delegate(&self, delegate: Arc<dyn ScheduleProvider>) {
        *self.delegate.write().await = delegate;
    }

    async fn get(&self) -> Arc<dyn ScheduleProvider> {
        self.delegate.read().await.clone()
    }
}

#[async_trait]
impl ScheduleProvider for ReloadableScheduleProvider {
    fn provider_id(&self) -> ProviderId {
        // Synchronous trait method over an async lock: `try_read` never
        // contends in practice since writers only hold the lock for the
        // duration of a pointer swap, never across an await point.
        self.delegate
            .try_read()
            .map(|d| d.provider_id())
            .unwrap_or_else(|_| ProviderId::from("reloadable"))
    }

    fn display_name(&self) -> String {
        self.delegate
            .try_read()
            .map(|d| d.display_name())
            .unwrap_or_else(|_| "...".into())
    }

    async fn list_sources(&self, force_refresh: bool) -> ProviderResult<Vec<Source>> {
        self.get().await.list_sources(force_refresh).await
    }

    async fn list_days(&self, force_refresh: bool) -> ProviderResult<Vec<NaiveDate>> {
        self.get().await.list_days(force_refresh).await
    }

    async fn list_days_for_provider(&self, provider_id: &str, force_refresh: bool) -> ProviderResult<Vec<NaiveDate>> {
        self.get().await.list_days_for_provider(provider_id, force_refresh).await
    }

    async fn get_schedule(&self, source: &Source, day: NaiveDate, force_refresh: bool) -> ProviderResult<Vec<ScheduleItem>> {
        self.get().await.get_schedule(source, day, force_refresh).await
    }

    async fn get_item_details(&self, item: &ScheduleItem, force_refresh: bool) -> ProviderResult<String> {
        self.get().await.get_item_details(item, force_refresh).await
    }
}

pub struct ReloadableArchiveProvider {
    delegate: RwLock<Arc<dyn ArchiveProvider>>,
}

impl ReloadableArchiveProvider {
    pub fn new(delegate: Arc<dyn ArchiveProvider>) -> Self {
        Self { delegate: RwLock::new(delegate) }
    }

    pub async fn set_delegate(&self, delegate: Arc<dyn ArchiveProvider>) {
        *self.delegate.write().await = delegate;
    }

    async fn get(&self) -> Arc<dyn ArchiveProvider> {
        self.delegate.read().await.clone()
    }
}

#[async_trait]
impl ArchiveProvider for ReloadableArchiveProvider {
    fn provider_id(&self) -> ProviderId {
        self.delegate
            .try_read()
            .map(|d| d.provider_id())
            .unwrap_or_else(|_| ProviderId::from("reloadable-archive"))
    }

    fn display_name(&self) -> String {
        self.delegate
            .try_read()
            .map(|d| d.display_name())
            .unwrap_or_else(|_| "...".into())
    }

    async fn list_years(&self) -> ProviderResult<Vec<i32>> {
        self.get().await.list_years().await
    }

    async fn list_days_in_month(&self, year: i32, month: u32, force_refresh: bool) -> ProviderResult<Vec<NaiveDate>> {
        self.get().await.list_days_in_month(year, month, force_refresh).await
    }

    async fn list_sources_for_day(&self, day: NaiveDate, force_refresh: bool) -> ProviderResult<Vec<Source>> {
        self.get().await.list_sources_for_day(day, force_refresh).await
    }

    async fn get_schedule(&self, source: &Source, day: NaiveDate, force_refresh: bool) -> ProviderResult<Vec<ScheduleItem>> {
        self.get().await.get_schedule(source, day, force_refresh).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubSchedule(&'static str);

    #[async_trait]
    impl ScheduleProvider for StubSchedule {
        fn provider_id(&self) -> ProviderId {
            ProviderId::from(self.0)
        }
        fn display_name(&self) -> String {
            self.0.into()
        }
        async fn list_sources(&self, _force_refresh: bool) -> ProviderResult<Vec<Source>> {
            Ok(vec![Source::new(self.0, "x", format!("{}-name", self.0))])
        }
        async fn list_days(&self, _force_refresh: bool) -> ProviderResult<Vec<NaiveDate>> {
            Ok(vec![NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()])
        }
        async fn get_schedule(&self, source: &Source, day: NaiveDate, _force_refresh: bool) -> ProviderResult<Vec<ScheduleItem>> {
            Ok(vec![ScheduleItem {
                provider_id: source.provider_id.clone(),
                source: source.clone(),
                day,
                start_time: None,
                end_time: None,
                title: "t".into(),
                subtitle: None,
                details_ref: None,
                details_summary: None,
                accessibility: vec![],
            }])
        }
        async fn get_item_details(&self, _item: &ScheduleItem, _force_refresh: bool) -> ProviderResult<String> {
            Ok("d".into())
        }
    }

    #[tokio::test]
    async fn composite_dispatches_by_provider_id_and_merges_lists() {
        let composite = CompositeScheduleProvider::new(vec![Arc::new(StubSchedule("a")), Arc::new(StubSchedule("b"))]);
        let sources = composite.list_sources(false).await.unwrap();
        assert_eq!(sources.len(), 2);

        let source = Source::new("b", "x", "b-name");
        let items = composite.get_schedule(&source, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), false).await.unwrap();
        assert_eq!(items[0].provider_id.as_str(), "b");
    }

    #[tokio::test]
    async fn reloadable_swap_is_observed_by_next_read() {
        let reloadable = ReloadableScheduleProvider::new(Arc::new(StubSchedule("a")));
        assert_eq!(reloadable.list_sources(false).await.unwrap()[0].provider_id.as_str(), "a");
        reloadable.set_delegate(Arc::new(StubSchedule("b"))).await;
        assert_eq!(reloadable.list_sources(false).await.unwrap()[0].provider_id.as_str(), "b");
    }

    #[tokio::test]
    async fn composite_list_days_for_provider_dispatches_instead_of_always_empty() {
        let composite = CompositeScheduleProvider::new(vec![Arc::new(StubSchedule("a")), Arc::new(StubSchedule("b"))]);
        let days = composite.list_days_for_provider("b", false).await.unwrap();
        assert_eq!(days, vec![NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()]);

        let unknown = composite.list_days_for_provider("nonexistent", false).await.unwrap();
        assert!(unknown.is_empty());
    }
}
