use async_trait::async_trait;
use chrono::NaiveDate;

use crate::ids::ProviderId;
use crate::provider_error::ProviderResult;
use crate::schedule_item::ScheduleItem;
use crate::source::Source;

/// Capability contract for a TV, TV-accessibility, radio, or favorites
/// source (spec §4.5). `list_days_for_provider` is the "optional
/// capability" from the Design Notes — a default trait method rather than
/// a second marker trait, so a caller never has to downcast or reflect to
/// find out whether a provider refines it.
#[async_trait]
pub trait ScheduleProvider: Send + Sync {
    fn provider_id(&self) -> ProviderId;
    fn display_name(&self) -> String;

    async fn list_sources(&self, force_refresh: bool) -> ProviderResult<Vec<Source>>;
    async fn list_days(&self, force_refresh: bool) -> ProviderResult<Vec<NaiveDate>>;

    /// Default: providers that don't refine this fall back to the global
    /// day list when asked about their own id, and an empty list for any
    /// other id (mirrors `CachedScheduleProvider.list_days_for_provider`'s
    /// `getattr(..., None)` fallback).
    async fn list_days_for_provider(
        &self,
        provider_id: &str,
        force_refresh: bool,
    ) -> ProviderResult<Vec<NaiveDate>> {
        if provider_id == self.provider_id().as_str() {
            self.list_days(force_refresh).await
        } else {
            Ok(Vec::new())
        }
    }

    async fn get_schedule(
        &self,
        source: &Source,
        day: NaiveDate,
        force_refresh: bool,
    ) -> ProviderResult<Vec<ScheduleItem>>;

    async fn get_item_details(&self, item: &ScheduleItem, force_refresh: bool) -> ProviderResult<String>;
}

/// Capability contract for a historical-archive source (spec §4.5).
#[async_trait]
pub trait ArchiveProvider: Send + Sync {
    fn provider_id(&self) -> ProviderId;
    fn display_name(&self) -> String;

    async fn list_years(&self) -> ProviderResult<Vec<i32>>;

    async fn list_days_in_month(
        &self,
        year: i32,
        month: u32,
        force_refresh: bool,
    ) -> ProviderResult<Vec<NaiveDate>>;

    async fn list_sources_for_day(&self, day: NaiveDate, force_refresh: bool) -> ProviderResult<Vec<Source>>;

    async fn get_schedule(
        &self,
        source: &Source,
        day: NaiveDate,
        force_refresh: bool,
    ) -> ProviderResult<Vec<ScheduleItem>>;
}
