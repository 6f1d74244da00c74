use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use model::{
    decode_favorite_source_id, encode_favorite_source_id, FavoriteEntry, FavoriteKind, ProviderId, ProviderResult,
    ScheduleItem, ScheduleProvider, Source,
};
use store::FavoritesStore;

/// Presents every favorited source through the single sentinel
/// `provider_id = "favorites"`, decoding the original `(kind, provider_id,
/// source_id)` on every call and delegating to the matching TV/radio
/// provider (spec §4.7).
pub struct FavoritesProvider {
    store: Arc<FavoritesStore>,
    tv: Arc<dyn ScheduleProvider>,
    radio: Arc<dyn ScheduleProvider>,
}

impl FavoritesProvider {
    pub fn new(store: Arc<FavoritesStore>, tv: Arc<dyn ScheduleProvider>, radio: Arc<dyn ScheduleProvider>) -> Self {
        Self { store, tv, radio }
    }

    fn entry_to_source(entry: &FavoriteEntry) -> Source {
        let label_prefix = if matches!(entry.kind, FavoriteKind::Tv) { "TV: " } else { "Radio: " };
        let encoded_id = encode_favorite_source_id(&entry.as_ref());
        Source::new(model::FAVORITES_PROVIDER_ID, encoded_id, format!("{label_prefix}{}", entry.name))
    }

    fn name_from_source(source: &Source) -> String {
        if let Some(rest) = source.name.strip_prefix("TV: ") {
            rest.to_owned()
        } else if let Some(rest) = source.name.strip_prefix("Radio: ") {
            rest.to_owned()
        } else {
            source.name.clone()
        }
    }

    fn delegate_for_kind(&self, kind: FavoriteKind) -> &Arc<dyn ScheduleProvider> {
        match kind {
            FavoriteKind::Tv => &self.tv,
            FavoriteKind::Radio => &self.radio,
        }
    }

    fn ref_to_original_source(&self, r: &model::FavoriteRef, preferred_name: &str) -> Source {
        let name = self.store.get(r).map(|e| e.name).unwrap_or_else(|| preferred_name.to_owned());
        Source::new(r.provider_id.clone(), r.source_id.clone(), name)
    }
}

#[async_trait]
impl ScheduleProvider for FavoritesProvider {
    fn provider_id(&self) -> ProviderId {
        ProviderId::from(model::FAVORITES_PROVIDER_ID)
    }

    fn display_name(&self) -> String {
        "Ulubione".into()
    }

    async fn list_sources(&self, _force_refresh: bool) -> ProviderResult<Vec<Source>> {
        Ok(self.store.list_entries().iter().map(Self::entry_to_source).collect())
    }

    async fn list_days(&self, force_refresh: bool) -> ProviderResult<Vec<NaiveDate>> {
        if self.store.list_entries().is_empty() {
            return Ok(Vec::new());
        }
        let today = chrono::Local::now().date_naive();
        let tv_days = self.tv.list_days(force_refresh).await?;
        let radio_days: Vec<NaiveDate> = self
            .radio
            .list_days(force_refresh)
            .await?
            .into_iter()
            .filter(|d| *d >= today)
            .collect();

        let mut all: Vec<NaiveDate> = tv_days;
        all.extend(radio_days);
        all.sort();
        all.dedup();
        Ok(all)
    }

    async fn get_schedule(&self, source: &Source, day: NaiveDate, force_refresh: bool) -> ProviderResult<Vec<ScheduleItem>> {
        let Some(r) = decode_favorite_source_id(source.id.as_str()) else {
            return Ok(Vec::new());
        };
        let delegate = self.delegate_for_kind(r.kind);
        let original_source = self.ref_to_original_source(&r, &Self::name_from_source(source));

        let items = delegate.get_schedule(&original_source, day, force_refresh).await?;
        Ok(items
            .into_iter()
            .map(|it| it.with_provider_and_source(ProviderId::from(model::FAVORITES_PROVIDER_ID), source.clone()))
            .collect())
    }

    async fn get_item_details(&self, item: &ScheduleItem, force_refresh: bool) -> ProviderResult<String> {
        let Some(r) = decode_favorite_source_id(item.source.id.as_str()) else {
            return Ok(String::new());
        };
        let delegate = self.delegate_for_kind(r.kind);
        let original_source = self.ref_to_original_source(&r, &Self::name_from_source(&item.source));
        let original_item = item.with_provider_and_source(ProviderId::from(r.provider_id.as_str()), original_source);
        delegate.get_item_details(&original_item, force_refresh).await
    }
}
