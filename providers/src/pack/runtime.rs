use std::sync::Arc;

use model::Kind;

use crate::wrappers::{
    CompositeArchiveProvider, CompositeScheduleProvider, EmptyArchiveProvider, EmptyScheduleProvider, ReloadableArchiveProvider,
    ReloadableScheduleProvider,
};

use super::loader::PackLoader;
use super::updater::{PackUpdater, UpdateResult};

/// Per-kind `Reloadable` holders, each starting at an `Empty` fallback
/// until the first [`Self::load_installed`] (spec §4.6).
pub struct ProviderRuntime {
    pub tv: Arc<ReloadableScheduleProvider>,
    pub tv_accessibility: Arc<ReloadableScheduleProvider>,
    pub radio: Arc<ReloadableScheduleProvider>,
    pub archive: Arc<ReloadableArchiveProvider>,
    loader: PackLoader,
    updater: PackUpdater,
}

impl ProviderRuntime {
    pub fn new(loader: PackLoader, updater: PackUpdater) -> Self {
        Self {
            tv: Arc::new(ReloadableScheduleProvider::new(Arc::new(EmptyScheduleProvider))),
            tv_accessibility: Arc::new(ReloadableScheduleProvider::new(Arc::new(EmptyScheduleProvider))),
            radio: Arc::new(ReloadableScheduleProvider::new(Arc::new(EmptyScheduleProvider))),
            archive: Arc::new(ReloadableArchiveProvider::new(Arc::new(EmptyArchiveProvider))),
            loader,
            updater,
        }
    }

    /// Reads whatever pack is currently active per kind and swaps it in.
    /// A kind with no loadable pack keeps its previous delegate (never
    /// regresses to Empty once something has loaded) — readers always see
    /// either the previous set or the new set, never a partial swap.
    pub async fn load_installed(&self) {
        if let Some(tv) = self.loader.load_schedule_kind(Kind::Tv).await {
            self.tv.set_delegate(Arc::new(CompositeScheduleProvider::new(vec![tv]))).await;
        }
        if let Some(a11y) = self.loader.load_schedule_kind(Kind::TvAccessibility).await {
            self.tv_accessibility.set_delegate(Arc::new(CompositeScheduleProvider::new(vec![a11y]))).await;
        }
        if let Some(radio) = self.loader.load_schedule_kind(Kind::Radio).await {
            self.radio.set_delegate(Arc::new(CompositeScheduleProvider::new(vec![radio]))).await;
        }
        if let Some(archive) = self.loader.load_archive_kind().await {
            self.archive.set_delegate(Arc::new(CompositeArchiveProvider::new(vec![archive]))).await;
        }
    }

    pub async fn update_and_reload(&self, force_check: bool) -> UpdateResult {
        let result = self.updater.update_if_needed(force_check).await;
        if !result.updated.is_empty() {
            self.load_installed().await;
        }
        result
    }
}
