mod error;
mod favorites_store;
mod kv_cache;
mod schedule_cache;
mod search_index;
mod settings_store;

pub use error::{StoreError, StoreResult};
pub use favorites_store::FavoritesStore;
pub use kv_cache::KvCache;
pub use schedule_cache::{CachedArchiveProvider, CachedScheduleProvider};
pub use search_index::{SearchIndex, DEFAULT_PRUNE_KEEP_SECONDS};
pub use settings_store::{SearchKindFilters, SettingsStore, TvAccessibilityFilters};
