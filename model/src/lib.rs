//! Domain types and capability contracts shared by every other crate in the
//! workspace: sources, schedule items, favorites, search results, pack
//! manifests, the provider traits, and the handful of pure helpers the data
//! plane needs (title normalization, `LIKE` escaping, request tokens).

mod accessibility;
mod favorite;
mod ids;
mod kind;
mod pack_manifest;
mod provider_error;
mod providers;
mod schedule_item;
mod search_result;
mod source;
mod token;
pub mod util;

pub use accessibility::{format_feature_list, parse_feature_list, AccessibilityFeature};
pub use favorite::{decode_favorite_source_id, encode_favorite_source_id, FavoriteEntry, FavoriteRef};
pub use ids::{ProviderId, SourceId, FAVORITES_PROVIDER_ID};
pub use kind::{FavoriteKind, Kind, UnknownKind};
pub use pack_manifest::{PackManifest, PACK_SCHEMA_VERSION};
pub use provider_error::{ProviderError, ProviderResult};
pub use providers::{ArchiveProvider, ScheduleProvider};
pub use schedule_item::ScheduleItem;
pub use search_result::SearchResult;
pub use source::Source;
pub use token::{RequestToken, RequestTokenSource};
