mod favorites_provider;
mod pack;
mod wrappers;

pub use favorites_provider::FavoritesProvider;
pub use pack::{ArchiveProcessProvider, PackError, PackLoader, PackProcess, PackResult, PackStore, PackUpdater, ProviderRuntime, ScheduleProcessProvider, UpdateResult};
pub use wrappers::{
    CompositeArchiveProvider, CompositeScheduleProvider, EmptyArchiveProvider, EmptyScheduleProvider, ReloadableArchiveProvider,
    ReloadableScheduleProvider,
};
