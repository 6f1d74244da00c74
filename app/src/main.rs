mod config;

use std::collections::HashMap;
use std::sync::Arc;

use model::{ArchiveProvider, ScheduleProvider};
use providers::{FavoritesProvider, PackLoader, PackStore, PackUpdater, ProviderRuntime};
use store::{CachedArchiveProvider, CachedScheduleProvider, FavoritesStore, KvCache, SearchIndex, SettingsStore};
use sync_core::PrefetchManager;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::CoreConfig;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let config = CoreConfig::from_env();
    std::fs::create_dir_all(&config.data_dir)?;

    let db = sled::Config::new().use_compression(true).path(config.kv_db_path()).open()?;

    let search_index = Arc::new(SearchIndex::open(config.search_index_path())?);
    let favorites = Arc::new(FavoritesStore::open(config.favorites_path())?);
    let settings = Arc::new(SettingsStore::open(config.settings_path())?);

    let http_cache = Arc::new(KvCache::open(&db, "http")?);
    let http_fetcher = Arc::new(net::HttpFetcher::new(&config.user_agent, http_cache)?);

    let hub_client = net::HubClient::new(Arc::clone(&settings), config.hub_base_url.as_deref(), &config.app_version, &config.user_agent)?;
    info!(base_url = hub_client.base_url(), "hub client ready");

    let update_result = net::check_for_app_update(&http_fetcher, &config.app_version, false, config.update_check_ttl_seconds, false, None).await;
    if update_result.update_available {
        info!(latest = ?update_result.latest_version, "newer release available");
    }

    let mut child_env = HashMap::new();
    child_env.insert("PROGRAMISTA_HUB_BASE_URL".to_owned(), hub_client.base_url().to_owned());

    let loader = PackLoader::new(PackStore::new(config.pack_store_path()), config.provider_api_version, child_env);
    let updater_client = reqwest::Client::builder().user_agent(config.user_agent.clone()).build()?;
    let updater = PackUpdater::new(updater_client, PackStore::new(config.pack_store_path()), &config.pack_index_url);

    let runtime = Arc::new(ProviderRuntime::new(loader, updater));
    runtime.load_installed().await;

    let tv_cache = Arc::new(KvCache::open(&db, "schedule_tv")?);
    let tv_accessibility_cache = Arc::new(KvCache::open(&db, "schedule_tv_accessibility")?);
    let radio_cache = Arc::new(KvCache::open(&db, "schedule_radio")?);
    let archive_cache = Arc::new(KvCache::open(&db, "schedule_archive")?);

    let tv: Arc<dyn ScheduleProvider> =
        Arc::new(CachedScheduleProvider::new(Arc::clone(&runtime.tv), tv_cache, "tv", config.schedule_ttl_seconds));
    let tv_accessibility: Arc<dyn ScheduleProvider> = Arc::new(CachedScheduleProvider::new(
        Arc::clone(&runtime.tv_accessibility),
        tv_accessibility_cache,
        "tv_accessibility",
        config.schedule_ttl_seconds,
    ));
    let radio: Arc<dyn ScheduleProvider> =
        Arc::new(CachedScheduleProvider::new(Arc::clone(&runtime.radio), radio_cache, "radio", config.schedule_ttl_seconds));
    let archive: Arc<dyn ArchiveProvider> =
        Arc::new(CachedArchiveProvider::new(Arc::clone(&runtime.archive), archive_cache, config.archive_ttl_seconds));

    let favorites_provider: Arc<dyn ScheduleProvider> =
        Arc::new(FavoritesProvider::new(Arc::clone(&favorites), Arc::clone(&tv), Arc::clone(&radio)));
    info!(provider_id = %favorites_provider.provider_id(), "favorites overlay ready");

    let (update_tx, mut update_rx) = tokio::sync::mpsc::unbounded_channel();
    let root_cancel = CancellationToken::new();

    let prefetch = Arc::new(PrefetchManager::new(tv, tv_accessibility, radio, archive, Arc::clone(&search_index), update_tx, root_cancel.clone()));

    tokio::spawn(async move {
        while let Some(update) = update_rx.recv().await {
            if update.finished || update.cancelled {
                info!(stage = %update.stage, errors = update.errors, "{}", update.message);
            } else {
                info!(stage = %update.stage, done = update.done, total = ?update.total, "{}", update.message);
            }
        }
    });

    if !prefetch.start_full_sync() {
        warn!("prefetch already running");
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    prefetch.stop();
    root_cancel.cancel();

    Ok(())
}
