use std::path::PathBuf;

/// Everything the wiring in `main` needs that spec.md leaves to the
/// caller: cache/db root, HTTP timeouts, cache TTLs, hub base URL (§4.1,
/// §4.4, §4.10 all say "not in-code constants"). `Default` gives sane
/// values for a local run; `from_env` overlays environment variables, the
/// way `app_updates.py` reads `PROGRAMISTA_HUB_BASE_URL`.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub data_dir: PathBuf,
    pub user_agent: String,
    pub app_version: String,
    pub hub_base_url: Option<String>,
    pub pack_index_url: String,
    pub provider_api_version: u32,
    pub http_timeout_seconds: f64,
    pub schedule_ttl_seconds: i64,
    pub archive_ttl_seconds: i64,
    pub update_check_ttl_seconds: i64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            user_agent: "programista/0.1".to_owned(),
            app_version: env!("CARGO_PKG_VERSION").to_owned(),
            hub_base_url: None,
            pack_index_url: "https://tyflo.eu.org/programista/packs".to_owned(),
            provider_api_version: 1,
            http_timeout_seconds: 15.0,
            schedule_ttl_seconds: 15 * 60,
            archive_ttl_seconds: 24 * 3600,
            update_check_ttl_seconds: 6 * 3600,
        }
    }
}

impl CoreConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("PROGRAMISTA_DATA_DIR") {
            if !dir.trim().is_empty() {
                config.data_dir = PathBuf::from(dir);
            }
        }
        if let Ok(url) = std::env::var("PROGRAMISTA_HUB_BASE_URL") {
            if !url.trim().is_empty() {
                config.hub_base_url = Some(url);
            }
        }
        if let Ok(url) = std::env::var("PROGRAMISTA_PACK_INDEX_URL") {
            if !url.trim().is_empty() {
                config.pack_index_url = url;
            }
        }

        config
    }

    pub fn kv_db_path(&self) -> PathBuf {
        self.data_dir.join("cache.sled")
    }

    pub fn search_index_path(&self) -> PathBuf {
        self.data_dir.join("search_index.sqlite")
    }

    pub fn favorites_path(&self) -> PathBuf {
        self.data_dir.join("favorites.json")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }

    pub fn pack_store_path(&self) -> PathBuf {
        self.data_dir.join("packs")
    }
}
