use std::fs;
use std::path::PathBuf;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreResult;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TvAccessibilityFilters {
    pub ad: bool,
    pub jm: bool,
    pub n: bool,
}

impl Default for TvAccessibilityFilters {
    fn default() -> Self {
        Self { ad: true, jm: true, n: true }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SearchKindFilters {
    pub tv: bool,
    pub radio: bool,
    pub tv_accessibility: bool,
    pub archive: bool,
}

impl Default for SearchKindFilters {
    fn default() -> Self {
        Self { tv: true, radio: true, tv_accessibility: true, archive: true }
    }
}

/// Single JSON preferences file, atomically saved (spec §4.8/§6): the
/// accessibility/search-kind filters, a lazily-generated install UUID, and
/// an optional hub API key.
pub struct SettingsStore {
    path: PathBuf,
    data: Mutex<Map<String, Value>>,
}

impl SettingsStore {
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = Self::load(&path);
        Ok(Self { path, data: Mutex::new(data) })
    }

    fn load(path: &PathBuf) -> Map<String, Value> {
        let Ok(raw) = fs::read_to_string(path) else {
            return Map::new();
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    pub fn get_tv_accessibility_filters(&self) -> TvAccessibilityFilters {
        let data = self.data.lock();
        data.get("tv_accessibility_filters")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }

    pub fn set_tv_accessibility_filters(&self, filters: TvAccessibilityFilters) -> StoreResult<()> {
        let mut data = self.data.lock();
        data.insert("tv_accessibility_filters".into(), serde_json::to_value(filters)?);
        self.save_locked(&data)
    }

    pub fn get_search_kind_filters(&self) -> SearchKindFilters {
        let data = self.data.lock();
        data.get("search_kind_filters")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }

    pub fn set_search_kind_filters(&self, filters: SearchKindFilters) -> StoreResult<()> {
        let mut data = self.data.lock();
        data.insert("search_kind_filters".into(), serde_json::to_value(filters)?);
        self.save_locked(&data)
    }

    pub fn get_hub_install_id(&self) -> Option<String> {
        let data = self.data.lock();
        data.get("hub_install_id")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
    }

    /// Returns the persistent install id, generating and persisting a new
    /// v4 UUID the first time it's read.
    pub fn get_or_create_hub_install_id(&self) -> StoreResult<String> {
        if let Some(existing) = self.get_hub_install_id() {
            return Ok(existing);
        }
        let mut data = self.data.lock();
        if let Some(existing) = data
            .get("hub_install_id")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
        {
            return Ok(existing.to_owned());
        }
        let install_id = uuid::Uuid::new_v4().to_string();
        data.insert("hub_install_id".into(), Value::String(install_id.clone()));
        self.save_locked(&data)?;
        Ok(install_id)
    }

    pub fn get_hub_api_key(&self) -> Option<String> {
        let data = self.data.lock();
        data.get("hub_api_key")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
    }

    pub fn set_hub_api_key(&self, api_key: &str) -> StoreResult<()> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Ok(());
        }
        let mut data = self.data.lock();
        data.insert("hub_api_key".into(), Value::String(api_key.to_owned()));
        self.save_locked(&data)
    }

    pub fn clear_hub_api_key(&self) -> StoreResult<()> {
        let mut data = self.data.lock();
        if data.remove("hub_api_key").is_some() {
            self.save_locked(&data)?;
        }
        Ok(())
    }

    fn save_locked(&self, data: &Map<String, Value>) -> StoreResult<()> {
        let encoded = serde_json::to_string_pretty(data)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, encoded)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_id_is_generated_once_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::open(&path).unwrap();
        let id = store.get_or_create_hub_install_id().unwrap();

        let reopened = SettingsStore::open(&path).unwrap();
        assert_eq!(reopened.get_or_create_hub_install_id().unwrap(), id);
    }

    #[test]
    fn clear_hub_api_key_removes_it() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::open(dir.path().join("settings.json")).unwrap();
        store.set_hub_api_key("secret").unwrap();
        assert_eq!(store.get_hub_api_key().as_deref(), Some("secret"));
        store.clear_hub_api_key().unwrap();
        assert_eq!(store.get_hub_api_key(), None);
    }

    #[test]
    fn filters_default_to_all_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::open(dir.path().join("settings.json")).unwrap();
        assert_eq!(store.get_tv_accessibility_filters(), TvAccessibilityFilters::default());
        assert_eq!(store.get_search_kind_filters(), SearchKindFilters::default());
    }
}
