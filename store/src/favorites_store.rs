use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use model::{FavoriteEntry, FavoriteKind, FavoriteRef};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;

const FAVORITES_VERSION: u32 = 1;

#[derive(Serialize, Deserialize, Default)]
struct FavoritesFile {
    version: u32,
    favorites: Vec<FavoriteEntry>,
}

/// Persistent set of favorited `(kind, provider_id, source_id)` entries,
/// backed by a single JSON file written tmp-then-rename (spec §4.7/§6).
pub struct FavoritesStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<(FavoriteKind, String, String), FavoriteEntry>>,
}

impl FavoritesStore {
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let entries = Mutex::new(Self::load(&path));
        Ok(Self { path, entries })
    }

    fn load(path: &Path) -> BTreeMap<(FavoriteKind, String, String), FavoriteEntry> {
        let Ok(raw) = fs::read_to_string(path) else {
            return BTreeMap::new();
        };
        let Ok(file) = serde_json::from_str::<FavoritesFile>(&raw) else {
            return BTreeMap::new();
        };
        file.favorites
            .into_iter()
            .map(|e| ((e.kind, e.provider_id.clone(), e.source_id.clone()), e))
            .collect()
    }

    /// Snapshot sorted by `(kind, casefold(name), provider_id, source_id)`
    /// (spec §4.7) — `kind` sorts on its wire string (`"radio" < "tv"`), not
    /// the enum's declaration order, so radio favorites precede tv ones.
    pub fn list_entries(&self) -> Vec<FavoriteEntry> {
        let mut entries: Vec<FavoriteEntry> = self.entries.lock().values().cloned().collect();
        entries.sort_by(|a, b| {
            (a.kind.as_str(), a.name.to_lowercase(), &a.provider_id, &a.source_id).cmp(&(
                b.kind.as_str(),
                b.name.to_lowercase(),
                &b.provider_id,
                &b.source_id,
            ))
        });
        entries
    }

    pub fn get(&self, r: &FavoriteRef) -> Option<FavoriteEntry> {
        let (kind, provider_id, source_id) = r.key();
        self.entries
            .lock()
            .get(&(kind, provider_id.to_owned(), source_id.to_owned()))
            .cloned()
    }

    pub fn is_favorite(&self, r: &FavoriteRef) -> bool {
        self.get(r).is_some()
    }

    /// Adds or replaces an entry. Returns `false` (no-op, no write) if the
    /// entry is unchanged.
    pub fn add_entry(&self, entry: FavoriteEntry) -> StoreResult<bool> {
        let key = (entry.kind, entry.provider_id.clone(), entry.source_id.clone());
        let mut guard = self.entries.lock();
        if guard.get(&key) == Some(&entry) {
            return Ok(false);
        }
        guard.insert(key, entry);
        self.save_locked(&guard)?;
        Ok(true)
    }

    pub fn add_source(&self, kind: FavoriteKind, source: &model::Source) -> StoreResult<bool> {
        self.add_entry(FavoriteEntry {
            kind,
            provider_id: source.provider_id.as_str().to_owned(),
            source_id: source.id.as_str().to_owned(),
            name: source.name.clone(),
        })
    }

    pub fn remove(&self, r: &FavoriteRef) -> StoreResult<bool> {
        let (kind, provider_id, source_id) = r.key();
        let mut guard = self.entries.lock();
        let removed = guard.remove(&(kind, provider_id.to_owned(), source_id.to_owned())).is_some();
        if removed {
            self.save_locked(&guard)?;
        }
        Ok(removed)
    }

    fn save_locked(&self, entries: &BTreeMap<(FavoriteKind, String, String), FavoriteEntry>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut favorites: Vec<FavoriteEntry> = entries.values().cloned().collect();
        favorites.sort_by(|a, b| {
            (a.kind.as_str(), a.name.to_lowercase(), &a.provider_id, &a.source_id).cmp(&(
                b.kind.as_str(),
                b.name.to_lowercase(),
                &b.provider_id,
                &b.source_id,
            ))
        });
        let file = FavoritesFile { version: FAVORITES_VERSION, favorites };
        let encoded = serde_json::to_string_pretty(&file)?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, encoded)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
