use std::collections::HashMap;
use std::sync::Arc;

use model::{ArchiveProvider, Kind, ScheduleProvider};
use tracing::warn;

use super::manifest_store::PackStore;
use super::process::{ArchiveProcessProvider, PackProcess, ScheduleProcessProvider};

/// Loads the active pack for one kind (spec §4.6). Missing or invalid
/// packs return `Ok(None)` — "no pack loaded" — never an error that aborts
/// the caller; every failure is logged and swallowed here.
pub struct PackLoader {
    store: PackStore,
    app_provider_api_version: u32,
    child_env: HashMap<String, String>,
}

impl PackLoader {
    pub fn new(store: PackStore, app_provider_api_version: u32, child_env: HashMap<String, String>) -> Self {
        Self { store, app_provider_api_version, child_env }
    }

    async fn spawn_active(&self, kind: Kind) -> Option<Arc<PackProcess>> {
        let version = self.store.read_active_version(kind)?;
        let manifest = match self.store.read_manifest(kind, &version) {
            Ok(Some(m)) => m,
            Ok(None) => {
                warn!(kind = kind.as_str(), version, "active pack has no manifest");
                return None;
            }
            Err(err) => {
                warn!(kind = kind.as_str(), version, error = %err, "failed to read pack manifest");
                return None;
            }
        };

        if !manifest.is_schema_supported() || manifest.kind != kind {
            warn!(kind = kind.as_str(), version, "pack manifest schema/kind mismatch");
            return None;
        }
        if manifest.provider_api_version != self.app_provider_api_version {
            warn!(
                kind = kind.as_str(),
                version,
                manifest_api = manifest.provider_api_version,
                app_api = self.app_provider_api_version,
                "pack provider_api_version incompatible"
            );
            return None;
        }

        let entrypoint = self.store.entrypoint_path(kind, &version, &manifest);
        match PackProcess::spawn(&entrypoint, kind, &self.child_env).await {
            Ok(process) => Some(Arc::new(process)),
            Err(err) => {
                warn!(kind = kind.as_str(), version, error = %err, "failed to spawn pack process");
                None
            }
        }
    }

    pub async fn load_schedule_kind(&self, kind: Kind) -> Option<Arc<dyn ScheduleProvider>> {
        let process = self.spawn_active(kind).await?;
        Some(Arc::new(ScheduleProcessProvider::new(process)))
    }

    pub async fn load_archive_kind(&self) -> Option<Arc<dyn ArchiveProvider>> {
        let process = self.spawn_active(Kind::Archive).await?;
        Some(Arc::new(ArchiveProcessProvider::new(process)))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use model::PackManifest;

    use super::*;

    fn write_manifest(store: &PackStore, kind: Kind, version: &str, manifest: &PackManifest) {
        let dir = store.pack_dir(kind, version);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("pack.json"), serde_json::to_string(manifest).unwrap()).unwrap();
        store.set_active_version(kind, version).unwrap();
    }

    fn manifest(kind: Kind, provider_api_version: u32) -> PackManifest {
        PackManifest {
            schema: 1,
            kind,
            version: "1.0.0".into(),
            package: "demo".into(),
            entrypoint: "demo-pack".into(),
            provider_api_version,
        }
    }

    #[tokio::test]
    async fn missing_active_pointer_means_none_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let loader = PackLoader::new(PackStore::new(dir.path()), 1, HashMap::new());
        assert!(loader.load_schedule_kind(Kind::Tv).await.is_none());
    }

    #[tokio::test]
    async fn schema_mismatch_is_rejected_without_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let store = PackStore::new(dir.path());
        let mut bad = manifest(Kind::Tv, 1);
        bad.schema = 2;
        write_manifest(&store, Kind::Tv, "1.0.0", &bad);

        let loader = PackLoader::new(store, 1, HashMap::new());
        assert!(loader.load_schedule_kind(Kind::Tv).await.is_none());
    }

    #[tokio::test]
    async fn kind_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = PackStore::new(dir.path());
        // active.json under `tv` naming a manifest whose own `kind` says `radio`.
        write_manifest(&store, Kind::Tv, "1.0.0", &manifest(Kind::Radio, 1));

        let loader = PackLoader::new(store, 1, HashMap::new());
        assert!(loader.load_schedule_kind(Kind::Tv).await.is_none());
    }

    #[tokio::test]
    async fn incompatible_provider_api_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = PackStore::new(dir.path());
        write_manifest(&store, Kind::Tv, "1.0.0", &manifest(Kind::Tv, 99));

        let loader = PackLoader::new(store, 1, HashMap::new());
        assert!(loader.load_schedule_kind(Kind::Tv).await.is_none());
    }
}
