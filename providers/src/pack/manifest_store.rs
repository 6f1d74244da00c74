use std::fs;
use std::path::{Path, PathBuf};

use model::{Kind, PackManifest};

use super::error::PackResult;

/// On-disk layout of the provider-pack tree: `<root>/<kind>/<version>/`
/// plus `<root>/<kind>/active.json` naming the active version (spec §4.6,
/// unchanged by the subprocess redesign — only `pack.json`'s `entrypoint`
/// field changed meaning).
pub struct PackStore {
    root: PathBuf,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct ActiveFile {
    version: String,
}

impl PackStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn kind_dir(&self, kind: Kind) -> PathBuf {
        self.root.join(kind.as_str())
    }

    pub fn pack_dir(&self, kind: Kind, version: &str) -> PathBuf {
        self.kind_dir(kind).join(version)
    }

    fn active_path(&self, kind: Kind) -> PathBuf {
        self.kind_dir(kind).join("active.json")
    }

    pub fn read_active_version(&self, kind: Kind) -> Option<String> {
        let raw = fs::read_to_string(self.active_path(kind)).ok()?;
        let file: ActiveFile = serde_json::from_str(&raw).ok()?;
        let version = file.version.trim().to_owned();
        if version.is_empty() {
            None
        } else {
            Some(version)
        }
    }

    /// Atomically rewrites `active.json` for `kind` via write-to-tmp +
    /// rename (spec §4.6).
    pub fn set_active_version(&self, kind: Kind, version: &str) -> PackResult<()> {
        let dir = self.kind_dir(kind);
        fs::create_dir_all(&dir)?;
        let path = self.active_path(kind);
        let tmp_path = path.with_extension("json.tmp");
        let encoded = serde_json::to_string_pretty(&ActiveFile { version: version.to_owned() })?;
        fs::write(&tmp_path, encoded)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    pub fn read_manifest(&self, kind: Kind, version: &str) -> PackResult<Option<PackManifest>> {
        let path = self.pack_dir(kind, version).join("pack.json");
        let Ok(raw) = fs::read_to_string(&path) else {
            return Ok(None);
        };
        let manifest: PackManifest = serde_json::from_str(&raw)?;
        Ok(Some(manifest))
    }

    pub fn entrypoint_path(&self, kind: Kind, version: &str, manifest: &PackManifest) -> PathBuf {
        self.pack_dir(kind, version).join(&manifest.entrypoint)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use model::PackManifest;

    use super::*;

    #[test]
    fn active_version_round_trips_through_tmp_then_rename() {
        let dir = tempfile::tempdir().unwrap();
        let store = PackStore::new(dir.path());
        assert_eq!(store.read_active_version(Kind::Tv), None);

        store.set_active_version(Kind::Tv, "2.1.0").unwrap();
        assert_eq!(store.read_active_version(Kind::Tv).as_deref(), Some("2.1.0"));
        assert!(!dir.path().join("tv").join("active.json.tmp").exists());

        store.set_active_version(Kind::Tv, "2.2.0").unwrap();
        assert_eq!(store.read_active_version(Kind::Tv).as_deref(), Some("2.2.0"));
    }

    #[test]
    fn reading_a_manifest_for_a_version_with_no_pack_json_is_none_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = PackStore::new(dir.path());
        assert_eq!(store.read_manifest(Kind::Tv, "9.9.9").unwrap(), None);
    }

    #[test]
    fn entrypoint_path_joins_version_dir_and_manifest_entrypoint() {
        let dir = tempfile::tempdir().unwrap();
        let store = PackStore::new(dir.path());
        let manifest = PackManifest {
            schema: 1,
            kind: Kind::Radio,
            version: "1.0.0".into(),
            package: "demo".into(),
            entrypoint: "bin/demo-pack".into(),
            provider_api_version: 1,
        };
        let path = store.entrypoint_path(Kind::Radio, "1.0.0", &manifest);
        assert_eq!(path, store.root().join("radio").join("1.0.0").join("bin/demo-pack"));
    }
}
