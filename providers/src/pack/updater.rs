use std::collections::{BTreeSet, HashMap};

use flate2::read::GzDecoder;
use model::Kind;
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tar::Archive;
use tracing::warn;

use super::error::{PackError, PackResult};
use super::manifest_store::PackStore;

#[derive(Deserialize)]
struct IndexEntry {
    version: String,
    url: String,
    sha256: String,
}

/// Result of one [`PackUpdater::update_if_needed`] pass (spec §4.6).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UpdateResult {
    pub updated: BTreeSet<Kind>,
    pub message: String,
}

/// Polls a release index (`kind -> {version, url, sha256}`) and installs
/// any kind whose upstream version differs from the locally active one
/// (or unconditionally under `force_check`). Old versions are retained —
/// no GC (spec §4.6).
pub struct PackUpdater {
    client: Client,
    store: PackStore,
    index_url: String,
}

impl PackUpdater {
    pub fn new(client: Client, store: PackStore, base_url: &str) -> Self {
        Self { client, store, index_url: format!("{}/index.json", base_url.trim_end_matches('/')) }
    }

    pub async fn update_if_needed(&self, force_check: bool) -> UpdateResult {
        let index: HashMap<String, IndexEntry> = match self.fetch_index().await {
            Ok(index) => index,
            Err(err) => {
                return UpdateResult { updated: BTreeSet::new(), message: format!("nie udało się pobrać indeksu paczek: {err}") };
            }
        };

        let mut updated = BTreeSet::new();
        let mut messages = Vec::new();

        for kind in Kind::ALL {
            let Some(entry) = index.get(kind.as_str()) else { continue };
            let current = self.store.read_active_version(kind);
            if !force_check && current.as_deref() == Some(entry.version.as_str()) {
                continue;
            }

            match self.install(kind, entry).await {
                Ok(()) => {
                    updated.insert(kind);
                    messages.push(format!("{}: zainstalowano {}", kind.as_str(), entry.version));
                }
                Err(err) => {
                    warn!(kind = kind.as_str(), version = entry.version, error = %err, "pack update failed");
                    messages.push(format!("{}: aktualizacja nieudana ({err})", kind.as_str()));
                }
            }
        }

        let message = if messages.is_empty() { "brak dostępnych aktualizacji".to_owned() } else { messages.join("; ") };
        UpdateResult { updated, message }
    }

    async fn fetch_index(&self) -> PackResult<HashMap<String, IndexEntry>> {
        let resp = self.client.get(&self.index_url).send().await?;
        Ok(resp.error_for_status()?.json().await?)
    }

    async fn install(&self, kind: Kind, entry: &IndexEntry) -> PackResult<()> {
        let bytes = self.client.get(&entry.url).send().await?.error_for_status()?.bytes().await?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let actual = hex::encode(hasher.finalize());
        if !actual.eq_ignore_ascii_case(&entry.sha256) {
            return Err(PackError::HashMismatch { expected: entry.sha256.clone(), actual });
        }

        let dest = self.store.pack_dir(kind, &entry.version);
        std::fs::create_dir_all(&dest)?;
        extract_tar_gz(&bytes, &dest)?;

        self.store.set_active_version(kind, &entry.version)?;
        Ok(())
    }
}

fn extract_tar_gz(bytes: &[u8], dest: &std::path::Path) -> PackResult<()> {
    let decoder = GzDecoder::new(bytes);
    let mut archive = Archive::new(decoder);
    archive.unpack(dest)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn build_tar_gz(entrypoint_contents: &[u8]) -> Vec<u8> {
        let mut tar_bytes = Vec::new();
        {
            let mut builder = tar::Builder::new(&mut tar_bytes);
            let mut header = tar::Header::new_gnu();
            header.set_size(entrypoint_contents.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append_data(&mut header, "demo-pack", entrypoint_contents).unwrap();
            builder.finish().unwrap();
        }
        let mut gz_bytes = Vec::new();
        {
            let mut encoder = GzEncoder::new(&mut gz_bytes, Compression::default());
            std::io::Write::write_all(&mut encoder, &tar_bytes).unwrap();
            encoder.finish().unwrap();
        }
        gz_bytes
    }

    #[tokio::test]
    async fn index_fetch_failure_reports_a_message_without_panicking() {
        let server = MockServer::start().await;
        // No /index.json mock mounted: the request 404s.
        let dir = tempfile::tempdir().unwrap();
        let updater = PackUpdater::new(Client::new(), PackStore::new(dir.path()), &server.uri());

        let result = updater.update_if_needed(false).await;
        assert!(result.updated.is_empty());
        assert!(!result.message.is_empty());
    }

    #[tokio::test]
    async fn hash_mismatch_skips_the_install_and_leaves_no_active_version() {
        let server = MockServer::start().await;
        let archive_bytes = build_tar_gz(b"#!/bin/sh\necho pack\n");

        Mock::given(method("GET"))
            .and(path("/index.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tv": {"version": "1.0.0", "url": format!("{}/tv-1.0.0.tar.gz", server.uri()), "sha256": "0".repeat(64)},
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tv-1.0.0.tar.gz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(archive_bytes))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = PackStore::new(dir.path());
        let updater = PackUpdater::new(Client::new(), store, &server.uri());

        let result = updater.update_if_needed(false).await;
        assert!(result.updated.is_empty());
        assert!(result.message.contains("aktualizacja nieudana"));
    }

    #[tokio::test]
    async fn matching_hash_installs_and_activates_the_version() {
        let server = MockServer::start().await;
        let archive_bytes = build_tar_gz(b"#!/bin/sh\necho pack\n");
        let mut hasher = Sha256::new();
        hasher.update(&archive_bytes);
        let sha256 = hex::encode(hasher.finalize());

        Mock::given(method("GET"))
            .and(path("/index.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tv": {"version": "1.0.0", "url": format!("{}/tv-1.0.0.tar.gz", server.uri()), "sha256": sha256},
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tv-1.0.0.tar.gz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(archive_bytes))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = PackStore::new(dir.path());
        let updater = PackUpdater::new(Client::new(), store, &server.uri());

        let result = updater.update_if_needed(false).await;
        assert_eq!(result.updated, BTreeSet::from([Kind::Tv]));

        let store = PackStore::new(dir.path());
        assert_eq!(store.read_active_version(Kind::Tv).as_deref(), Some("1.0.0"));
        assert!(dir.path().join("tv").join("1.0.0").join("demo-pack").exists());
    }

    #[tokio::test]
    async fn unchanged_version_is_skipped_unless_force_checked() {
        let server = MockServer::start().await;
        let archive_bytes = build_tar_gz(b"#!/bin/sh\necho pack\n");
        let mut hasher = Sha256::new();
        hasher.update(&archive_bytes);
        let sha256 = hex::encode(hasher.finalize());

        Mock::given(method("GET"))
            .and(path("/index.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tv": {"version": "1.0.0", "url": format!("{}/tv-1.0.0.tar.gz", server.uri()), "sha256": sha256},
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = PackStore::new(dir.path());
        store.set_active_version(Kind::Tv, "1.0.0").unwrap();
        let updater = PackUpdater::new(Client::new(), store, &server.uri());

        let result = updater.update_if_needed(false).await;
        assert!(result.updated.is_empty());
    }
}
