use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreResult;

/// Durable TTL key-value cache over `sled` (spec §4.2). One row per key,
/// holding a `(blob, created_at, expires_at)` envelope; reads past
/// `expires_at` are a miss, writes overwrite the prior value, and
/// `clear()` wipes rows but keeps the tree open.
///
/// All mutation funnels through `sled`'s own internal locking, so this
/// type is safe to share behind an `Arc` across threads without an
/// additional mutex (spec §5: "safe under concurrent callers").
pub struct KvCache {
    tree: sled::Tree,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct Envelope {
    blob: Vec<u8>,
    created_at: i64,
    expires_at: i64,
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

impl KvCache {
    /// Opens (or creates) the cache at `path`, using `tree_name` as the
    /// sled tree — so several logical caches can share one `sled::Db` the
    /// way the teacher's `app/src/main.rs` opens multiple trees
    /// (`podcasts`, ...) on a single database handle.
    pub fn open(db: &sled::Db, tree_name: &str) -> StoreResult<Self> {
        let tree = db.open_tree(tree_name)?;
        Ok(Self { tree })
    }

    /// Opens a fresh, dedicated `sled::Db` at `path` — used where a cache
    /// isn't meant to share a database with anything else.
    pub fn open_standalone(path: impl AsRef<std::path::Path>) -> StoreResult<Self> {
        let db = sled::Config::new()
            .use_compression(true)
            .path(path.as_ref())
            .open()?;
        Ok(Self { tree: db.open_tree("kv_cache")? })
    }

    pub fn get_text(&self, key: &str) -> StoreResult<Option<String>> {
        let Some(envelope) = self.read_envelope(key)? else {
            return Ok(None);
        };
        Ok(String::from_utf8(envelope.blob).ok())
    }

    pub fn set_text(&self, key: &str, value: &str, ttl_seconds: i64) -> StoreResult<()> {
        self.set_bytes(key, value.as_bytes(), ttl_seconds)
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        let Some(envelope) = self.read_envelope(key)? else {
            return Ok(None);
        };
        match serde_json::from_slice(&envelope.blob) {
            Ok(value) => Ok(Some(value)),
            Err(_) => Ok(None), // decode failure: silently treated as a miss (spec §7)
        }
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl_seconds: i64) -> StoreResult<()> {
        let bytes = serde_json::to_vec(value)?;
        self.set_bytes(key, &bytes, ttl_seconds)
    }

    fn set_bytes(&self, key: &str, bytes: &[u8], ttl_seconds: i64) -> StoreResult<()> {
        let created_at = now_unix();
        let envelope = Envelope {
            blob: bytes.to_vec(),
            created_at,
            expires_at: created_at + ttl_seconds.max(0),
        };
        let encoded = serde_json::to_vec(&envelope)?;
        self.tree.insert(key.as_bytes(), encoded)?;
        self.tree.flush()?;
        Ok(())
    }

    fn read_envelope(&self, key: &str) -> StoreResult<Option<Envelope>> {
        let Some(raw) = self.tree.get(key.as_bytes())? else {
            return Ok(None);
        };
        let envelope: Envelope = match serde_json::from_slice(&raw) {
            Ok(e) => e,
            Err(_) => return Ok(None),
        };
        if now_unix() >= envelope.expires_at {
            return Ok(None);
        }
        Ok(Some(envelope))
    }

    /// Deletes every row whose `expires_at` has elapsed; returns the count
    /// removed.
    pub fn prune_expired(&self) -> StoreResult<usize> {
        let now = now_unix();
        let mut pruned = 0usize;
        let mut expired_keys = Vec::new();
        for entry in self.tree.iter() {
            let (key, raw) = entry?;
            let expired = match serde_json::from_slice::<Envelope>(&raw) {
                Ok(envelope) => now >= envelope.expires_at,
                Err(_) => true, // unreadable row, treat as expired garbage
            };
            if expired {
                expired_keys.push(key);
            }
        }
        for key in expired_keys {
            self.tree.remove(key)?;
            pruned += 1;
        }
        self.tree.flush()?;
        Ok(pruned)
    }

    pub fn clear(&self) -> StoreResult<()> {
        self.tree.clear()?;
        self.tree.flush()?;
        Ok(())
    }

    pub fn close(&self) -> StoreResult<()> {
        self.tree.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> (tempfile::TempDir, KvCache) {
        let dir = tempfile::tempdir().unwrap();
        let cache = KvCache::open_standalone(dir.path().join("cache.sled")).unwrap();
        (dir, cache)
    }

    #[test]
    fn ttl_governs_visibility() {
        let (_dir, cache) = cache();
        cache.set_text("greeting", "hello", 60).unwrap();
        assert_eq!(cache.get_text("greeting").unwrap().as_deref(), Some("hello"));

        // A TTL of 0 (already expired at write time) is immediately a miss.
        cache.set_text("stale", "bye", -1).unwrap();
        assert_eq!(cache.get_text("stale").unwrap(), None);
    }

    #[test]
    fn later_write_wins() {
        let (_dir, cache) = cache();
        cache.set_text("k", "first", 60).unwrap();
        cache.set_text("k", "second", 60).unwrap();
        assert_eq!(cache.get_text("k").unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn json_round_trips_and_bad_json_is_a_miss() {
        let (_dir, cache) = cache();
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Payload {
            n: u32,
        }
        cache.set_json("p", &Payload { n: 7 }, 60).unwrap();
        assert_eq!(cache.get_json::<Payload>("p").unwrap(), Some(Payload { n: 7 }));

        cache.set_text("bad", "not json", 60).unwrap();
        assert_eq!(cache.get_json::<Payload>("bad").unwrap(), None);
    }

    #[test]
    fn clear_removes_rows() {
        let (_dir, cache) = cache();
        cache.set_text("a", "1", 60).unwrap();
        cache.set_text("b", "2", 60).unwrap();
        cache.clear().unwrap();
        assert_eq!(cache.get_text("a").unwrap(), None);
        assert_eq!(cache.get_text("b").unwrap(), None);
    }

    #[test]
    fn prune_expired_counts_and_removes_only_stale_rows() {
        let (_dir, cache) = cache();
        cache.set_text("fresh", "1", 60).unwrap();
        cache.set_text("stale", "2", -5).unwrap();
        let pruned = cache.prune_expired().unwrap();
        assert_eq!(pruned, 1);
        assert_eq!(cache.get_text("fresh").unwrap().as_deref(), Some("1"));
    }
}
