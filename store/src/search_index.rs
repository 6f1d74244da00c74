use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::NaiveDate;
use model::{parse_feature_list, util, AccessibilityFeature, Kind, ScheduleItem, SearchResult};
use parking_lot::Mutex;
use rusqlite::Connection;

use crate::error::StoreResult;

/// Default `prune(keep_seconds)` horizon: 90 days. A heuristic, not
/// load-bearing behavior (spec §9, Open Question — kept as a named
/// constant per SPEC_FULL.md §9.2).
pub const DEFAULT_PRUNE_KEEP_SECONDS: i64 = 90 * 24 * 3600;

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Durable full-text-ish index of every schedule item the browse path or
/// the prefetch orchestrator has ever observed (spec §4.3). Backed by
/// SQLite (`rusqlite`, bundled) rather than the KV cache: the schema needs
/// a compound primary key, two secondary indexes, and a `LIKE` substring
/// search, none of which a plain key-value store expresses cleanly.
pub struct SearchIndex {
    conn: Mutex<Connection>,
}

impl SearchIndex {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path.as_ref())?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;",
        )?;
        let index = Self { conn: Mutex::new(conn) };
        index.init_schema()?;
        Ok(index)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn.lock();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS search_items (
                kind TEXT NOT NULL,
                provider_id TEXT NOT NULL,
                source_id TEXT NOT NULL,
                source_name TEXT NOT NULL,
                day TEXT NOT NULL,
                start TEXT NOT NULL,
                title TEXT NOT NULL,
                title_norm TEXT NOT NULL,
                features TEXT NOT NULL,
                indexed_at INTEGER NOT NULL,
                PRIMARY KEY(kind, provider_id, source_id, day, start, title_norm)
            );
            CREATE INDEX IF NOT EXISTS idx_search_items_title_norm ON search_items(title_norm);
            CREATE INDEX IF NOT EXISTS idx_search_items_kind_day ON search_items(kind, day);",
        )?;
        Ok(())
    }

    /// Upserts `items` under `kind`. Items with an empty (after-trim) title
    /// are skipped, as are `tv_accessibility` items carrying no
    /// accessibility tag at all (spec §4.3).
    pub fn add_items(&self, kind: Kind, items: &[ScheduleItem]) -> StoreResult<()> {
        let now = now_unix();
        let conn = self.conn.lock();
        let tx = conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO search_items(
                    kind, provider_id, source_id, source_name,
                    day, start, title, title_norm, features, indexed_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(kind, provider_id, source_id, day, start, title_norm) DO UPDATE SET
                    source_name = excluded.source_name,
                    title = excluded.title,
                    features = excluded.features,
                    indexed_at = excluded.indexed_at",
            )?;

            for item in items {
                if matches!(kind, Kind::TvAccessibility) && item.accessibility.is_empty() {
                    continue;
                }
                let title = item.trimmed_title();
                if title.is_empty() {
                    continue;
                }
                let title_norm = util::normalize_title(title);
                let start = item
                    .start_time
                    .map(|t| t.format("%H:%M").to_string())
                    .unwrap_or_default();
                let features = model::format_feature_list(&item.accessibility);

                stmt.execute(rusqlite::params![
                    kind.as_str(),
                    item.source.provider_id.as_str(),
                    item.source.id.as_str(),
                    item.source.name,
                    item.day.to_string(),
                    start,
                    title,
                    title_norm,
                    features,
                    now,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Case-folded substring search over `title_norm`, restricted to
    /// `kinds`, ordered `(day, start, source_name, title)`, capped at
    /// `limit`. An empty (after-trim) query returns no rows without
    /// touching the database (spec §4.3).
    pub fn search(&self, query: &str, kinds: &[Kind], limit: usize) -> StoreResult<Vec<SearchResult>> {
        let query = query.trim();
        if query.is_empty() || kinds.is_empty() {
            return Ok(Vec::new());
        }

        let like_pattern = format!("%{}%", util::escape_like(&util::normalize_title(query)));
        // `Kind::as_str()` only ever yields one of four fixed literals, so
        // inlining them is safe — the placeholders are reserved for the
        // actual untrusted input (the query text and the limit).
        let kind_list = kinds
            .iter()
            .map(|k| format!("'{}'", k.as_str()))
            .collect::<Vec<_>>()
            .join(",");
        let sql = format!(
            "SELECT kind, provider_id, source_id, source_name, day, start, title, features
             FROM search_items
             WHERE kind IN ({kind_list})
               AND title_norm LIKE ?1 ESCAPE '\\'
             ORDER BY day ASC, start ASC, source_name ASC, title ASC
             LIMIT ?2"
        );

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt.query_map(rusqlite::params![like_pattern, limit as i64], |row| {
            let kind_raw: String = row.get(0)?;
            let day_raw: String = row.get(4)?;
            let features_raw: String = row.get(7)?;
            Ok((
                kind_raw,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                day_raw,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                features_raw,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (kind_raw, provider_id, source_id, source_name, day_raw, start, title, features_raw) = row?;
            let Ok(kind) = kind_raw.parse::<Kind>() else { continue };
            let Ok(day) = NaiveDate::parse_from_str(&day_raw, "%Y-%m-%d") else { continue };
            let accessibility: Vec<AccessibilityFeature> = parse_feature_list(&features_raw);
            out.push(SearchResult {
                kind,
                provider_id,
                source_id,
                source_name,
                day,
                start,
                title,
                subtitle: None,
                details_ref: None,
                details_summary: None,
                accessibility,
                item_id: None,
            });
        }
        Ok(out)
    }

    /// Deletes rows indexed more than `keep_seconds` ago.
    pub fn prune(&self, keep_seconds: i64) -> StoreResult<usize> {
        let cutoff = now_unix() - keep_seconds;
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM search_items WHERE indexed_at < ?1", [cutoff])?;
        Ok(changed)
    }

    pub fn clear(&self) -> StoreResult<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM search_items", [])?;
        Ok(())
    }

    pub fn close(&self) -> StoreResult<()> {
        // `rusqlite::Connection` closes on drop; nothing else to flush.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{ProviderId, Source};

    fn item(title: &str, start_hm: &str, day: NaiveDate) -> ScheduleItem {
        ScheduleItem {
            provider_id: ProviderId::from("teleman"),
            source: Source::new("teleman", "tvp1", "TVP1"),
            day,
            start_time: chrono::NaiveTime::parse_from_str(start_hm, "%H:%M").ok(),
            end_time: None,
            title: title.to_owned(),
            subtitle: None,
            details_ref: None,
            details_summary: None,
            accessibility: Vec::new(),
        }
    }

    #[test]
    fn inserted_item_is_searchable_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        let index = SearchIndex::open(dir.path().join("search.sqlite3")).unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        index.add_items(Kind::Tv, &[item("Morning News", "08:00", day)]).unwrap();

        let lower = index.search("news", &[Kind::Tv], 10).unwrap();
        let upper = index.search("NEWS", &[Kind::Tv], 10).unwrap();
        assert_eq!(lower.len(), 1);
        assert_eq!(upper.len(), 1);
        assert_eq!(lower[0].title, "Morning News");
    }

    #[test]
    fn substring_search_orders_by_day_then_start() {
        let dir = tempfile::tempdir().unwrap();
        let index = SearchIndex::open(dir.path().join("search.sqlite3")).unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        index
            .add_items(
                Kind::Tv,
                &[
                    item("Morning News", "08:00", day),
                    item("Evening News", "19:00", day),
                    item("Sport Night", "21:00", day),
                ],
            )
            .unwrap();

        let results = index.search("news", &[Kind::Tv], 10).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Morning News");
        assert_eq!(results[1].title, "Evening News");
    }

    #[test]
    fn upsert_on_conflict_keeps_one_row_with_latest_indexed_at() {
        let dir = tempfile::tempdir().unwrap();
        let index = SearchIndex::open(dir.path().join("search.sqlite3")).unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let i1 = item("Repeats", "10:00", day);
        let i2 = i1.clone();
        index.add_items(Kind::Tv, &[i1]).unwrap();
        index.add_items(Kind::Tv, &[i2]).unwrap();

        let results = index.search("repeats", &[Kind::Tv], 10).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn empty_query_returns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let index = SearchIndex::open(dir.path().join("search.sqlite3")).unwrap();
        assert_eq!(index.search("   ", &[Kind::Tv], 10).unwrap(), Vec::new());
    }

    #[test]
    fn tv_accessibility_items_without_tags_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let index = SearchIndex::open(dir.path().join("search.sqlite3")).unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        index.add_items(Kind::TvAccessibility, &[item("No tags", "10:00", day)]).unwrap();
        assert_eq!(index.search("no tags", &[Kind::TvAccessibility], 10).unwrap(), Vec::new());
    }

    #[test]
    fn like_metacharacters_in_query_are_treated_literally() {
        let dir = tempfile::tempdir().unwrap();
        let index = SearchIndex::open(dir.path().join("search.sqlite3")).unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        index.add_items(Kind::Tv, &[item("100% Wolf", "10:00", day)]).unwrap();
        index.add_items(Kind::Tv, &[item("100X Wolf", "11:00", day)]).unwrap();

        let results = index.search("100%", &[Kind::Tv], 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "100% Wolf");
    }
}
