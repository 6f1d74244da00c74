use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use model::{ArchiveProvider, Kind, ScheduleProvider};
use parking_lot::Mutex;
use store::SearchIndex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::update::PrefetchUpdate;

struct RunState {
    handle: Option<JoinHandle<()>>,
    current_token: Option<CancellationToken>,
}

/// Walks `tv -> tv_accessibility -> radio -> archive`, feeding everything it
/// sees into the search index (spec §4.9). Grounded on the teacher's
/// `worker` crate cancellation pattern — a `CancellationToken` child-minted
/// per run off a root token, checked at every nested loop boundary — but
/// generalized from "recurring scheduled job" to "run once to completion or
/// until cancelled", since nothing here needs `clokwerk`'s recurrence.
///
/// Unlike `prefetch.py`'s `_run`, which always re-emits one extra terminal
/// update from a bare `finally` block regardless of which stage it stopped
/// at, this walk emits exactly one terminal [`PrefetchUpdate`] per run,
/// tagged with the stage it actually stopped or finished on.
pub struct PrefetchManager {
    tv: Arc<dyn ScheduleProvider>,
    tv_accessibility: Arc<dyn ScheduleProvider>,
    radio: Arc<dyn ScheduleProvider>,
    archive: Arc<dyn ArchiveProvider>,
    search_index: Arc<SearchIndex>,
    updates: mpsc::UnboundedSender<PrefetchUpdate>,
    cancel_root: CancellationToken,
    state: Mutex<RunState>,
}

impl PrefetchManager {
    pub fn new(
        tv: Arc<dyn ScheduleProvider>,
        tv_accessibility: Arc<dyn ScheduleProvider>,
        radio: Arc<dyn ScheduleProvider>,
        archive: Arc<dyn ArchiveProvider>,
        search_index: Arc<SearchIndex>,
        updates: mpsc::UnboundedSender<PrefetchUpdate>,
        cancel_root: CancellationToken,
    ) -> Self {
        Self {
            tv,
            tv_accessibility,
            radio,
            archive,
            search_index,
            updates,
            cancel_root,
            state: Mutex::new(RunState { handle: None, current_token: None }),
        }
    }

    pub fn is_running(&self) -> bool {
        let state = self.state.lock();
        state.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Starts a full walk unless one is already running. The previous run's
    /// token (if any) is simply discarded here — a stale `stop()` call
    /// against a finished run has nothing left to cancel, so a fresh child
    /// token always starts clean (matching `self._stop.clear()`).
    pub fn start_full_sync(self: &Arc<Self>) -> bool {
        let mut state = self.state.lock();
        if state.handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return false;
        }

        let token = self.cancel_root.child_token();
        state.current_token = Some(token.clone());

        let manager = Arc::clone(self);
        state.handle = Some(tokio::spawn(async move { manager.run(token).await }));
        true
    }

    /// Cancels the in-flight run, if any. A no-op before the first run, or
    /// once a run has already finished (sticky only for the run it targets).
    pub fn stop(&self) {
        let state = self.state.lock();
        if let Some(token) = &state.current_token {
            token.cancel();
        }
    }

    async fn run(self: Arc<Self>, token: CancellationToken) {
        let mut errors: u64 = 0;

        errors = self.prefetch_schedule_stage(Kind::Tv, &self.tv, &token, errors, None).await;
        if token.is_cancelled() {
            self.finish(Kind::Tv, errors, true);
            return;
        }

        errors = self.prefetch_schedule_stage(Kind::TvAccessibility, &self.tv_accessibility, &token, errors, None).await;
        if token.is_cancelled() {
            self.finish(Kind::TvAccessibility, errors, true);
            return;
        }

        let today = chrono::Local::now().date_naive();
        errors = self.prefetch_schedule_stage(Kind::Radio, &self.radio, &token, errors, Some(today)).await;
        if token.is_cancelled() {
            self.finish(Kind::Radio, errors, true);
            return;
        }

        errors = self.prefetch_archive(&token, errors).await;
        self.finish(Kind::Archive, errors, token.is_cancelled());
    }

    async fn prefetch_schedule_stage(
        &self,
        stage: Kind,
        provider: &Arc<dyn ScheduleProvider>,
        token: &CancellationToken,
        mut errors: u64,
        keep_from: Option<NaiveDate>,
    ) -> u64 {
        self.emit_progress(stage, "Ładowanie listy kanałów i dni…", 0, None, errors);

        let sources = match provider.list_sources(false).await {
            Ok(sources) => sources,
            Err(err) => {
                self.emit_progress(stage, &format!("Błąd listowania: {err}"), 0, None, errors + 1);
                return errors + 1;
            }
        };
        let days_all = match provider.list_days(false).await {
            Ok(days) => days,
            Err(err) => {
                self.emit_progress(stage, &format!("Błąd listowania: {err}"), 0, None, errors + 1);
                return errors + 1;
            }
        };

        let mut provider_ids: Vec<&str> = sources.iter().map(|s| s.provider_id.as_str()).collect();
        provider_ids.sort_unstable();
        provider_ids.dedup();

        let mut days_by_provider: HashMap<&str, Vec<NaiveDate>> = HashMap::new();
        for pid in provider_ids {
            let mut days = match provider.list_days_for_provider(pid, false).await {
                Ok(days) => days,
                Err(_) => days_all.clone(),
            };
            if let Some(from) = keep_from {
                days.retain(|d| *d >= from);
            }
            days_by_provider.insert(pid, days);
        }

        let total: u64 = sources.iter().map(|s| days_by_provider.get(s.provider_id.as_str()).map_or(0, Vec::len) as u64).sum();
        let mut done: u64 = 0;
        self.emit_progress(stage, "Pobieranie ramówek…", done, Some(total), errors);

        'sources: for source in &sources {
            if token.is_cancelled() {
                break;
            }
            let days = days_by_provider.get(source.provider_id.as_str()).cloned().unwrap_or_default();
            for day in days {
                if token.is_cancelled() {
                    break 'sources;
                }
                done += 1;
                self.emit_progress(stage, &format!("{} {day}", source.name), done, Some(total), errors);

                let items = match provider.get_schedule(source, day, false).await {
                    Ok(items) => items,
                    Err(_) => {
                        errors += 1;
                        continue;
                    }
                };
                if let Err(err) = self.search_index.add_items(stage, &items) {
                    warn!(stage = stage.as_str(), %err, "failed to index prefetched items");
                    errors += 1;
                }
            }
        }

        errors
    }

    async fn prefetch_archive(&self, token: &CancellationToken, mut errors: u64) -> u64 {
        let stage = Kind::Archive;
        self.emit_progress(stage, "Ładowanie listy lat…", 0, None, errors);

        let years = match self.archive.list_years().await {
            Ok(years) => years,
            Err(err) => {
                self.emit_progress(stage, &format!("Błąd listowania lat: {err}"), 0, None, errors + 1);
                return errors + 1;
            }
        };

        'years: for year in years {
            if token.is_cancelled() {
                break;
            }
            for month in 1..=12u32 {
                if token.is_cancelled() {
                    break 'years;
                }
                self.emit_progress(stage, &format!("{year}-{month:02}: szukanie dni…"), 0, None, errors);

                let days = match self.archive.list_days_in_month(year, month, false).await {
                    Ok(days) => days,
                    Err(_) => {
                        errors += 1;
                        continue;
                    }
                };

                for day in days {
                    if token.is_cancelled() {
                        break 'years;
                    }
                    let sources = match self.archive.list_sources_for_day(day, false).await {
                        Ok(sources) => sources,
                        Err(_) => {
                            errors += 1;
                            continue;
                        }
                    };

                    let total_sources = sources.len();
                    for (idx, source) in sources.iter().enumerate() {
                        if token.is_cancelled() {
                            break 'years;
                        }
                        self.emit_progress(stage, &format!("{day} ({}/{total_sources}): {}", idx + 1, source.name), 0, None, errors);

                        let items = match self.archive.get_schedule(source, day, false).await {
                            Ok(items) => items,
                            Err(_) => {
                                errors += 1;
                                continue;
                            }
                        };
                        if let Err(err) = self.search_index.add_items(stage, &items) {
                            warn!(stage = stage.as_str(), %err, "failed to index prefetched archive items");
                            errors += 1;
                        }
                    }
                }
            }
        }

        errors
    }

    fn emit_progress(&self, stage: Kind, message: &str, done: u64, total: Option<u64>, errors: u64) {
        let _ = self.updates.send(PrefetchUpdate {
            stage,
            message: message.to_owned(),
            done,
            total,
            errors,
            finished: false,
            cancelled: false,
        });
    }

    fn finish(&self, stage: Kind, errors: u64, cancelled: bool) {
        let message = if cancelled { "Przerwano." } else { "Gotowe." };
        let _ = self.updates.send(PrefetchUpdate {
            stage,
            message: message.to_owned(),
            done: 0,
            total: None,
            errors,
            finished: !cancelled,
            cancelled,
        });
    }
}
