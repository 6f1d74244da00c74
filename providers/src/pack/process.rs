use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use model::{ArchiveProvider, Kind, ProviderError, ProviderId, ProviderResult, ScheduleItem, ScheduleProvider, Source};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::sync::Mutex;

use super::error::{PackError, PackResult};
use super::protocol::{Request, Response, WireScheduleItem, WireSource};

struct ChildIo {
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// A live pack subprocess, kept alive for the lifetime of its delegate
/// (spec §4.6 redesign). Every call is a serialized request/response round
/// trip over newline-delimited JSON on the child's stdin/stdout — there is
/// no pipelining, mirroring the original's synchronous, one-call-at-a-time
/// Python function invocation.
pub struct PackProcess {
    _child: Mutex<Child>,
    io: Mutex<ChildIo>,
    kind: Kind,
    provider_id: String,
    display_name: String,
}

impl PackProcess {
    /// Spawns `entrypoint`, passing the shared fetcher configuration via
    /// environment variables (base headers, cache root — the pack performs
    /// its own HTTP I/O rather than borrowing the host's fetcher, per the
    /// redesign), then performs the handshake and verifies `kind` matches.
    pub async fn spawn(entrypoint: &std::path::Path, kind: Kind, env: &HashMap<String, String>) -> PackResult<Self> {
        let mut command = tokio::process::Command::new(entrypoint);
        command.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::inherit()).envs(env);
        let mut child = command.spawn()?;

        let stdin = child.stdin.take().ok_or_else(|| PackError::Process("pack exposed no stdin".into()))?;
        let stdout = child.stdout.take().ok_or_else(|| PackError::Process("pack exposed no stdout".into()))?;
        let io = Mutex::new(ChildIo { stdin, stdout: BufReader::new(stdout) });

        let process = Self {
            _child: Mutex::new(child),
            io,
            kind,
            provider_id: String::new(),
            display_name: String::new(),
        };

        let handshake = process.request(&Request::Handshake).await?;
        if let Some(err) = handshake.error() {
            return Err(PackError::Process(format!("handshake failed: {err}")));
        }
        let answered_kind = handshake.get_str("kind").unwrap_or_default();
        if answered_kind != kind.as_str() {
            return Err(PackError::Process(format!(
                "handshake kind mismatch: expected {}, got {answered_kind}",
                kind.as_str()
            )));
        }
        let provider_id = handshake.get_str("provider_id").unwrap_or_else(|| "pack".into());
        let display_name = handshake.get_str("display_name").unwrap_or_else(|| provider_id.clone());

        Ok(Self { provider_id, display_name, ..process })
    }

    pub async fn request(&self, req: &Request) -> PackResult<Response> {
        let mut line = serde_json::to_string(req)?;
        line.push('\n');

        let mut io = self.io.lock().await;
        io.stdin.write_all(line.as_bytes()).await?;
        io.stdin.flush().await?;

        let mut raw = String::new();
        let read = io.stdout.read_line(&mut raw).await?;
        if read == 0 {
            return Err(PackError::Process("pack process closed stdout".into()));
        }
        let value: serde_json::Value = serde_json::from_str(raw.trim())?;
        Ok(Response { value })
    }

    fn provider_error(err: PackError) -> ProviderError {
        ProviderError::from(err.to_string())
    }
}

/// Wraps a schedule-kind [`PackProcess`] as a [`ScheduleProvider`].
pub struct ScheduleProcessProvider {
    process: Arc<PackProcess>,
}

impl ScheduleProcessProvider {
    pub fn new(process: Arc<PackProcess>) -> Self {
        Self { process }
    }
}

#[async_trait]
impl ScheduleProvider for ScheduleProcessProvider {
    fn provider_id(&self) -> ProviderId {
        ProviderId::from(self.process.provider_id.as_str())
    }

    fn display_name(&self) -> String {
        self.process.display_name.clone()
    }

    async fn list_sources(&self, force_refresh: bool) -> ProviderResult<Vec<Source>> {
        let resp = self.process.request(&Request::ListSources { force_refresh }).await.map_err(PackProcess::provider_error)?;
        if let Some(err) = resp.error() {
            return Err(ProviderError::from(err));
        }
        Ok(resp.get_sources())
    }

    async fn list_days(&self, force_refresh: bool) -> ProviderResult<Vec<NaiveDate>> {
        let resp = self.process.request(&Request::ListDays { force_refresh }).await.map_err(PackProcess::provider_error)?;
        if let Some(err) = resp.error() {
            return Err(ProviderError::from(err));
        }
        Ok(resp.get_days())
    }

    async fn list_days_for_provider(&self, provider_id: &str, force_refresh: bool) -> ProviderResult<Vec<NaiveDate>> {
        let resp = self
            .process
            .request(&Request::ListDaysForProvider { provider_id: provider_id.to_owned(), force_refresh })
            .await
            .map_err(PackProcess::provider_error)?;
        if let Some(err) = resp.error() {
            return Err(ProviderError::from(err));
        }
        Ok(resp.get_days())
    }

    async fn get_schedule(&self, source: &Source, day: NaiveDate, force_refresh: bool) -> ProviderResult<Vec<ScheduleItem>> {
        let resp = self
            .process
            .request(&Request::GetSchedule { source: WireSource::from(source), day, force_refresh })
            .await
            .map_err(PackProcess::provider_error)?;
        if let Some(err) = resp.error() {
            return Err(ProviderError::from(err));
        }
        Ok(resp.get_items())
    }

    async fn get_item_details(&self, item: &ScheduleItem, force_refresh: bool) -> ProviderResult<String> {
        let resp = self
            .process
            .request(&Request::GetItemDetails { item: WireScheduleItem::from(item), force_refresh })
            .await
            .map_err(PackProcess::provider_error)?;
        if let Some(err) = resp.error() {
            return Err(ProviderError::from(err));
        }
        Ok(resp.get_str("text").unwrap_or_default())
    }
}

/// Wraps an archive-kind [`PackProcess`] as an [`ArchiveProvider`].
pub struct ArchiveProcessProvider {
    process: Arc<PackProcess>,
}

impl ArchiveProcessProvider {
    pub fn new(process: Arc<PackProcess>) -> Self {
        Self { process }
    }
}

#[async_trait]
impl ArchiveProvider for ArchiveProcessProvider {
    fn provider_id(&self) -> ProviderId {
        ProviderId::from(self.process.provider_id.as_str())
    }

    fn display_name(&self) -> String {
        self.process.display_name.clone()
    }

    async fn list_years(&self) -> ProviderResult<Vec<i32>> {
        let resp = self.process.request(&Request::ListYears).await.map_err(PackProcess::provider_error)?;
        if let Some(err) = resp.error() {
            return Err(ProviderError::from(err));
        }
        Ok(resp.get_years())
    }

    async fn list_days_in_month(&self, year: i32, month: u32, force_refresh: bool) -> ProviderResult<Vec<NaiveDate>> {
        let resp = self
            .process
            .request(&Request::ListDaysInMonth { year, month, force_refresh })
            .await
            .map_err(PackProcess::provider_error)?;
        if let Some(err) = resp.error() {
            return Err(ProviderError::from(err));
        }
        Ok(resp.get_days())
    }

    async fn list_sources_for_day(&self, day: NaiveDate, force_refresh: bool) -> ProviderResult<Vec<Source>> {
        let resp = self
            .process
            .request(&Request::ListSourcesForDay { day, force_refresh })
            .await
            .map_err(PackProcess::provider_error)?;
        if let Some(err) = resp.error() {
            return Err(ProviderError::from(err));
        }
        Ok(resp.get_sources())
    }

    async fn get_schedule(&self, source: &Source, day: NaiveDate, force_refresh: bool) -> ProviderResult<Vec<ScheduleItem>> {
        let resp = self
            .process
            .request(&Request::GetSchedule { source: WireSource::from(source), day, force_refresh })
            .await
            .map_err(PackProcess::provider_error)?;
        if let Some(err) = resp.error() {
            return Err(ProviderError::from(err));
        }
        Ok(resp.get_items())
    }
}
