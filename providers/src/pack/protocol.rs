use chrono::NaiveDate;
use model::{AccessibilityFeature, ProviderId, ScheduleItem, Source};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One line of the newline-delimited JSON wire protocol spoken with a
/// pack's child process (spec §4.6 redesign): each variant mirrors one
/// `ScheduleProvider`/`ArchiveProvider` trait method 1:1, tagged by `op`.
#[derive(Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Handshake,
    ListSources { force_refresh: bool },
    ListDays { force_refresh: bool },
    ListDaysForProvider { provider_id: String, force_refresh: bool },
    GetSchedule { source: WireSource, day: NaiveDate, force_refresh: bool },
    GetItemDetails { item: WireScheduleItem, force_refresh: bool },
    ListYears,
    ListDaysInMonth { year: i32, month: u32, force_refresh: bool },
    ListSourcesForDay { day: NaiveDate, force_refresh: bool },
}

#[derive(Clone, Serialize, Deserialize)]
pub struct WireSource {
    pub provider_id: String,
    pub id: String,
    pub name: String,
}

impl From<&Source> for WireSource {
    fn from(s: &Source) -> Self {
        Self {
            provider_id: s.provider_id.as_str().to_owned(),
            id: s.id.as_str().to_owned(),
            name: s.name.clone(),
        }
    }
}

impl From<WireSource> for Source {
    fn from(w: WireSource) -> Self {
        Source::new(w.provider_id, w.id, w.name)
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct WireScheduleItem {
    pub provider_id: String,
    pub source: WireSource,
    pub day: NaiveDate,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub title: String,
    pub subtitle: Option<String>,
    pub details_ref: Option<String>,
    pub details_summary: Option<String>,
    pub accessibility: Vec<String>,
}

impl From<&ScheduleItem> for WireScheduleItem {
    fn from(it: &ScheduleItem) -> Self {
        Self {
            provider_id: it.provider_id.as_str().to_owned(),
            source: WireSource::from(&it.source),
            day: it.day,
            start_time: it.start_time.map(|t| t.format("%H:%M").to_string()),
            end_time: it.end_time.map(|t| t.format("%H:%M").to_string()),
            title: it.title.clone(),
            subtitle: it.subtitle.clone(),
            details_ref: it.details_ref.clone(),
            details_summary: it.details_summary.clone(),
            accessibility: it.accessibility.iter().map(|f| f.as_str().to_owned()).collect(),
        }
    }
}

impl From<WireScheduleItem> for ScheduleItem {
    fn from(w: WireScheduleItem) -> Self {
        ScheduleItem {
            provider_id: ProviderId::from(w.provider_id),
            source: w.source.into(),
            day: w.day,
            start_time: w.start_time.as_deref().and_then(|s| chrono::NaiveTime::parse_from_str(s, "%H:%M").ok()),
            end_time: w.end_time.as_deref().and_then(|s| chrono::NaiveTime::parse_from_str(s, "%H:%M").ok()),
            title: w.title,
            subtitle: w.subtitle,
            details_ref: w.details_ref,
            details_summary: w.details_summary,
            accessibility: w.accessibility.iter().filter_map(|s| s.parse::<AccessibilityFeature>().ok()).collect(),
        }
    }
}

/// A decoded response line. Any response carrying a non-null `error` is
/// surfaced as a `ProviderError` by the caller rather than a panic — a
/// misbehaving pack never brings down the host process.
pub struct Response {
    pub value: Value,
}

impl Response {
    pub fn error(&self) -> Option<&str> {
        self.value.get("error").and_then(Value::as_str)
    }

    pub fn get_str(&self, field: &str) -> Option<String> {
        self.value.get(field).and_then(Value::as_str).map(str::to_owned)
    }

    pub fn get_days(&self) -> Vec<NaiveDate> {
        self.value
            .get("days")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_str).filter_map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()).collect())
            .unwrap_or_default()
    }

    pub fn get_years(&self) -> Vec<i32> {
        self.value
            .get("years")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_i64).map(|v| v as i32).collect())
            .unwrap_or_default()
    }

    pub fn get_sources(&self) -> Vec<Source> {
        self.value
            .get("sources")
            .cloned()
            .and_then(|v| serde_json::from_value::<Vec<WireSource>>(v).ok())
            .map(|v| v.into_iter().map(Source::from).collect())
            .unwrap_or_default()
    }

    pub fn get_items(&self) -> Vec<ScheduleItem> {
        self.value
            .get("items")
            .cloned()
            .and_then(|v| serde_json::from_value::<Vec<WireScheduleItem>>(v).ok())
            .map(|v| v.into_iter().map(ScheduleItem::from).collect())
            .unwrap_or_default()
    }
}
