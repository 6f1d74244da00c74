use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::accessibility::AccessibilityFeature;
use crate::ids::ProviderId;
use crate::source::Source;

/// A single program entry, as observed from a provider (spec §3).
///
/// `start_time`/`end_time` are in the day's civil timezone as supplied by
/// the provider; the core never converts them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduleItem {
    pub provider_id: ProviderId,
    pub source: Source,
    pub day: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub title: String,
    pub subtitle: Option<String>,
    pub details_ref: Option<String>,
    pub details_summary: Option<String>,
    pub accessibility: Vec<AccessibilityFeature>,
}

impl ScheduleItem {
    /// Title after trimming — the emptiness check cache/index boundaries
    /// apply before admitting an item (spec §3 invariant).
    pub fn trimmed_title(&self) -> &str {
        self.title.trim()
    }

    pub fn has_valid_title(&self) -> bool {
        !self.trimmed_title().is_empty()
    }

    /// Pure field-replacement builder, the Rust shape of `dataclasses.replace`
    /// (Design Notes: "immutable schedule items with field-replacement").
    /// Used by the favorites overlay to re-stamp `provider_id`/`source`
    /// without mutating the original item.
    pub fn with_provider_and_source(&self, provider_id: ProviderId, source: Source) -> Self {
        Self {
            provider_id,
            source,
            ..self.clone()
        }
    }
}
