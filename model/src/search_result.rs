use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::accessibility::AccessibilityFeature;
use crate::kind::Kind;

/// A row from either the remote search API or the local full-text index —
/// both share this envelope (spec §3). `item_id` is only ever present for
/// remote rows; it's the pagination cursor (decreasing).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub kind: Kind,
    pub provider_id: String,
    pub source_id: String,
    pub source_name: String,
    pub day: NaiveDate,
    /// `HH:MM`, always 5 characters when non-empty.
    pub start: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub details_ref: Option<String>,
    pub details_summary: Option<String>,
    pub accessibility: Vec<AccessibilityFeature>,
    pub item_id: Option<i64>,
}

impl SearchResult {
    /// Sort key shared by the hub client and the local index:
    /// `(day, start, casefold(source_name), casefold(title))`.
    pub fn sort_key(&self) -> (NaiveDate, String, String, String) {
        (
            self.day,
            self.start.clone(),
            self.source_name.to_lowercase(),
            self.title.to_lowercase(),
        )
    }
}
