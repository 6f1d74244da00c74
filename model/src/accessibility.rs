use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the three accessibility tags the core understands. Anything else
/// observed from a provider is discarded at the boundary (spec invariant on
/// `ScheduleItem::accessibility`).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum AccessibilityFeature {
    /// Audio description.
    #[serde(rename = "AD")]
    AudioDescription,
    /// Sign language.
    #[serde(rename = "JM")]
    SignLanguage,
    /// Captions.
    #[serde(rename = "N")]
    Captions,
}

impl AccessibilityFeature {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessibilityFeature::AudioDescription => "AD",
            AccessibilityFeature::SignLanguage => "JM",
            AccessibilityFeature::Captions => "N",
        }
    }
}

impl fmt::Display for AccessibilityFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessibilityFeature {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AD" => Ok(AccessibilityFeature::AudioDescription),
            "JM" => Ok(AccessibilityFeature::SignLanguage),
            "N" => Ok(AccessibilityFeature::Captions),
            _ => Err(()),
        }
    }
}

/// Parses a comma-separated feature list, silently dropping unknown tags.
/// Mirrors the original index's `",".join(...)`/`split(",")` wire shape
/// (§4.3).
pub fn parse_feature_list(raw: &str) -> Vec<AccessibilityFeature> {
    raw.split(',')
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect()
}

pub fn format_feature_list(features: &[AccessibilityFeature]) -> String {
    features
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(",")
}
