use serde::{Deserialize, Serialize};

use crate::kind::FavoriteKind;

/// Identity of a favorited source: `(kind, provider_id, source_id)` (spec
/// §3). Two refs with equal fields are the same favorite.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct FavoriteRef {
    pub kind: FavoriteKind,
    pub provider_id: String,
    pub source_id: String,
}

impl FavoriteRef {
    pub fn new(kind: FavoriteKind, provider_id: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            kind,
            provider_id: provider_id.into(),
            source_id: source_id.into(),
        }
    }

    pub fn key(&self) -> (FavoriteKind, &str, &str) {
        (self.kind, self.provider_id.as_str(), self.source_id.as_str())
    }
}

/// A [`FavoriteRef`] plus the display name captured when it was added.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FavoriteEntry {
    pub kind: FavoriteKind,
    pub provider_id: String,
    pub source_id: String,
    pub name: String,
}

impl FavoriteEntry {
    pub fn as_ref(&self) -> FavoriteRef {
        FavoriteRef {
            kind: self.kind,
            provider_id: self.provider_id.clone(),
            source_id: self.source_id.clone(),
        }
    }

    pub fn from_ref(r: FavoriteRef, name: impl Into<String>) -> Self {
        Self {
            kind: r.kind,
            provider_id: r.provider_id,
            source_id: r.source_id,
            name: name.into(),
        }
    }
}

/// Serializes to the compact `{"k":...,"p":...,"s":...}` shape used to
/// encode a favorite's original identity into a single opaque source id
/// (spec §4.7/§6).
#[derive(Serialize, Deserialize)]
struct EncodedFavoriteSourceId<'a> {
    #[serde(rename = "k")]
    kind: &'a str,
    #[serde(rename = "p")]
    provider_id: &'a str,
    #[serde(rename = "s")]
    source_id: &'a str,
}

pub fn encode_favorite_source_id(r: &FavoriteRef) -> String {
    let encoded = EncodedFavoriteSourceId {
        kind: r.kind.as_str(),
        provider_id: &r.provider_id,
        source_id: &r.source_id,
    };
    // `serde_json::to_string` already omits whitespace and is ASCII-safe for
    // our inputs (arbitrary Unicode in provider/source ids round-trips
    // through `\uXXXX` escapes), matching `ensure_ascii=false` intent: we
    // keep non-ASCII as literal UTF-8 rather than escaping it.
    serde_json::to_string(&encoded).unwrap_or_default()
}

/// Decodes an encoded favorite source id, accepting both the compact `k`/
/// `p`/`s` keys and the legacy `kind`/`provider_id`/`source_id` keys (spec
/// §6). Returns `None` for anything malformed or for an unknown kind.
pub fn decode_favorite_source_id(value: &str) -> Option<FavoriteRef> {
    let data: serde_json::Value = serde_json::from_str(value).ok()?;
    let obj = data.as_object()?;

    let kind_raw = obj
        .get("k")
        .or_else(|| obj.get("kind"))
        .and_then(|v| v.as_str())?;
    let provider_id = obj
        .get("p")
        .or_else(|| obj.get("provider_id"))
        .and_then(|v| v.as_str())?
        .trim();
    let source_id = obj
        .get("s")
        .or_else(|| obj.get("source_id"))
        .and_then(|v| v.as_str())?
        .trim();

    if provider_id.is_empty() || source_id.is_empty() {
        return None;
    }

    let kind: FavoriteKind = kind_raw.parse().ok()?;
    Some(FavoriteRef::new(kind, provider_id, source_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_valid_refs() {
        let r = FavoriteRef::new(FavoriteKind::Tv, "teleman", "13ulica");
        let encoded = encode_favorite_source_id(&r);
        assert_eq!(decode_favorite_source_id(&encoded), Some(r));
    }

    #[test]
    fn accepts_legacy_keys() {
        let legacy = r#"{"kind":"radio","provider_id":"pr","source_id":"Jedynka"}"#;
        assert_eq!(
            decode_favorite_source_id(legacy),
            Some(FavoriteRef::new(FavoriteKind::Radio, "pr", "Jedynka"))
        );
    }

    #[test]
    fn rejects_unknown_kind_and_missing_fields() {
        assert_eq!(decode_favorite_source_id(r#"{"k":"movie","p":"x","s":"y"}"#), None);
        assert_eq!(decode_favorite_source_id(r#"{"k":"tv","p":"","s":"y"}"#), None);
        assert_eq!(decode_favorite_source_id("not json"), None);
    }
}
