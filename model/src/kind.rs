use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the four schedule kinds the core indexes and prefetches.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Tv,
    TvAccessibility,
    Radio,
    Archive,
}

impl Kind {
    pub const ALL: [Kind; 4] = [Kind::Tv, Kind::TvAccessibility, Kind::Radio, Kind::Archive];

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Tv => "tv",
            Kind::TvAccessibility => "tv_accessibility",
            Kind::Radio => "radio",
            Kind::Archive => "archive",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tv" => Ok(Kind::Tv),
            "tv_accessibility" => Ok(Kind::TvAccessibility),
            "radio" => Ok(Kind::Radio),
            "archive" => Ok(Kind::Archive),
            other => Err(UnknownKind(other.to_owned())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown kind: {0}")]
pub struct UnknownKind(pub String);

/// The two kinds a favorite can point at — a strict subset of [`Kind`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FavoriteKind {
    Tv,
    Radio,
}

impl FavoriteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FavoriteKind::Tv => "tv",
            FavoriteKind::Radio => "radio",
        }
    }

    pub fn as_kind(&self) -> Kind {
        match self {
            FavoriteKind::Tv => Kind::Tv,
            FavoriteKind::Radio => Kind::Radio,
        }
    }
}

impl fmt::Display for FavoriteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FavoriteKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tv" => Ok(FavoriteKind::Tv),
            "radio" => Ok(FavoriteKind::Radio),
            other => Err(UnknownKind(other.to_owned())),
        }
    }
}
