use serde::{Deserialize, Serialize};

use crate::kind::Kind;

/// The schema version this crate knows how to read (spec §4.6).
pub const PACK_SCHEMA_VERSION: u32 = 1;

/// On-disk manifest for one provider-pack version (`pack.json`, spec §3/§6).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PackManifest {
    pub schema: u32,
    pub kind: Kind,
    pub version: String,
    pub package: String,
    /// Path (relative to the version directory) of the executable that
    /// speaks the pack stdio protocol (§4.6 redesign).
    pub entrypoint: String,
    pub provider_api_version: u32,
}

impl PackManifest {
    pub fn is_schema_supported(&self) -> bool {
        self.schema == PACK_SCHEMA_VERSION
    }
}
