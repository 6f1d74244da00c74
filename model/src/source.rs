use serde::{Deserialize, Serialize};

use crate::ids::{ProviderId, SourceId};

/// A channel or station. `(provider_id, id)` is globally unique (spec §3).
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Source {
    pub provider_id: ProviderId,
    pub id: SourceId,
    pub name: String,
}

impl Source {
    pub fn new(provider_id: impl Into<ProviderId>, id: impl Into<SourceId>, name: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            id: id.into(),
            name: name.into(),
        }
    }
}
