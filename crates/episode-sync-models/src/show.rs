use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::provider::ExternalId;

/// A TV show as stored in the local media library
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TvShow {
    pub show_id: i64,
    pub label: String,
    /// External IDs keyed by library namespace (`tvmaze`, `tvdb`, `imdb`, ...)
    #[serde(default)]
    pub unique_ids: HashMap<String, String>,
}

impl TvShow {
    pub fn preferred_external_id(&self) -> Option<ExternalId> {
        ExternalId::preferred(&self.unique_ids)
    }
}
