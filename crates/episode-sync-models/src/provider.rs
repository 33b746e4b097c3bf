use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Online databases a show can be identified by on TVmaze.
///
/// Variants are declared in lookup preference order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Provider {
    #[serde(rename = "tvmaze")]
    TvMaze,
    #[serde(rename = "thetvdb")]
    TheTvDb,
    #[serde(rename = "imdb")]
    Imdb,
}

impl Provider {
    /// All providers, most preferred first
    pub const PREFERENCE: [Provider; 3] = [Provider::TvMaze, Provider::TheTvDb, Provider::Imdb];

    /// Key of this provider in the media library's `uniqueid` map
    pub fn catalog_key(&self) -> &'static str {
        match self {
            Provider::TvMaze => "tvmaze",
            Provider::TheTvDb => "tvdb",
            Provider::Imdb => "imdb",
        }
    }

    /// Name of this provider as the TVmaze API expects it
    pub fn wire_name(&self) -> &'static str {
        match self {
            Provider::TvMaze => "tvmaze",
            Provider::TheTvDb => "thetvdb",
            Provider::Imdb => "imdb",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// A show ID in one of the supported online databases
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExternalId {
    pub id: String,
    pub provider: Provider,
}

impl ExternalId {
    /// Pick the most preferred supported ID from a library `uniqueid` map.
    ///
    /// Empty values are treated as absent.
    pub fn preferred(unique_ids: &HashMap<String, String>) -> Option<Self> {
        Provider::PREFERENCE.into_iter().find_map(|provider| {
            unique_ids
                .get(provider.catalog_key())
                .map(|id| id.trim())
                .filter(|id| !id.is_empty())
                .map(|id| ExternalId {
                    id: id.to_string(),
                    provider,
                })
        })
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.provider, self.id)
    }
}

/// A local show resolved to an ID usable for TVmaze calls
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShowIdentity {
    pub local_show_id: i64,
    pub remote_id: String,
    pub provider: Provider,
}

impl ShowIdentity {
    pub fn external_id(&self) -> ExternalId {
        ExternalId {
            id: self.remote_id.clone(),
            provider: self.provider,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_preferred_follows_priority() {
        let all = ids(&[("imdb", "tt0944947"), ("tvdb", "121361"), ("tvmaze", "82")]);
        let picked = ExternalId::preferred(&all).unwrap();
        assert_eq!(picked.provider, Provider::TvMaze);
        assert_eq!(picked.id, "82");

        let no_tvmaze = ids(&[("imdb", "tt0944947"), ("tvdb", "121361")]);
        let picked = ExternalId::preferred(&no_tvmaze).unwrap();
        assert_eq!(picked.provider, Provider::TheTvDb);
        assert_eq!(picked.provider.wire_name(), "thetvdb");

        let imdb_only = ids(&[("imdb", "tt0944947")]);
        assert_eq!(ExternalId::preferred(&imdb_only).unwrap().provider, Provider::Imdb);
    }

    #[test]
    fn test_preferred_never_yields_tvdb_wire_name() {
        for combo in [
            vec![("tvdb", "1")],
            vec![("tvdb", "1"), ("imdb", "tt1")],
            vec![("tvdb", "1"), ("tmdb", "5")],
        ] {
            let picked = ExternalId::preferred(&ids(&combo)).unwrap();
            assert_ne!(picked.provider.wire_name(), "tvdb");
            assert!(Provider::PREFERENCE.contains(&picked.provider));
        }
    }

    #[test]
    fn test_preferred_without_supported_ids() {
        assert!(ExternalId::preferred(&ids(&[("tmdb", "1399")])).is_none());
        assert!(ExternalId::preferred(&HashMap::new()).is_none());
        // Kodi sometimes stores empty strings for unknown ids
        assert!(ExternalId::preferred(&ids(&[("tvmaze", "")])).is_none());
    }

    #[test]
    fn test_provider_wire_name_matches_serde() {
        assert_eq!(Provider::TheTvDb.catalog_key(), "tvdb");
        assert_eq!(Provider::TheTvDb.wire_name(), "thetvdb");
        assert_eq!(serde_json::to_string(&Provider::TheTvDb).unwrap(), "\"thetvdb\"");
    }
}
