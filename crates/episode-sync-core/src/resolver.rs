use episode_sync_models::{ExternalId, Provider, ShowIdentity, TvShow};
use episode_sync_sources::{MediaLibrary, RemoteService};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::ResolveError;

/// Maps a library show to the TVmaze id used for remote calls.
///
/// A show known only by a TheTVDB or IMDb id is looked up once; the TVmaze id found is written
/// back to the library so later runs resolve locally.
#[derive(Clone)]
pub struct IdentityResolver {
    library: Arc<dyn MediaLibrary>,
    remote: Arc<dyn RemoteService>,
}

impl IdentityResolver {
    pub fn new(library: Arc<dyn MediaLibrary>, remote: Arc<dyn RemoteService>) -> Self {
        Self { library, remote }
    }

    pub async fn resolve(&self, show: &TvShow) -> Result<ShowIdentity, ResolveError> {
        let external = preferred_external_id(show).ok_or_else(|| ResolveError::NoSupportedId {
            show_id: show.show_id,
            unique_ids: show.unique_ids.clone(),
        })?;

        if external.provider == Provider::TvMaze {
            return Ok(ShowIdentity {
                local_show_id: show.show_id,
                remote_id: external.id,
                provider: Provider::TvMaze,
            });
        }

        debug!(show_id = show.show_id, external = %external, "Looking up TVmaze id");
        let info = self
            .remote
            .lookup_show(&external)
            .await
            .map_err(|source| ResolveError::NotFound {
                show_id: show.show_id,
                external: external.clone(),
                source,
            })?;
        let remote_id = info.id.to_string();

        // The id is usable for this run even if the library refuses to store it
        match self
            .library
            .set_show_external_id(show.show_id, Provider::TvMaze.catalog_key(), &remote_id)
            .await
        {
            Ok(()) => info!(
                show_id = show.show_id,
                external = %external,
                tvmaze_id = %remote_id,
                "Stored TVmaze id on show"
            ),
            Err(e) => warn!(show_id = show.show_id, error = %e, "Failed to store TVmaze id on show"),
        }

        Ok(ShowIdentity {
            local_show_id: show.show_id,
            remote_id,
            provider: Provider::TvMaze,
        })
    }

    /// Resolve through a per-operation cache. Failures are cached too, so an unresolvable show
    /// is looked up and logged once per operation.
    pub async fn resolve_cached(
        &self,
        show: &TvShow,
        cache: &mut HashMap<i64, Option<ShowIdentity>>,
    ) -> Option<ShowIdentity> {
        if let Some(cached) = cache.get(&show.show_id) {
            return cached.clone();
        }
        let resolved = match self.resolve(show).await {
            Ok(identity) => Some(identity),
            Err(e) => {
                error!(
                    show_id = show.show_id,
                    show = %show.label,
                    unique_ids = ?show.unique_ids,
                    error = %e,
                    "Unable to determine TVmaze id from show info"
                );
                None
            }
        };
        cache.insert(show.show_id, resolved.clone());
        resolved
    }
}

/// Most preferred supported id of a show, named as the TVmaze API expects (`thetvdb`, never `tvdb`)
pub fn preferred_external_id(show: &TvShow) -> Option<ExternalId> {
    show.preferred_external_id()
}
