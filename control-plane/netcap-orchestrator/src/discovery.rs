use futures_util::TryStreamExt;
use netcap_control::ControlPlane;
use netcap_models::{DiscoveredResource, matches_target_pattern, short_name};
use tracing::debug;

use crate::errors::{EngineError, EngineResult};

/// Lists every service under `parent` whose short name is `<prefix>-<digits>`.
///
/// Pages are pulled lazily and filtered as they arrive. Any listing error
/// aborts discovery; a partial set is never returned.
pub async fn discover(
    control: &dyn ControlPlane,
    parent: &str,
    prefix: &str,
) -> EngineResult<Vec<DiscoveredResource>> {
    let resources: Vec<DiscoveredResource> = control
        .list_services(parent)
        .map_err(EngineError::DiscoveryFailed)
        .try_filter_map(|svc| async move {
            if !matches_target_pattern(prefix, short_name(&svc.name)) {
                return Ok(None);
            }
            Ok(Some(DiscoveredResource::from_name(svc.name, svc.uri)))
        })
        .try_collect()
        .await?;
    debug!(parent = %parent, prefix = %prefix, count = resources.len(), "Discovered services");
    Ok(resources)
}
