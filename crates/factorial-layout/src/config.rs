use crate::relax::RelaxConfig;
use crate::resolve::ProducerPolicy;
use crate::route::RouterConfig;
use factorial_spatial::SiteBounds;
use serde::{Deserialize, Serialize};

/// Settings for one layout run. Every field has a default, so a config file
/// only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub site: SiteBounds,
    /// Seed for the random initial placement.
    pub seed: u64,
    pub producer_policy: ProducerPolicy,
    pub relax: RelaxConfig,
    pub router: RouterConfig,
    /// Further attempts, each with the next seed, when relaxation does not
    /// converge.
    pub restarts: u32,
}
