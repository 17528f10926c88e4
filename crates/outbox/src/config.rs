use enrelay::NormRelayUrl;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const DEFAULT_MAX_CONNECTIONS: usize = 12;
pub const DEFAULT_MAX_RELAYS_PER_USER: usize = 6;

/// Budget knobs for the selector plus the static fallback relay list.
/// Validation happens here at the configuration boundary so invalid
/// values never reach the selection pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxConfig {
    pub max_connections: usize,
    pub max_relays_per_user: usize,
    /// Anti-concentration cap: a relay already serving more than this
    /// percentage of users is skipped while alternatives exist.
    pub max_relay_coverage: Option<f32>,
    pub fallback_relays: Vec<NormRelayUrl>,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        OutboxConfig {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_relays_per_user: DEFAULT_MAX_RELAYS_PER_USER,
            max_relay_coverage: None,
            fallback_relays: Vec::new(),
        }
    }
}

impl OutboxConfig {
    pub fn new(max_connections: usize, max_relays_per_user: usize) -> Self {
        OutboxConfig {
            max_connections: max_connections.max(1),
            max_relays_per_user,
            ..Default::default()
        }
    }

    pub fn with_fallbacks(mut self, fallback_relays: Vec<NormRelayUrl>) -> Self {
        self.fallback_relays = fallback_relays;
        self
    }

    pub fn set_max_connections(&mut self, budget: usize) {
        self.max_connections = budget.max(1);
    }

    pub fn set_max_relays_per_user(&mut self, cap: usize) {
        self.max_relays_per_user = cap;
    }

    /// Set or clear the coverage cap. Percentages outside (0, 100] are
    /// rejected.
    pub fn set_max_relay_coverage(&mut self, percent: Option<f32>) -> Result<()> {
        if let Some(percent) = percent {
            if !percent.is_finite() || percent <= 0.0 || percent > 100.0 {
                return Err(Error::Config(format!(
                    "max_relay_coverage must be within (0, 100], got {percent}"
                )));
            }
        }
        self.max_relay_coverage = percent;
        Ok(())
    }

    pub fn set_fallback_relays(&mut self, fallback_relays: Vec<NormRelayUrl>) {
        self.fallback_relays = fallback_relays;
    }
}
