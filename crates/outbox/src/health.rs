use std::collections::BTreeMap;
use std::time::Duration;

use enrelay::NormRelayUrl;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Consecutive failures after which a relay is considered dead.
pub const DEAD_THRESHOLD: u32 = 5;

const BASE_BACKOFF: Duration = Duration::from_secs(2);
const MAX_BACKOFF: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayHealthState {
    Online,
    Offline,
    Dead,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayHealth {
    pub state: RelayHealthState,
    pub failure_count: u32,
    pub backoff_until: u64,
}

impl Default for RelayHealth {
    fn default() -> Self {
        RelayHealth {
            state: RelayHealthState::Online,
            failure_count: 0,
            backoff_until: 0,
        }
    }
}

/// Classifies relays from the connection outcomes the networking layer
/// reports. The tracker itself never fails, it only keeps score.
#[derive(Default)]
pub struct RelayHealthTracker {
    relays: HashMap<NormRelayUrl, RelayHealth>,
}

impl RelayHealthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failed connection attempt at `now` (unix seconds).
    /// Bumps the failure count, reclassifies, and pushes the backoff
    /// window out. `backoff_until` never moves backwards while
    /// failures continue.
    pub fn record_failure(&mut self, url: &NormRelayUrl, now: u64) {
        let health = self.relays.entry(url.clone()).or_default();

        health.failure_count = health.failure_count.saturating_add(1);
        health.state = if health.failure_count >= DEAD_THRESHOLD {
            RelayHealthState::Dead
        } else {
            RelayHealthState::Offline
        };
        health.backoff_until = health
            .backoff_until
            .max(now.saturating_add(backoff_delay(health.failure_count).as_secs()));

        debug!(
            "relay {} failed ({} consecutive), {:?} until {}",
            url, health.failure_count, health.state, health.backoff_until
        );
    }

    /// Record a successful connection, resetting the relay to online.
    pub fn record_success(&mut self, url: &NormRelayUrl) {
        let health = self.relays.entry(url.clone()).or_default();

        if health.state != RelayHealthState::Online {
            debug!("relay {} revived by successful connect", url);
        }

        *health = RelayHealth::default();
    }

    /// Manual override for user-initiated retry: force the relay back
    /// online and clear its backoff regardless of failure count.
    pub fn revive(&mut self, url: &NormRelayUrl) {
        debug!("relay {} manually revived", url);
        self.relays.insert(url.clone(), RelayHealth::default());
    }

    /// A relay is usable unless it is dead or still inside its backoff
    /// window. Relays we have never seen are usable.
    pub fn is_usable(&self, url: &NormRelayUrl, now: u64) -> bool {
        self.relays
            .get(url)
            .is_none_or(|h| h.state != RelayHealthState::Dead && now >= h.backoff_until)
    }

    pub fn state(&self, url: &NormRelayUrl) -> RelayHealth {
        self.relays.get(url).cloned().unwrap_or_default()
    }

    /// All tracked relays currently not online, sorted by url.
    pub fn unhealthy(&self) -> Vec<NormRelayUrl> {
        let mut urls: Vec<NormRelayUrl> = self
            .relays
            .iter()
            .filter(|(_, h)| h.state != RelayHealthState::Online)
            .map(|(url, _)| url.clone())
            .collect();
        urls.sort();
        urls
    }

    /// Serializable copy of the tracked state, for persistence.
    pub fn snapshot(&self) -> BTreeMap<NormRelayUrl, RelayHealth> {
        self.relays
            .iter()
            .map(|(url, h)| (url.clone(), h.clone()))
            .collect()
    }

    /// Replace the tracked state with a previously saved snapshot.
    pub fn restore(&mut self, snapshot: BTreeMap<NormRelayUrl, RelayHealth>) {
        self.relays = snapshot.into_iter().collect();
    }
}

fn backoff_delay(failure_count: u32) -> Duration {
    let shift = failure_count.min(16);
    let secs = (BASE_BACKOFF.as_secs() << shift).min(MAX_BACKOFF.as_secs());
    Duration::from_secs(secs)
}
