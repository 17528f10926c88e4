use std::collections::BTreeMap;
use std::time::Duration;

use enrelay::NormRelayUrl;
use tracing::{info, warn};

use crate::debouncer::Debouncer;
use crate::health::RelayHealth;
use crate::storage::{self, DataPath, Directory};
use crate::RelayHealthTracker;

const HEALTH_FILE: &str = "relay_health.json";
const SAVE_DELAY: Duration = Duration::from_secs(1);

/// Persists relay health snapshots so backoff discipline survives a
/// restart. Saves are debounced and skipped when nothing changed, so
/// callers can hand the tracker over every tick.
pub struct HealthHandler {
    directory: Directory,
    debouncer: Debouncer,
    last_saved: Option<String>,
}

impl HealthHandler {
    pub fn new(path: &DataPath) -> Self {
        Self {
            directory: Directory::new(path.health()),
            debouncer: Debouncer::new(SAVE_DELAY),
            last_saved: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.debouncer = Debouncer::new(delay);
        self
    }

    /// Load the previously saved snapshot. A missing or unreadable
    /// file is a fresh start, not an error.
    pub fn load(&mut self) -> Option<BTreeMap<NormRelayUrl, RelayHealth>> {
        let contents = self.directory.get_file(HEALTH_FILE.to_string()).ok()?;

        match serde_json::from_str(&contents) {
            Ok(snapshot) => {
                self.last_saved = Some(contents);
                Some(snapshot)
            }
            Err(err) => {
                warn!("discarding unreadable health snapshot: {err}");
                None
            }
        }
    }

    /// Save the tracker's current snapshot if the debounce window has
    /// passed and the state actually changed. Returns whether a write
    /// happened.
    pub fn try_save(&mut self, tracker: &RelayHealthTracker) -> bool {
        if !self.debouncer.should_act() {
            return false;
        }

        let serialized = match serde_json::to_string(&tracker.snapshot()) {
            Ok(serialized) => serialized,
            Err(err) => {
                warn!("failed to serialize health snapshot: {err}");
                return false;
            }
        };

        if self.last_saved.as_deref() == Some(serialized.as_str()) {
            return false;
        }

        if let Err(err) = storage::write_file(
            &self.directory.file_path,
            HEALTH_FILE.to_string(),
            &serialized,
        ) {
            warn!("failed to write health snapshot: {err}");
            return false;
        }

        info!("wrote relay health snapshot");
        self.debouncer.bounce();
        self.last_saved = Some(serialized);
        true
    }
}
