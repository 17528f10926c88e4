use std::collections::BTreeMap;
use std::time::Duration;

use enrelay::{NormRelayUrl, Pubkey};
use nostr::Filter;
use tracing::debug;

use crate::candidates::{resolve_users, CandidateIndex, MailboxSource};
use crate::config::OutboxConfig;
use crate::debouncer::Debouncer;
use crate::fallback::inject_fallbacks;
use crate::filtermap::FilterMapBuilder;
use crate::health::RelayHealthTracker;
use crate::persist::HealthHandler;
use crate::select::{select_relays, SelectionResult};
use crate::storage::DataPath;
use crate::time::unix_time_secs;

const RECOMPUTE_DEBOUNCE: Duration = Duration::from_millis(200);

/// The artifact handed to the subscription layer: the selection, the
/// per-relay filters, and the users the budget could not cover.
#[derive(Debug, Clone)]
pub struct RelayPlan {
    pub selection: SelectionResult,
    pub filters: BTreeMap<NormRelayUrl, Vec<Filter>>,
    pub uncovered: Vec<Pubkey>,
}

/// Drives the selection pipeline: candidate resolution, health
/// filtering, fallback injection, selection, and filter building, with
/// recomputation debounced against rapid upstream change bursts. The
/// host calls [`OutboxRouter::tick`] from its event loop; the last
/// consistent snapshot wins and intermediate states are skipped.
pub struct OutboxRouter {
    config: OutboxConfig,
    health: RelayHealthTracker,
    index: CandidateIndex,
    filters: FilterMapBuilder,
    debouncer: Debouncer,
    dirty: bool,
    persist: Option<HealthHandler>,
}

impl OutboxRouter {
    pub fn new(config: OutboxConfig) -> Self {
        Self {
            config,
            health: RelayHealthTracker::new(),
            index: CandidateIndex::default(),
            filters: FilterMapBuilder::default(),
            debouncer: Debouncer::new(RECOMPUTE_DEBOUNCE),
            dirty: true,
            persist: None,
        }
    }

    pub fn with_filter_map(mut self, filters: FilterMapBuilder) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debouncer = Debouncer::new(delay);
        self
    }

    /// Enable health persistence under `path`, restoring any snapshot
    /// a previous session left behind so backoff is not reset by a
    /// restart.
    pub fn with_persistence(mut self, path: &DataPath) -> Self {
        let mut handler = HealthHandler::new(path);
        if let Some(snapshot) = handler.load() {
            self.health.restore(snapshot);
        }
        self.persist = Some(handler);
        self
    }

    pub fn config(&self) -> &OutboxConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: OutboxConfig) {
        if self.config != config {
            self.config = config;
            self.dirty = true;
        }
    }

    pub fn health(&self) -> &RelayHealthTracker {
        &self.health
    }

    /// Flag that upstream state changed (contact list, a mailbox
    /// resolution, a budget slider) and a recomputation is wanted.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn relay_failed(&mut self, url: &NormRelayUrl) {
        self.health.record_failure(url, unix_time_secs());
        self.dirty = true;
    }

    pub fn relay_connected(&mut self, url: &NormRelayUrl) {
        self.health.record_success(url);
        self.dirty = true;
    }

    pub fn revive_relay(&mut self, url: &NormRelayUrl) {
        self.health.revive(url);
        self.dirty = true;
    }

    /// Note that `url` delivered an event authored by `pubkey`,
    /// boosting that relay among the author's candidates.
    pub fn record_event_delivery(&mut self, pubkey: &Pubkey, url: NormRelayUrl) {
        self.index.record_observed(pubkey, url);
        self.dirty = true;
    }

    /// Recompute the plan if something changed and the debounce window
    /// has passed. Also opportunistically saves health state when
    /// persistence is enabled.
    pub fn tick<S: MailboxSource>(
        &mut self,
        source: &S,
        contacts: &[Pubkey],
        now: u64,
    ) -> Option<RelayPlan> {
        if let Some(persist) = &mut self.persist {
            persist.try_save(&self.health);
        }

        if !self.dirty || !self.debouncer.should_act() {
            return None;
        }

        let plan = self.recompute(source, contacts, now);
        self.debouncer.bounce();
        self.dirty = false;
        Some(plan)
    }

    /// Immediate recomputation, bypassing the debounce window.
    pub fn recompute<S: MailboxSource>(
        &mut self,
        source: &S,
        contacts: &[Pubkey],
        now: u64,
    ) -> RelayPlan {
        let mut users = resolve_users(&mut self.index, source, contacts);

        // drop dead or backing-off relays before looking at coverage
        for user in &mut users {
            user.relays.retain(|c| self.health.is_usable(&c.url, now));
        }

        // orphans get the static fallbacks, which face the same health
        // bar as everything else
        let mut users = inject_fallbacks(users, &self.config.fallback_relays);
        for user in &mut users {
            user.relays.retain(|c| self.health.is_usable(&c.url, now));
        }

        let selection = select_relays(&users, &self.config);
        let filters = self.filters.build(&selection);
        let uncovered = selection.uncovered();

        debug!(
            "relay plan: {} relays covering {} of {} users",
            selection.relay_count(),
            users.len() - uncovered.len(),
            users.len()
        );

        RelayPlan {
            selection,
            filters,
            uncovered,
        }
    }
}
