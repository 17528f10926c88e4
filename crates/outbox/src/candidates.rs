use std::time::{Duration, Instant};

use enrelay::{NormRelayUrl, Pubkey, RelaySpec};
use hashbrown::HashMap;

/// Weight given to a relay we actually saw deliver an event for an
/// author. Beats every declared mailbox weight so live observations
/// win ties against stale relay lists.
pub const OBSERVED_WEIGHT: u8 = 4;

const DEFAULT_TTL: Duration = Duration::from_secs(300);
const DEFAULT_MAX_PER_USER: usize = 6;

/// Which side of a user's mailbox declaration a candidate came from.
/// Outbox relays carry the user's own notes, so they rank highest for
/// read subscriptions; fallbacks are a last resort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayRole {
    Inbox,
    Outbox,
    Fallback,
}

impl RelayRole {
    pub(crate) fn base_weight(self) -> u8 {
        match self {
            RelayRole::Outbox => 3,
            RelayRole::Inbox => 1,
            RelayRole::Fallback => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayCandidate {
    pub url: NormRelayUrl,
    pub role: RelayRole,
    pub weight: u8,
}

impl RelayCandidate {
    pub fn new(url: NormRelayUrl, role: RelayRole) -> Self {
        RelayCandidate {
            url,
            role,
            weight: role.base_weight(),
        }
    }

    fn observed(url: NormRelayUrl) -> Self {
        RelayCandidate {
            url,
            role: RelayRole::Outbox,
            weight: OBSERVED_WEIGHT,
        }
    }
}

/// One contact's candidate relays, an immutable snapshot taken per
/// recomputation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRelays {
    pub pubkey: Pubkey,
    pub relays: Vec<RelayCandidate>,
}

/// A user's declared NIP-65 mailboxes.
#[derive(Debug, Clone, Default)]
pub struct Mailboxes {
    pub inboxes: Vec<NormRelayUrl>,
    pub outboxes: Vec<NormRelayUrl>,
}

impl Mailboxes {
    /// Split a NIP-65 relay list into mailbox sides. The author's
    /// writable relays are their outboxes (where their notes can be
    /// read from); unmarked relays serve both purposes and land in
    /// both lists.
    pub fn from_specs(specs: &[RelaySpec]) -> Self {
        let mut mailboxes = Mailboxes::default();
        for spec in specs {
            if spec.is_writable() {
                mailboxes.outboxes.push(spec.url.clone());
            }
            if spec.is_readable() {
                mailboxes.inboxes.push(spec.url.clone());
            }
        }
        mailboxes
    }

    pub fn is_empty(&self) -> bool {
        self.inboxes.is_empty() && self.outboxes.is_empty()
    }
}

/// The injected mailbox lookup. Absence of data (a user who never
/// published a relay list) is `None`, not an error.
pub trait MailboxSource {
    fn mailboxes(&self, pubkey: &Pubkey) -> Option<Mailboxes>;
}

/// Cached candidates for a single author. The TTL keeps us from
/// re-resolving mailboxes on every recomputation while still letting
/// observed relays land quickly.
#[derive(Debug)]
struct CacheEntry {
    candidates: Vec<RelayCandidate>,
    fetched_at: Instant,
}

impl CacheEntry {
    fn new(candidates: Vec<RelayCandidate>) -> Self {
        CacheEntry {
            candidates,
            fetched_at: Instant::now(),
        }
    }

    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }

    fn upsert_observed(&mut self, url: NormRelayUrl) {
        let mut replaced = false;
        for candidate in &mut self.candidates {
            if candidate.url == url {
                if candidate.weight < OBSERVED_WEIGHT {
                    candidate.weight = OBSERVED_WEIGHT;
                }
                replaced = true;
                break;
            }
        }

        if !replaced {
            self.candidates.push(RelayCandidate::observed(url));
        }

        sort_candidates(&mut self.candidates);
        self.fetched_at = Instant::now();
    }
}

/// Per-author candidate cache over a [`MailboxSource`], with a TTL and
/// a per-user candidate cap.
pub struct CandidateIndex {
    ttl: Duration,
    max_per_user: usize,
    cache: HashMap<[u8; 32], CacheEntry>,
}

impl Default for CandidateIndex {
    fn default() -> Self {
        CandidateIndex::new(DEFAULT_TTL, DEFAULT_MAX_PER_USER)
    }
}

impl CandidateIndex {
    pub fn new(ttl: Duration, max_per_user: usize) -> Self {
        Self {
            ttl,
            max_per_user,
            cache: HashMap::new(),
        }
    }

    pub fn set_ttl(&mut self, ttl: Duration) {
        self.ttl = ttl;
    }

    pub fn candidates_for(
        &mut self,
        source: &impl MailboxSource,
        pubkey: &Pubkey,
    ) -> Vec<RelayCandidate> {
        let key = *pubkey.bytes();

        if let Some(entry) = self.cache.get(&key) {
            if entry.is_fresh(self.ttl) {
                return entry.candidates.clone();
            }
        }

        let candidates = self.fetch(source, pubkey);
        self.cache.insert(key, CacheEntry::new(candidates.clone()));
        candidates
    }

    /// Note that `url` delivered an event authored by `pubkey`. The
    /// relay is upserted into the author's candidates at the observed
    /// weight.
    pub fn record_observed(&mut self, pubkey: &Pubkey, url: NormRelayUrl) {
        let entry = self
            .cache
            .entry(*pubkey.bytes())
            .or_insert_with(|| CacheEntry::new(Vec::new()));
        entry.upsert_observed(url);
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    fn fetch(&self, source: &impl MailboxSource, pubkey: &Pubkey) -> Vec<RelayCandidate> {
        let mailboxes = source.mailboxes(pubkey).unwrap_or_default();

        let mut dedup = HashMap::<NormRelayUrl, RelayCandidate>::new();
        for url in mailboxes.outboxes {
            insert_max_weight(&mut dedup, RelayCandidate::new(url, RelayRole::Outbox));
        }
        for url in mailboxes.inboxes {
            insert_max_weight(&mut dedup, RelayCandidate::new(url, RelayRole::Inbox));
        }

        let mut candidates: Vec<RelayCandidate> = dedup.into_values().collect();
        sort_candidates(&mut candidates);

        if candidates.len() > self.max_per_user {
            candidates.truncate(self.max_per_user);
        }

        candidates
    }
}

/// Resolve candidates for every contact, one [`UserRelays`] per
/// contact in input order.
pub fn resolve_users(
    index: &mut CandidateIndex,
    source: &impl MailboxSource,
    contacts: &[Pubkey],
) -> Vec<UserRelays> {
    contacts
        .iter()
        .map(|pubkey| UserRelays {
            pubkey: *pubkey,
            relays: index.candidates_for(source, pubkey),
        })
        .collect()
}

fn insert_max_weight(
    dedup: &mut HashMap<NormRelayUrl, RelayCandidate>,
    candidate: RelayCandidate,
) {
    dedup
        .entry(candidate.url.clone())
        .and_modify(|existing| {
            if existing.weight < candidate.weight {
                *existing = candidate.clone();
            }
        })
        .or_insert(candidate);
}

fn sort_candidates(candidates: &mut [RelayCandidate]) {
    candidates.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.url.cmp(&b.url)));
}
