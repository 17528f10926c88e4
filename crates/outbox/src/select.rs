use std::collections::BTreeMap;

use enrelay::{NormRelayUrl, Pubkey};
use hashbrown::{HashMap, HashSet};

use crate::candidates::{RelayCandidate, UserRelays};
use crate::config::OutboxConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAssignment {
    pub pubkey: Pubkey,
    pub relays: Vec<NormRelayUrl>,
}

/// The relay subscription plan: per-user relay subsets in input order,
/// plus the inverted relay -> users view the networking layer
/// subscribes from. A pure function of its inputs, rebuilt wholesale
/// on every change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionResult {
    pub users: Vec<UserAssignment>,
    pub relay_to_users: BTreeMap<NormRelayUrl, Vec<Pubkey>>,
}

impl SelectionResult {
    pub fn relay_count(&self) -> usize {
        self.relay_to_users.len()
    }

    /// Users who ended up with no selected relay. Explicit
    /// non-coverage, surfaced for diagnostics rather than an error.
    pub fn uncovered(&self) -> Vec<Pubkey> {
        self.users
            .iter()
            .filter(|u| u.relays.is_empty())
            .map(|u| u.pubkey)
            .collect()
    }
}

/// Greedy set-cover pass over the users' candidate relays.
///
/// Relay popularity is aggregated across all users (one role-weighted
/// count per listing user), then each user takes up to
/// `max_relays_per_user` of their own candidates, most popular first,
/// while the distinct-relay count stays within `max_connections`.
/// Re-using an already selected relay is always free, which is what
/// concentrates users onto shared relays. Ties break toward the
/// lexicographically smaller url so identical inputs yield identical
/// output.
///
/// Never fails: an over-tight budget leaves some users with an empty
/// assignment, and empty input produces an empty result.
pub fn select_relays(users: &[UserRelays], config: &OutboxConfig) -> SelectionResult {
    if users.is_empty() {
        return SelectionResult::default();
    }

    let mut popularity: HashMap<&NormRelayUrl, u32> = HashMap::new();
    for user in users {
        let mut seen: HashSet<&NormRelayUrl> = HashSet::new();
        for candidate in &user.relays {
            if seen.insert(&candidate.url) {
                *popularity.entry(&candidate.url).or_default() += u32::from(candidate.weight) + 1;
            }
        }
    }

    let max_connections = config.max_connections.max(1);
    let total_users = users.len();

    let mut selected: HashSet<NormRelayUrl> = HashSet::new();
    let mut served: HashMap<NormRelayUrl, usize> = HashMap::new();
    let mut relay_to_users: BTreeMap<NormRelayUrl, Vec<Pubkey>> = BTreeMap::new();
    let mut assignments = Vec::with_capacity(users.len());

    for user in users {
        let mut candidates: Vec<&RelayCandidate> = Vec::with_capacity(user.relays.len());
        let mut seen: HashSet<&NormRelayUrl> = HashSet::new();
        for candidate in &user.relays {
            if seen.insert(&candidate.url) {
                candidates.push(candidate);
            }
        }
        candidates.sort_by(|a, b| {
            let pop_a = popularity.get(&a.url).copied().unwrap_or(0);
            let pop_b = popularity.get(&b.url).copied().unwrap_or(0);
            pop_b
                .cmp(&pop_a)
                .then_with(|| b.weight.cmp(&a.weight))
                .then_with(|| a.url.cmp(&b.url))
        });

        let mut chosen = assign_user(
            &candidates,
            config.max_relays_per_user,
            max_connections,
            config.max_relay_coverage,
            total_users,
            &selected,
            &served,
        );

        // the coverage cap must never cost a user their only coverage
        if chosen.is_empty() && config.max_relay_coverage.is_some() {
            chosen = assign_user(
                &candidates,
                config.max_relays_per_user,
                max_connections,
                None,
                total_users,
                &selected,
                &served,
            );
        }

        for url in &chosen {
            selected.insert(url.clone());
            *served.entry(url.clone()).or_default() += 1;
            relay_to_users
                .entry(url.clone())
                .or_default()
                .push(user.pubkey);
        }

        assignments.push(UserAssignment {
            pubkey: user.pubkey,
            relays: chosen,
        });
    }

    SelectionResult {
        users: assignments,
        relay_to_users,
    }
}

#[allow(clippy::too_many_arguments)]
fn assign_user(
    candidates: &[&RelayCandidate],
    per_user_cap: usize,
    max_connections: usize,
    coverage_cap: Option<f32>,
    total_users: usize,
    selected: &HashSet<NormRelayUrl>,
    served: &HashMap<NormRelayUrl, usize>,
) -> Vec<NormRelayUrl> {
    let mut chosen: Vec<NormRelayUrl> = Vec::new();
    let mut new_connections = 0;

    for candidate in candidates {
        if chosen.len() >= per_user_cap {
            break;
        }

        let already_selected = selected.contains(&candidate.url);
        if !already_selected && selected.len() + new_connections >= max_connections {
            continue;
        }

        if let Some(percent) = coverage_cap {
            let serving = served.get(&candidate.url).copied().unwrap_or(0);
            let share = serving as f32 * 100.0 / total_users as f32;
            if share > percent {
                continue;
            }
        }

        if !already_selected {
            new_connections += 1;
        }
        chosen.push(candidate.url.clone());
    }

    chosen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidates::RelayRole;
    use pretty_assertions::assert_eq;

    fn url(s: &str) -> NormRelayUrl {
        NormRelayUrl::new(s).unwrap()
    }

    fn pk(byte: u8) -> Pubkey {
        Pubkey::new([byte; 32])
    }

    fn outbox_user(byte: u8, urls: &[&str]) -> UserRelays {
        UserRelays {
            pubkey: pk(byte),
            relays: urls
                .iter()
                .map(|u| RelayCandidate::new(url(u), RelayRole::Outbox))
                .collect(),
        }
    }

    /// With budget for everyone, every user with a candidate gets at
    /// least one relay.
    #[test]
    fn coverage_floor() {
        let users = vec![
            outbox_user(1, &["wss://a.example.com"]),
            outbox_user(2, &["wss://b.example.com"]),
            outbox_user(3, &["wss://c.example.com"]),
        ];
        let config = OutboxConfig::new(3, 2);

        let result = select_relays(&users, &config);

        assert!(result.users.iter().all(|u| !u.relays.is_empty()));
        assert!(result.uncovered().is_empty());
    }

    /// Distinct selected relays never exceed the connection budget.
    #[test]
    fn budget_respected() {
        let users: Vec<UserRelays> = (1..=10)
            .map(|i| outbox_user(i, &[format!("wss://r{i}.example.com").as_str()]))
            .collect();
        let config = OutboxConfig::new(4, 3);

        let result = select_relays(&users, &config);

        assert!(result.relay_count() <= 4);
    }

    /// No user is assigned more relays than the per-user cap.
    #[test]
    fn per_user_cap_respected() {
        let users = vec![outbox_user(
            1,
            &[
                "wss://a.example.com",
                "wss://b.example.com",
                "wss://c.example.com",
                "wss://d.example.com",
            ],
        )];
        let config = OutboxConfig::new(10, 2);

        let result = select_relays(&users, &config);

        assert_eq!(result.users[0].relays.len(), 2);
    }

    /// Identical input yields identical output.
    #[test]
    fn deterministic() {
        let users = vec![
            outbox_user(1, &["wss://b.example.com", "wss://a.example.com"]),
            outbox_user(2, &["wss://a.example.com", "wss://c.example.com"]),
            outbox_user(3, &["wss://c.example.com", "wss://b.example.com"]),
        ];
        let config = OutboxConfig::new(2, 2);

        assert_eq!(select_relays(&users, &config), select_relays(&users, &config));
    }

    /// Equal popularity breaks toward the lexicographically smaller
    /// url.
    #[test]
    fn popularity_tie_breaks_on_url() {
        let users = vec![outbox_user(
            1,
            &["wss://zzz.example.com", "wss://aaa.example.com"],
        )];
        let config = OutboxConfig::new(1, 1);

        let result = select_relays(&users, &config);

        assert_eq!(result.users[0].relays, vec![url("wss://aaa.example.com")]);
    }

    /// A relay shared by all users beats a single-user relay when only
    /// one connection is allowed.
    #[test]
    fn popularity_greedy() {
        let shared = "wss://shared.example.com";
        let users = vec![
            outbox_user(1, &[shared]),
            outbox_user(2, &[shared]),
            outbox_user(3, &[shared, "wss://solo.example.com"]),
        ];
        let config = OutboxConfig::new(1, 1);

        let result = select_relays(&users, &config);

        assert_eq!(result.relay_count(), 1);
        assert_eq!(result.relay_to_users[&url(shared)].len(), 3);
    }

    /// The documented end-to-end scenario: four users on relay a, one
    /// on relay b, budget for one connection.
    #[test]
    fn five_users_one_connection() {
        let users = vec![
            outbox_user(1, &["wss://a.example.com"]),
            outbox_user(2, &["wss://a.example.com"]),
            outbox_user(3, &["wss://a.example.com"]),
            outbox_user(4, &["wss://a.example.com"]),
            outbox_user(5, &["wss://b.example.com"]),
        ];
        let config = OutboxConfig::new(1, 1);

        let result = select_relays(&users, &config);

        assert_eq!(result.relay_count(), 1);
        let a = url("wss://a.example.com");
        assert_eq!(result.relay_to_users[&a], vec![pk(1), pk(2), pk(3), pk(4)]);
        for covered in &result.users[..4] {
            assert_eq!(covered.relays, vec![a.clone()]);
        }
        assert!(result.users[4].relays.is_empty());
        assert_eq!(result.uncovered(), vec![pk(5)]);
    }

    /// Empty input produces an empty result rather than an error.
    #[test]
    fn empty_input_empty_result() {
        let result = select_relays(&[], &OutboxConfig::default());
        assert_eq!(result, SelectionResult::default());
    }

    /// A zero per-user cap yields empty assignments but a valid shape.
    #[test]
    fn zero_per_user_cap() {
        let users = vec![outbox_user(1, &["wss://a.example.com"])];
        let config = OutboxConfig::new(3, 0);

        let result = select_relays(&users, &config);

        assert!(result.users[0].relays.is_empty());
        assert_eq!(result.relay_count(), 0);
    }

    /// A user with no candidates appears with an empty assignment.
    #[test]
    fn candidateless_user_is_explicitly_uncovered() {
        let users = vec![
            outbox_user(1, &["wss://a.example.com"]),
            outbox_user(2, &[]),
        ];
        let config = OutboxConfig::new(3, 2);

        let result = select_relays(&users, &config);

        assert!(result.users[1].relays.is_empty());
        assert_eq!(result.uncovered(), vec![pk(2)]);
    }

    /// Outbox candidates outrank inbox candidates of equal popularity.
    #[test]
    fn role_weight_orders_own_candidates() {
        let users = vec![UserRelays {
            pubkey: pk(1),
            relays: vec![
                RelayCandidate::new(url("wss://a.example.com"), RelayRole::Inbox),
                RelayCandidate::new(url("wss://b.example.com"), RelayRole::Outbox),
            ],
        }];
        let config = OutboxConfig::new(10, 1);

        let result = select_relays(&users, &config);

        assert_eq!(result.users[0].relays, vec![url("wss://b.example.com")]);
    }

    /// Once a relay serves more than the coverage cap, later users
    /// diversify onto their alternatives.
    #[test]
    fn coverage_cap_diversifies() {
        let big = "wss://big.example.com";
        let alt = "wss://alt.example.com";
        let users = vec![
            outbox_user(1, &[big]),
            outbox_user(2, &[big]),
            outbox_user(3, &[big, alt]),
            outbox_user(4, &[big, alt]),
        ];
        let mut config = OutboxConfig::new(4, 1);
        config.set_max_relay_coverage(Some(40.0)).unwrap();

        let result = select_relays(&users, &config);

        // big absorbs two users, then the cap pushes the rest away
        assert_eq!(result.relay_to_users[&url(big)], vec![pk(1), pk(2)]);
        assert_eq!(result.relay_to_users[&url(alt)], vec![pk(3), pk(4)]);
    }

    /// The coverage cap never strips a user whose only candidate is
    /// the capped relay.
    #[test]
    fn coverage_cap_preserves_floor() {
        let big = "wss://big.example.com";
        let users = vec![
            outbox_user(1, &[big]),
            outbox_user(2, &[big]),
            outbox_user(3, &[big]),
        ];
        let mut config = OutboxConfig::new(3, 1);
        config.set_max_relay_coverage(Some(25.0)).unwrap();

        let result = select_relays(&users, &config);

        assert!(result.uncovered().is_empty());
        assert_eq!(result.relay_to_users[&url(big)].len(), 3);
    }
}
