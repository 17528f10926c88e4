use enrelay::NormRelayUrl;
use tracing::debug;

use crate::candidates::{RelayCandidate, RelayRole, UserRelays};

/// Append the static fallback relays for any user left with no
/// candidates at all. Strictly a safety net for orphaned users: a user
/// with even one usable candidate is never touched. Output preserves
/// length and pubkey order.
pub fn inject_fallbacks(mut users: Vec<UserRelays>, fallbacks: &[NormRelayUrl]) -> Vec<UserRelays> {
    if fallbacks.is_empty() {
        return users;
    }

    for user in &mut users {
        if !user.relays.is_empty() {
            continue;
        }

        debug!("user {} has no usable relays, injecting fallbacks", user.pubkey);
        user.relays = fallbacks
            .iter()
            .map(|url| RelayCandidate::new(url.clone(), RelayRole::Fallback))
            .collect();
    }

    users
}

#[cfg(test)]
mod tests {
    use super::*;
    use enrelay::Pubkey;

    fn url(s: &str) -> NormRelayUrl {
        NormRelayUrl::new(s).unwrap()
    }

    fn user(byte: u8, relays: Vec<RelayCandidate>) -> UserRelays {
        UserRelays {
            pubkey: Pubkey::new([byte; 32]),
            relays,
        }
    }

    /// Orphaned users receive every fallback with the fallback role.
    #[test]
    fn orphan_receives_fallbacks() {
        let fallbacks = vec![url("wss://f1.example.com"), url("wss://f2.example.com")];
        let users = inject_fallbacks(vec![user(1, vec![])], &fallbacks);

        assert_eq!(users[0].relays.len(), 2);
        assert!(users[0]
            .relays
            .iter()
            .all(|c| c.role == RelayRole::Fallback && c.weight == 0));
    }

    /// Users with at least one candidate are never supplemented.
    #[test]
    fn covered_user_untouched() {
        let real = RelayCandidate::new(url("wss://real.example.com"), RelayRole::Outbox);
        let fallbacks = vec![url("wss://f1.example.com")];

        let users = inject_fallbacks(vec![user(1, vec![real.clone()])], &fallbacks);

        assert_eq!(users[0].relays, vec![real]);
    }

    /// Length and pubkey order are preserved.
    #[test]
    fn shape_preserved() {
        let real = RelayCandidate::new(url("wss://real.example.com"), RelayRole::Outbox);
        let fallbacks = vec![url("wss://f1.example.com")];
        let input = vec![user(1, vec![real]), user(2, vec![]), user(3, vec![])];

        let output = inject_fallbacks(input.clone(), &fallbacks);

        assert_eq!(output.len(), input.len());
        for (before, after) in input.iter().zip(&output) {
            assert_eq!(before.pubkey, after.pubkey);
            assert!(after.relays.len() >= before.relays.len());
        }
    }

    /// An empty fallback list is a no-op.
    #[test]
    fn empty_fallbacks_noop() {
        let users = inject_fallbacks(vec![user(1, vec![])], &[]);
        assert!(users[0].relays.is_empty());
    }
}
