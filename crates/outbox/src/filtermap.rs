use std::collections::BTreeMap;

use enrelay::NormRelayUrl;
use nostr::{Filter, Kind, PublicKey};
use tracing::warn;

use crate::select::SelectionResult;

const DEFAULT_MAX_AUTHORS_PER_FILTER: usize = 250;

/// Builds the per-relay subscription filters for a selection. One
/// grouped `{kinds, authors}` filter per relay (chunked if the author
/// list outgrows what a relay message comfortably holds), never a
/// second subscription to the same relay.
pub struct FilterMapBuilder {
    kinds: Vec<Kind>,
    limit: Option<usize>,
    max_authors_per_filter: usize,
}

impl Default for FilterMapBuilder {
    fn default() -> Self {
        FilterMapBuilder {
            kinds: vec![Kind::TextNote],
            limit: None,
            max_authors_per_filter: DEFAULT_MAX_AUTHORS_PER_FILTER,
        }
    }
}

impl FilterMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kinds(mut self, kinds: impl IntoIterator<Item = Kind>) -> Self {
        self.kinds = kinds.into_iter().collect();
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn max_authors_per_filter(mut self, max: usize) -> Self {
        self.max_authors_per_filter = max.max(1);
        self
    }

    pub fn build(&self, selection: &SelectionResult) -> BTreeMap<NormRelayUrl, Vec<Filter>> {
        let mut map = BTreeMap::new();

        for (url, pubkeys) in &selection.relay_to_users {
            if pubkeys.is_empty() {
                continue;
            }

            let mut filters = Vec::new();
            for chunk in pubkeys.chunks(self.max_authors_per_filter) {
                let authors: Vec<PublicKey> = chunk
                    .iter()
                    .filter_map(|pk| match PublicKey::from_slice(pk.bytes()) {
                        Ok(author) => Some(author),
                        Err(err) => {
                            warn!("skipping invalid author {pk} for {url}: {err}");
                            None
                        }
                    })
                    .collect();

                if authors.is_empty() {
                    continue;
                }

                let mut filter = Filter::new()
                    .kinds(self.kinds.iter().copied())
                    .authors(authors);
                if let Some(limit) = self.limit {
                    filter = filter.limit(limit);
                }
                filters.push(filter);
            }

            if !filters.is_empty() {
                map.insert(url.clone(), filters);
            }
        }

        map
    }
}
