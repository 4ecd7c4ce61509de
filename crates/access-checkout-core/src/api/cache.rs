//! Memoised discovery results.

use dashmap::DashMap;
use url::Url;

/// Map of (document URL, link relation) to the resolved link target.
///
/// The map is sharded by key, so concurrent discoveries of different
/// relations never contend, and [`get_or_insert`](Self::get_or_insert) is
/// atomic per key. Entries live until [`clear`](Self::clear) is called.
///
/// Share one cache between clients by wrapping it in an `Arc`; a fresh cache
/// gives a client isolated state.
#[derive(Debug, Default)]
pub struct DiscoveryCache {
    entries: DashMap<(Url, String), Url>,
}

impl DiscoveryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &Url, relation: &str) -> Option<Url> {
        self.entries
            .get(&(url.clone(), relation.to_owned()))
            .map(|entry| entry.value().clone())
    }

    /// Stores `resolved` unless the key already has a value, and returns the
    /// value now held for the key.
    pub fn get_or_insert(&self, url: Url, relation: &str, resolved: Url) -> Url {
        self.entries
            .entry((url, relation.to_owned()))
            .or_insert(resolved)
            .value()
            .clone()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
