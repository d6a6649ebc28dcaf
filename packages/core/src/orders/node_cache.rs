//! Session-scoped Node Cache
//!
//! Maps identities to already-materialized values so one traversal never
//! fetches or deserializes the same node (or target) twice. The cache is the
//! single owner of its values: list nodes refer to each other by identity and
//! look neighbors up here, which keeps the doubly linked structure free of
//! ownership cycles.
//!
//! A cache lives exactly as long as the [`OrderedList`](super::OrderedList)
//! session that created it. It is never shared between sessions or threads.

use crate::models::Identity;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::future::Future;

/// Identity-keyed arena of materialized values
#[derive(Debug)]
pub struct NodeCache<T> {
    entries: HashMap<Identity, T>,
    hits: usize,
    misses: usize,
}

impl<T> Default for NodeCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> NodeCache<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// Return the cached value for `id`, or build it with `constructor`
    ///
    /// `constructor` runs at most once per identity per session and only on a
    /// miss. It cannot reach back into this cache (the cache is mutably
    /// borrowed for the duration of the call), so construction must not
    /// resolve neighbors eagerly; neighbor resolution always happens later,
    /// one link at a time.
    ///
    /// A failed construction leaves the cache untouched.
    pub async fn fetch<F, Fut, E>(&mut self, id: &Identity, constructor: F) -> Result<&mut T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.entries.entry(id.clone()) {
            Entry::Occupied(entry) => {
                self.hits += 1;
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => {
                self.misses += 1;
                tracing::trace!("NodeCache miss for {}", id);
                let value = constructor().await?;
                Ok(entry.insert(value))
            }
        }
    }

    /// Store a value created in this session (e.g. a freshly minted node)
    pub fn insert(&mut self, id: Identity, value: T) -> Option<T> {
        self.entries.insert(id, value)
    }

    pub fn get(&self, id: &Identity) -> Option<&T> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: &Identity) -> Option<&mut T> {
        self.entries.get_mut(id)
    }

    pub fn remove(&mut self, id: &Identity) -> Option<T> {
        self.entries.remove(id)
    }

    pub fn contains(&self, id: &Identity) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &Identity> {
        self.entries.keys()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// `(hits, misses)` since the session started
    pub fn stats(&self) -> (usize, usize) {
        (self.hits, self.misses)
    }
}
