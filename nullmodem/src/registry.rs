//! In-memory registry of port pairs.
//!
//! The registry is a mirror of the driver's state, rebuilt from every
//! successful listing. Reads are wait-free through [`arc_swap::ArcSwap`]:
//! a reader sees either the snapshot before a [`PairRegistry::replace_all`]
//! or the one after it, never a mix.

use crate::port::PortPair;
use arc_swap::ArcSwap;
use log::debug;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Id-ordered map of pairs.
pub type PairMap = BTreeMap<u32, PortPair>;

/// Identity-keyed store of port pairs with whole-snapshot replacement.
#[derive(Debug, Default)]
pub struct PairRegistry {
    pairs: ArcSwap<PairMap>,
}

impl PairRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole contents with `pairs`.
    ///
    /// Nothing from the previous snapshot survives. If two pairs share an
    /// id, the later one wins.
    pub fn replace_all<I>(&self, pairs: I)
    where
        I: IntoIterator<Item = PortPair>,
    {
        let map: PairMap = pairs.into_iter().map(|pair| (pair.id, pair)).collect();
        debug!("Registry now holds {} pair(s)", map.len());
        self.pairs.store(Arc::new(map));
    }

    /// Current snapshot, shared without copying.
    pub fn snapshot(&self) -> Arc<PairMap> {
        self.pairs.load_full()
    }

    /// Pair with identity `id`.
    pub fn get(&self, id: u32) -> Option<PortPair> {
        self.pairs.load().get(&id).cloned()
    }

    /// All pairs ordered by id.
    pub fn all(&self) -> Vec<PortPair> {
        self.pairs.load().values().cloned().collect()
    }

    /// Identities of all pairs, ascending.
    pub fn ids(&self) -> Vec<u32> {
        self.pairs.load().keys().copied().collect()
    }

    /// Whether a pair with identity `id` is known.
    pub fn contains(&self, id: u32) -> bool {
        self.pairs.load().contains_key(&id)
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.pairs.load().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.pairs.load().is_empty()
    }
}
