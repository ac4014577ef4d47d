use lru::LruCache;
use std::collections::HashMap;
use types::{BeaconState, EthSpec, Hash256};

/// An LRU of recent states keyed by state root.
///
/// The head, justified and finalized states are pinned: they are held outside the LRU and are
/// never evicted, forming the floor of the cache.
pub struct StateCache<E: EthSpec> {
    states: LruCache<Hash256, BeaconState<E>>,
    pinned: HashMap<Hash256, BeaconState<E>>,
}

impl<E: EthSpec> StateCache<E> {
    pub fn new(capacity: usize) -> Self {
        Self {
            states: LruCache::new(capacity),
            pinned: HashMap::new(),
        }
    }

    /// Insert a state into the LRU portion of the cache.
    pub fn put(&mut self, state_root: Hash256, state: BeaconState<E>) {
        if !self.pinned.contains_key(&state_root) {
            self.states.put(state_root, state);
        }
    }

    /// Fetch a clone of a state, touching its LRU position.
    pub fn get(&mut self, state_root: &Hash256) -> Option<BeaconState<E>> {
        if let Some(state) = self.pinned.get(state_root) {
            return Some(state.clone());
        }
        self.states.get(state_root).cloned()
    }

    pub fn contains(&self, state_root: &Hash256) -> bool {
        self.pinned.contains_key(state_root) || self.states.contains(state_root)
    }

    /// Replace the pinned set with the given `(state_root, state)` pairs.
    ///
    /// States which lose their pin drop back into the LRU.
    pub fn update_pinned(&mut self, pins: Vec<(Hash256, BeaconState<E>)>) {
        let old_pinned = std::mem::take(&mut self.pinned);

        for (state_root, state) in pins {
            self.pinned.insert(state_root, state);
        }

        for (state_root, state) in old_pinned {
            if !self.pinned.contains_key(&state_root) {
                self.states.put(state_root, state);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.pinned.len() + self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::MinimalEthSpec;

    type E = MinimalEthSpec;

    fn state() -> BeaconState<E> {
        let spec = E::default_spec();
        BeaconState::new(0, <_>::default(), &spec)
    }

    #[test]
    fn pinned_states_survive_eviction() {
        let mut cache = StateCache::<E>::new(2);

        let pinned_root = Hash256::repeat_byte(0xff);
        cache.update_pinned(vec![(pinned_root, state())]);

        for i in 0..10u8 {
            cache.put(Hash256::repeat_byte(i), state());
        }

        // The LRU only holds the 2 most recent states.
        assert!(cache.get(&Hash256::repeat_byte(0)).is_none());
        assert!(cache.get(&Hash256::repeat_byte(9)).is_some());

        // The pinned state is unaffected by the churn.
        assert!(cache.get(&pinned_root).is_some());
    }

    #[test]
    fn unpinned_states_drop_into_lru() {
        let mut cache = StateCache::<E>::new(2);

        let root = Hash256::repeat_byte(1);
        cache.update_pinned(vec![(root, state())]);
        cache.update_pinned(vec![]);

        assert!(cache.get(&root).is_some());
    }
}
