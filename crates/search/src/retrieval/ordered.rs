//! Insertion-ordered accumulation keyed by id

use std::collections::HashMap;

/// Map that iterates in first-insertion order
#[derive(Debug)]
pub(crate) struct InsertionOrderMap<V> {
    index: HashMap<String, usize>,
    entries: Vec<V>,
}

impl<V> Default for InsertionOrderMap<V> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }
}

impl<V> InsertionOrderMap<V> {
    /// Existing entry for `key`, or a new one built by `init`
    pub(crate) fn get_or_insert_with(&mut self, key: &str, init: impl FnOnce() -> V) -> &mut V {
        let slot = match self.index.get(key) {
            Some(&slot) => slot,
            None => {
                self.entries.push(init());
                let slot = self.entries.len() - 1;
                self.index.insert(key.to_string(), slot);
                slot
            }
        };
        &mut self.entries[slot]
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_values(self) -> Vec<V> {
        self.entries
    }
}

/// Arithmetic mean; 0.0 for no scores
pub(crate) fn mean(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}
