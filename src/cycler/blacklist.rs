use std::collections::HashSet;

use crate::models::Frequency;

/// Frequencies excluded from cycling, keyed by their Hz value.
#[derive(Debug, Clone, Default)]
pub struct FrequencyBlacklist {
    entries: HashSet<u64>,
}

impl FrequencyBlacklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the frequency was not already listed.
    pub fn add(&mut self, frequency: Frequency) -> bool {
        self.entries.insert(frequency.hz())
    }

    pub fn contains(&self, frequency: Frequency) -> bool {
        self.entries.contains(&frequency.hz())
    }

    pub fn remove(&mut self, frequency: Frequency) -> bool {
        self.entries.remove(&frequency.hz())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Listed frequencies in ascending order
    pub fn frequencies(&self) -> Vec<Frequency> {
        let mut listed: Vec<_> = self
            .entries
            .iter()
            .filter_map(|hz| Frequency::from_hz(*hz))
            .collect();
        listed.sort();
        listed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
