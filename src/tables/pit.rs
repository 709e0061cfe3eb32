use std::collections::BTreeMap;

use crate::{
    clock::Timestamp,
    packet::{Data, Interest},
};

use super::PendingInterestId;

pub struct PitEntry<R> {
    pub interest: Interest,
    pub deadline: Timestamp,
    pub resolution: R,
}

/// Outstanding Interests keyed by identifier.
///
/// Identifiers grow monotonically, so iteration order is insertion order.
pub struct PendingInterestTable<R> {
    entries: BTreeMap<PendingInterestId, PitEntry<R>>,
}

impl<R> Default for PendingInterestTable<R> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<R> PendingInterestTable<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: PendingInterestId, entry: PitEntry<R>) {
        self.entries.insert(id, entry);
    }

    pub fn remove(&mut self, id: PendingInterestId) -> Option<PitEntry<R>> {
        self.entries.remove(&id)
    }

    pub fn contains(&self, id: PendingInterestId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn get(&self, id: PendingInterestId) -> Option<&PitEntry<R>> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // The oldest entry still alive at `now` that the data satisfies.
    //  Entries past their deadline are left for the expiry pass.
    pub fn find_match(&self, data: &Data, now: Timestamp) -> Option<PendingInterestId> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.deadline > now && entry.interest.matches_data(data))
            .map(|(id, _)| *id)
    }

    // All entries whose deadline has been reached, oldest first.
    pub fn expired_ids(&self, now: Timestamp) -> Vec<PendingInterestId> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.deadline <= now)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.entries.values().map(|entry| entry.deadline).min()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
