use std::collections::BTreeMap;

use crate::name::Name;

use super::{PendingInterestId, RegistrationId};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegistrationState {
    // Waiting for the forwarder to answer the command Interest
    Pending(PendingInterestId),
    Registered,
}

pub struct RegisteredPrefix<C> {
    pub prefix: Name,
    pub state: RegistrationState,
    // Taken out while one of the callbacks runs
    callbacks: Option<C>,
}

/// Prefixes the application serves, with the callbacks for each.
pub struct RegisteredPrefixTable<C> {
    entries: BTreeMap<RegistrationId, RegisteredPrefix<C>>,
}

impl<C> Default for RegisteredPrefixTable<C> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<C> RegisteredPrefixTable<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        id: RegistrationId,
        prefix: Name,
        command: PendingInterestId,
        callbacks: C,
    ) {
        self.entries.insert(
            id,
            RegisteredPrefix {
                prefix,
                state: RegistrationState::Pending(command),
                callbacks: Some(callbacks),
            },
        );
    }

    pub fn get(&self, id: RegistrationId) -> Option<&RegisteredPrefix<C>> {
        self.entries.get(&id)
    }

    // Returns the prefix and callbacks, if the callbacks were not taken.
    pub fn remove(&mut self, id: RegistrationId) -> Option<(Name, Option<C>)> {
        self.entries
            .remove(&id)
            .map(|entry| (entry.prefix, entry.callbacks))
    }

    // The forwarder accepted the registration; returns false if it was already removed.
    pub fn mark_registered(&mut self, id: RegistrationId) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.state = RegistrationState::Registered;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // The registered prefix with the most components that covers `name`.
    //  Among equally long prefixes the oldest registration wins.
    pub fn longest_match(&self, name: &Name) -> Option<RegistrationId> {
        let mut best: Option<(RegistrationId, usize)> = None;
        for (id, entry) in &self.entries {
            if entry.state != RegistrationState::Registered
                || entry.callbacks.is_none()
                || !entry.prefix.is_prefix_of(name)
            {
                continue;
            }
            let len = entry.prefix.len();
            if best.map_or(true, |(_, best_len)| len > best_len) {
                best = Some((*id, len));
            }
        }
        best.map(|(id, _)| id)
    }

    pub fn take_callbacks(&mut self, id: RegistrationId) -> Option<(Name, C)> {
        let entry = self.entries.get_mut(&id)?;
        let callbacks = entry.callbacks.take()?;
        Some((entry.prefix.clone(), callbacks))
    }

    // Puts callbacks back after they ran; dropped if the entry went away meanwhile.
    pub fn restore_callbacks(&mut self, id: RegistrationId, callbacks: C) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.callbacks = Some(callbacks);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with(prefixes: &[&str]) -> (RegisteredPrefixTable<u32>, Vec<RegistrationId>) {
        let mut table = RegisteredPrefixTable::new();
        let mut ids = Vec::new();
        for (i, prefix) in prefixes.iter().enumerate() {
            let id = RegistrationId::next();
            table.insert(id, Name::from_uri(prefix), PendingInterestId::next(), i as u32);
            ids.push(id);
        }
        (table, ids)
    }

    #[test]
    fn test_pending_entries_do_not_match() {
        let (mut table, ids) = table_with(&["/a"]);
        let name = Name::from_uri("/a/b");
        assert_eq!(table.longest_match(&name), None);
        assert!(table.mark_registered(ids[0]));
        assert_eq!(table.longest_match(&name), Some(ids[0]));
    }

    #[test]
    fn test_longest_then_oldest() {
        let (mut table, ids) = table_with(&["/a", "/a/b", "/a/b", "/c"]);
        for id in &ids {
            table.mark_registered(*id);
        }
        assert_eq!(table.longest_match(&Name::from_uri("/a/b/c")), Some(ids[1]));
        assert_eq!(table.longest_match(&Name::from_uri("/a/x")), Some(ids[0]));
        assert_eq!(table.longest_match(&Name::from_uri("/d")), None);

        table.remove(ids[1]);
        assert_eq!(table.longest_match(&Name::from_uri("/a/b/c")), Some(ids[2]));
    }

    #[test]
    fn test_take_and_restore() {
        let (mut table, ids) = table_with(&["/a"]);
        table.mark_registered(ids[0]);

        let (prefix, callbacks) = table.take_callbacks(ids[0]).unwrap();
        assert_eq!(prefix, Name::from_uri("/a"));
        assert_eq!(table.longest_match(&Name::from_uri("/a")), None);
        assert!(table.take_callbacks(ids[0]).is_none());

        table.restore_callbacks(ids[0], callbacks);
        assert_eq!(table.longest_match(&Name::from_uri("/a")), Some(ids[0]));

        table.remove(ids[0]);
        table.restore_callbacks(ids[0], 7);
        assert!(table.is_empty());
        assert!(!table.mark_registered(ids[0]));
    }
}
