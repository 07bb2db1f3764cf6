// src/ledger.rs
//! Place id -> set of participants who took an action (like or dislike) on it.
//!
//! The ledger is kept sparse: a place with no participants has no entry.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger(BTreeMap<String, BTreeSet<String>>);

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `participant_id` against `place_id`. Returns false if the pair
    /// was already present.
    pub fn add(&mut self, place_id: &str, participant_id: &str) -> bool {
        self.0
            .entry(place_id.to_string())
            .or_default()
            .insert(participant_id.to_string())
    }

    /// Removes the pair, dropping the place entry once it has no members.
    /// Returns false if the pair was not present.
    pub fn remove(&mut self, place_id: &str, participant_id: &str) -> bool {
        let Some(members) = self.0.get_mut(place_id) else {
            return false;
        };
        let removed = members.remove(participant_id);
        if members.is_empty() {
            self.0.remove(place_id);
        }
        removed
    }

    /// Removes `participant_id` from every place. Returns how many entries
    /// were removed.
    pub fn remove_participant(&mut self, participant_id: &str) -> usize {
        let mut removed = 0;
        self.0.retain(|_, members| {
            if members.remove(participant_id) {
                removed += 1;
            }
            !members.is_empty()
        });
        removed
    }

    /// Adds every member of `members` to `place_id`.
    pub fn union(&mut self, place_id: &str, members: &BTreeSet<String>) {
        if members.is_empty() {
            return;
        }
        self.0
            .entry(place_id.to_string())
            .or_default()
            .extend(members.iter().cloned());
    }

    pub fn contains(&self, place_id: &str, participant_id: &str) -> bool {
        self.0
            .get(place_id)
            .is_some_and(|members| members.contains(participant_id))
    }

    pub fn count(&self, place_id: &str) -> usize {
        self.0.get(place_id).map_or(0, BTreeSet::len)
    }

    pub fn members(&self, place_id: &str) -> Option<&BTreeSet<String>> {
        self.0.get(place_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<(String, String)> for Ledger {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut ledger = Ledger::new();
        for (place_id, participant_id) in iter {
            ledger.add(&place_id, &participant_id);
        }
        ledger
    }
}

/// True if the participant has either liked or disliked the place.
pub fn has_reviewed(votes: &Ledger, dislikes: &Ledger, place_id: &str, participant_id: &str) -> bool {
    votes.contains(place_id, participant_id) || dislikes.contains(place_id, participant_id)
}
