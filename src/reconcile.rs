// src/reconcile.rs
//! Carries votes forward when the place list is regenerated.
//!
//! Place ids are only stable within one fetch, so an old id that is missing
//! from the new list is matched to a new place by normalized name. Two
//! genuinely different places sharing a name will be merged; the first new
//! place with that name wins.
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::ledger::Ledger;
use crate::models::Place;

pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Old place id -> new place id, for every old id that survives the refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdMapping(BTreeMap<String, String>);

impl IdMapping {
    pub fn build(old_places: &[Place], new_places: &[Place]) -> Self {
        let new_ids: HashSet<&str> = new_places.iter().map(|p| p.place_id.as_str()).collect();

        let mut first_by_name: HashMap<String, &str> = HashMap::new();
        for place in new_places {
            let name = normalize_name(&place.name);
            if name.is_empty() {
                continue;
            }
            first_by_name.entry(name).or_insert(place.place_id.as_str());
        }

        let mut mapping = BTreeMap::new();
        for old in old_places {
            if new_ids.contains(old.place_id.as_str()) {
                mapping.insert(old.place_id.clone(), old.place_id.clone());
            } else if let Some(new_id) = first_by_name.get(&normalize_name(&old.name)) {
                mapping.insert(old.place_id.clone(), new_id.to_string());
            }
        }

        // Ledger keys without a matching old place can still survive on id alone.
        for id in new_ids {
            mapping.entry(id.to_string()).or_insert_with(|| id.to_string());
        }

        IdMapping(mapping)
    }

    pub fn resolve(&self, old_id: &str) -> Option<&str> {
        self.0.get(old_id).map(String::as_str)
    }

    /// Number of old ids that moved to a different new id.
    pub fn renamed(&self) -> usize {
        self.0.iter().filter(|(old, new)| old != new).count()
    }

    /// Rewrites a ledger onto the new ids. Entries with no mapping are dropped;
    /// entries mapping onto the same new id are unioned.
    pub fn apply(&self, ledger: &Ledger) -> Ledger {
        let mut out = Ledger::new();
        for (old_id, members) in ledger.iter() {
            if let Some(new_id) = self.resolve(old_id) {
                out.union(new_id, members);
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub votes: Ledger,
    pub dislikes: Ledger,
    pub carried: usize,
    pub dropped: usize,
}

pub fn reconcile(
    old_places: &[Place],
    new_places: &[Place],
    votes: &Ledger,
    dislikes: &Ledger,
) -> Reconciled {
    let mapping = IdMapping::build(old_places, new_places);

    let before = votes.len() + dislikes.len();
    let carried = votes
        .iter()
        .chain(dislikes.iter())
        .filter(|(id, _)| mapping.resolve(id).is_some())
        .count();

    let mut merged_votes = mapping.apply(votes);
    let mut merged_dislikes = mapping.apply(dislikes);
    settle_overlaps(&mut merged_votes, &mut merged_dislikes, dislikes);

    Reconciled {
        votes: merged_votes,
        dislikes: merged_dislikes,
        carried,
        dropped: before - carried,
    }
}

/// A name merge can land one participant in both ledgers for the same
/// place. Keep the dislike only if it was cast on that exact id; otherwise
/// the like stands.
fn settle_overlaps(votes: &mut Ledger, dislikes: &mut Ledger, old_dislikes: &Ledger) {
    let overlaps: Vec<(String, String)> = votes
        .iter()
        .flat_map(|(place_id, members)| {
            members
                .iter()
                .filter(|member| dislikes.contains(place_id, member))
                .map(move |member| (place_id.clone(), member.clone()))
        })
        .collect();

    for (place_id, member) in overlaps {
        if old_dislikes.contains(&place_id, &member) {
            votes.remove(&place_id, &member);
        } else {
            dislikes.remove(&place_id, &member);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(id: &str, name: &str) -> Place {
        Place::new(id, name, 0.0, 0.0)
    }

    fn ledger(entries: &[(&str, &str)]) -> Ledger {
        entries
            .iter()
            .map(|(place, who)| (place.to_string(), who.to_string()))
            .collect()
    }

    #[test]
    fn exact_ids_keep_their_votes() {
        let old = [place("A", "Joe's Pizza"), place("C", "Taco Stand")];
        let new = [place("A", "Joe's Pizza"), place("D", "Noodle Bar")];
        let votes = ledger(&[("A", "p1"), ("A", "p2")]);

        let out = reconcile(&old, &new, &votes, &Ledger::new());
        assert_eq!(out.votes.members("A"), votes.members("A"));
    }

    #[test]
    fn name_match_moves_votes_to_new_id() {
        let old = [place("A", "Joe's Pizza")];
        let new = [place("B", "  joe's pizza ")];
        let votes = ledger(&[("A", "p1")]);
        let dislikes = ledger(&[("A", "p2")]);

        let out = reconcile(&old, &new, &votes, &dislikes);
        assert!(out.votes.contains("B", "p1"));
        assert!(out.dislikes.contains("B", "p2"));
        assert!(out.votes.members("A").is_none());
        assert_eq!(out.carried, 2);
    }

    #[test]
    fn unmatched_places_are_dropped() {
        let old = [place("A", "Joe's Pizza"), place("C", "Gone Cafe")];
        let new = [place("A", "Joe's Pizza")];
        let votes = ledger(&[("A", "p1"), ("C", "p1")]);

        let out = reconcile(&old, &new, &votes, &Ledger::new());
        assert_eq!(out.votes.len(), 1);
        assert_eq!(out.dropped, 1);
    }

    #[test]
    fn merged_ids_union_their_voters() {
        let old = [place("A", "Joe's Pizza"), place("B", "Pizza Place")];
        let new = [place("B", "Joe's Pizza")];
        let votes = ledger(&[("A", "p1"), ("B", "p2")]);

        let out = reconcile(&old, &new, &votes, &Ledger::new());
        assert_eq!(out.votes.count("B"), 2);
    }

    #[test]
    fn duplicate_names_pick_first_new_place() {
        let old = [place("A", "Subway")];
        let new = [place("B", "Subway"), place("C", "subway")];

        let mapping = IdMapping::build(&old, &new);
        assert_eq!(mapping.resolve("A"), Some("B"));
        assert_eq!(mapping.renamed(), 1);
    }

    #[test]
    fn blank_names_never_match() {
        let old = [place("A", "  ")];
        let new = [place("B", "")];

        let out = reconcile(&old, &new, &ledger(&[("A", "p1")]), &Ledger::new());
        assert!(out.votes.is_empty());
    }

    #[test]
    fn merged_like_and_dislike_keep_the_surviving_ids_verdict() {
        let old = [place("A", "Joe's Pizza"), place("B", "Joe's Pizza")];
        let new = [place("B", "Joe's Pizza")];
        let votes = ledger(&[("A", "p1")]);
        let dislikes = ledger(&[("B", "p1")]);

        let out = reconcile(&old, &new, &votes, &dislikes);
        assert!(out.dislikes.contains("B", "p1"));
        assert!(!out.votes.contains("B", "p1"));
    }

    #[test]
    fn merged_like_and_dislike_without_exact_id_keep_the_like() {
        let old = [place("A", "Joe's Pizza"), place("B", "joe's pizza")];
        let new = [place("C", "Joe's Pizza")];
        let votes = ledger(&[("A", "p1"), ("A", "p2")]);
        let dislikes = ledger(&[("B", "p1")]);

        let out = reconcile(&old, &new, &votes, &dislikes);
        assert!(out.votes.contains("C", "p1"));
        assert_eq!(out.votes.count("C"), 2);
        assert!(out.dislikes.is_empty());
    }
}
