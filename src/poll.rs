// src/poll.rs
use serde::{Deserialize, Serialize};

use crate::ledger::Ledger;
use crate::models::Place;

/// A single voter's like is not consensus.
pub const QUORUM: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusEntry {
    pub place: Place,
    /// Share of participants who liked the place, rounded to a whole percent.
    pub agreement: u32,
    pub votes: usize,
}

/// `round(100 * n / d)` with halves rounded up, in integer arithmetic.
fn percentage(votes: usize, participants: usize) -> u32 {
    let d = participants.max(1) as u64;
    let n = votes as u64;
    ((200 * n + d) / (2 * d)) as u32
}

/// Places with at least [`QUORUM`] likes, best agreement first. Ties keep
/// the order of `places`.
pub fn compute_consensus(places: &[Place], votes: &Ledger, participant_count: usize) -> Vec<ConsensusEntry> {
    let mut results: Vec<ConsensusEntry> = places
        .iter()
        .filter_map(|place| {
            let count = votes.count(&place.place_id);
            (count >= QUORUM).then(|| ConsensusEntry {
                place: place.clone(),
                agreement: percentage(count, participant_count),
                votes: count,
            })
        })
        .collect();

    results.sort_by(|a, b| b.agreement.cmp(&a.agreement));
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn places(ids: &[&str]) -> Vec<Place> {
        ids.iter().map(|id| Place::new(*id, *id, 0.0, 0.0)).collect()
    }

    fn ledger(entries: &[(&str, &[&str])]) -> Ledger {
        entries
            .iter()
            .flat_map(|(place, who)| who.iter().map(move |w| (place.to_string(), w.to_string())))
            .collect()
    }

    #[test]
    fn single_votes_are_below_quorum() {
        let list = places(&["X", "Y"]);
        let votes = ledger(&[("X", &["p1", "p2"][..]), ("Y", &["p1"][..])]);

        let result = compute_consensus(&list, &votes, 2);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].place.place_id, "X");
        assert_eq!(result[0].agreement, 100);
        assert_eq!(result[0].votes, 2);
    }

    #[test]
    fn sorted_by_agreement_with_stable_ties() {
        let list = places(&["A", "B", "C", "D"]);
        let votes = ledger(&[
            ("A", &["p1", "p2"][..]),
            ("B", &["p1", "p2", "p3"][..]),
            ("C", &["p3", "p4"][..]),
            ("D", &["p1", "p2", "p3", "p4"][..]),
        ]);

        let order: Vec<_> = compute_consensus(&list, &votes, 4)
            .into_iter()
            .map(|e| (e.place.place_id, e.agreement))
            .collect();
        assert_eq!(
            order,
            vec![
                ("D".to_string(), 100),
                ("B".to_string(), 75),
                ("A".to_string(), 50),
                ("C".to_string(), 50),
            ]
        );
    }

    #[test]
    fn rounds_half_up() {
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(2, 0), 200);
    }

    #[test]
    fn votes_for_unlisted_places_are_ignored() {
        let list = places(&["X"]);
        let votes = ledger(&[("gone", &["p1", "p2"][..])]);
        assert!(compute_consensus(&list, &votes, 2).is_empty());
    }
}
