// src/progress.rs
use crate::ledger::{has_reviewed, Ledger};
use crate::models::{Place, Progress, SessionRecord};

/// Index of the first place at or after `from` that the participant has
/// neither liked nor disliked, or `places.len()` when none is left.
pub fn next_unreviewed_index(
    places: &[Place],
    votes: &Ledger,
    dislikes: &Ledger,
    participant_id: &str,
    from: usize,
) -> usize {
    places
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, p)| !has_reviewed(votes, dislikes, &p.place_id, participant_id))
        .map_or(places.len(), |(i, _)| i)
}

pub fn reviewed_count(places: &[Place], votes: &Ledger, dislikes: &Ledger, participant_id: &str) -> usize {
    places
        .iter()
        .filter(|p| has_reviewed(votes, dislikes, &p.place_id, participant_id))
        .count()
}

pub fn progress_for(record: &SessionRecord, participant_id: &str, from: usize) -> Progress {
    let total = record.places.len();
    let next_index = next_unreviewed_index(
        &record.places,
        &record.votes,
        &record.dislikes,
        participant_id,
        from,
    );

    Progress {
        next_index,
        reviewed: reviewed_count(&record.places, &record.votes, &record.dislikes, participant_id),
        total,
        exhausted: next_index >= total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn places(ids: &[&str]) -> Vec<Place> {
        ids.iter().map(|id| Place::new(*id, *id, 0.0, 0.0)).collect()
    }

    #[test]
    fn skips_liked_and_disliked_places() {
        let list = places(&["a", "b", "c", "d"]);
        let mut votes = Ledger::new();
        let mut dislikes = Ledger::new();
        votes.add("a", "p1");
        dislikes.add("b", "p1");
        votes.add("c", "p2");

        assert_eq!(next_unreviewed_index(&list, &votes, &dislikes, "p1", 0), 2);
        assert_eq!(next_unreviewed_index(&list, &votes, &dislikes, "p2", 0), 0);
    }

    #[test]
    fn exhausted_returns_len() {
        let list = places(&["a", "b"]);
        let mut votes = Ledger::new();
        votes.add("a", "p1");
        votes.add("b", "p1");

        assert_eq!(next_unreviewed_index(&list, &votes, &Ledger::new(), "p1", 0), 2);
        assert_eq!(next_unreviewed_index(&[], &votes, &Ledger::new(), "p1", 0), 0);
    }

    #[test]
    fn starts_scanning_at_from() {
        let list = places(&["a", "b", "c"]);
        let votes = Ledger::new();

        assert_eq!(next_unreviewed_index(&list, &votes, &votes, "p1", 1), 1);
        assert_eq!(next_unreviewed_index(&list, &votes, &votes, "p1", 7), 3);
    }

    #[test]
    fn never_lands_on_a_reviewed_place() {
        let list = places(&["a", "b", "c", "d", "e"]);
        let mut votes = Ledger::new();
        let mut dislikes = Ledger::new();
        for id in ["a", "c", "d"] {
            votes.add(id, "p1");
        }
        dislikes.add("e", "p1");

        for from in 0..=list.len() {
            let i = next_unreviewed_index(&list, &votes, &dislikes, "p1", from);
            if i < list.len() {
                assert!(!has_reviewed(&votes, &dislikes, &list[i].place_id, "p1"));
            }
            assert_eq!(i, next_unreviewed_index(&list, &votes, &dislikes, "p1", from));
        }
    }
}
