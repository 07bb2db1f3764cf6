// src/ids.rs
//! Session and participant identifiers.
//!
//! Identifiers double as storage keys, so a collision would merge two
//! unrelated sessions. Session codes are short enough to type by hand but
//! carry ~62 bits of randomness; participants get a full UUID v4.
use rand::{distributions::Uniform, Rng};
use uuid::Uuid;

const SESSION_PREFIX: &str = "session-";
const PARTICIPANT_PREFIX: &str = "user-";
const SESSION_CODE_LEN: usize = 12;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

pub fn new_session_id() -> String {
    let mut rng = rand::thread_rng();
    let digits = Uniform::from(0..BASE36.len());
    let code: String = (0..SESSION_CODE_LEN)
        .map(|_| BASE36[rng.sample(digits)] as char)
        .collect();
    format!("{SESSION_PREFIX}{code}")
}

pub fn new_participant_id() -> String {
    format!("{PARTICIPANT_PREFIX}{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn session_ids_are_prefixed_base36() {
        let id = new_session_id();
        let code = id.strip_prefix(SESSION_PREFIX).unwrap();
        assert_eq!(code.len(), SESSION_CODE_LEN);
        assert!(code.bytes().all(|b| BASE36.contains(&b)));
    }

    #[test]
    fn participant_ids_are_prefixed_uuids() {
        let id = new_participant_id();
        let raw = id.strip_prefix(PARTICIPANT_PREFIX).unwrap();
        assert!(Uuid::parse_str(raw).is_ok());
    }

    #[test]
    fn ids_do_not_repeat() {
        let sessions: HashSet<_> = (0..2000).map(|_| new_session_id()).collect();
        let users: HashSet<_> = (0..2000).map(|_| new_participant_id()).collect();
        assert_eq!(sessions.len(), 2000);
        assert_eq!(users.len(), 2000);
    }
}
