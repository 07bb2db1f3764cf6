// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Result, SessionError};
use crate::ledger::Ledger;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn validate(&self) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.lat) || !(-180.0..=180.0).contains(&self.lon) {
            return Err(SessionError::InvalidInput(format!(
                "coordinates out of range: ({}, {})",
                self.lat, self.lon
            )));
        }
        Ok(())
    }

    /// Great-circle distance in meters.
    pub fn distance_m(&self, other: &Coordinates) -> f64 {
        const EARTH_RADIUS_M: f64 = 6_371_000.0;
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlat = lat2 - lat1;
        let dlon = (other.lon - self.lon).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().asin()
    }
}

/// A candidate venue. Only `place_id` and `name` take part in voting and
/// reconciliation; the rest is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub place_id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl Place {
    pub fn new(place_id: impl Into<String>, name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            place_id: place_id.into(),
            name: name.into(),
            lat,
            lon,
            opening_hours: None,
            tags: BTreeMap::new(),
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.lat,
            lon: self.lon,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Like,
    Dislike,
}

/// The shared, durable unit every participant reads and writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub origin: Coordinates,
    pub radius_m: u32,
    pub created_at: DateTime<Utc>,
    pub owner_id: String,
    pub places: Vec<Place>,
    #[serde(default)]
    pub participants: BTreeMap<String, Participant>,
    #[serde(default)]
    pub votes: Ledger,
    #[serde(default)]
    pub dislikes: Ledger,
    /// Optimistic-concurrency token, bumped by the store on every write.
    #[serde(default)]
    pub version: u64,
}

impl SessionRecord {
    pub fn new(
        session_id: String,
        owner_id: String,
        params: &SessionParams,
        places: Vec<Place>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut participants = BTreeMap::new();
        participants.insert(owner_id.clone(), Participant { joined_at: now });

        Self {
            session_id,
            origin: params.origin,
            radius_m: params.radius_m,
            created_at: now,
            owner_id,
            places,
            participants,
            votes: Ledger::new(),
            dislikes: Ledger::new(),
            version: 0,
        }
    }

    /// Never zero, so it can be used as a divisor.
    pub fn participant_count(&self) -> usize {
        self.participants.len().max(1)
    }

    pub fn is_owner(&self, participant_id: &str) -> bool {
        self.owner_id == participant_id
    }

    pub fn has_place(&self, place_id: &str) -> bool {
        self.places.iter().any(|p| p.place_id == place_id)
    }

    pub fn place_id_set(&self) -> BTreeSet<&str> {
        self.places.iter().map(|p| p.place_id.as_str()).collect()
    }

    pub fn require_participant(&self, participant_id: &str) -> Result<()> {
        if self.participants.contains_key(participant_id) {
            Ok(())
        } else {
            Err(SessionError::ParticipantNotFound {
                session_id: self.session_id.clone(),
                participant_id: participant_id.to_string(),
            })
        }
    }

    /// Adds the participant if missing. Re-joining keeps the first join time.
    pub fn join(&mut self, participant_id: &str, now: DateTime<Utc>) -> bool {
        if self.participants.contains_key(participant_id) {
            return false;
        }
        self.participants
            .insert(participant_id.to_string(), Participant { joined_at: now });
        true
    }

    /// Records a like or dislike. The two are mutually exclusive: casting one
    /// withdraws the other for the same place.
    pub fn cast(&mut self, place_id: &str, participant_id: &str, verdict: Verdict) -> Result<()> {
        if !self.has_place(place_id) {
            return Err(SessionError::UnknownPlace(place_id.to_string()));
        }
        self.require_participant(participant_id)?;

        let (add_to, remove_from) = match verdict {
            Verdict::Like => (&mut self.votes, &mut self.dislikes),
            Verdict::Dislike => (&mut self.dislikes, &mut self.votes),
        };
        remove_from.remove(place_id, participant_id);
        add_to.add(place_id, participant_id);
        Ok(())
    }

    /// Withdraws any like or dislike the participant holds on the place.
    pub fn retract(&mut self, place_id: &str, participant_id: &str) -> bool {
        let liked = self.votes.remove(place_id, participant_id);
        let disliked = self.dislikes.remove(place_id, participant_id);
        liked || disliked
    }

    pub fn clear_reviews(&mut self, participant_id: &str) -> usize {
        self.votes.remove_participant(participant_id)
            + self.dislikes.remove_participant(participant_id)
    }

    pub fn remove_participant(&mut self, participant_id: &str) -> bool {
        self.clear_reviews(participant_id);
        self.participants.remove(participant_id).is_some()
    }
}

/// Location and radius chosen by the owner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionParams {
    pub origin: Coordinates,
    pub radius_m: u32,
}

impl SessionParams {
    pub fn validate(&self) -> Result<()> {
        self.origin.validate()?;
        if self.radius_m == 0 {
            return Err(SessionError::InvalidInput(
                "radius must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where a participant stands in the current place list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub next_index: usize,
    pub reviewed: usize,
    pub total: usize,
    pub exhausted: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: u32,
    pub participant_id: Option<String>,
}

impl CreateSessionRequest {
    pub fn params(&self) -> SessionParams {
        SessionParams {
            origin: Coordinates {
                lat: self.latitude,
                lon: self.longitude,
            },
            radius_m: self.radius_m,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateParametersRequest {
    pub participant_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: u32,
}

impl UpdateParametersRequest {
    pub fn params(&self) -> SessionParams {
        SessionParams {
            origin: Coordinates {
                lat: self.latitude,
                lon: self.longitude,
            },
            radius_m: self.radius_m,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub participant_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub participant_id: String,
    pub place_id: String,
    pub verdict: Verdict,
    #[serde(default)]
    pub from_index: usize,
}

#[derive(Debug, Deserialize)]
pub struct ParticipantQuery {
    pub participant_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProgressQuery {
    #[serde(default)]
    pub from: usize,
}

/// Returned whenever a participant enters or re-enters a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionHandle {
    pub session_id: String,
    pub participant_id: String,
    pub join_url: String,
    pub progress: Progress,
    pub session: SessionRecord,
}
