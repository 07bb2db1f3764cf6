// src/services.rs
//! Session operations. Each one reads the full record, changes it and writes
//! it back; a write that lost a race against another participant is retried
//! on a fresh read instead of overwriting their change.
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{Result, SessionError};
use crate::ids::{new_participant_id, new_session_id};
use crate::models::{
    Place, Progress, SessionHandle, SessionParams, SessionRecord, Verdict,
};
use crate::places::{PlacesQuery, PlacesSource};
use crate::poll::{compute_consensus, ConsensusEntry};
use crate::progress::progress_for;
use crate::reconcile::reconcile;
use crate::store::SessionStore;
use crate::sync::{LocalView, SyncPoller};

const MAX_ID_DRAWS: usize = 8;

pub struct SessionService {
    store: Arc<dyn SessionStore>,
    places: Arc<dyn PlacesSource>,
    public_base_url: String,
    write_attempts: u32,
    sync_interval: Duration,
}

impl SessionService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        places: Arc<dyn PlacesSource>,
        public_base_url: impl Into<String>,
        write_attempts: u32,
    ) -> Self {
        Self {
            store,
            places,
            public_base_url: public_base_url.into(),
            write_attempts: write_attempts.max(1),
            sync_interval: Duration::from_secs(3),
        }
    }

    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    /// A poller over this service's store, for participants who did not set
    /// the place list and need to notice when the owner replaces it.
    pub fn watcher(&self) -> SyncPoller {
        SyncPoller::new(self.store(), self.sync_interval)
    }

    pub fn local_view(&self, handle: &SessionHandle) -> LocalView {
        LocalView {
            session_id: handle.session_id.clone(),
            participant_id: handle.participant_id.clone(),
            places: handle.session.places.clone(),
        }
    }

    pub fn store(&self) -> Arc<dyn SessionStore> {
        Arc::clone(&self.store)
    }

    /// Shareable link with the session id in the `session` query parameter.
    pub fn join_url(&self, session_id: &str) -> Result<String> {
        let mut url = reqwest::Url::parse(&self.public_base_url)
            .map_err(|e| SessionError::Config(format!("Invalid public base url: {e}")))?;
        url.query_pairs_mut().append_pair("session", session_id);
        Ok(url.into())
    }

    pub async fn get_session(&self, session_id: &str) -> Result<SessionRecord> {
        self.store
            .get(session_id)
            .await?
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    async fn fetch_places(&self, params: &SessionParams) -> Result<Vec<Place>> {
        params.validate()?;
        let places = self
            .places
            .fetch_places(&PlacesQuery {
                origin: params.origin,
                radius_m: params.radius_m,
            })
            .await?;

        if places.is_empty() {
            return Err(SessionError::EmptyPlaces {
                lat: params.origin.lat,
                lon: params.origin.lon,
                radius_m: params.radius_m,
            });
        }
        Ok(places)
    }

    /// Read-modify-write with retry on `Conflict`.
    async fn mutate<F>(&self, session_id: &str, mut change: F) -> Result<SessionRecord>
    where
        F: FnMut(&mut SessionRecord) -> Result<()> + Send,
    {
        for attempt in 1..=self.write_attempts {
            let mut record = self.get_session(session_id).await?;
            change(&mut record)?;

            match self.store.put(session_id, Some(record.clone())).await {
                Ok(version) => {
                    record.version = version;
                    return Ok(record);
                }
                Err(SessionError::Conflict(_)) => {
                    warn!(session_id, attempt, "concurrent write, retrying");
                }
                Err(e) => return Err(e),
            }
        }
        Err(SessionError::Conflict(session_id.to_string()))
    }

    fn handle(&self, record: SessionRecord, participant_id: String) -> Result<SessionHandle> {
        let progress = progress_for(&record, &participant_id, 0);
        Ok(SessionHandle {
            join_url: self.join_url(&record.session_id)?,
            session_id: record.session_id.clone(),
            participant_id,
            progress,
            session: record,
        })
    }

    pub async fn create_session(
        &self,
        params: SessionParams,
        participant_id: Option<String>,
    ) -> Result<SessionHandle> {
        let places = self.fetch_places(&params).await?;
        let owner_id = participant_id.unwrap_or_else(new_participant_id);

        for _ in 0..MAX_ID_DRAWS {
            let session_id = new_session_id();
            let mut record = SessionRecord::new(
                session_id.clone(),
                owner_id.clone(),
                &params,
                places.clone(),
                Utc::now(),
            );

            match self.store.put(&session_id, Some(record.clone())).await {
                Ok(version) => {
                    record.version = version;
                    info!(
                        session_id = %session_id,
                        owner = %owner_id,
                        places = record.places.len(),
                        radius_m = params.radius_m,
                        "session created"
                    );
                    return self.handle(record, owner_id);
                }
                Err(SessionError::Conflict(_)) => {
                    warn!(session_id = %session_id, "session id already taken, drawing another");
                }
                Err(e) => return Err(e),
            }
        }
        Err(SessionError::Store("could not allocate a session id".into()))
    }

    /// Regenerates the place list and carries existing votes over to it.
    /// Only the owner may do this; ownership never moves.
    pub async fn update_parameters(
        &self,
        session_id: &str,
        participant_id: &str,
        params: SessionParams,
    ) -> Result<SessionHandle> {
        let current = self.get_session(session_id).await?;
        current.require_participant(participant_id)?;
        if !current.is_owner(participant_id) {
            return Err(SessionError::NotOwner);
        }
        let places = self.fetch_places(&params).await?;

        let record = self
            .mutate(session_id, |record| {
                record.require_participant(participant_id)?;
                if !record.is_owner(participant_id) {
                    return Err(SessionError::NotOwner);
                }
                let merged = reconcile(&record.places, &places, &record.votes, &record.dislikes);
                info!(
                    session_id,
                    carried = merged.carried,
                    dropped = merged.dropped,
                    "votes reconciled onto new places"
                );

                record.places = places.clone();
                record.origin = params.origin;
                record.radius_m = params.radius_m;
                record.votes = merged.votes;
                record.dislikes = merged.dislikes;
                Ok(())
            })
            .await?;

        self.handle(record, participant_id.to_string())
    }

    pub async fn join(&self, session_id: &str, participant_id: Option<String>) -> Result<SessionHandle> {
        let participant_id = participant_id.unwrap_or_else(new_participant_id);

        let record = self
            .mutate(session_id, |record| {
                if record.places.is_empty() {
                    return Err(SessionError::EmptyPlaces {
                        lat: record.origin.lat,
                        lon: record.origin.lon,
                        radius_m: record.radius_m,
                    });
                }
                record.join(&participant_id, Utc::now());
                Ok(())
            })
            .await?;

        info!(session_id, participant = %participant_id, "participant joined");
        self.handle(record, participant_id)
    }

    /// Likes or dislikes a place. The write is durable before the next index
    /// is computed.
    pub async fn cast(
        &self,
        session_id: &str,
        participant_id: &str,
        place_id: &str,
        verdict: Verdict,
        from_index: usize,
    ) -> Result<Progress> {
        let record = self
            .mutate(session_id, |record| record.cast(place_id, participant_id, verdict))
            .await?;

        debug!(session_id, participant = participant_id, place_id, ?verdict, "review recorded");
        Ok(progress_for(&record, participant_id, from_index))
    }

    pub async fn undo(&self, session_id: &str, participant_id: &str, place_id: &str) -> Result<Progress> {
        let record = self
            .mutate(session_id, |record| {
                record.require_participant(participant_id)?;
                record.retract(place_id, participant_id);
                Ok(())
            })
            .await?;

        debug!(session_id, participant = participant_id, place_id, "review withdrawn");
        Ok(progress_for(&record, participant_id, 0))
    }

    /// Clears every like and dislike of the participant.
    pub async fn restart(&self, session_id: &str, participant_id: &str) -> Result<Progress> {
        let record = self
            .mutate(session_id, |record| {
                record.require_participant(participant_id)?;
                record.clear_reviews(participant_id);
                Ok(())
            })
            .await?;

        info!(session_id, participant = participant_id, "participant restarted");
        Ok(progress_for(&record, participant_id, 0))
    }

    /// Removes the participant and their reviews. When the owner leaves the
    /// session ends for everyone.
    pub async fn leave(&self, session_id: &str, participant_id: &str) -> Result<()> {
        let record = self.get_session(session_id).await?;
        record.require_participant(participant_id)?;
        if record.is_owner(participant_id) {
            return self.end_session(session_id, participant_id).await;
        }

        self.mutate(session_id, |record| {
            record.remove_participant(participant_id);
            Ok(())
        })
        .await?;

        info!(session_id, participant = participant_id, "participant left");
        Ok(())
    }

    pub async fn end_session(&self, session_id: &str, participant_id: &str) -> Result<()> {
        let record = self.get_session(session_id).await?;
        if !record.is_owner(participant_id) {
            return Err(SessionError::NotOwner);
        }

        self.store.put(session_id, None).await?;
        info!(session_id, owner = participant_id, "session ended");
        Ok(())
    }

    pub async fn progress(&self, session_id: &str, participant_id: &str, from: usize) -> Result<Progress> {
        let record = self.get_session(session_id).await?;
        record.require_participant(participant_id)?;
        Ok(progress_for(&record, participant_id, from))
    }

    pub async fn consensus(&self, session_id: &str) -> Result<Vec<ConsensusEntry>> {
        let record = self.get_session(session_id).await?;
        Ok(compute_consensus(
            &record.places,
            &record.votes,
            record.participant_count(),
        ))
    }
}
