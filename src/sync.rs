// src/sync.rs
//! Keeps a participant's local view of a session current.
//!
//! The poller reads the shared record on a fixed interval and reports when
//! the owner has replaced the place list. If the store can push changes the
//! poller applies them as they arrive as well, but polling never stops, so a
//! store without `subscribe` behaves the same, only slower.
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::models::{Place, SessionRecord};
use crate::progress::next_unreviewed_index;
use crate::store::{SessionStore, Subscription};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Watching,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// The place list changed. Emitted once per change.
    PlacesReplaced { places: Vec<Place>, next_index: usize },
    /// The session record is gone; the poller has stopped.
    SessionEnded,
}

/// What the participant currently has on screen.
#[derive(Debug, Clone)]
pub struct LocalView {
    pub session_id: String,
    pub participant_id: String,
    pub places: Vec<Place>,
}

impl LocalView {
    fn place_ids(&self) -> BTreeSet<&str> {
        self.places.iter().map(|p| p.place_id.as_str()).collect()
    }

    /// Adopts the record's places if they differ (ignoring order).
    fn apply(&mut self, record: &SessionRecord) -> Option<SyncEvent> {
        if record.place_id_set() == self.place_ids() {
            return None;
        }

        self.places = record.places.clone();
        let next_index = next_unreviewed_index(
            &record.places,
            &record.votes,
            &record.dislikes,
            &self.participant_id,
            0,
        );
        info!(
            session_id = %self.session_id,
            places = self.places.len(),
            next_index,
            "host updated the session parameters"
        );
        Some(SyncEvent::PlacesReplaced {
            places: self.places.clone(),
            next_index,
        })
    }
}

struct Running {
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

pub struct SyncPoller {
    store: Arc<dyn SessionStore>,
    interval: Duration,
    running: Option<Running>,
}

impl SyncPoller {
    pub fn new(store: Arc<dyn SessionStore>, interval: Duration) -> Self {
        Self {
            store,
            interval,
            running: None,
        }
    }

    pub fn state(&self) -> PollerState {
        match &self.running {
            Some(r) if !r.task.is_finished() => PollerState::Watching,
            _ => PollerState::Idle,
        }
    }

    /// Starts watching `view.session_id`, replacing any previous watch.
    pub async fn start(&mut self, view: LocalView) -> mpsc::UnboundedReceiver<SyncEvent> {
        self.stop().await;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let subscription = self.store.subscribe(&view.session_id).await;

        debug!(session_id = %view.session_id, "sync poller watching");
        let task = tokio::spawn(watch_session(
            Arc::clone(&self.store),
            self.interval,
            view,
            subscription,
            cancel_rx,
            events_tx,
        ));
        self.running = Some(Running {
            cancel: cancel_tx,
            task,
        });
        events_rx
    }

    /// Stops watching. Once this returns no further store reads are issued;
    /// a read that was in flight is discarded.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        let _ = running.cancel.send(true);
        if let Err(e) = running.task.await {
            warn!(error = %e, "sync poller task failed");
        }
        debug!("sync poller idle");
    }
}

impl Drop for SyncPoller {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.task.abort();
        }
    }
}

enum Wake {
    Cancelled,
    Tick,
    Pushed(Option<SessionRecord>),
}

async fn next_wake(
    ticker: &mut tokio::time::Interval,
    cancel: &mut watch::Receiver<bool>,
    subscription: &mut Option<Subscription>,
) -> Wake {
    let pushed = async {
        match subscription.as_mut() {
            Some(sub) => match sub.changed().await {
                Ok(()) => sub.borrow_and_update().clone(),
                // sender gone: the record was deleted
                Err(_) => None,
            },
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        biased;
        _ = cancel.changed() => Wake::Cancelled,
        _ = ticker.tick() => Wake::Tick,
        record = pushed => Wake::Pushed(record),
    }
}

async fn watch_session(
    store: Arc<dyn SessionStore>,
    period: Duration,
    mut view: LocalView,
    mut subscription: Option<Subscription>,
    mut cancel: watch::Receiver<bool>,
    events: mpsc::UnboundedSender<SyncEvent>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let wake = next_wake(&mut ticker, &mut cancel, &mut subscription).await;
        if events.is_closed() {
            debug!(session_id = %view.session_id, "sync events dropped, watch ends");
            break;
        }

        let fetched = match wake {
            Wake::Cancelled => break,
            Wake::Pushed(record) => Ok(record),
            Wake::Tick => {
                tokio::select! {
                    biased;
                    _ = cancel.changed() => break,
                    result = store.get(&view.session_id) => result,
                }
            }
        };
        if *cancel.borrow() {
            break;
        }

        let event = match fetched {
            Ok(Some(record)) => view.apply(&record),
            Ok(None) => {
                info!(session_id = %view.session_id, "session ended while watching");
                let _ = events.send(SyncEvent::SessionEnded);
                break;
            }
            Err(e) => {
                warn!(session_id = %view.session_id, error = %e, "error polling session");
                None
            }
        };

        if let Some(event) = event {
            if events.send(event).is_err() {
                break;
            }
        }
    }
}
