//! State container for fetched events.
//!
//! The list and the selected detail live in separate slots: a failed detail
//! fetch never touches the list or its status.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::api::{ApiError, EventSource};
use crate::filter::{self, FilterCriteria};
use crate::models::{Event, EventDetail};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "lowercase")]
pub enum FetchStatus {
    Idle,
    Loading,
    Succeeded,
    Failed(String),
}

impl FetchStatus {
    pub fn error(&self) -> Option<&str> {
        match self {
            FetchStatus::Failed(message) => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    Idle,
    Loading(i64),
    Loaded(Arc<EventDetail>),
    Failed { id: i64, message: String },
}

/// A consistent read of the list slot.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub events: Arc<[Event]>,
    pub status: FetchStatus,
}

impl Snapshot {
    pub fn error(&self) -> Option<&str> {
        self.status.error()
    }

    pub fn visible(&self, criteria: &FilterCriteria) -> Vec<Event> {
        filter::filter(&self.events, criteria)
    }

    pub fn find(&self, id: i64) -> Option<&Event> {
        self.events.iter().find(|event| event.id == id)
    }
}

struct StoreState {
    events: Arc<[Event]>,
    status: FetchStatus,
    in_flight: usize,
    detail: DetailState,
}

pub struct EventStore {
    state: Mutex<StoreState>,
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState {
                events: Arc::from(Vec::new()),
                status: FetchStatus::Idle,
                in_flight: 0,
                detail: DetailState::Idle,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = self.lock();
        Snapshot {
            events: Arc::clone(&state.events),
            status: state.status.clone(),
        }
    }

    pub fn status(&self) -> FetchStatus {
        self.lock().status.clone()
    }

    pub fn events(&self) -> Arc<[Event]> {
        Arc::clone(&self.lock().events)
    }

    pub fn is_fetching(&self) -> bool {
        self.lock().in_flight > 0
    }

    /// Marks a list fetch as started.
    pub fn begin_fetch(&self) {
        let mut state = self.lock();
        state.in_flight += 1;
        state.status = FetchStatus::Loading;
    }

    /// Applies a finished list fetch. Overlapping fetches are not sequenced:
    /// whichever completes last decides the list and status.
    pub fn apply_fetch(&self, outcome: Result<Vec<Event>, ApiError>) -> FetchStatus {
        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        state.status = match outcome {
            Ok(events) => {
                info!(count = events.len(), "event list replaced");
                state.events = Arc::from(events);
                FetchStatus::Succeeded
            }
            Err(err) => {
                warn!(%err, kept = state.events.len(), "event fetch failed");
                FetchStatus::Failed(err.to_string())
            }
        };
        state.status.clone()
    }

    pub async fn load_all<S: EventSource>(&self, source: &S) -> FetchStatus {
        self.begin_fetch();
        let outcome = source.fetch_events().await;
        self.apply_fetch(outcome)
    }

    pub async fn load_detail<S: EventSource>(&self, source: &S, id: i64) -> DetailState {
        self.lock().detail = DetailState::Loading(id);
        let outcome = source.fetch_event_detail(id).await;

        let mut state = self.lock();
        if state.detail != DetailState::Loading(id) {
            debug!(id, "dropping detail response for a deselected event");
            return state.detail.clone();
        }
        state.detail = match outcome {
            Ok(detail) => DetailState::Loaded(Arc::new(detail)),
            Err(err) => {
                warn!(id, %err, "event detail fetch failed");
                DetailState::Failed {
                    id,
                    message: err.to_string(),
                }
            }
        };
        state.detail.clone()
    }
}
