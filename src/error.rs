// src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    /// The location/radius produced no places. Distinct from `NotFound` so
    /// callers can suggest widening the radius.
    #[error("No places found within {radius_m}m of ({lat}, {lon})")]
    EmptyPlaces { lat: f64, lon: f64, radius_m: u32 },

    #[error("Participant {participant_id} is not part of session {session_id}")]
    ParticipantNotFound {
        session_id: String,
        participant_id: String,
    },

    #[error("Place {0} is not in the session's place list")]
    UnknownPlace(String),

    #[error("Only the session owner can do this")]
    NotOwner,

    #[error("Session {0} was modified concurrently")]
    Conflict(String),

    #[error("Places source failed: {0}")]
    PlacesSource(String),

    #[error("Session store failed: {0}")]
    Store(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SessionError {
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::NotFound(_) => "session_not_found",
            SessionError::EmptyPlaces { .. } => "empty_places",
            SessionError::ParticipantNotFound { .. } => "participant_not_found",
            SessionError::UnknownPlace(_) => "unknown_place",
            SessionError::NotOwner => "not_owner",
            SessionError::Conflict(_) => "conflict",
            SessionError::PlacesSource(_) => "places_source",
            SessionError::Store(_) => "store",
            SessionError::InvalidInput(_) => "invalid_input",
            SessionError::Config(_) => "config",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            SessionError::NotFound(_) | SessionError::ParticipantNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            SessionError::EmptyPlaces { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            SessionError::UnknownPlace(_) | SessionError::InvalidInput(_) => {
                StatusCode::BAD_REQUEST
            }
            SessionError::NotOwner => StatusCode::FORBIDDEN,
            SessionError::Conflict(_) => StatusCode::CONFLICT,
            SessionError::PlacesSource(_) => StatusCode::BAD_GATEWAY,
            SessionError::Store(_) | SessionError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<sqlx::Error> for SessionError {
    fn from(e: sqlx::Error) -> Self {
        SessionError::Store(e.to_string())
    }
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), "{self}");
        }

        (
            status,
            Json(json!({ "error": self.to_string(), "kind": self.kind() })),
        )
            .into_response()
    }
}
