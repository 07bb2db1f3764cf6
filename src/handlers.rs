// src/handlers.rs
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::error::SessionError;
use crate::models::{
    CreateSessionRequest, JoinRequest, ParticipantQuery, ProgressQuery, UpdateParametersRequest,
    VoteRequest,
};
use crate::services::SessionService;

pub type AppState = Arc<SessionService>;

pub async fn health() -> &'static str {
    "OK"
}

/// Create a session around the caller's location
pub async fn create_session(
    State(service): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, SessionError> {
    let handle = service
        .create_session(req.params(), req.participant_id.clone())
        .await?;
    Ok((StatusCode::CREATED, Json(handle)))
}

pub async fn get_session(
    State(service): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, SessionError> {
    Ok(Json(service.get_session(&session_id).await?))
}

/// End the session for everyone (owner only)
pub async fn end_session(
    State(service): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<ParticipantQuery>,
) -> Result<impl IntoResponse, SessionError> {
    service
        .end_session(&session_id, &query.participant_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Regenerate the place list, keeping votes for places that are still there
pub async fn update_parameters(
    State(service): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<UpdateParametersRequest>,
) -> Result<impl IntoResponse, SessionError> {
    let handle = service
        .update_parameters(&session_id, &req.participant_id, req.params())
        .await?;
    Ok(Json(handle))
}

pub async fn join_session(
    State(service): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<JoinRequest>,
) -> Result<impl IntoResponse, SessionError> {
    Ok(Json(service.join(&session_id, req.participant_id).await?))
}

pub async fn leave_session(
    State(service): State<AppState>,
    Path((session_id, participant_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, SessionError> {
    service.leave(&session_id, &participant_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_progress(
    State(service): State<AppState>,
    Path((session_id, participant_id)): Path<(String, String)>,
    Query(query): Query<ProgressQuery>,
) -> Result<impl IntoResponse, SessionError> {
    Ok(Json(
        service
            .progress(&session_id, &participant_id, query.from)
            .await?,
    ))
}

/// Like or dislike a place
pub async fn cast_vote(
    State(service): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<VoteRequest>,
) -> Result<impl IntoResponse, SessionError> {
    let progress = service
        .cast(
            &session_id,
            &req.participant_id,
            &req.place_id,
            req.verdict,
            req.from_index,
        )
        .await?;
    Ok(Json(progress))
}

/// Forget all of a participant's votes and start over
pub async fn restart(
    State(service): State<AppState>,
    Path((session_id, participant_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, SessionError> {
    Ok(Json(service.restart(&session_id, &participant_id).await?))
}

pub async fn undo_vote(
    State(service): State<AppState>,
    Path((session_id, participant_id, place_id)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, SessionError> {
    Ok(Json(
        service
            .undo(&session_id, &participant_id, &place_id)
            .await?,
    ))
}

pub async fn get_consensus(
    State(service): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, SessionError> {
    let results = service.consensus(&session_id).await?;
    Ok(Json(json!({
        "session_id": session_id,
        "results": results,
    })))
}
