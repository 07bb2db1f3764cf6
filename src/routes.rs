// src/routes.rs
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use http::{header, Method};
use tower_http::cors::{Any, CorsLayer};

use crate::handlers::{self, AppState};

pub fn create_routes(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE]);

    let api = Router::new()
        .route(
            "/sessions",
            post(handlers::create_session),
        )
        .route(
            "/sessions/{session_id}",
            get(handlers::get_session).delete(handlers::end_session),
        )
        .route(
            "/sessions/{session_id}/parameters",
            put(handlers::update_parameters),
        )
        .route(
            "/sessions/{session_id}/participants",
            post(handlers::join_session),
        )
        .route(
            "/sessions/{session_id}/participants/{participant_id}",
            delete(handlers::leave_session),
        )
        .route(
            "/sessions/{session_id}/participants/{participant_id}/progress",
            get(handlers::get_progress),
        )
        .route("/sessions/{session_id}/votes", post(handlers::cast_vote))
        .route(
            "/sessions/{session_id}/votes/{participant_id}",
            delete(handlers::restart),
        )
        .route(
            "/sessions/{session_id}/votes/{participant_id}/{place_id}",
            delete(handlers::undo_vote),
        )
        .route(
            "/sessions/{session_id}/consensus",
            get(handlers::get_consensus),
        );

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api)
        .layer(cors)
        .with_state(state)
}
