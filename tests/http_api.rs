use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use foodswipe_backend::models::Place;
use foodswipe_backend::places::StaticPlacesSource;
use foodswipe_backend::routes::create_routes;
use foodswipe_backend::services::SessionService;
use foodswipe_backend::store::MemoryStore;

fn test_app() -> Router {
    let places = StaticPlacesSource::new(vec![
        Place::new("node/1", "Joe's Pizza", 1.0, 1.0),
        Place::new("way/2", "Taco Stand", 1.001, 1.0),
    ]);
    let service = SessionService::new(
        Arc::new(MemoryStore::new()),
        Arc::new(places),
        "https://food.example/",
        5,
    );
    create_routes(Arc::new(service))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let res = app.clone().oneshot(request).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn health_is_ok() {
    let app = test_app();
    let res = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn full_round_over_http() {
    let app = test_app();

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/sessions",
        Some(json!({ "latitude": 1.0, "longitude": 1.0, "radius_m": 1609, "participant_id": "alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let sid = created["session_id"].as_str().unwrap().to_string();
    assert_eq!(
        created["join_url"],
        json!(format!("https://food.example/?session={sid}"))
    );
    assert_eq!(created["session"]["places"].as_array().unwrap().len(), 2);

    let (status, joined) = send(
        &app,
        Method::POST,
        &format!("/api/sessions/{sid}/participants"),
        Some(json!({ "participant_id": "bob" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(joined["progress"]["next_index"], json!(0));

    for (who, place, verdict) in [
        ("alice", "node/1", "like"),
        ("alice", "way/2", "dislike"),
        ("bob", "node/1", "like"),
        ("bob", "way/2", "like"),
    ] {
        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/sessions/{sid}/votes"),
            Some(json!({ "participant_id": who, "place_id": place, "verdict": verdict })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, progress) = send(
        &app,
        Method::GET,
        &format!("/api/sessions/{sid}/participants/bob/progress"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(progress["exhausted"], json!(true));

    let (status, consensus) = send(&app, Method::GET, &format!("/api/sessions/{sid}/consensus"), None).await;
    assert_eq!(status, StatusCode::OK);
    let results = consensus["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["place"]["place_id"], json!("node/1"));
    assert_eq!(results[0]["agreement"], json!(100));
    assert_eq!(results[0]["votes"], json!(2));

    // undo takes the place id as an encoded path segment
    let (status, progress) = send(
        &app,
        Method::DELETE,
        &format!("/api/sessions/{sid}/votes/bob/way%2F2"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(progress["next_index"], json!(1));

    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/api/sessions/{sid}?participant_id=bob"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], json!("not_owner"));

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/sessions/{sid}?participant_id=alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, Method::GET, &format!("/api/sessions/{sid}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], json!("session_not_found"));
}

#[tokio::test]
async fn empty_area_is_unprocessable() {
    let app = test_app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/sessions",
        Some(json!({ "latitude": 45.0, "longitude": 45.0, "radius_m": 500 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], json!("empty_places"));
}

#[tokio::test]
async fn voting_on_unknown_place_is_rejected() {
    let app = test_app();
    let (_, created) = send(
        &app,
        Method::POST,
        "/api/sessions",
        Some(json!({ "latitude": 1.0, "longitude": 1.0, "radius_m": 1609 })),
    )
    .await;
    let sid = created["session_id"].as_str().unwrap();
    let owner = created["participant_id"].as_str().unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/sessions/{sid}/votes"),
        Some(json!({ "participant_id": owner, "place_id": "node/999", "verdict": "like" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], json!("unknown_place"));
}

#[tokio::test]
async fn only_the_owner_can_change_parameters() {
    let app = test_app();
    let (_, created) = send(
        &app,
        Method::POST,
        "/api/sessions",
        Some(json!({ "latitude": 1.0, "longitude": 1.0, "radius_m": 1609, "participant_id": "alice" })),
    )
    .await;
    let sid = created["session_id"].as_str().unwrap().to_string();
    send(
        &app,
        Method::POST,
        &format!("/api/sessions/{sid}/participants"),
        Some(json!({ "participant_id": "bob" })),
    )
    .await;

    let update = |who: &str| json!({ "participant_id": who, "latitude": 1.0, "longitude": 1.0, "radius_m": 800 });

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/sessions/{sid}/parameters"),
        Some(update("bob")),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], json!("not_owner"));

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/sessions/{sid}/parameters"),
        Some(update("alice")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session"]["owner_id"], json!("alice"));
    assert_eq!(body["session"]["radius_m"], json!(800));
}
