use std::collections::HashMap;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::extract::Query;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use callejero_api::{build_app_with, ApiConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

const TEST_API_KEY: &str = "test-callejero-key";

/// Stand-in for both providers: Nominatim's /search and Overpass's
/// /api/interpreter, with fixed answers for the scenarios under test.
async fn spawn_mock_providers() -> String {
    let app = Router::new()
        .route("/search", get(mock_search))
        .route("/api/interpreter", get(mock_interpreter));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("mock listener should bind");
    let addr = listener.local_addr().expect("mock addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock server");
    });

    format!("http://{addr}")
}

async fn mock_search(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let q = params.get("q").cloned().unwrap_or_default().to_lowercase();

    if q.contains("roma") {
        Json(json!([{
            "lat": "41.9",
            "lon": "12.5",
            "display_name": "Roma, Lazio, Italia"
        }]))
    } else if q.contains("desierto") {
        Json(json!([{
            "lat": "0",
            "lon": "0",
            "display_name": "Desierto, Ninguna Parte"
        }]))
    } else {
        Json(json!([]))
    }
}

async fn mock_interpreter(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let data = params.get("data").cloned().unwrap_or_default();

    // The desert geocodes to (0, 0); nothing lives there.
    if data.contains(",0,0)") {
        return Json(json!({ "elements": [] }));
    }

    Json(json!({
        "elements": [
            {
                "lat": 41.8931,
                "lon": 12.4828,
                "tags": { "name": "Musei Capitolini", "tourism": "museum" }
            },
            {
                "lat": 41.9013,
                "lon": 12.4989,
                "tags": {
                    "name": "Museo Nazionale Romano",
                    "tourism": "museum",
                    "opening_hours": "9:00-19:00"
                }
            }
        ]
    }))
}

async fn test_app() -> Router {
    let provider_base = spawn_mock_providers().await;

    build_app_with(ApiConfig {
        nominatim_url: provider_base.clone(),
        overpass_url: provider_base,
        user_agent: "callejero-tests".to_string(),
        geocode_timeout: Duration::from_secs(2),
        places_timeout: Duration::from_secs(2),
        default_radius: 2_000,
        api_key: TEST_API_KEY.to_string(),
        rate_limit_window: Duration::from_secs(60),
        rate_limit_max: 1_000,
    })
    .expect("app should build")
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-api-key", TEST_API_KEY)
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, parsed)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .header("x-api-key", TEST_API_KEY)
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, parsed)
}

#[tokio::test]
async fn health_is_public() {
    let app = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn chat_requires_api_key() {
    let app = test_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/v1/chat")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "message": "hola" }).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn chat_rejects_missing_message() {
    let app = test_app().await;

    let (status, body) = post_json(&app, "/v1/chat", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "empty_message");

    let (status, _) = post_json(&app, "/v1/chat", json!({ "message": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chat_greeting_is_canned() {
    let app = test_app().await;

    let (status, body) = post_json(&app, "/v1/chat", json!({ "message": "hola" })).await;

    assert_eq!(status, StatusCode::OK);
    let reply = body["reply_text"].as_str().unwrap();
    assert!(reply.contains("Hola"));
    assert_eq!(body["place_count"], 0);
}

#[tokio::test]
async fn chat_museum_query_end_to_end() {
    let app = test_app().await;

    let (status, body) =
        post_json(&app, "/v1/chat", json!({ "message": "museos en Roma" })).await;

    assert_eq!(status, StatusCode::OK);
    let reply = body["reply_text"].as_str().unwrap();
    assert!(reply.contains("Lugares culturales en Roma"));
    assert!(reply.contains("Musei Capitolini"));
    assert!(reply.contains("Museo Nazionale Romano"));
    assert_eq!(body["intent"], "culture");
    assert_eq!(body["place_count"], 2);
}

#[tokio::test]
async fn places_requires_both_coordinates() {
    let app = test_app().await;

    let (status, body) = post_json(&app, "/v1/places", json!({ "latitude": 41.9 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing_coordinates");
}

#[tokio::test]
async fn places_returns_nearest_first() {
    let app = test_app().await;

    let (status, body) = post_json(
        &app,
        "/v1/places",
        json!({ "latitude": 41.9028, "longitude": 12.4964 }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["place_count"], 2);
    let places = body["places"].as_array().unwrap();
    assert_eq!(places.len(), 2);
    // Museo Nazionale Romano sits a few hundred meters closer.
    assert_eq!(places[0]["name"], "Museo Nazionale Romano");
    assert!(places[0]["distance_meters"].as_f64().unwrap() <= 2_000.0);
}

#[tokio::test]
async fn geocode_validates_and_maps_not_found() {
    let app = test_app().await;

    let (status, body) = post_json(&app, "/v1/geocode", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing_place_name");

    let (status, body) =
        post_json(&app, "/v1/geocode", json!({ "place_name": "xyzzy" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "location_not_found");
}

#[tokio::test]
async fn geocode_loads_the_surroundings() {
    let app = test_app().await;

    let (status, body) = post_json(&app, "/v1/geocode", json!({ "place_name": "Roma" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["latitude"], 41.9);
    assert_eq!(body["address"], "Roma, Lazio, Italia");
    assert_eq!(body["place_count"], 2);
    assert_eq!(body["places"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn summary_tracks_resolutions_and_resets_on_empty_result() {
    let app = test_app().await;

    let (status, body) = get_json(&app, "/v1/places/summary").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["summary"],
        "No hay lugares almacenados para la ubicación actual."
    );

    let (status, _) = post_json(
        &app,
        "/v1/places",
        json!({ "latitude": 41.9028, "longitude": 12.4964 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = get_json(&app, "/v1/places/summary").await;
    let summary = body["summary"].as_str().unwrap();
    assert!(summary.contains("Total de lugares: 2"));
    assert!(summary.contains("tourism: 2 lugares"));

    // A later resolution with no results must clear the stored places.
    let (status, body) =
        post_json(&app, "/v1/geocode", json!({ "place_name": "desierto" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["place_count"], 0);

    let (_, body) = get_json(&app, "/v1/places/summary").await;
    assert_eq!(
        body["summary"],
        "No hay lugares almacenados para la ubicación actual."
    );
}
