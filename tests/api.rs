//! Drives a full round over HTTP against an in-memory server.

use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use qr_hunt_back::{
    config::{AppConfig, GeneratorConfig},
    dao::game_store::memory::MemoryGameStore,
    routes,
    services::question_generator::AnthropicGenerator,
    state::AppState,
};

const ADMIN_TOKEN: &str = "integration-admin";

async fn spawn_server() -> String {
    let config = AppConfig {
        rng_seed: Some(11),
        admin_token: Some(ADMIN_TOKEN.into()),
        upload_dir: std::env::temp_dir().join("qr-hunt-back-api-tests"),
        ..AppConfig::default()
    };
    let generator = AnthropicGenerator::new(GeneratorConfig::default()).unwrap();
    let state = AppState::new(config, Arc::new(generator));
    state
        .install_game_store(Arc::new(MemoryGameStore::new()))
        .await;
    state.hydrate().await.unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, routes::router(state).into_make_service())
            .await
            .unwrap();
    });
    format!("http://{addr}")
}

fn as_host(request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    request
        .header("X-Host-Login", "host1")
        .header("X-Host-Password", "password1")
}

fn as_admin_host(request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    request
        .header("X-Admin-Token", ADMIN_TOKEN)
        .header("X-Event-Id", "1")
}

#[tokio::test]
async fn round_from_codes_to_leaderboard() {
    let base = spawn_server().await;
    let client = Client::new();

    let health: Value = client
        .get(format!("{base}/healthcheck"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");

    // plain hosts cannot manage codes
    let response = as_host(client.post(format!("{base}/api/host/qrcodes/generate")))
        .json(&json!({ "red": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let listing: Value = as_admin_host(client.post(format!("{base}/api/host/qrcodes/generate")))
        .json(&json!({ "red": 2, "green": 1 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["counts"]["red"], 2);

    let state: Value = as_host(client.post(format!("{base}/api/host/start_game")))
        .json(&json!({ "minutes": 10 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(state["game_active"], true);
    assert_eq!(state["game_status"], "active");

    let response = client
        .post(format!("{base}/api/player/register"))
        .json(&json!({ "name": "Ala", "event_id": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let player: Value = response.json().await.unwrap();
    let player_id = player["id"].as_str().unwrap().to_owned();

    let scan = |code: &'static str| {
        client
            .post(format!("{base}/api/player/scan_qr"))
            .json(&json!({ "player_id": player_id, "event_id": 1, "qr_code": code }))
            .send()
    };

    let response = scan("red1").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "info");
    let score = body["score"].as_i64().unwrap();
    assert!(score > 0);

    assert_eq!(scan("red1").await.unwrap().status(), StatusCode::CONFLICT);
    assert_eq!(scan("nope").await.unwrap().status(), StatusCode::NOT_FOUND);

    let leaderboard: Value = client
        .get(format!("{base}/api/leaderboard/1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(leaderboard[0]["name"], "Ala");
    assert_eq!(leaderboard[0]["score"], score);

    let response = as_host(client.post(format!("{base}/api/host/stop_game")))
        .json(&json!({ "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_players_are_told_to_clear_storage() {
    let base = spawn_server().await;
    let client = Client::new();

    let response = client
        .post(format!("{base}/api/player/scan_qr"))
        .json(&json!({
            "player_id": "8a3c1f1e-1111-4f5e-9d1b-2f6a7c9b0e11",
            "event_id": 1,
            "qr_code": "white"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["clear_storage"], true);
}

#[tokio::test]
async fn admin_routes_require_the_token() {
    let base = spawn_server().await;
    let client = Client::new();

    let response = client
        .get(format!("{base}/api/admin/events"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let events: Value = client
        .get(format!("{base}/api/admin/events"))
        .header("X-Admin-Token", ADMIN_TOKEN)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(events.as_array().map(Vec::len), Some(1));

    // host credentials do not open admin routes
    let response = as_host(client.get(format!("{base}/api/admin/events")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
