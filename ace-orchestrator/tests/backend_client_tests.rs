//! Backend REST client tests against an in-process fake backend
//! Test File: backend_client_tests.rs

use ace_common::api::{
    GenerationCreate, GenerationStatus, GenerationUpdate, LlmTask, LlmTaskRequest,
};
use ace_orchestrator::services::BackendClient;
use ace_orchestrator::types::{
    AssetCreator, BackendConfigSource, CoverRegenerator, HistorySource, LibraryEditor,
    LlmTaskExecutor, ModelInventorySource,
};
use ace_orchestrator::BackendError;
use axum::{
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

fn record_json(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "title": "Neon Dreams",
        "status": status,
        "model_variant": "turbo",
        "audio_url": format!("/api/generations/{}/audio", id),
        "created_at": "2026-01-01T00:00:00",
        "updated_at": "2026-01-01T00:00:00"
    })
}

async fn llm(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "task": body["task"],
        "output": format!("out:{}", body["seed_prompt"].as_str().unwrap_or_default()),
        "provider": "ace"
    }))
}

async fn create(Json(body): Json<Value>) -> Json<Value> {
    let mut record = record_json("gen-9", "queued");
    record["title"] = body["title"].clone();
    Json(record)
}

async fn history() -> Json<Value> {
    Json(json!([record_json("a1", "ready"), record_json("a2", "whatever")]))
}

async fn models() -> Json<Value> {
    Json(json!([
        {"id": "dit-turbo", "status": "available"},
        {"id": "dit-base", "status": "downloading", "display_name": "Base"}
    ]))
}

async fn config() -> Json<Value> {
    Json(json!({"image_generation_provider": "openai"}))
}

async fn regenerate(Path(id): Path<String>) -> impl IntoResponse {
    match id.as_str() {
        "empty" => (StatusCode::OK, String::new()),
        "status" => (StatusCode::OK, json!({"queued": true}).to_string()),
        "broken" => (StatusCode::INTERNAL_SERVER_ERROR, "provider exploded".to_string()),
        _ => (StatusCode::OK, record_json(&id, "ready").to_string()),
    }
}

async fn update(Path(id): Path<String>, Json(body): Json<Value>) -> impl IntoResponse {
    if id == "missing" {
        return Err(StatusCode::NOT_FOUND);
    }
    let mut record = record_json(&id, "ready");
    record["title"] = body["title"].clone();
    Ok(Json(record))
}

async fn remove(Path(id): Path<String>) -> StatusCode {
    if id == "missing" {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    }
}

async fn audio(Path(id): Path<String>) -> Vec<u8> {
    format!("WAV:{}", id).into_bytes()
}

async fn spawn_backend() -> BackendClient {
    let app = Router::new()
        .route("/api/llm", post(llm))
        .route("/api/generations", post(create))
        .route("/api/history", get(history))
        .route("/api/models", get(models))
        .route("/api/config", get(config))
        .route("/api/generations/:id/cover/regenerate", post(regenerate))
        .route(
            "/api/generations/:id",
            axum::routing::put(update).delete(remove),
        )
        .route("/api/generations/:id/audio", get(audio));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    BackendClient::new(format!("http://{}/", addr)).unwrap()
}

/// TC-CLI-001: LLM task returns the output text
#[tokio::test]
async fn tc_cli_001_llm_task() {
    let client = spawn_backend().await;

    let output = client
        .run_llm_task(LlmTaskRequest::new(LlmTask::Title, "summer rain", false))
        .await
        .unwrap();

    assert_eq!(output, "out:summer rain");
}

/// TC-CLI-002: Create returns the parsed record
#[tokio::test]
async fn tc_cli_002_create_asset() {
    let client = spawn_backend().await;
    let payload = GenerationCreate {
        title: Some("Neon".into()),
        ..Default::default()
    };

    let record = client.create_asset(&payload).await.unwrap();

    assert_eq!(record.id, "gen-9");
    assert_eq!(record.title.as_deref(), Some("Neon"));
    assert_eq!(record.status, GenerationStatus::Queued);
}

/// TC-CLI-003: History keeps unknown statuses verbatim
#[tokio::test]
async fn tc_cli_003_history() {
    let client = spawn_backend().await;

    let history = client.list_history().await.unwrap();

    assert_eq!(history.len(), 2);
    assert!(history[0].status.is_terminal());
    assert_eq!(history[1].status, GenerationStatus::Other("whatever".into()));
}

/// TC-CLI-004: Model inventory and config parse
#[tokio::test]
async fn tc_cli_004_inventory_and_config() {
    let client = spawn_backend().await;

    let inventory = client.list_model_inventory().await.unwrap();
    assert_eq!(inventory.len(), 2);
    assert!(inventory[0].is_available());
    assert!(!inventory[1].is_available());

    let config = client.fetch_config().await.unwrap();
    assert_eq!(config.image_generation_provider, "openai");
    assert_eq!(config.default_model_variant, None);
}

/// TC-CLI-005: Cover regeneration tolerates empty and non-record bodies
#[tokio::test]
async fn tc_cli_005_cover_regeneration_bodies() {
    let client = spawn_backend().await;

    let record = client.regenerate_cover("a1").await.unwrap();
    assert_eq!(record.map(|r| r.id), Some("a1".to_string()));

    assert!(client.regenerate_cover("empty").await.unwrap().is_none());
    assert!(client.regenerate_cover("status").await.unwrap().is_none());

    let err = client.regenerate_cover("broken").await.unwrap_err();
    match err {
        BackendError::Api(status, body) => {
            assert_eq!(status, 500);
            assert_eq!(body, "provider exploded");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

/// TC-CLI-006: Update and delete map 404 to NotFound
#[tokio::test]
async fn tc_cli_006_library_edits() {
    let client = spawn_backend().await;

    let update = GenerationUpdate {
        title: Some("Renamed".into()),
        ..Default::default()
    };
    let record = client.update_generation("a1", &update).await.unwrap();
    assert_eq!(record.title.as_deref(), Some("Renamed"));

    client.delete_generation("a1").await.unwrap();

    assert!(matches!(
        client.update_generation("missing", &update).await,
        Err(BackendError::NotFound(_))
    ));
    assert!(matches!(
        client.delete_generation("missing").await,
        Err(BackendError::NotFound(_))
    ));
}

/// TC-CLI-007: Relative audio URLs resolve against the backend origin
#[tokio::test]
async fn tc_cli_007_fetch_audio_relative_url() {
    let client = spawn_backend().await;

    let bytes = client.fetch_audio("/api/generations/a1/audio").await.unwrap();

    assert_eq!(bytes, b"WAV:a1");
}

/// TC-CLI-008: Unreachable backend is a network error
#[tokio::test]
async fn tc_cli_008_unreachable_backend() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let client = BackendClient::new(format!("http://{}", addr)).unwrap();

    let err = client.list_history().await.unwrap_err();

    assert!(matches!(err, BackendError::Network(_)));
}
