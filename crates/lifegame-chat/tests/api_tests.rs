//! Integration tests for the chat API endpoints.
//!
//! Tests drive the Axum `Router` directly via `tower::ServiceExt` without
//! starting a TCP server.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use lifegame_chat::{AppState, ChatBot, build_router};
use lifegame_runner::{PromptEngine, ScriptedCompletion};
use lifegame_store::PlayerStore;
use serde_json::{Value, json};
use tower::ServiceExt;

struct Harness {
    _dir: tempfile::TempDir,
    completion: Arc<ScriptedCompletion>,
    state: Arc<AppState<ScriptedCompletion>>,
}

impl Harness {
    fn router(&self) -> Router {
        build_router(Arc::clone(&self.state))
    }
}

async fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(PlayerStore::open(dir.path()).await.unwrap());
    let completion = Arc::new(ScriptedCompletion::default());
    let prompts = Arc::new(PromptEngine::builtin().unwrap());
    let (bot, _worker) = ChatBot::start(Arc::clone(&completion), prompts, store);
    Harness {
        _dir: dir,
        completion,
        state: Arc::new(AppState::new(Arc::new(bot))),
    }
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_index_reports_status() {
    let h = harness().await;
    let response = h.router().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("0 pending transfers"));
}

#[tokio::test]
async fn test_start_command() {
    let h = harness().await;
    let response = h
        .router()
        .oneshot(post(
            "/api/messages",
            &json!({"player_id": 7, "text": "/start", "display_name": "Ann", "handle": "ann"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    let text = json["messages"][0]["text"].as_str().unwrap();
    assert!(text.contains("Hi, Ann!"));
    assert!(json["messages"][0].get("buttons").is_none());
}

#[tokio::test]
async fn test_action_round_trip() {
    let h = harness().await;
    h.completion
        .push_reply("You find a coin. <balance=1001><inventory:coin=1>")
        .await;

    let response = h
        .router()
        .oneshot(post("/api/messages", &json!({"player_id": 7, "text": "look under the bench"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert!(json["messages"][0]["text"].as_str().unwrap().contains("queue"));
    let outcome = json["messages"][1]["text"].as_str().unwrap();
    assert!(outcome.starts_with("📊 You find a coin."));
    assert!(outcome.contains("📦 coin: +1 (total: 1)"));

    let top = h.router().oneshot(get("/api/top")).await.unwrap();
    let json = body_to_json(top.into_body()).await;
    assert_eq!(json["players"][0]["id"], 7);
    assert_eq!(json["players"][0]["balance"], 1001);
    assert_eq!(json["players"][0]["rank"], 1);
}

#[tokio::test]
async fn test_transfer_through_inbox_and_callback() {
    let h = harness().await;
    h.router()
        .oneshot(post("/api/messages", &json!({"player_id": 2, "text": "/start"})))
        .await
        .unwrap();

    h.completion
        .push_reply("<money=250>\n<items=>\n<receiver_id=2>\n<message=>")
        .await;
    h.completion.push_reply("<valid=true>\n<reason=fine>").await;
    let response = h
        .router()
        .oneshot(post("/api/messages", &json!({"player_id": 1, "text": "transfer 250$ to 2"})))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["messages"][0]["text"], "✅ Transfer request sent!");

    let inbox = h.router().oneshot(get("/api/players/2/inbox")).await.unwrap();
    let json = body_to_json(inbox.into_body()).await;
    assert_eq!(json["player_id"], 2);
    let accept = json["messages"][0]["buttons"][0]["data"].as_str().unwrap().to_owned();
    let reject = json["messages"][0]["buttons"][1]["data"].as_str().unwrap().to_owned();
    assert!(reject.starts_with("reject_"));

    let empty = h.router().oneshot(get("/api/players/2/inbox")).await.unwrap();
    let json = body_to_json(empty.into_body()).await;
    assert_eq!(json["messages"], json!([]));

    let response = h
        .router()
        .oneshot(post("/api/callbacks", &json!({"player_id": 2, "data": accept})))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["messages"][0]["text"], "✅ Transfer accepted!");

    let sender_inbox = h.router().oneshot(get("/api/players/1/inbox")).await.unwrap();
    let json = body_to_json(sender_inbox.into_body()).await;
    assert!(json["messages"][0]["text"].as_str().unwrap().contains("250$"));

    let top = h.router().oneshot(get("/api/top")).await.unwrap();
    let json = body_to_json(top.into_body()).await;
    assert_eq!(json["players"][0]["balance"], 1250);
    assert_eq!(json["players"][1]["balance"], 750);
}

#[tokio::test]
async fn test_empty_message_is_bad_request() {
    let h = harness().await;
    let response = h
        .router()
        .oneshot(post("/api/messages", &json!({"player_id": 1, "text": "   "})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 400);
    assert!(json["error"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn test_unknown_callback_is_bad_request() {
    let h = harness().await;
    let response = h
        .router()
        .oneshot(post("/api/callbacks", &json!({"player_id": 1, "data": "noop"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_top_with_no_players() {
    let h = harness().await;
    let response = h.router().oneshot(get("/api/top")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["players"], json!([]));
}
