// ABOUTME: Integration tests for the encrypted streaming relay route
// ABOUTME: Covers framing, the empty-prompt notice, sidecars, and error frames

mod common;
mod helpers;

use common::{
    create_test_database, create_test_resources, delta_chunk, encrypted_body, final_chunk,
    gateway_app, standard_script, test_config, ScriptedProvider, ScriptedStep, ALLOWED_REFERER,
    TEST_SECRET,
};
use helpers::axum_test::AxumTestRequest;
use std::sync::Arc;

const EMPTY_PROMPT_NOTICE: &str = "请输入您的会话内容";

fn relay_request(prompt: &str) -> serde_json::Value {
    serde_json::json!({
        "prompt": prompt,
        "options": {},
        "device": "web",
        "username": "alice",
    })
}

async fn send_chat(
    app: axum::Router,
    resources: &chat_gateway::resources::ServerResources,
    prompt: &str,
) -> helpers::axum_test::AxumTestResponse {
    AxumTestRequest::post("/chat-process")
        .header("referer", ALLOWED_REFERER)
        .header("authorization", &format!("Bearer {TEST_SECRET}"))
        .json(&encrypted_body(resources, &relay_request(prompt)))
        .send(app)
        .await
}

#[tokio::test]
async fn test_stream_is_newline_delimited_json() {
    let provider = Arc::new(ScriptedProvider::new(standard_script()));
    let resources = create_test_resources(test_config(), provider, None).await;
    let app = gateway_app(resources.clone());

    let response = send_chat(app, &resources, "Hello").await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.content_type(), Some("application/octet-stream"));

    let body = response.text();
    assert_eq!(
        body,
        "{\"text\":\"Hi\"}\n{\"text\":\"Hi there\",\"id\":\"c1\",\"detail\":{\"choices\":[{\"finish_reason\":\"stop\"}]}}"
    );
}

#[tokio::test]
async fn test_every_frame_after_split_is_parseable() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        delta_chunk("a"),
        delta_chunk("ab"),
        delta_chunk("abc"),
        final_chunk("abcd", "c9", "stop"),
    ]));
    let resources = create_test_resources(test_config(), provider, None).await;
    let app = gateway_app(resources.clone());

    let body = send_chat(app, &resources, "Hello").await.text();
    let frames: Vec<&str> = body.split('\n').collect();
    assert_eq!(frames.len(), 4);
    for frame in frames {
        let parsed: serde_json::Value = serde_json::from_str(frame).unwrap();
        assert!(parsed["text"].is_string());
    }
}

#[tokio::test]
async fn test_empty_prompt_returns_fixed_notice() {
    let provider = Arc::new(ScriptedProvider::new(standard_script()));
    let resources = create_test_resources(test_config(), provider, None).await;
    let app = gateway_app(resources.clone());

    let response = send_chat(app, &resources, "   \n\t  ").await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.text(), EMPTY_PROMPT_NOTICE);
}

#[tokio::test]
async fn test_malformed_ciphertext_is_rejected() {
    let provider = Arc::new(ScriptedProvider::new(standard_script()));
    let resources = create_test_resources(test_config(), provider, None).await;
    let app = gateway_app(resources);

    let response = AxumTestRequest::post("/chat-process")
        .header("referer", ALLOWED_REFERER)
        .header("authorization", &format!("Bearer {TEST_SECRET}"))
        .json(&serde_json::json!({"queryData": "not-valid-ciphertext!!!"}))
        .send(app)
        .await;

    assert_eq!(response.status(), 400);
    let json: serde_json::Value = response.json();
    assert_eq!(json["error"]["code"], "INVALID_PAYLOAD");
}

#[tokio::test]
async fn test_exchange_record_is_inserted_and_completed() {
    let database = create_test_database().await;
    let provider = Arc::new(ScriptedProvider::new(standard_script()));
    let resources = create_test_resources(test_config(), provider, Some(database.clone())).await;
    let app = gateway_app(resources.clone());

    // Reading the body to completion waits for finalization.
    let _ = send_chat(app, &resources, "Hello").await.text();

    let store = database.exchanges();
    assert_eq!(store.count_exchanges().await.unwrap(), 1);
    let record = store.get_exchange(1).await.unwrap().unwrap();
    assert_eq!(record.prompt, "Hello");
    assert_eq!(record.device, "web");
    assert_eq!(record.username, "alice");
    assert_eq!(record.conversation.as_deref(), Some("Hi there"));
    assert_eq!(record.conversation_id.as_deref(), Some("c1"));
    assert_eq!(record.finish_reason.as_deref(), Some("stop"));
}

#[tokio::test]
async fn test_prompt_is_trimmed_before_persistence() {
    let database = create_test_database().await;
    let provider = Arc::new(ScriptedProvider::new(standard_script()));
    let resources = create_test_resources(test_config(), provider, Some(database.clone())).await;
    let app = gateway_app(resources.clone());

    let _ = send_chat(app, &resources, "  Hello  ").await.text();

    let record = database.exchanges().get_exchange(1).await.unwrap().unwrap();
    assert_eq!(record.prompt, "Hello");
}

#[tokio::test]
async fn test_empty_prompt_skips_persistence() {
    let database = create_test_database().await;
    let provider = Arc::new(ScriptedProvider::new(standard_script()));
    let resources = create_test_resources(test_config(), provider, Some(database.clone())).await;
    let app = gateway_app(resources.clone());

    let _ = send_chat(app, &resources, "").await.text();

    assert_eq!(database.exchanges().count_exchanges().await.unwrap(), 0);
}

#[tokio::test]
async fn test_insert_failure_leaves_stream_intact() {
    let path = std::env::temp_dir().join(format!(
        "chat-gateway-relay-test-{}.db",
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);
    let url = format!("sqlite://{}?mode=rwc", path.display());

    let database = chat_gateway::database::Database::connect(&url).await.unwrap();
    let provider = Arc::new(ScriptedProvider::new(standard_script()));
    let resources = create_test_resources(test_config(), provider, Some(database)).await;

    // Break the persistence sidecar out from under the relay.
    let pool = sqlx::SqlitePool::connect(&url).await.unwrap();
    sqlx::query("DROP TABLE chat_exchanges")
        .execute(&pool)
        .await
        .unwrap();

    let response = send_chat(gateway_app(resources.clone()), &resources, "Hello").await;
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.text(),
        "{\"text\":\"Hi\"}\n{\"text\":\"Hi there\",\"id\":\"c1\",\"detail\":{\"choices\":[{\"finish_reason\":\"stop\"}]}}"
    );

    pool.close().await;
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_stream_unaffected_without_database() {
    let provider = Arc::new(ScriptedProvider::new(standard_script()));
    let resources = create_test_resources(test_config(), provider, None).await;
    let app = gateway_app(resources.clone());

    let response = send_chat(app, &resources, "Hello").await;
    assert_eq!(response.status(), 200);
    assert!(response.text().contains("Hi there"));
}

#[tokio::test]
async fn test_upstream_start_failure_yields_error_frame() {
    let provider = Arc::new(ScriptedProvider::failing("connection refused"));
    let resources = create_test_resources(test_config(), provider, None).await;
    let app = gateway_app(resources.clone());

    let response = send_chat(app, &resources, "Hello").await;
    // Status is committed before the upstream call; failure is in-band.
    assert_eq!(response.status(), 200);
    let json: serde_json::Value = response.json();
    assert_eq!(json["error"]["code"], "EXTERNAL_SERVICE_ERROR");
}

#[tokio::test]
async fn test_mid_stream_failure_preserves_delivered_frames() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        delta_chunk("Hi"),
        ScriptedStep::Error("upstream reset".into()),
    ]));
    let resources = create_test_resources(test_config(), provider, None).await;
    let app = gateway_app(resources.clone());

    let body = send_chat(app, &resources, "Hello").await.text();
    let frames: Vec<&str> = body.split('\n').collect();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0], "{\"text\":\"Hi\"}");
    let error: serde_json::Value = serde_json::from_str(frames[1]).unwrap();
    assert_eq!(error["error"]["code"], "EXTERNAL_SERVICE_ERROR");
}

#[tokio::test]
async fn test_mid_stream_failure_persists_partial_conversation() {
    let database = create_test_database().await;
    let provider = Arc::new(ScriptedProvider::new(vec![
        delta_chunk("Hi"),
        ScriptedStep::Error("upstream reset".into()),
    ]));
    let resources = create_test_resources(test_config(), provider, Some(database.clone())).await;
    let app = gateway_app(resources.clone());

    let _ = send_chat(app, &resources, "Hello").await.text();

    let record = database.exchanges().get_exchange(1).await.unwrap().unwrap();
    assert_eq!(record.conversation.as_deref(), Some("Hi"));
    assert!(record.finish_reason.is_none());
}

#[tokio::test]
async fn test_relay_requires_bearer_token() {
    let provider = Arc::new(ScriptedProvider::new(standard_script()));
    let resources = create_test_resources(test_config(), provider, None).await;
    let app = gateway_app(resources.clone());

    let response = AxumTestRequest::post("/chat-process")
        .header("referer", ALLOWED_REFERER)
        .json(&encrypted_body(&resources, &relay_request("Hello")))
        .send(app)
        .await;

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_relay_rate_limit_rejects_over_ceiling() {
    let mut config = test_config();
    config.security.rate_limit.max_requests_per_hour = 1;
    let provider = Arc::new(ScriptedProvider::new(standard_script()));
    let resources = create_test_resources(config, provider, None).await;

    let first = send_chat(gateway_app(resources.clone()), &resources, "Hello").await;
    assert_eq!(first.status(), 200);

    let second = send_chat(gateway_app(resources.clone()), &resources, "Hello").await;
    assert_eq!(second.status(), 429);
}

#[tokio::test]
async fn test_relay_reachable_under_api_prefix() {
    let provider = Arc::new(ScriptedProvider::new(standard_script()));
    let resources = create_test_resources(test_config(), provider, None).await;
    let app = gateway_app(resources.clone());

    let response = AxumTestRequest::post("/api/chat-process")
        .header("referer", ALLOWED_REFERER)
        .header("authorization", &format!("Bearer {TEST_SECRET}"))
        .json(&encrypted_body(&resources, &relay_request("Hello")))
        .send(app)
        .await;

    assert_eq!(response.status(), 200);
    assert!(response.text().contains("Hi there"));
}
