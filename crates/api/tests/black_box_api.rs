use std::sync::{Arc, Mutex};

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::json;

use dialout_auth::{JwtClaims, PrincipalId};
use dialout_core::TenantId;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(jwt_secret: &str) -> Self {
        // Build app (same router as prod), but bind to an ephemeral port.
        let app = dialout_api::app::build_app(jwt_secret.to_string());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(jwt_secret: &str, tenant_id: TenantId) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: PrincipalId::new(),
        tenant_id,
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

/// Stand-in telephony bridge: accepts dispatches and records their payloads.
async fn spawn_bridge(respond_with: StatusCode) -> (String, Arc<Mutex<Vec<serde_json::Value>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let recorded = received.clone();

    let app = axum::Router::new().route(
        "/outbound/call",
        axum::routing::post(move |axum::Json(body): axum::Json<serde_json::Value>| {
            let recorded = recorded.clone();
            async move {
                recorded.lock().unwrap().push(body);
                respond_with
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind bridge port");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), received)
}

/// Point the tenant at a bridge and issue its service token.
async fn configure_tenant(
    client: &reqwest::Client,
    base_url: &str,
    token: &str,
    bridge_url: &str,
) -> String {
    let res = client
        .put(format!("{}/outbound/config", base_url))
        .bearer_auth(token)
        .json(&json!({ "bridgeBaseUrl": bridge_url }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(format!("{}/outbound/service-token", base_url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

/// Poll the list endpoint until the call reaches the wanted status.
async fn wait_for_status(
    client: &reqwest::Client,
    base_url: &str,
    token: &str,
    call_id: &str,
    status: &str,
) -> serde_json::Value {
    for _ in 0..100 {
        let res = client
            .get(format!("{}/outbound/scheduled", base_url))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = res.json().await.unwrap();
        if let Some(call) = body["items"]
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["callId"] == call_id)
        {
            if call["status"] == status {
                return call.clone();
            }
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("call {call_id} never reached status {status}");
}

#[tokio::test]
async fn auth_required_for_tenant_endpoints() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/outbound/scheduled", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Health stays open
    let res = client
        .get(format!("{}/health", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn trigger_rejects_invalid_input_without_persisting() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let token = mint_jwt(jwt_secret, TenantId::new());
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/outbound/trigger", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "targetPhone": "not-a-phone" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(format!("{}/outbound/trigger", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "targetPhone": "+393331234567", "instructionType": "poem" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .get(format!("{}/outbound/scheduled", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn schedule_requires_a_future_timestamp() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let token = mint_jwt(jwt_secret, TenantId::new());
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/outbound/schedule", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "targetPhone": "+393331234567",
            "scheduledAt": (Utc::now() - ChronoDuration::minutes(1)).to_rfc3339(),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let at = Utc::now() + ChronoDuration::hours(1);
    let res = client
        .post(format!("{}/outbound/schedule", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "targetPhone": "+393331234567",
            "scheduledAt": at.to_rfc3339(),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: serde_json::Value = res.json().await.unwrap();
    let call_id = created["callId"].as_str().unwrap();

    let call = wait_for_status(&client, &srv.base_url, &token, call_id, "pending").await;
    assert_eq!(call["attempts"], 0);
}

#[tokio::test]
async fn trigger_dispatches_to_the_bridge() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let (bridge_url, received) = spawn_bridge(StatusCode::OK).await;
    let token = mint_jwt(jwt_secret, TenantId::new());
    let client = reqwest::Client::new();
    configure_tenant(&client, &srv.base_url, &token, &bridge_url).await;

    let res = client
        .post(format!("{}/outbound/trigger", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "targetPhone": "+393331234567",
            "instructionType": "task",
            "callInstruction": "confirm the appointment",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: serde_json::Value = res.json().await.unwrap();
    let call_id = created["callId"].as_str().unwrap();

    let call = wait_for_status(&client, &srv.base_url, &token, call_id, "calling").await;
    assert_eq!(call["attempts"], 1);
    assert_eq!(call["attemptsLog"].as_array().unwrap().len(), 1);

    let requests = received.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["targetPhone"], "+393331234567");
    assert_eq!(requests[0]["callId"], call_id);
    assert_eq!(requests[0]["instructionType"], "task");
}

#[tokio::test]
async fn missing_bridge_config_fails_the_call() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let token = mint_jwt(jwt_secret, TenantId::new());
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/outbound/trigger", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "targetPhone": "+393331234567" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: serde_json::Value = res.json().await.unwrap();
    let call_id = created["callId"].as_str().unwrap();

    // Configuration errors are terminal, not retried
    let call = wait_for_status(&client, &srv.base_url, &token, call_id, "failed").await;
    assert!(call["errorMessage"].as_str().unwrap().contains("bridge URL"));
}

#[tokio::test]
async fn cancel_is_idempotent_and_tenant_scoped() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let tenant = TenantId::new();
    let token = mint_jwt(jwt_secret, tenant);
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/outbound/schedule", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "targetPhone": "+393331234567",
            "scheduledAt": (Utc::now() + ChronoDuration::hours(1)).to_rfc3339(),
        }))
        .send()
        .await
        .unwrap();
    let created: serde_json::Value = res.json().await.unwrap();
    let call_id = created["callId"].as_str().unwrap().to_string();

    // Another tenant cannot see or cancel it
    let other_token = mint_jwt(jwt_secret, TenantId::new());
    let res = client
        .delete(format!("{}/outbound/{}", srv.base_url, call_id))
        .bearer_auth(&other_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let call = wait_for_status(&client, &srv.base_url, &token, &call_id, "pending").await;
    assert_eq!(call["status"], "pending");

    // First cancel flips it, the second reports the same state
    for _ in 0..2 {
        let res = client
            .delete(format!("{}/outbound/{}", srv.base_url, call_id))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["status"], "cancelled");
    }

    let res = client
        .delete(format!("{}/outbound/{}", srv.base_url, uuid::Uuid::now_v7()))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn a_call_in_progress_cannot_be_cancelled() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let (bridge_url, _received) = spawn_bridge(StatusCode::OK).await;
    let token = mint_jwt(jwt_secret, TenantId::new());
    let client = reqwest::Client::new();
    configure_tenant(&client, &srv.base_url, &token, &bridge_url).await;

    let res = client
        .post(format!("{}/outbound/trigger", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "targetPhone": "+393331234567" }))
        .send()
        .await
        .unwrap();
    let created: serde_json::Value = res.json().await.unwrap();
    let call_id = created["callId"].as_str().unwrap().to_string();

    wait_for_status(&client, &srv.base_url, &token, &call_id, "calling").await;

    let res = client
        .delete(format!("{}/outbound/{}", srv.base_url, call_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn retryable_outcome_schedules_a_retry_then_completes() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let (bridge_url, _received) = spawn_bridge(StatusCode::OK).await;
    let token = mint_jwt(jwt_secret, TenantId::new());
    let client = reqwest::Client::new();
    let service_token = configure_tenant(&client, &srv.base_url, &token, &bridge_url).await;

    let res = client
        .post(format!("{}/outbound/trigger", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "targetPhone": "+393331234567" }))
        .send()
        .await
        .unwrap();
    let created: serde_json::Value = res.json().await.unwrap();
    let call_id = created["callId"].as_str().unwrap().to_string();
    wait_for_status(&client, &srv.base_url, &token, &call_id, "calling").await;

    // Nobody picked up; the bridge reports it
    let res = client
        .post(format!("{}/outbound/callback", srv.base_url))
        .bearer_auth(&service_token)
        .json(&json!({ "callId": call_id, "status": "no_answer" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "retry_scheduled");
    assert!(body["nextRetryAt"].is_string());

    let call = wait_for_status(&client, &srv.base_url, &token, &call_id, "retry_scheduled").await;
    assert_eq!(call["retryReason"], "no_answer");
    assert_eq!(call["attempts"], 1);

    // The retried attempt eventually connects
    let res = client
        .post(format!("{}/outbound/callback", srv.base_url))
        .bearer_auth(&service_token)
        .json(&json!({
            "callId": call_id,
            "status": "completed",
            "durationSeconds": 95,
            "hangupCause": "normal_clearing",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let call = wait_for_status(&client, &srv.base_url, &token, &call_id, "completed").await;
    assert_eq!(call["durationSeconds"], 95);
    assert_eq!(call["hangupCause"], "normal_clearing");
}

#[tokio::test]
async fn retries_exhaust_into_failed() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let (bridge_url, _received) = spawn_bridge(StatusCode::OK).await;
    let token = mint_jwt(jwt_secret, TenantId::new());
    let client = reqwest::Client::new();
    let service_token = configure_tenant(&client, &srv.base_url, &token, &bridge_url).await;

    // One attempt only
    let res = client
        .put(format!("{}/outbound/config", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "maxAttempts": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(format!("{}/outbound/trigger", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "targetPhone": "+393331234567" }))
        .send()
        .await
        .unwrap();
    let created: serde_json::Value = res.json().await.unwrap();
    let call_id = created["callId"].as_str().unwrap().to_string();
    wait_for_status(&client, &srv.base_url, &token, &call_id, "calling").await;

    let res = client
        .post(format!("{}/outbound/callback", srv.base_url))
        .bearer_auth(&service_token)
        .json(&json!({ "callId": call_id, "status": "busy" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let call = wait_for_status(&client, &srv.base_url, &token, &call_id, "failed").await;
    assert_eq!(call["retryReason"], "busy");
}

#[tokio::test]
async fn unrecognized_outcome_is_terminal() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let (bridge_url, _received) = spawn_bridge(StatusCode::OK).await;
    let token = mint_jwt(jwt_secret, TenantId::new());
    let client = reqwest::Client::new();
    let service_token = configure_tenant(&client, &srv.base_url, &token, &bridge_url).await;

    let res = client
        .post(format!("{}/outbound/trigger", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "targetPhone": "+393331234567" }))
        .send()
        .await
        .unwrap();
    let created: serde_json::Value = res.json().await.unwrap();
    let call_id = created["callId"].as_str().unwrap().to_string();
    wait_for_status(&client, &srv.base_url, &token, &call_id, "calling").await;

    let res = client
        .post(format!("{}/outbound/callback", srv.base_url))
        .bearer_auth(&service_token)
        .json(&json!({ "callId": call_id, "status": "carrier_glitch_42" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let call = wait_for_status(&client, &srv.base_url, &token, &call_id, "failed").await;
    assert!(
        call["errorMessage"]
            .as_str()
            .unwrap()
            .contains("carrier_glitch_42")
    );
}

#[tokio::test]
async fn callback_rejects_bad_and_revoked_tokens() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let (bridge_url, _received) = spawn_bridge(StatusCode::OK).await;
    let token = mint_jwt(jwt_secret, TenantId::new());
    let client = reqwest::Client::new();
    let first_service_token = configure_tenant(&client, &srv.base_url, &token, &bridge_url).await;

    let res = client
        .post(format!("{}/outbound/trigger", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "targetPhone": "+393331234567" }))
        .send()
        .await
        .unwrap();
    let created: serde_json::Value = res.json().await.unwrap();
    let call_id = created["callId"].as_str().unwrap().to_string();
    wait_for_status(&client, &srv.base_url, &token, &call_id, "calling").await;

    // No token at all
    let res = client
        .post(format!("{}/outbound/callback", srv.base_url))
        .json(&json!({ "callId": call_id, "status": "completed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // A tenant JWT is not a service token
    let res = client
        .post(format!("{}/outbound/callback", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "callId": call_id, "status": "completed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Issuing a new service token revokes the first one
    let res = client
        .post(format!("{}/outbound/service-token", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .post(format!("{}/outbound/callback", srv.base_url))
        .bearer_auth(&first_service_token)
        .json(&json!({ "callId": call_id, "status": "completed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // The record was never touched
    let call = wait_for_status(&client, &srv.base_url, &token, &call_id, "calling").await;
    assert_eq!(call["status"], "calling");
}

#[tokio::test]
async fn callback_cannot_touch_another_tenants_call() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let (bridge_url, _received) = spawn_bridge(StatusCode::OK).await;
    let client = reqwest::Client::new();

    let token_a = mint_jwt(jwt_secret, TenantId::new());
    configure_tenant(&client, &srv.base_url, &token_a, &bridge_url).await;

    let token_b = mint_jwt(jwt_secret, TenantId::new());
    let service_token_b = configure_tenant(&client, &srv.base_url, &token_b, &bridge_url).await;

    let res = client
        .post(format!("{}/outbound/trigger", srv.base_url))
        .bearer_auth(&token_a)
        .json(&json!({ "targetPhone": "+393331234567" }))
        .send()
        .await
        .unwrap();
    let created: serde_json::Value = res.json().await.unwrap();
    let call_id = created["callId"].as_str().unwrap().to_string();
    wait_for_status(&client, &srv.base_url, &token_a, &call_id, "calling").await;

    let res = client
        .post(format!("{}/outbound/callback", srv.base_url))
        .bearer_auth(&service_token_b)
        .json(&json!({ "callId": call_id, "status": "completed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let call = wait_for_status(&client, &srv.base_url, &token_a, &call_id, "calling").await;
    assert_eq!(call["status"], "calling");
}

#[tokio::test]
async fn blocked_callers_are_rejected_until_unblocked() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let token = mint_jwt(jwt_secret, TenantId::new());
    let client = reqwest::Client::new();
    let phone = "+393335550001";

    let res = client
        .post(format!("{}/outbound/block/{}", srv.base_url, phone))
        .bearer_auth(&token)
        .json(&json!({ "reason": "repeated complaints", "hours": 24 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!("{}/outbound/rate-limits/{}", srv.base_url, phone))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let record: serde_json::Value = res.json().await.unwrap();
    assert_eq!(record["isBlocked"], true);
    assert_eq!(record["blockedReason"], "repeated complaints");

    let res = client
        .get(format!("{}/outbound/blocked", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(
        body["items"]
            .as_array()
            .unwrap()
            .iter()
            .any(|r| r["callerId"] == phone)
    );

    let res = client
        .post(format!("{}/outbound/trigger", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "targetPhone": phone }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

    let res = client
        .delete(format!("{}/outbound/block/{}", srv.base_url, phone))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(format!("{}/outbound/trigger", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "targetPhone": phone }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn config_clamps_retry_settings() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let token = mint_jwt(jwt_secret, TenantId::new());
    let client = reqwest::Client::new();

    let res = client
        .put(format!("{}/outbound/config", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "baseIntervalMinutes": 90 }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["baseIntervalMinutes"], 30);

    let res = client
        .put(format!("{}/outbound/config", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "baseIntervalMinutes": 0 }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["baseIntervalMinutes"], 1);
}

#[tokio::test]
async fn config_is_tenant_scoped() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let token_a = mint_jwt(jwt_secret, TenantId::new());
    let token_b = mint_jwt(jwt_secret, TenantId::new());
    let client = reqwest::Client::new();

    let res = client
        .put(format!("{}/outbound/config", srv.base_url))
        .bearer_auth(&token_a)
        .json(&json!({ "maxAttempts": 1, "baseIntervalMinutes": 10 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // An empty update echoes the tenant's effective settings: tenant B must
    // still see the defaults, untouched by tenant A's write.
    let res = client
        .put(format!("{}/outbound/config", srv.base_url))
        .bearer_auth(&token_b)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["baseIntervalMinutes"], 5);
    assert_eq!(body["maxAttempts"], 3);

    // And tenant A's own settings survived tenant B's no-op update.
    let res = client
        .put(format!("{}/outbound/config", srv.base_url))
        .bearer_auth(&token_a)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["baseIntervalMinutes"], 10);
    assert_eq!(body["maxAttempts"], 1);
}
