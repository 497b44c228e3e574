use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Router;

use lead_portal_api::audit::{AuditLogger, AuditSeverity};
use lead_portal_api::config::CrmConfig;
use lead_portal_api::crm::{
    CrmError, CrmExecute, CrmRequest, CrmResponse, DynamicsClient, RetryPolicy,
    StaticTokenProvider,
};

/// Scripted upstream: replays queued (status, body) responses, then 200s.
struct UpstreamState {
    hits: AtomicUsize,
    script: Mutex<VecDeque<(u16, String)>>,
    last_authorization: Mutex<Option<String>>,
}

async fn upstream_handler(
    State(state): State<Arc<UpstreamState>>,
    headers: HeaderMap,
) -> (StatusCode, [(&'static str, &'static str); 1], String) {
    state.hits.fetch_add(1, Ordering::SeqCst);
    *state.last_authorization.lock().unwrap() = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let (status, body) = state
        .script
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or((200, r#"{"value":[]}"#.to_string()));
    (
        StatusCode::from_u16(status).unwrap(),
        [("content-type", "application/json")],
        body,
    )
}

async fn spawn_upstream(script: Vec<(u16, &str)>) -> Result<(String, Arc<UpstreamState>)> {
    let state = Arc::new(UpstreamState {
        hits: AtomicUsize::new(0),
        script: Mutex::new(script.into_iter().map(|(s, b)| (s, b.to_string())).collect()),
        last_authorization: Mutex::new(None),
    });
    let app = Router::new()
        .fallback(axum::routing::any(upstream_handler))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Ok((format!("http://{}", addr), state))
}

fn client(base_url: &str, token: Option<&str>, max_retries: u32) -> DynamicsClient {
    let crm = CrmConfig {
        base_url: base_url.to_string(),
        request_timeout_secs: 5,
        odata_max_version: "4.0".to_string(),
    };
    let retry = RetryPolicy {
        max_retries,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(100),
        backoff_factor: 2.0,
        jitter: false,
    };
    DynamicsClient::new(
        &crm,
        retry,
        Arc::new(StaticTokenProvider(token.map(str::to_string))),
        AuditLogger::new(AuditSeverity::Critical),
    )
    .unwrap()
}

#[tokio::test]
async fn bad_request_is_single_attempt() -> Result<()> {
    let body = r#"{"error":{"code":"0x80040203","message":"Invalid query"}}"#;
    let (base_url, state) = spawn_upstream(vec![(400, body)]).await?;
    let client = client(&base_url, Some("test-token"), 3);

    let result = client.execute(CrmRequest::get("leads")).await;
    match result {
        Err(CrmError::Upstream(parsed)) => {
            assert_eq!(parsed.status_code, 400);
            assert_eq!(parsed.error_code, "0x80040203");
        }
        other => panic!("expected upstream error, got {:?}", other.map(|_| ())),
    }
    assert_eq!(state.hits.load(Ordering::SeqCst), 1, "400 must not retry");
    Ok(())
}

#[tokio::test]
async fn transient_failures_retry_until_success() -> Result<()> {
    let (base_url, state) =
        spawn_upstream(vec![(503, "{}"), (429, "{}")]).await?;
    let client = client(&base_url, Some("test-token"), 3);

    let response = client.execute(CrmRequest::get("leads")).await?;
    assert!(matches!(response, CrmResponse::Json(_)));
    assert_eq!(state.hits.load(Ordering::SeqCst), 3);
    Ok(())
}

#[tokio::test]
async fn exhausted_retries_report_attempts() -> Result<()> {
    let (base_url, state) =
        spawn_upstream(vec![(503, "{}"), (503, "{}"), (503, "{}")]).await?;
    let client = client(&base_url, Some("test-token"), 2);

    let result = client.execute(CrmRequest::get("leads")).await;
    match result {
        Err(CrmError::RetriesExhausted {
            last,
            attempts,
            total_delay_ms,
        }) => {
            assert_eq!(attempts, 3);
            assert_eq!(last.status_code, 503);
            // 10ms + 20ms of backoff before the last attempt
            assert_eq!(total_delay_ms, 30);
        }
        other => panic!("expected exhausted retries, got {:?}", other.map(|_| ())),
    }
    assert_eq!(state.hits.load(Ordering::SeqCst), 3);
    Ok(())
}

#[tokio::test]
async fn missing_token_is_fatal_without_any_request() -> Result<()> {
    let (base_url, state) = spawn_upstream(vec![]).await?;
    let client = client(&base_url, None, 3);

    let result = client.execute(CrmRequest::get("leads")).await;
    assert!(matches!(result, Err(CrmError::MissingToken)));
    assert_eq!(state.hits.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn bearer_token_and_odata_headers_are_sent() -> Result<()> {
    let (base_url, state) = spawn_upstream(vec![]).await?;
    let client = client(&base_url, Some("test-token"), 0);

    client.execute(CrmRequest::get("leads")).await?;
    let auth = state.last_authorization.lock().unwrap().clone();
    assert_eq!(auth.as_deref(), Some("Bearer test-token"));
    Ok(())
}

#[tokio::test]
async fn empty_body_maps_to_no_content() -> Result<()> {
    let (base_url, _) = spawn_upstream(vec![(200, "")]).await?;
    let client = client(&base_url, Some("test-token"), 0);

    let response = client.execute(CrmRequest::get("leads")).await?;
    assert!(matches!(response, CrmResponse::NoContent));
    Ok(())
}
