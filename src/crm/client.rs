//! Resilient HTTP client for the Dynamics Web API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde_json::{json, Value};

use crate::audit::{AuditEvent, AuditEventType, AuditLogger, AuditResult};
use crate::config::CrmConfig;

use super::error::{CrmError, ParsedError};
use super::retry::RetryPolicy;
use super::token::TokenProvider;

/// One upstream request. Paths are relative to the configured Web API base,
/// e.g. `leads` or `leads(<guid>)`.
#[derive(Debug, Clone)]
pub struct CrmRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl CrmRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: vec![],
            body: None,
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }
}

#[derive(Debug, Clone)]
pub enum CrmResponse {
    /// 204 or empty body.
    NoContent,
    Json(Value),
    Text(String),
}

/// Transport seam between the orchestration layer and the wire. The lead
/// service is generic over this so its fail-secure paths are testable
/// without a network.
#[async_trait]
pub trait CrmExecute: Send + Sync {
    async fn execute(&self, request: CrmRequest) -> Result<CrmResponse, CrmError>;
}

#[async_trait]
impl<T: CrmExecute + ?Sized> CrmExecute for Arc<T> {
    async fn execute(&self, request: CrmRequest) -> Result<CrmResponse, CrmError> {
        (**self).execute(request).await
    }
}

pub struct DynamicsClient {
    http: reqwest::Client,
    base_url: String,
    odata_max_version: String,
    retry: RetryPolicy,
    tokens: Arc<dyn TokenProvider>,
    audit: AuditLogger,
}

impl DynamicsClient {
    pub fn new(
        crm: &CrmConfig,
        retry: RetryPolicy,
        tokens: Arc<dyn TokenProvider>,
        audit: AuditLogger,
    ) -> Result<Self, CrmError> {
        if crm.base_url.is_empty() {
            return Err(CrmError::Configuration("CRM base URL is not set".to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(crm.request_timeout_secs))
            .build()
            .map_err(|e| CrmError::Configuration(e.to_string()))?;
        Ok(Self {
            http,
            base_url: crm.base_url.trim_end_matches('/').to_string(),
            odata_max_version: crm.odata_max_version.clone(),
            retry,
            tokens,
            audit,
        })
    }

    async fn send_once(&self, request: &CrmRequest, token: &str) -> Result<CrmResponse, ParsedError> {
        let url = format!("{}/{}", self.base_url, request.path);
        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .header(ACCEPT, "application/json")
            .header("OData-MaxVersion", &self.odata_max_version)
            .header("OData-Version", &self.odata_max_version)
            .header("Prefer", "odata.include-annotations=\"*\"");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                // Request timeout: the in-flight call is cancelled and the
                // failure classified as a retryable network error. Dropping
                // the surrounding future (caller deadline) aborts the whole
                // loop instead.
                ParsedError::timeout(e.to_string())
            } else {
                ParsedError::network(e.to_string())
            }
        })?;

        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("application/json"))
            .unwrap_or(false);
        let body = response
            .text()
            .await
            .map_err(|e| ParsedError::network(e.to_string()))?;

        if !status.is_success() {
            return Err(ParsedError::from_response(status.as_u16(), &body));
        }
        if status.as_u16() == 204 || body.is_empty() {
            return Ok(CrmResponse::NoContent);
        }
        if is_json {
            let value = serde_json::from_str(&body)
                .map_err(|e| ParsedError::network(format!("malformed JSON body: {}", e)))?;
            return Ok(CrmResponse::Json(value));
        }
        Ok(CrmResponse::Text(body))
    }

    fn audit_terminal_failure(&self, request: &CrmRequest, error: &ParsedError, attempts: u32) {
        self.audit.log(
            AuditEvent::new(AuditEventType::QueryFailed, AuditResult::Failure)
                .with_resource(&request.path)
                .with_details(json!({
                    "status": error.status_code,
                    "errorCode": error.error_code,
                    "message": error.sanitized_message(),
                    "attempts": attempts,
                })),
        );
    }
}

#[async_trait]
impl CrmExecute for DynamicsClient {
    async fn execute(&self, request: CrmRequest) -> Result<CrmResponse, CrmError> {
        // A missing token is a configuration failure; retrying cannot help.
        let token = self
            .tokens
            .access_token()
            .await
            .ok_or(CrmError::MissingToken)?;

        let mut total_delay_ms: u64 = 0;
        let max_attempts = self.retry.max_retries + 1;

        for attempt in 1..=max_attempts {
            match self.send_once(&request, &token).await {
                Ok(response) => return Ok(response),
                Err(parsed) if !parsed.is_retryable => {
                    self.audit_terminal_failure(&request, &parsed, attempt);
                    return Err(CrmError::Upstream(parsed));
                }
                Err(parsed) => {
                    if attempt == max_attempts {
                        self.audit_terminal_failure(&request, &parsed, attempt);
                        return Err(CrmError::RetriesExhausted {
                            last: parsed,
                            attempts: attempt,
                            total_delay_ms,
                        });
                    }
                    let delay = self.retry.delay_for(attempt);
                    total_delay_ms += delay.as_millis() as u64;
                    tracing::warn!(
                        path = %request.path,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        status = parsed.status_code,
                        "transient CRM failure, backing off"
                    );
                    // Suspends only this request's task, not the process.
                    tokio::time::sleep(delay).await;
                }
            }
        }
        unreachable!("retry loop always returns")
    }
}
