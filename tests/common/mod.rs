#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use lead_portal_api::audit::{AuditEvent, AuditLogger, AuditSeverity, AuditSink};
use lead_portal_api::config::QueryConfig;
use lead_portal_api::crm::{CrmError, CrmExecute, CrmRequest, CrmResponse};
use lead_portal_api::identity::{GroupMapping, GroupType, Initiative, InitiativeDirectory};
use lead_portal_api::types::SecurityContext;

pub const OREGON_GUID: &str = "3f2a1b4c-5d6e-4f70-8a91-b2c3d4e5f601";
pub const ARKANSAS_GUID: &str = "7c8d9e0f-1a2b-4c3d-9e5f-a6b7c8d9e002";

pub fn directory() -> Arc<InitiativeDirectory> {
    let initiatives = vec![
        Initiative {
            id: "ec-oregon".into(),
            crm_tenant_guid: OREGON_GUID.into(),
            display_name: "Every Child Oregon".into(),
            enabled: true,
        },
        Initiative {
            id: "ec-arkansas".into(),
            crm_tenant_guid: ARKANSAS_GUID.into(),
            display_name: "Every Child Arkansas".into(),
            enabled: true,
        },
    ];
    let mappings = vec![
        GroupMapping {
            group_id: "5e6f7a8b-9c0d-4e1f-a2b3-c4d5e6f7a801".into(),
            initiative: "ec-oregon".into(),
            role: None,
            group_type: GroupType::AllUsers,
        },
        GroupMapping {
            group_id: "2c3d4e5f-6a7b-4c8d-9e0f-a1b2c3d4e503".into(),
            initiative: "ec-arkansas".into(),
            role: None,
            group_type: GroupType::Standard,
        },
    ];
    Arc::new(InitiativeDirectory::build(initiatives, mappings).unwrap())
}

pub fn query_config() -> QueryConfig {
    QueryConfig {
        default_page_size: 25,
        max_page_size: 100,
    }
}

pub fn oregon_ctx() -> SecurityContext {
    SecurityContext {
        initiative: "ec-oregon".into(),
        organization_id: Some("org-1".into()),
        organization_lead_type: Some("100,200".into()),
        user_id: Some("user-1".into()),
    }
}

/// Captures every emitted audit event for assertions.
pub struct CapturingSink(pub Mutex<Vec<AuditEvent>>);

impl AuditSink for CapturingSink {
    fn emit(&self, event: &AuditEvent) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.0.lock().unwrap().push(event.clone());
        Ok(())
    }
}

pub fn capturing_audit() -> (AuditLogger, Arc<CapturingSink>) {
    let sink = Arc::new(CapturingSink(Mutex::new(vec![])));
    let logger = AuditLogger::new(AuditSeverity::Info).with_sink(sink.clone());
    (logger, sink)
}

/// Scripted in-process CRM transport. Records every request and replays
/// queued responses in order; an empty queue answers with an empty
/// collection.
pub struct MockCrm {
    pub requests: Arc<Mutex<Vec<CrmRequest>>>,
    responses: Mutex<VecDeque<Result<CrmResponse, CrmError>>>,
}

impl MockCrm {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(Mutex::new(vec![])),
            responses: Mutex::new(VecDeque::new()),
        }
    }

    pub fn respond_json(self, payload: Value) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(CrmResponse::Json(payload)));
        self
    }

    pub fn respond_error(self, error: CrmError) -> Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn query_value(&self, index: usize, key: &str) -> Option<String> {
        self.requests.lock().unwrap().get(index).and_then(|r| {
            r.query
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        })
    }
}

#[async_trait]
impl CrmExecute for MockCrm {
    async fn execute(&self, request: CrmRequest) -> Result<CrmResponse, CrmError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(CrmResponse::Json(serde_json::json!({ "value": [] }))))
    }
}
