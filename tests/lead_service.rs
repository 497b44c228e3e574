mod common;

use std::sync::Arc;

use anyhow::Result;
use serde_json::json;

use lead_portal_api::audit::AuditEventType;
use lead_portal_api::crm::{CrmError, ParsedError};
use lead_portal_api::services::{LeadQueryService, LeadStatus};
use lead_portal_api::types::{LeadFilters, PageOptions, SecurityContext, SortDirection};

use common::{capturing_audit, directory, oregon_ctx, query_config, MockCrm, ARKANSAS_GUID, OREGON_GUID};

fn service(mock: MockCrm) -> (LeadQueryService<Arc<MockCrm>>, Arc<MockCrm>, Arc<common::CapturingSink>) {
    let mock = Arc::new(mock);
    let (audit, sink) = capturing_audit();
    let service = LeadQueryService::new(mock.clone(), directory(), audit, query_config());
    (service, mock, sink)
}

fn lead_record(id: &str, name: &str, tenant_guid: &str) -> serde_json::Value {
    json!({
        "leadid": id,
        "fullname": name,
        "emailaddress1": format!("{}@example.com", id),
        "statuscode": 1,
        "leadsourcecode": 8,
        "createdon": "2025-06-01T12:00:00Z",
        "_ec_initiative_value": tenant_guid,
        "_ec_fosterorganization_value": "org-1"
    })
}

#[tokio::test]
async fn missing_org_returns_empty_without_http() -> Result<()> {
    let (service, mock, sink) = service(MockCrm::new());
    let ctx = SecurityContext {
        organization_id: None,
        ..oregon_ctx()
    };

    let result = service
        .get_leads(&ctx, &LeadFilters::default(), &PageOptions::default())
        .await?;

    assert!(result.items.is_empty());
    assert_eq!(result.total_count, 0);
    assert_eq!(mock.request_count(), 0, "no HTTP call may be issued");

    let events = sink.0.lock().unwrap();
    assert!(events
        .iter()
        .any(|e| e.event_type == AuditEventType::MissingOrgContext));
    Ok(())
}

#[tokio::test]
async fn invalid_org_type_returns_empty_without_http() -> Result<()> {
    let (service, mock, sink) = service(MockCrm::new());
    let ctx = SecurityContext {
        organization_lead_type: Some("100,abc".into()),
        ..oregon_ctx()
    };

    let result = service
        .get_leads(&ctx, &LeadFilters::default(), &PageOptions::default())
        .await?;

    assert!(result.items.is_empty());
    assert_eq!(mock.request_count(), 0);

    let events = sink.0.lock().unwrap();
    assert!(events
        .iter()
        .any(|e| e.event_type == AuditEventType::InvalidOrgType));
    Ok(())
}

#[tokio::test]
async fn get_leads_maps_records_and_pagination() -> Result<()> {
    let payload = json!({
        "value": [
            lead_record("d0000000-0000-0000-0000-000000000001", "Jordan Fox", OREGON_GUID),
            lead_record("d0000000-0000-0000-0000-000000000002", "Casey Reed",
                        "99999999-9999-9999-9999-999999999999"),
        ],
        "@odata.count": 42,
        "@odata.nextLink": "https://org.crm.dynamics.com/api/data/v9.2/leads?$skip=50"
    });
    let (service, mock, sink) = service(MockCrm::new().respond_json(payload));

    let result = service
        .get_leads(&oregon_ctx(), &LeadFilters::default(), &PageOptions::default())
        .await?;

    assert_eq!(result.items.len(), 2);
    assert_eq!(result.total_count, 42);
    assert_eq!(result.next_page_token.as_deref(), Some("50"));
    assert_eq!(result.items[0].initiative, "ec-oregon");
    assert_eq!(result.items[0].status, LeadStatus::New);
    // One bad record does not abort the page; its initiative is empty and a
    // warning event is recorded.
    assert_eq!(result.items[1].initiative, "");

    let events = sink.0.lock().unwrap();
    assert!(events
        .iter()
        .any(|e| e.event_type == AuditEventType::InitiativeMappingFailed));
    assert!(events
        .iter()
        .any(|e| e.event_type == AuditEventType::QueryExecuted));

    // The query carries the mandatory scoping and pagination parameters.
    let filter = mock.query_value(0, "$filter").unwrap();
    assert!(filter.contains("statecode eq 0"));
    assert!(filter.contains(&format!("_ec_initiative_value eq '{}'", OREGON_GUID)));
    assert!(filter.contains(
        "(_ec_fosterorganization_value eq 'org-1') or (ec_lead_volunteerorg/any(o:o/accountid eq 'org-1'))"
    ));
    assert_eq!(mock.query_value(0, "$count").as_deref(), Some("true"));
    assert_eq!(mock.query_value(0, "$top").as_deref(), Some("25"));
    Ok(())
}

#[tokio::test]
async fn page_size_is_clamped_and_sort_allow_listed() -> Result<()> {
    let (service, mock, sink) = service(MockCrm::new());
    let page = PageOptions {
        page_size: Some(10_000),
        skip: Some(100),
        sort_by: Some("name".into()),
        sort_direction: Some(SortDirection::Asc),
    };

    service
        .get_leads(&oregon_ctx(), &LeadFilters::default(), &page)
        .await?;

    assert_eq!(mock.query_value(0, "$top").as_deref(), Some("100"));
    assert_eq!(mock.query_value(0, "$skip").as_deref(), Some("100"));
    assert_eq!(mock.query_value(0, "$orderby").as_deref(), Some("fullname asc"));

    // Unknown sort fields fall back to the default with a warning event.
    let page = PageOptions {
        sort_by: Some("dangerous eq 'field'".into()),
        ..Default::default()
    };
    service
        .get_leads(&oregon_ctx(), &LeadFilters::default(), &page)
        .await?;
    assert_eq!(mock.query_value(1, "$orderby").as_deref(), Some("createdon desc"));

    let events = sink.0.lock().unwrap();
    assert!(events
        .iter()
        .any(|e| e.event_type == AuditEventType::InvalidSortField));
    Ok(())
}

#[tokio::test]
async fn negative_skip_is_clamped_to_zero() -> Result<()> {
    let (service, mock, _) = service(MockCrm::new());
    let page = PageOptions {
        skip: Some(-5),
        ..Default::default()
    };

    service
        .get_leads(&oregon_ctx(), &LeadFilters::default(), &page)
        .await?;

    assert_eq!(mock.query_value(0, "$skip").as_deref(), Some("0"));
    Ok(())
}

#[tokio::test]
async fn search_reaches_filter_escaped() -> Result<()> {
    let (service, mock, _) = service(MockCrm::new());
    let filters = LeadFilters {
        search: Some("O'Brien".into()),
    };

    service
        .get_leads(&oregon_ctx(), &filters, &PageOptions::default())
        .await?;

    let filter = mock.query_value(0, "$filter").unwrap();
    assert!(filter.contains("contains(fullname,'O''Brien')"));
    Ok(())
}

#[tokio::test]
async fn get_lead_by_id_returns_matching_record() -> Result<()> {
    let id = "d0000000-0000-0000-0000-000000000001";
    let (service, mock, _) =
        service(MockCrm::new().respond_json(lead_record(id, "Jordan Fox", OREGON_GUID)));

    let lead = service.get_lead_by_id(&oregon_ctx(), id).await?.unwrap();
    assert_eq!(lead.id, id);
    assert_eq!(lead.initiative, "ec-oregon");

    let request = mock.requests.lock().unwrap()[0].clone();
    assert_eq!(request.path, format!("leads({})", id));
    // Single-entity fetches carry only projection parameters.
    let keys: Vec<&str> = request.query.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, vec!["$select", "$expand"]);
    Ok(())
}

#[tokio::test]
async fn cross_tenant_record_is_not_found_with_critical_audit() -> Result<()> {
    // Caller is scoped to ec-arkansas; the record belongs to ec-oregon.
    let id = "d0000000-0000-0000-0000-000000000001";
    let (service, _, sink) =
        service(MockCrm::new().respond_json(lead_record(id, "Jordan Fox", OREGON_GUID)));
    let ctx = SecurityContext {
        initiative: "ec-arkansas".into(),
        ..oregon_ctx()
    };

    let lead = service.get_lead_by_id(&ctx, id).await?;
    assert!(lead.is_none(), "mismatch must read as not-found, not forbidden");

    let events = sink.0.lock().unwrap();
    let event = events
        .iter()
        .find(|e| e.event_type == AuditEventType::CrossTenantAttempt)
        .expect("cross-tenant attempt must be audited");
    assert_eq!(
        event.details["expectedTenantGuid"].as_str(),
        Some(ARKANSAS_GUID)
    );
    assert_eq!(event.details["recordTenantGuid"].as_str(), Some(OREGON_GUID));
    Ok(())
}

#[tokio::test]
async fn upstream_404_maps_to_none() -> Result<()> {
    let id = "d0000000-0000-0000-0000-000000000001";
    let body = r#"{"error":{"code":"0x80040217","message":"Does Not Exist"}}"#;
    let (service, _, _) = service(
        MockCrm::new().respond_error(CrmError::Upstream(ParsedError::from_response(404, body))),
    );

    assert!(service.get_lead_by_id(&oregon_ctx(), id).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn malformed_id_is_none_without_http() -> Result<()> {
    let (service, mock, _) = service(MockCrm::new());

    let lead = service
        .get_lead_by_id(&oregon_ctx(), "leads')%20or%20(1 eq 1")
        .await?;
    assert!(lead.is_none());
    assert_eq!(mock.request_count(), 0);
    Ok(())
}

#[tokio::test]
async fn by_id_missing_org_is_none_without_http() -> Result<()> {
    let (service, mock, sink) = service(MockCrm::new());
    let ctx = SecurityContext {
        organization_id: None,
        ..oregon_ctx()
    };

    let lead = service
        .get_lead_by_id(&ctx, "d0000000-0000-0000-0000-000000000001")
        .await?;
    assert!(lead.is_none());
    assert_eq!(mock.request_count(), 0);

    let events = sink.0.lock().unwrap();
    assert!(events
        .iter()
        .any(|e| e.event_type == AuditEventType::MissingOrgContext));
    Ok(())
}
