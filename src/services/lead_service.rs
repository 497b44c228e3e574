//! Lead read orchestration: filter synthesis, query assembly, execution,
//! mapping. All fail-secure short-circuits happen here before any HTTP call.

use std::sync::Arc;

use serde_json::json;
use thiserror::Error;

use crate::audit::{AuditEvent, AuditEventType, AuditLogger, AuditResult, AuditSeverity};
use crate::config::QueryConfig;
use crate::crm::{schema, CrmError, CrmExecute, CrmRequest, CrmResponse};
use crate::filter::{FilterError, FilterOutcome, SecureFilterBuilder};
use crate::identity::{is_guid, IdentityError, InitiativeDirectory};
use crate::odata::{query::next_page_token, QueryOptions};
use crate::types::{LeadFilters, PageOptions, PagedResult, SecurityContext, SortDirection};

use super::lead::Lead;

#[derive(Error, Debug)]
pub enum LeadServiceError {
    #[error(transparent)]
    Crm(#[from] CrmError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("Unexpected CRM response shape: {0}")]
    UnexpectedResponse(String),
}

pub struct LeadQueryService<C: CrmExecute> {
    client: C,
    directory: Arc<InitiativeDirectory>,
    audit: AuditLogger,
    query: QueryConfig,
}

impl<C: CrmExecute> LeadQueryService<C> {
    pub fn new(
        client: C,
        directory: Arc<InitiativeDirectory>,
        audit: AuditLogger,
        query: QueryConfig,
    ) -> Self {
        Self {
            client,
            directory,
            audit,
            query,
        }
    }

    pub async fn get_leads(
        &self,
        ctx: &SecurityContext,
        filters: &LeadFilters,
        page: &PageOptions,
    ) -> Result<PagedResult<Lead>, LeadServiceError> {
        if ctx.organization_id.is_none() {
            self.audit_missing_org(ctx);
            return Ok(PagedResult::empty());
        }

        let builder = SecureFilterBuilder::new(&self.directory, &self.audit);
        let filter = match builder.build(ctx, filters.search.as_deref())? {
            FilterOutcome::Filter(filter) => filter,
            // The builder already audited the reason; hand back an empty
            // page, not an error.
            FilterOutcome::Empty(_) => return Ok(PagedResult::empty()),
        };

        let options = self.query_options(Some(filter.into_string()), ctx, page);
        let request =
            CrmRequest::get(schema::LEAD_ENTITY_SET).with_query(options.to_query_pairs());
        let response = self.client.execute(request).await?;
        let CrmResponse::Json(payload) = response else {
            return Err(LeadServiceError::UnexpectedResponse(
                "expected a JSON collection body".to_string(),
            ));
        };

        let raw_records = payload["value"].as_array().cloned().unwrap_or_default();
        let mut items = Vec::with_capacity(raw_records.len());
        for record in &raw_records {
            items.push(self.map_record(ctx, record));
        }

        let total_count = payload["@odata.count"]
            .as_i64()
            .unwrap_or(items.len() as i64);
        let next = payload["@odata.nextLink"]
            .as_str()
            .and_then(next_page_token);

        self.audit.log(
            AuditEvent::new(AuditEventType::QueryExecuted, AuditResult::Success)
                .with_user(ctx.user_id.as_deref())
                .with_initiative(&ctx.initiative)
                .with_resource(schema::LEAD_ENTITY_SET)
                .with_details(json!({ "count": items.len(), "totalCount": total_count })),
        );

        Ok(PagedResult {
            items,
            total_count,
            next_page_token: next,
        })
    }

    pub async fn get_lead_by_id(
        &self,
        ctx: &SecurityContext,
        id: &str,
    ) -> Result<Option<Lead>, LeadServiceError> {
        if ctx.organization_id.is_none() {
            self.audit_missing_org(ctx);
            return Ok(None);
        }

        let expected_guid = match self.directory.crm_guid(&ctx.initiative) {
            Ok(guid) => guid.to_string(),
            Err(e) => {
                self.audit.log(
                    AuditEvent::new(AuditEventType::InitiativeMappingFailed, AuditResult::Failure)
                        .with_user(ctx.user_id.as_deref())
                        .with_initiative(&ctx.initiative)
                        .with_details(json!({ "error": e.to_string() })),
                );
                return Err(e.into());
            }
        };

        // A malformed id cannot name a record; answering "not found" keeps
        // the response indistinguishable from a real miss.
        if !is_guid(id) {
            return Ok(None);
        }

        let request = CrmRequest::get(format!("{}({})", schema::LEAD_ENTITY_SET, id))
            .with_query(self.detail_query_pairs());

        let record = match self.client.execute(request).await {
            Ok(CrmResponse::Json(record)) => record,
            Ok(_) => {
                return Err(LeadServiceError::UnexpectedResponse(
                    "expected a JSON entity body".to_string(),
                ))
            }
            Err(CrmError::Upstream(parsed)) if parsed.status_code == 404 => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // Re-verify tenant ownership after the fetch. A mismatch is a
        // security event, and the caller sees "not found", never
        // "forbidden", so record existence is not confirmed.
        let record_guid = record[schema::FIELD_TENANT].as_str().unwrap_or_default();
        if !record_guid.eq_ignore_ascii_case(&expected_guid) {
            self.audit.log(
                AuditEvent::new(AuditEventType::CrossTenantAttempt, AuditResult::Failure)
                    .with_user(ctx.user_id.as_deref())
                    .with_initiative(&ctx.initiative)
                    .with_resource(&format!("{}/{}", schema::LEAD_ENTITY_SET, id))
                    .with_details(json!({
                        "expectedTenantGuid": expected_guid,
                        "recordTenantGuid": record_guid,
                    })),
            );
            return Ok(None);
        }

        Ok(Some(self.map_record(ctx, &record)))
    }

    fn map_record(&self, ctx: &SecurityContext, record: &serde_json::Value) -> Lead {
        let mapped = Lead::from_record(record, &self.directory);
        if !mapped.tenant_resolved {
            // Tolerated per record: log and continue rather than abort the
            // page over one bad row.
            self.audit.log(
                AuditEvent::new(AuditEventType::InitiativeMappingFailed, AuditResult::Success)
                    .with_severity(AuditSeverity::Warning)
                    .with_user(ctx.user_id.as_deref())
                    .with_initiative(&ctx.initiative)
                    .with_resource(schema::LEAD_ENTITY_SET)
                    .with_details(json!({
                        "leadId": mapped.lead.id,
                        "recordTenantGuid": mapped.tenant_guid,
                    })),
            );
        }
        mapped.lead
    }

    fn query_options(
        &self,
        filter: Option<String>,
        ctx: &SecurityContext,
        page: &PageOptions,
    ) -> QueryOptions {
        let top = page
            .page_size
            .unwrap_or(self.query.default_page_size)
            .clamp(1, self.query.max_page_size);

        let direction = page.sort_direction.unwrap_or(SortDirection::Desc);
        let order_by = match page.sort_by.as_deref() {
            None => schema::DEFAULT_SORT.to_string(),
            Some(external) => match schema::sort_field(external) {
                Some(internal) => format!("{} {}", internal, direction.to_odata()),
                None => {
                    self.audit.log(
                        AuditEvent::new(AuditEventType::InvalidSortField, AuditResult::Success)
                            .with_user(ctx.user_id.as_deref())
                            .with_initiative(&ctx.initiative)
                            .with_details(json!({ "sortBy": external })),
                    );
                    schema::DEFAULT_SORT.to_string()
                }
            },
        };

        QueryOptions {
            filter,
            select: schema::LEAD_SELECT.to_vec(),
            expand: Some(schema::LEAD_EXPAND.to_string()),
            order_by: Some(order_by),
            top: Some(top),
            skip: page.skip.map(|s| s.max(0)),
            count: true,
        }
    }

    /// Fixed `$select`/`$expand` pairs for single-entity fetches, where
    /// pagination and ordering do not apply.
    fn detail_query_pairs(&self) -> Vec<(String, String)> {
        vec![
            ("$select".to_string(), schema::LEAD_SELECT.join(",")),
            ("$expand".to_string(), schema::LEAD_EXPAND.to_string()),
        ]
    }

    fn audit_missing_org(&self, ctx: &SecurityContext) {
        self.audit.log(
            AuditEvent::new(AuditEventType::MissingOrgContext, AuditResult::Success)
                .with_user(ctx.user_id.as_deref())
                .with_initiative(&ctx.initiative)
                .with_details(json!({ "reason": "security context has no organization id" })),
        );
    }
}
