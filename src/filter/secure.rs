//! Mandatory tenant/organization filter synthesis.
//!
//! Every upstream query passes through [`SecureFilterBuilder::build`]; the
//! produced expression always carries, in order, the active-record
//! predicate, the tenant-GUID equality, and (when organization context is
//! present) the organization constraint. Ambiguous organization context
//! short-circuits to an empty result before any HTTP call is made.

use serde_json::json;
use thiserror::Error;

use crate::audit::{AuditEvent, AuditEventType, AuditLogger, AuditResult};
use crate::crm::schema;
use crate::identity::{IdentityError, InitiativeDirectory};
use crate::odata::{self, CompareOp, ODataError};
use crate::types::SecurityContext;

/// Opaque, fully-escaped OData `$filter` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecureFilterExpression(String);

impl SecureFilterExpression {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for SecureFilterExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why the builder decided on a fail-secure empty page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    MissingOrgType,
    InvalidOrgType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    Filter(SecureFilterExpression),
    /// Return an empty page without contacting the CRM. Not an error: the
    /// caller must not leak whether data exists.
    Empty(EmptyReason),
}

#[derive(Error, Debug)]
pub enum FilterError {
    /// Middleware should have guaranteed the initiative claim; its absence
    /// here is an internal misconfiguration, not a user error.
    #[error("Security context has no initiative")]
    MissingInitiative,

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    OData(#[from] ODataError),
}

pub struct SecureFilterBuilder<'a> {
    directory: &'a InitiativeDirectory,
    audit: &'a AuditLogger,
}

impl<'a> SecureFilterBuilder<'a> {
    pub fn new(directory: &'a InitiativeDirectory, audit: &'a AuditLogger) -> Self {
        Self { directory, audit }
    }

    pub fn build(
        &self,
        ctx: &SecurityContext,
        search: Option<&str>,
    ) -> Result<FilterOutcome, FilterError> {
        let mut predicates: Vec<String> = vec![];

        // 1. Active records only.
        predicates.push(odata::expr::comparison_raw(
            schema::FIELD_STATE,
            CompareOp::Eq,
            schema::STATE_ACTIVE,
        )?);

        // 2-3. Tenant constraint. The GUID is system-generated but still
        // goes through escaping: every interpolated value is escaped, no
        // exceptions.
        if ctx.initiative.is_empty() {
            return Err(FilterError::MissingInitiative);
        }
        let guid = match self.directory.crm_guid(&ctx.initiative) {
            Ok(guid) => guid,
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
        predicates.push(odata::comparison(schema::FIELD_TENANT, CompareOp::Eq, guid)?);

        // 4. Organization constraint.
        if let Some(org_id) = ctx.organization_id.as_deref() {
            match self.organization_predicate(ctx, org_id)? {
                OrgOutcome::Predicate(predicate) => predicates.push(predicate),
                OrgOutcome::Empty(reason) => return Ok(FilterOutcome::Empty(reason)),
            }
        }

        // 5. Caller-supplied free-text search on the display name.
        if let Some(search) = search.filter(|s| !s.trim().is_empty()) {
            predicates.push(odata::contains(schema::FIELD_NAME, search.trim())?);
        }

        let expression = SecureFilterExpression(predicates.join(" and "));
        self.audit.log(
            AuditEvent::new(AuditEventType::FilterApplied, AuditResult::Success)
                .with_user(ctx.user_id.as_deref())
                .with_initiative(&ctx.initiative)
                .with_resource(schema::LEAD_ENTITY_SET)
                .with_details(json!({ "filter": expression.as_str() })),
        );
        Ok(FilterOutcome::Filter(expression))
    }

    fn organization_predicate(
        &self,
        ctx: &SecurityContext,
        org_id: &str,
    ) -> Result<OrgOutcome, FilterError> {
        let Some(lead_type) = ctx.organization_lead_type.as_deref() else {
            self.audit.log(
                AuditEvent::new(AuditEventType::MissingOrgContext, AuditResult::Success)
                    .with_user(ctx.user_id.as_deref())
                    .with_initiative(&ctx.initiative)
                    .with_details(json!({ "reason": "organization has no lead type configured" })),
            );
            return Ok(OrgOutcome::Empty(EmptyReason::MissingOrgType));
        };

        if !is_valid_lead_type_list(lead_type) {
            self.audit.log(
                AuditEvent::new(AuditEventType::InvalidOrgType, AuditResult::Success)
                    .with_user(ctx.user_id.as_deref())
                    .with_initiative(&ctx.initiative)
                    .with_details(json!({ "organizationLeadType": lead_type })),
            );
            return Ok(OrgOutcome::Empty(EmptyReason::InvalidOrgType));
        }

        let mut sub_predicates: Vec<String> = vec![];
        for code in lead_type.split(',') {
            match code.parse::<u32>() {
                Ok(schema::ORG_CATEGORY_FOSTER) => {
                    let predicate =
                        odata::comparison(schema::FIELD_ORG_DIRECT, CompareOp::Eq, org_id)?;
                    if !sub_predicates.contains(&predicate) {
                        sub_predicates.push(predicate);
                    }
                }
                Ok(schema::ORG_CATEGORY_VOLUNTEER) => {
                    let predicate = odata::any_expr(
                        schema::NAV_ORG_JUNCTION,
                        schema::NAV_ORG_JUNCTION_ALIAS,
                        schema::FIELD_ORG_JUNCTION_ID,
                        org_id,
                    )?;
                    if !sub_predicates.contains(&predicate) {
                        sub_predicates.push(predicate);
                    }
                }
                _ => {}
            }
        }

        if sub_predicates.is_empty() {
            self.audit.log(
                AuditEvent::new(AuditEventType::InvalidOrgType, AuditResult::Success)
                    .with_user(ctx.user_id.as_deref())
                    .with_initiative(&ctx.initiative)
                    .with_details(json!({
                        "organizationLeadType": lead_type,
                        "reason": "no recognized organization categories",
                    })),
            );
            return Ok(OrgOutcome::Empty(EmptyReason::InvalidOrgType));
        }

        let wrapped: Vec<String> = sub_predicates
            .into_iter()
            .map(|p| format!("({})", p))
            .collect();
        Ok(OrgOutcome::Predicate(format!("({})", wrapped.join(" or "))))
    }
}

enum OrgOutcome {
    Predicate(String),
    Empty(EmptyReason),
}

/// `^\d+(,\d+)*$` - comma-separated non-negative integers, no whitespace, no
/// leading/trailing commas.
fn is_valid_lead_type_list(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    value
        .split(',')
        .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
}
