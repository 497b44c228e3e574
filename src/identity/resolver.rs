//! Maps identity-provider group claims to initiative access.

use std::sync::Arc;

use serde_json::json;

use crate::audit::{AuditEvent, AuditEventType, AuditLogger, AuditResult};

use super::directory::InitiativeDirectory;
use super::types::GroupType;
use super::{is_guid, IdentityError};

/// One resolved initiative grant for a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiativeMapping {
    pub initiative: String,
    pub group_type: GroupType,
    pub role: Option<String>,
}

pub struct GroupResolver {
    directory: Arc<InitiativeDirectory>,
    audit: AuditLogger,
}

impl GroupResolver {
    pub fn new(directory: Arc<InitiativeDirectory>, audit: AuditLogger) -> Self {
        Self { directory, audit }
    }

    /// First matching initiative, in the caller's group-id order. An empty
    /// or unmapped list is a hard authorization failure, never defaulted.
    pub fn resolve_initiative(&self, group_ids: &[String]) -> Result<String, IdentityError> {
        for group_id in group_ids {
            if !is_guid(group_id) {
                continue;
            }
            if let Some(mapping) = self.directory.group_mapping(group_id) {
                return Ok(mapping.initiative.clone());
            }
        }
        Err(IdentityError::NoInitiativeAssigned)
    }

    /// Every distinct initiative the caller's groups map to, de-duplicated
    /// by initiative id, preserving first-seen order.
    pub fn resolve_all_initiatives(&self, group_ids: &[String]) -> Vec<InitiativeMapping> {
        let mut seen: Vec<InitiativeMapping> = vec![];
        for group_id in group_ids {
            if !is_guid(group_id) {
                continue;
            }
            let Some(mapping) = self.directory.group_mapping(group_id) else {
                continue;
            };
            if seen.iter().any(|m| m.initiative == mapping.initiative) {
                continue;
            }
            seen.push(InitiativeMapping {
                initiative: mapping.initiative.clone(),
                group_type: mapping.group_type,
                role: mapping.role.clone(),
            });
        }
        seen
    }

    /// Primary-initiative selection for multi-initiative callers. Preference
    /// is `all-users` over `role` over `standard`, tie-broken alphabetically
    /// by initiative id, so the result is independent of map iteration
    /// order. Multi-initiative membership is tracked as an anomaly, not
    /// rejected.
    pub fn resolve_primary(
        &self,
        group_ids: &[String],
        user_id: Option<&str>,
    ) -> Result<(String, Vec<String>), IdentityError> {
        let mut mappings = self.resolve_all_initiatives(group_ids);
        if mappings.is_empty() {
            return Err(IdentityError::NoInitiativeAssigned);
        }

        mappings.sort_by(|a, b| {
            a.group_type
                .cmp(&b.group_type)
                .then_with(|| a.initiative.cmp(&b.initiative))
        });

        let primary = mappings[0].initiative.clone();
        let additional: Vec<String> = mappings[1..]
            .iter()
            .map(|m| m.initiative.clone())
            .collect();

        if !additional.is_empty() {
            self.audit.log(
                AuditEvent::new(AuditEventType::AccessGranted, AuditResult::Success)
                    .with_user(user_id)
                    .with_initiative(&primary)
                    .with_resource("initiative-membership")
                    .with_details(json!({
                        "reason": "user maps to multiple initiatives",
                        "additional": additional,
                    })),
            );
        }

        Ok((primary, additional))
    }
}
