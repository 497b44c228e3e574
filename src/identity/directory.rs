//! Read-only initiative and group-mapping lookups.
//!
//! The directory is built once at process start from a configuration
//! document and is safe for unsynchronized concurrent reads afterward. It is
//! passed by reference into the resolver and filter builder; there is no
//! global access path.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::types::{GroupMapping, Initiative};
use super::{is_guid, IdentityError};

const PLACEHOLDER_GUID: &str = "00000000-0000-0000-0000-000000000000";

#[derive(Debug, Deserialize)]
struct DirectoryDocument {
    initiatives: Vec<Initiative>,
    group_mappings: Vec<GroupMapping>,
}

#[derive(Debug)]
pub struct InitiativeDirectory {
    initiatives: HashMap<String, Initiative>,
    /// Lowercased CRM GUID -> initiative id, built once.
    guid_index: HashMap<String, String>,
    /// Lowercased group GUID -> mapping.
    group_index: HashMap<String, GroupMapping>,
    /// Group mappings in document order, for deterministic scans.
    group_mappings: Vec<GroupMapping>,
}

impl InitiativeDirectory {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, IdentityError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| IdentityError::ConfigLoad(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, IdentityError> {
        let document: DirectoryDocument = serde_yaml::from_str(raw)?;
        Self::build(document.initiatives, document.group_mappings)
    }

    pub fn build(
        initiatives: Vec<Initiative>,
        group_mappings: Vec<GroupMapping>,
    ) -> Result<Self, IdentityError> {
        let mut initiative_map = HashMap::new();
        let mut guid_index = HashMap::new();

        for initiative in initiatives {
            // Enabled initiatives must carry a real, well-formed GUID;
            // refusing to start beats silently serving an unscoped tenant.
            if initiative.enabled {
                if !is_guid(&initiative.crm_tenant_guid) {
                    return Err(IdentityError::InvalidInitiativeConfig(format!(
                        "initiative '{}' has a malformed CRM GUID",
                        initiative.id
                    )));
                }
                if initiative.crm_tenant_guid.eq_ignore_ascii_case(PLACEHOLDER_GUID) {
                    return Err(IdentityError::InvalidInitiativeConfig(format!(
                        "initiative '{}' has a placeholder CRM GUID",
                        initiative.id
                    )));
                }
            }
            guid_index.insert(
                initiative.crm_tenant_guid.to_ascii_lowercase(),
                initiative.id.clone(),
            );
            initiative_map.insert(initiative.id.clone(), initiative);
        }

        let mut group_index = HashMap::new();
        for mapping in &group_mappings {
            if !initiative_map.contains_key(&mapping.initiative) {
                return Err(IdentityError::InvalidInitiativeConfig(format!(
                    "group mapping '{}' targets unknown initiative '{}'",
                    mapping.group_id, mapping.initiative
                )));
            }
            group_index.insert(mapping.group_id.to_ascii_lowercase(), mapping.clone());
        }

        Ok(Self {
            initiatives: initiative_map,
            guid_index,
            group_index,
            group_mappings,
        })
    }

    pub fn initiative(&self, id: &str) -> Option<&Initiative> {
        self.initiatives.get(id)
    }

    /// CRM tenant GUID for an initiative. Missing or disabled configuration
    /// is an `InvalidInitiativeConfig`; the caller surfaces only a generic
    /// configuration-error message.
    pub fn crm_guid(&self, initiative_id: &str) -> Result<&str, IdentityError> {
        let initiative = self.initiatives.get(initiative_id).ok_or_else(|| {
            IdentityError::InvalidInitiativeConfig(format!(
                "no configuration for initiative '{}'",
                initiative_id
            ))
        })?;
        if !initiative.enabled {
            return Err(IdentityError::InvalidInitiativeConfig(format!(
                "initiative '{}' is disabled",
                initiative_id
            )));
        }
        Ok(&initiative.crm_tenant_guid)
    }

    /// Case-insensitive reverse lookup. Unknown GUIDs are `None`, not an
    /// error, so a single bad record never aborts a whole result page.
    pub fn initiative_id_from_guid(&self, guid: &str) -> Option<&str> {
        self.guid_index
            .get(&guid.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn group_mapping(&self, group_id: &str) -> Option<&GroupMapping> {
        self.group_index.get(&group_id.to_ascii_lowercase())
    }

    pub fn group_mappings(&self) -> &[GroupMapping] {
        &self.group_mappings
    }

    pub fn initiative_count(&self) -> usize {
        self.initiatives.len()
    }
}
