use serde::{Deserialize, Serialize};

/// A tenant boundary: one state/region initiative, mapped 1:1 to a CRM GUID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Initiative {
    /// Stable internal slug, e.g. "ec-oregon".
    pub id: String,
    /// Immutable external identifier in the CRM.
    pub crm_tenant_guid: String,
    pub display_name: String,
    pub enabled: bool,
}

/// How a mapped identity-provider group grants initiative access. The order
/// here is the primary-initiative preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupType {
    AllUsers,
    Role,
    Standard,
}

/// Binds one identity-provider group GUID to an initiative. Several mappings
/// can target the same initiative (base access vs role-scoped access).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMapping {
    /// Identity-provider group object id (a GUID).
    pub group_id: String,
    /// Target `Initiative.id`.
    pub initiative: String,
    pub role: Option<String>,
    pub group_type: GroupType,
}
