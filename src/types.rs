/// Shared types used across the codebase

use serde::{Deserialize, Serialize};

/// Sort direction for `$orderby` clauses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_odata(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Pagination options supplied by the caller. Page sizes are clamped against
/// the configured maximum before they reach the upstream query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageOptions {
    pub page_size: Option<i32>,
    pub skip: Option<i32>,
    pub sort_by: Option<String>,
    pub sort_direction: Option<SortDirection>,
}

/// Caller-supplied lead filters. Free-text search is the only predicate a
/// caller can influence; everything else is synthesized server-side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeadFilters {
    pub search: Option<String>,
}

/// One page of results plus continuation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub next_page_token: Option<String>,
}

impl<T> PagedResult<T> {
    pub fn empty() -> Self {
        Self {
            items: vec![],
            total_count: 0,
            next_page_token: None,
        }
    }
}

/// Per-request security context, constructed by the auth middleware from a
/// verified session token. The core trusts these values as authenticated but
/// still validates their format before use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityContext {
    /// Internal initiative id, e.g. "ec-oregon". Middleware guarantees
    /// presence; the filter builder re-checks.
    pub initiative: String,
    /// External organization identifier. Absence means an empty result set.
    pub organization_id: Option<String>,
    /// Comma-separated organization category codes, e.g. "100,200".
    pub organization_lead_type: Option<String>,
    /// For audit trails only.
    pub user_id: Option<String>,
}
