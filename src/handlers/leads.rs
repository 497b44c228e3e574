// handlers/leads.rs - GET /api/leads and GET /api/leads/:id

use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::types::{LeadFilters, PageOptions, SecurityContext, SortDirection};

use super::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadListParams {
    pub search: Option<String>,
    pub page_size: Option<i32>,
    pub skip: Option<i32>,
    pub sort_by: Option<String>,
    pub sort_direction: Option<SortDirection>,
}

/// GET /api/leads - list leads visible to the caller's initiative and
/// organization
pub async fn leads_list(
    State(state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    Query(params): Query<LeadListParams>,
) -> Result<Json<Value>, ApiError> {
    let filters = LeadFilters {
        search: params.search,
    };
    let page = PageOptions {
        page_size: params.page_size,
        skip: params.skip,
        sort_by: params.sort_by,
        sort_direction: params.sort_direction,
    };

    let result = state.leads.get_leads(&ctx, &filters, &page).await?;

    Ok(Json(json!({
        "success": true,
        "data": result.items,
        "totalCount": result.total_count,
        "nextPageToken": result.next_page_token,
    })))
}

/// GET /api/leads/:id - fetch a single lead, scoped to the caller's tenant
pub async fn lead_get(
    State(state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    match state.leads.get_lead_by_id(&ctx, &id).await? {
        Some(lead) => Ok(Json(json!({ "success": true, "data": lead }))),
        None => Err(ApiError::not_found("The requested record was not found.")),
    }
}
