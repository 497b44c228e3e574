// handlers/session.rs - POST /auth/session
//
// Exchanges verified identity-provider claims for a portal session token.
// The upstream OAuth flow has already authenticated the user; this endpoint
// resolves initiative access from the presented group ids and bakes the
// result into the session claims.

use axum::{extract::State, response::Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::audit::{AuditEvent, AuditEventType, AuditResult};
use crate::auth::{generate_jwt, Claims};
use crate::error::ApiError;
use crate::identity::IdentityError;

use super::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub user_id: String,
    pub groups: Vec<String>,
    pub organization_id: Option<String>,
    pub organization_lead_type: Option<String>,
}

pub async fn session_create(
    State(state): State<AppState>,
    Json(request): Json<SessionRequest>,
) -> Result<Json<Value>, ApiError> {
    let (primary, additional) = state
        .resolver
        .resolve_primary(&request.groups, Some(&request.user_id))
        .map_err(|e| {
            if matches!(e, IdentityError::NoInitiativeAssigned) {
                state.audit.log(
                    AuditEvent::new(AuditEventType::AccessDenied, AuditResult::Failure)
                        .with_user(Some(&request.user_id))
                        .with_details(json!({ "reason": "no initiative assigned" })),
                );
            }
            ApiError::from(e)
        })?;

    let claims = Claims::new(
        primary.clone(),
        request.organization_id,
        request.organization_lead_type,
        request.user_id.clone(),
    );
    let token = generate_jwt(claims)?;

    state.audit.log(
        AuditEvent::new(AuditEventType::AccessGranted, AuditResult::Success)
            .with_user(Some(&request.user_id))
            .with_initiative(&primary)
            .with_resource("session"),
    );

    Ok(Json(json!({
        "success": true,
        "data": {
            "token": token,
            "initiative": primary,
            "additionalInitiatives": additional,
        }
    })))
}
