// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::crm::CrmError;
use crate::filter::FilterError;
use crate::identity::IdentityError;
use crate::services::LeadServiceError;

/// HTTP API error with appropriate status codes and client-safe messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 429 Too Many Requests
    TooManyRequests(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::TooManyRequests(_) => 429,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::TooManyRequests(msg)
            | ApiError::InternalServerError(msg)
            | ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::TooManyRequests(_) => "TOO_MANY_REQUESTS",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        })
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        ApiError::TooManyRequests(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<CrmError> for ApiError {
    fn from(err: CrmError) -> Self {
        match err {
            CrmError::MissingToken | CrmError::Configuration(_) => {
                // Log the real error but return a generic message
                tracing::error!("CRM configuration error: {}", err);
                ApiError::internal_server_error("A configuration error occurred")
            }
            CrmError::Upstream(parsed) => {
                tracing::error!(
                    status = parsed.status_code,
                    code = %parsed.error_code,
                    "CRM request failed: {}",
                    parsed.message
                );
                match parsed.status_code {
                    404 => ApiError::not_found(parsed.user_message),
                    409 => ApiError::conflict(parsed.user_message),
                    429 => ApiError::too_many_requests(parsed.user_message),
                    400 => ApiError::bad_request(parsed.user_message),
                    _ => ApiError::internal_server_error(parsed.user_message),
                }
            }
            CrmError::RetriesExhausted {
                last,
                attempts,
                total_delay_ms,
            } => {
                tracing::error!(
                    attempts,
                    total_delay_ms,
                    status = last.status_code,
                    code = %last.error_code,
                    "CRM retries exhausted: {}",
                    last.message
                );
                ApiError::service_unavailable(last.user_message)
            }
            CrmError::InvalidResponse(msg) => {
                tracing::error!("Unexpected CRM response: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::NoInitiativeAssigned => {
                ApiError::forbidden("Your account has no initiative access")
            }
            // Never leak GUIDs or initiative id formats to the caller.
            other => {
                tracing::error!("Initiative configuration error: {}", other);
                ApiError::internal_server_error("A configuration error occurred")
            }
        }
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        match err {
            FilterError::MissingInitiative => {
                tracing::error!("Security context reached the filter builder without an initiative");
                ApiError::internal_server_error("A configuration error occurred")
            }
            FilterError::Identity(inner) => inner.into(),
            FilterError::OData(inner) => {
                tracing::error!("Filter construction failed: {}", inner);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<LeadServiceError> for ApiError {
    fn from(err: LeadServiceError) -> Self {
        match err {
            LeadServiceError::Crm(inner) => inner.into(),
            LeadServiceError::Filter(inner) => inner.into(),
            LeadServiceError::Identity(inner) => inner.into(),
            LeadServiceError::UnexpectedResponse(msg) => {
                tracing::error!("Unexpected CRM response shape: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<crate::auth::JwtError> for ApiError {
    fn from(err: crate::auth::JwtError) -> Self {
        tracing::error!("Session token generation failed: {}", err);
        ApiError::internal_server_error("A configuration error occurred")
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
