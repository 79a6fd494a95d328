use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ridepool_core::DomainError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    BadRequest(String),
    Domain(DomainError),
    InternalServerError(String),
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        Self::Domain(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::AuthenticationError(msg) => {
                (StatusCode::UNAUTHORIZED, json!({ "error": msg }))
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::Domain(err) => {
                // Conflict-class codes let the caller distinguish a stale
                // view (reload and retry) from a no-longer-possible action.
                let status = match &err {
                    DomainError::InvalidSeatCount(_) | DomainError::InvalidMessage(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
                    DomainError::NotFound(_) => StatusCode::NOT_FOUND,
                    DomainError::RideClosed(_)
                    | DomainError::CapacityExceeded { .. }
                    | DomainError::InvalidTransition { .. }
                    | DomainError::TooLateToCancel(_) => StatusCode::CONFLICT,
                };
                (status, json!({ "error": err.to_string(), "code": err.code() }))
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
