use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),

    #[error("{0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Store(StoreError::Conflict(msg)) => (StatusCode::CONFLICT, msg),
            AppError::Store(StoreError::NotFound(msg)) => (StatusCode::NOT_FOUND, msg),
            AppError::Store(e) => {
                tracing::error!(error = %e, "Store failure");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_failures_surface_their_message_as_500() {
        let response = AppError::from(StoreError::Remote("quota exceeded".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn request_errors_map_to_client_statuses() {
        assert_eq!(AppError::Forbidden("no profile".to_string()).into_response().status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::BadRequest("bad seed".to_string()).into_response().status(), StatusCode::BAD_REQUEST);
        let missing = AppError::from(StoreError::NotFound("amy".to_string())).into_response();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn store_conflicts_map_to_409() {
        let response = AppError::from(StoreError::Conflict("taken".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
