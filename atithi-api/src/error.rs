use atithi_core::repository::StoreError;
use atithi_core::schema::FieldError;
use atithi_registration::{SessionError, SubmissionError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    /// Field-identified validation failures; never reached the network
    ValidationError(Vec<FieldError>),
    BadRequest(String),
    NotFoundError(String),
    ConflictError(String),
    /// Hosted store failed; the caller may retry, nothing was discarded
    StoreFailure(String),
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl AppError {
    pub fn session(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(id) => {
                AppError::NotFoundError(format!("registration session not found: {id}"))
            }
            SessionError::Stale => AppError::ConflictError(
                "registration form was reset while the upload was in flight".to_string(),
            ),
            SessionError::Invalid(field) => AppError::ValidationError(vec![field]),
            SessionError::GuestSet(err) => AppError::NotFoundError(err.to_string()),
            SessionError::Submission(err) => AppError::submission(err),
        }
    }

    pub fn submission(err: SubmissionError) -> Self {
        match err {
            SubmissionError::Validation(fields) => AppError::ValidationError(fields),
            SubmissionError::Store(err) => AppError::store(err),
        }
    }

    pub fn store(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => AppError::NotFoundError(msg),
            other => AppError::StoreFailure(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::AuthenticationError(msg) => {
                (StatusCode::UNAUTHORIZED, json!({ "error": msg }))
            }
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, json!({ "error": msg })),
            AppError::ValidationError(fields) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "validation failed", "fields": fields }),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            AppError::StoreFailure(msg) => {
                tracing::error!("record store failure: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    json!({ "error": msg, "retryable": true }),
                )
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Anyhow(err.into())
    }
}
