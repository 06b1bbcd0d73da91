use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use validator::ValidationErrors;

use crate::repository::RepositoryError;

/// ApiError
///
/// The single error type returned by handlers. Every variant renders as a JSON
/// body `{"error": "..."}` with the matching HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Internal server error")]
    Internal(String),
}

/// ErrorBody
///
/// Wire shape of every error response.
#[derive(Debug, Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            // The detail stays in the logs; clients only see the generic message.
            tracing::error!(error = %detail, "request failed");
        }
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(what) => {
                ApiError::BadRequest(format!("{what} already exists"))
            }
            RepositoryError::MissingReference(what) => {
                ApiError::BadRequest(format!("referenced {what} does not exist"))
            }
            RepositoryError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::BadRequest(first_validation_message(&errors))
    }
}

/// Flattens validator output to one readable message: the first failing field.
fn first_validation_message(errors: &ValidationErrors) -> String {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        match kind {
            ValidationErrorsKind::Field(list) => {
                if let Some(err) = list.first() {
                    return match &err.message {
                        Some(msg) => msg.to_string(),
                        None if &**field == "__all__" => {
                            format!("invalid request: {}", err.code)
                        }
                        None => format!("invalid {field}: {}", err.code),
                    };
                }
            }
            ValidationErrorsKind::Struct(inner) => return first_validation_message(inner),
            ValidationErrorsKind::List(items) => {
                if let Some((_, inner)) = items.iter().next() {
                    return first_validation_message(inner);
                }
            }
        }
    }
    "invalid request".to_string()
}

/// Result type alias for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
