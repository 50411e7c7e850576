use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("{0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Conflict(String),

    #[error("User not found")]
    NotFound,

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Token signing error: {0}")]
    Signing(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),
}

pub type UserResult<T> = Result<T, UserError>;

impl UserError {
    pub fn email_taken() -> Self {
        UserError::Conflict("email already exists".into())
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            UserError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg.clone())
            }
            UserError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Unauthorized".to_string(),
            ),
            UserError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                "Invalid credentials".to_string(),
            ),
            UserError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            UserError::NotFound => (
                StatusCode::NOT_FOUND,
                "not_found",
                "User not found".to_string(),
            ),
            UserError::Persistence(msg) => {
                tracing::error!(error = %msg, "persistence error");
                internal()
            }
            UserError::Signing(msg) => {
                tracing::error!(error = %msg, "token signing error");
                internal()
            }
            UserError::PasswordHash(msg) => {
                tracing::error!(error = %msg, "password hash error");
                internal()
            }
        };

        (
            status,
            Json(json!({
                "error": {
                    "type": error_type,
                    "message": message
                }
            })),
        )
            .into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "An internal error occurred".to_string(),
    )
}
