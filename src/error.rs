//! Error handling

use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// JSON request body whose rejections render as [`AppError`]
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

#[derive(Debug, Error)]
pub enum AppError {
    // Auth errors
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("session has expired")]
    TokenExpired,
    #[error("invalid session token")]
    TokenInvalid,
    #[error("authentication required")]
    Unauthorized,

    // Resource errors
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    AlreadyExists(String),

    // Validation errors
    #[error("{0}")]
    ValidationError(String),

    // Database errors
    #[error("database error: {0}")]
    DatabaseError(String),

    // Generic errors
    #[error("internal error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials
            | AppError::TokenExpired
            | AppError::TokenInvalid
            | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyExists(_) => StatusCode::CONFLICT,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::DatabaseError(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match &self {
            AppError::InvalidCredentials => "Invalid password",
            AppError::TokenExpired => "Session has expired",
            AppError::TokenInvalid => "Invalid session",
            AppError::Unauthorized => "Authentication required",
            AppError::NotFound(msg) => msg.as_str(),
            AppError::AlreadyExists(msg) => msg.as_str(),
            AppError::ValidationError(msg) => msg.as_str(),
            AppError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                "Database error occurred"
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error"
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                // unique_violation
                Some("23505") => {
                    return AppError::AlreadyExists(format!(
                        "Duplicate value violates {}",
                        db_err.constraint().unwrap_or("a unique constraint")
                    ));
                }
                // foreign_key_violation
                Some("23503") => {
                    return AppError::ValidationError("Referenced record does not exist".to_string());
                }
                _ => {}
            }
        }
        AppError::DatabaseError(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
            _ => AppError::TokenInvalid,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => format!("{}: {}", field, msg),
                    None => format!("{}: invalid value ({})", field, e.code),
                })
            })
            .collect();
        messages.sort();
        AppError::ValidationError(messages.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "must not be empty"))]
        name: String,
        #[validate(range(min = 0))]
        count: i32,
    }

    #[test]
    fn status_codes() {
        assert_eq!(AppError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::TokenExpired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::AlreadyExists("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(AppError::ValidationError("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::DatabaseError("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn validation_errors_name_each_field() {
        let errors = Sample { name: String::new(), count: -1 }.validate().unwrap_err();
        match AppError::from(errors) {
            AppError::ValidationError(msg) => {
                assert!(msg.contains("name: must not be empty"), "{msg}");
                assert!(msg.contains("count: invalid value (range)"), "{msg}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn expired_jwt_maps_to_token_expired() {
        let err = jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::ExpiredSignature);
        assert!(matches!(AppError::from(err), AppError::TokenExpired));

        let err = jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::InvalidSignature);
        assert!(matches!(AppError::from(err), AppError::TokenInvalid));
    }

    #[test]
    fn row_not_found_is_a_database_error() {
        assert!(matches!(
            AppError::from(sqlx::Error::RowNotFound),
            AppError::DatabaseError(_)
        ));
    }
}
