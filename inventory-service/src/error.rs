use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::pooled_connection::PoolError;
use serde_json::json;

/// Error type returned by every handler.
///
/// Store and infrastructure failures are logged and surfaced as a generic
/// 500; their detail never reaches the client.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),

    /// A delete was blocked by rows that still reference the target.
    #[error("in use: {0}")]
    InUse(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("insufficient stock for product {product_id}: requested {requested}")]
    InsufficientStock { product_id: i32, requested: i32 },

    #[error("database error: {0}")]
    Database(#[from] DieselError),

    #[error("connection pool error: {0}")]
    Pool(#[from] bb8::RunError<PoolError>),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Map a foreign-key violation to [`AppError::InUse`] with a caller-supplied message.
    pub fn referenced(err: DieselError, message: &str) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                AppError::InUse(message.to_string())
            }
            other => AppError::Database(other),
        }
    }

    /// Map a violation of the named foreign key to [`AppError::NotFound`]:
    /// the row being written points at something that does not exist.
    pub fn missing_reference(err: DieselError, constraint: &str, message: String) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info)
                if info.constraint_name() == Some(constraint) =>
            {
                AppError::NotFound(message)
            }
            other => AppError::Database(other),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::InUse(msg) => (StatusCode::BAD_REQUEST, "IN_USE", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::InsufficientStock { .. } => {
                (StatusCode::CONFLICT, "INSUFFICIENT_STOCK", self.to_string())
            }
            AppError::Database(err) => classify_diesel_error(err),
            AppError::Pool(err) => {
                tracing::error!(error = %err, "Connection pool error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Status, code, and client-safe message for a diesel error.
fn classify_diesel_error(err: &DieselError) -> (StatusCode, &'static str, String) {
    match err {
        DieselError::NotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => (
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            format!(
                "Referenced record does not exist ({})",
                info.constraint_name().unwrap_or("unknown constraint")
            ),
        ),
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => (
            StatusCode::CONFLICT,
            "CONFLICT",
            format!(
                "Duplicate value violates unique constraint {}",
                info.constraint_name().unwrap_or("unknown")
            ),
        ),
        DieselError::DatabaseError(DatabaseErrorKind::CheckViolation, info) => (
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            format!(
                "Value violates check constraint {}",
                info.constraint_name().unwrap_or("unknown")
            ),
        ),
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}

/// A foreign-key violation on `constraint`, shaped like the ones Postgres reports.
#[cfg(test)]
pub(crate) fn foreign_key_violation(constraint: &'static str) -> DieselError {
    #[derive(Debug)]
    struct Violation(&'static str);

    impl diesel::result::DatabaseErrorInformation for Violation {
        fn message(&self) -> &str {
            "insert or update violates foreign key constraint"
        }
        fn details(&self) -> Option<&str> {
            None
        }
        fn hint(&self) -> Option<&str> {
            None
        }
        fn table_name(&self) -> Option<&str> {
            None
        }
        fn column_name(&self) -> Option<&str> {
            None
        }
        fn constraint_name(&self) -> Option<&str> {
            Some(self.0)
        }
        fn statement_position(&self) -> Option<i32> {
            None
        }
    }

    DieselError::DatabaseError(
        DatabaseErrorKind::ForeignKeyViolation,
        Box::new(Violation(constraint)),
    )
}
