//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Authentication Errors**: malformed headers or tokens, expired or revoked sessions, inactive users
/// - **Resource Errors**: requested rows not found
/// - **Write Errors**: blog/category association failures, constraint conflicts
/// - **Infrastructure Errors**: deadline exceeded, store unreachable, other sqlx failures
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// No row matched. The payload names the entity ("blog", "token", ...).
    ///
    /// Returns HTTP 404 Not Found.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Token row exists but its expiry has passed.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("expired token")]
    Expired,

    /// Authorization header absent or not of the form `Bearer <token>`.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("no valid authorization header received")]
    MalformedHeader,

    /// Bearer token has the wrong length.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("token wrong size")]
    MalformedToken,

    /// The admin gate was shown a token (or token owner) that no longer exists.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("invalid or revoked token")]
    InvalidToken,

    /// User account is deactivated.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("user is not active")]
    Inactive,

    /// Login failed. Used for both unknown email and wrong password.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("invalid username/password")]
    PasswordMismatch,

    /// Writing the blog's category rows failed; the whole write was rolled back.
    ///
    /// Returns HTTP 500 Internal Server Error.
    #[error("blog not saved: categories could not be written: {0}")]
    CategoryWrite(#[source] sqlx::Error),

    /// A database call exceeded its deadline.
    ///
    /// Returns HTTP 504 Gateway Timeout.
    #[error("database call timed out")]
    Timeout,

    /// Connection or transport failure talking to the store.
    ///
    /// Returns HTTP 503 Service Unavailable.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] sqlx::Error),

    /// Unique or foreign-key constraint rejected the write.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid request")]
    InvalidRequest(String),

    /// Password hashing primitive failed (not a mismatch).
    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    /// Any other database failure.
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),
}

/// Classify a raw `sqlx::Error` into the application taxonomy.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("row"),
            sqlx::Error::PoolTimedOut => AppError::Timeout,
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolClosed => {
                AppError::StoreUnavailable(err)
            }
            sqlx::Error::Database(ref db_err)
                if db_err.is_unique_violation() || db_err.is_foreign_key_violation() =>
            {
                let constraint = db_err.constraint().unwrap_or("constraint").to_string();
                AppError::Conflict(format!("{constraint} violated"))
            }
            other => AppError::Database(other),
        }
    }
}

impl AppError {
    /// Stable machine-readable code used in response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::Expired => "expired_token",
            AppError::MalformedHeader => "malformed_header",
            AppError::MalformedToken => "malformed_token",
            AppError::InvalidToken => "invalid_token",
            AppError::Inactive => "inactive_user",
            AppError::PasswordMismatch => "invalid_credentials",
            AppError::CategoryWrite(_) => "category_write_failed",
            AppError::Timeout => "timeout",
            AppError::StoreUnavailable(_) => "store_unavailable",
            AppError::Conflict(_) => "conflict",
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::PasswordHash(_) | AppError::Database(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Expired
            | AppError::MalformedHeader
            | AppError::MalformedToken
            | AppError::InvalidToken
            | AppError::PasswordMismatch => StatusCode::UNAUTHORIZED,
            AppError::Inactive => StatusCode::FORBIDDEN,
            AppError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::CategoryWrite(_) | AppError::PasswordHash(_) | AppError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// Store and hashing failures are logged here and replaced with a generic
/// message so driver details never reach the client.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::InvalidRequest(msg) => msg.clone(),
            AppError::CategoryWrite(_) => {
                tracing::error!("{}", self);
                "blog not saved: categories could not be written".to_string()
            }
            AppError::StoreUnavailable(_) | AppError::PasswordHash(_) | AppError::Database(_) => {
                tracing::error!("{}", self);
                "An internal error occurred".to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert!(matches!(
            AppError::from(sqlx::Error::RowNotFound),
            AppError::NotFound(_)
        ));
    }

    #[test]
    fn pool_timeout_maps_to_timeout() {
        assert!(matches!(
            AppError::from(sqlx::Error::PoolTimedOut),
            AppError::Timeout
        ));
    }

    #[test]
    fn transport_failures_map_to_store_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(matches!(
            AppError::from(sqlx::Error::Io(io)),
            AppError::StoreUnavailable(_)
        ));
        assert!(matches!(
            AppError::from(sqlx::Error::PoolClosed),
            AppError::StoreUnavailable(_)
        ));
    }

    #[test]
    fn auth_failures_are_unauthorized() {
        for err in [
            AppError::Expired,
            AppError::MalformedHeader,
            AppError::MalformedToken,
            AppError::InvalidToken,
            AppError::PasswordMismatch,
        ] {
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED, "{err}");
        }
        assert_eq!(AppError::Inactive.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn not_found_body_names_entity() {
        let (status, body) = body_json(AppError::NotFound("blog")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "not_found");
        assert_eq!(body["error"]["message"], "blog not found");
    }

    #[tokio::test]
    async fn database_details_are_hidden() {
        let (status, body) = body_json(AppError::Database(sqlx::Error::WorkerCrashed)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "internal_error");
        assert_eq!(body["error"]["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn invalid_request_keeps_its_message() {
        let (status, body) =
            body_json(AppError::InvalidRequest("page must be at least 1".into())).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "page must be at least 1");
    }
}
