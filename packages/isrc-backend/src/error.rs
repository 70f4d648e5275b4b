//! Error types for the ISRC backend.
//!
//! Backend adapters (identity provider, record store, blob store) convert
//! whatever their upstream service returns into [`Error`], so route handlers
//! only ever match on these variants. [`ApiError`] pairs an [`Error`] with the
//! route's failure message and renders the JSON error body.
//!
//! | Variant            | Status |
//! |--------------------|--------|
//! | `InvalidInput`     | 400    |
//! | `DuplicateAccount` | 400    |
//! | `EmailNotVerified` | 400    |
//! | `Unauthenticated`  | 500    |
//! | `NotFound`         | 404    |
//! | `StoreUnavailable` | 500    |
//! | `ProviderError`    | 500    |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Result type alias for backend operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required field is missing, empty, or rejected as malformed.
    #[error("{0}")]
    InvalidInput(String),

    #[error("Email is already in use")]
    DuplicateAccount,

    #[error("Please verify your email before logging in.")]
    EmailNotVerified,

    #[error("Invalid email or password")]
    Unauthenticated,

    #[error("{0}")]
    NotFound(String),

    /// The record store or blob store could not be reached, or refused the request.
    #[error("Backing store unavailable: {0}")]
    StoreUnavailable(String),

    /// Any identity provider failure that has no dedicated variant.
    #[error("Identity provider error: {0}")]
    ProviderError(String),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::InvalidInput(_) | Error::DuplicateAccount | Error::EmailNotVerified => {
                StatusCode::BAD_REQUEST
            }
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Unauthenticated | Error::StoreUnavailable(_) | Error::ProviderError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// JSON error body shared by every route.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A route-level failure.
///
/// Client errors (4xx) answer with the error's own message. Server errors
/// answer with the route's `failure` message and carry the underlying error
/// text in the `error` field, unless the route asked for an opaque body.
#[derive(Debug)]
pub struct ApiError {
    error: Error,
    failure: &'static str,
    expose_detail: bool,
}

impl ApiError {
    pub fn new(error: Error, failure: &'static str) -> Self {
        Self {
            error,
            failure,
            expose_detail: true,
        }
    }

    /// Returns a closure suitable for `map_err`.
    pub fn with(failure: &'static str) -> impl Fn(Error) -> ApiError {
        move |error| ApiError::new(error, failure)
    }

    /// Like [`ApiError::with`], but 5xx bodies carry only `message`.
    pub fn opaque(failure: &'static str) -> impl Fn(Error) -> ApiError {
        move |error| ApiError {
            expose_detail: false,
            ..ApiError::new(error, failure)
        }
    }

    pub fn status(&self) -> StatusCode {
        self.error.status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.error.status();
        let body = if status.is_server_error() {
            tracing::error!(error = %self.error, "{}", self.failure);
            ErrorBody {
                message: self.failure.to_string(),
                error: self.expose_detail.then(|| self.error.to_string()),
            }
        } else {
            ErrorBody {
                message: self.error.to_string(),
                error: None,
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            Error::InvalidInput("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(Error::DuplicateAccount.status(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::EmailNotVerified.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::Unauthenticated.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(Error::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            Error::StoreUnavailable("down".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            Error::ProviderError("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_client_error_uses_own_message() {
        let err = ApiError::new(Error::DuplicateAccount, "Error registering user");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error.to_string(), "Email is already in use");
    }

    async fn body_of(err: ApiError) -> serde_json::Value {
        let response = err.into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_server_error_carries_detail() {
        let err = ApiError::with("Error fetching data")(Error::StoreUnavailable("down".into()));
        let body = body_of(err).await;
        assert_eq!(body["message"], "Error fetching data");
        assert_eq!(body["error"], "Backing store unavailable: down");
    }

    #[tokio::test]
    async fn test_opaque_server_error_has_no_detail() {
        let err = ApiError::opaque("Internal Server Error")(Error::StoreUnavailable("down".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_of(err).await;
        assert_eq!(body, serde_json::json!({ "message": "Internal Server Error" }));
    }

    #[tokio::test]
    async fn test_opaque_client_error_keeps_message() {
        let err = ApiError::opaque("Internal Server Error")(Error::InvalidInput(
            "All fields are required".into(),
        ));
        let body = body_of(err).await;
        assert_eq!(body["message"], "All fields are required");
    }
}
