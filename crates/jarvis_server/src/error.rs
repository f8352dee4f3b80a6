//! HTTP error mapping.
//!
//! # Invariants
//! - Every error body is `{"error": "<message>"}`.
//! - Caller mistakes map to 400, missing notes to 404, storage and
//!   persisted-data failures to 500. Storage failures are never reported
//!   as "not found".

use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use jarvis_core::RepoError;
use log::error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum ApiError {
    Repo(RepoError),
    BadRequest(String),
    NotFound(String),
    /// The blocking worker running the database call was lost.
    Worker,
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::BadRequest(message) | Self::NotFound(message) => f.write_str(message),
            Self::Worker => f.write_str("database worker unavailable"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<RepoError> for ApiError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<BlockingError> for ApiError {
    fn from(_: BlockingError) -> Self {
        Self::Worker
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Repo(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Repo(RepoError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Repo(_) | Self::Worker => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!(
                "event=http_error module=server status=error http_status={} error={self}",
                status.as_u16()
            );
        }
        HttpResponse::build(status).json(serde_json::json!({ "error": self.to_string() }))
    }
}
