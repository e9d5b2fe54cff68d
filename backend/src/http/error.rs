//! HTTP error handling.
//!
//! Every failure is rendered as an [`ApiResult`] envelope with a matching
//! HTTP status code.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::dto::ParseError;
use crate::api::{ApiResult, ResultStatus};
use crate::db::repository::RepositoryError;

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
    Repository(RepositoryError),
}

impl AppError {
    pub fn status(&self) -> (StatusCode, ResultStatus) {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, ResultStatus::NotFound),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, ResultStatus::BadRequest),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ResultStatus::ServerError),
            AppError::Repository(e) => match e {
                RepositoryError::NotFound { .. } => {
                    (StatusCode::NOT_FOUND, ResultStatus::NotFound)
                }
                RepositoryError::ValidationError { .. } => {
                    (StatusCode::BAD_REQUEST, ResultStatus::BadRequest)
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, ResultStatus::ServerError),
            },
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::NotFound(msg) | AppError::BadRequest(msg) | AppError::Internal(msg) => {
                f.write_str(msg)
            }
            AppError::Repository(e) => write!(f, "{}", e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, result_status) = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }

        (status, Json(ApiResult::error(result_status, self.to_string()))).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::Repository(err)
    }
}

impl From<ParseError> for AppError {
    fn from(err: ParseError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(format!("invalid request: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(format!("invalid query: {}", rejection.body_text()))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
