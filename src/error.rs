// src/error.rs

use actix_web::error::JsonPayloadError;
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use log::error;
use serde::Serialize;

use crate::store::StoreError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Every failure a handler can return. The message is what the client sees.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Email lookup where some addresses have no account.
    #[error("Some emails are not registered")]
    UnknownEmails(Vec<String>),

    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    not_found: Option<&'a [String]>,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) | ApiError::UnknownEmails(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let not_found = match self {
            ApiError::UnknownEmails(emails) => Some(emails.as_slice()),
            _ => None,
        };
        HttpResponse::build(self.status_code()).json(ErrorBody {
            success: false,
            message: self.to_string(),
            not_found,
        })
    }
}

/// Classify a store failure for the client. Guard failures keep their
/// message; driver errors are logged and replaced by `context`.
pub fn store_failure(context: &'static str) -> impl Fn(StoreError) -> ApiError {
    move |err| match err {
        StoreError::Duplicate(msg) | StoreError::Conflict(msg) => ApiError::BadRequest(msg),
        StoreError::NotFound(msg) => ApiError::NotFound(msg),
        other => {
            error!("{}: {}", context, other);
            ApiError::Internal(context.to_string())
        }
    }
}

/// Body extraction failures become 400s in the usual error shape.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let message = match &err {
        JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. } => {
            "Request body is too large".to_string()
        }
        JsonPayloadError::ContentType => "Expected a JSON body".to_string(),
        other => format!("Malformed JSON: {}", other),
    };
    ApiError::BadRequest(message).into()
}

/// Fallback for paths no route matched.
pub async fn route_not_found(req: HttpRequest) -> HttpResponse {
    ApiError::NotFound(format!("Route not found: {}", req.path())).error_response()
}
