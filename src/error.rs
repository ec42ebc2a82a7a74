use std::borrow::Cow;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::rentals::domain::RentalError;
use crate::store::StoreError;

/// Error returned by every handler. Each variant maps to one HTTP status.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        field: Cow<'static, str>,
        message: String,
    },

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Database or other infrastructure failure; details stay in the logs.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(field: impl Into<Cow<'static, str>>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<Cow<'static, str>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Validation { field, message } => ErrorBody {
                error: message.clone(),
                field: Some(field.clone()),
            },
            Self::Internal(e) => {
                error!(error = ?e, "internal error");
                ErrorBody {
                    error: "Internal server error".into(),
                    field: None,
                }
            }
            other => ErrorBody {
                error: other.to_string(),
                field: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<RentalError> for ApiError {
    fn from(e: RentalError) -> Self {
        match e {
            RentalError::BicycleInRent => Self::Conflict(e.to_string()),
            RentalError::AlreadyReturned => Self::Forbidden(e.to_string()),
            RentalError::EndNotAfterStart | RentalError::CostOutOfRange => {
                Self::validation("end_time", e.to_string())
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Rental(r) => r.into(),
            StoreError::EmailTaken => Self::validation("email", e.to_string()),
            StoreError::UnknownBicycle(_) => Self::validation("bicycle", e.to_string()),
            StoreError::NotFound(what) => Self::NotFound(format!("{what} not found")),
            StoreError::Db(e) => Self::Internal(e.into()),
            StoreError::Other(e) => Self::Internal(e),
        }
    }
}

/// Field name used when a body problem cannot be pinned to one field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Splits axum's rejection text into the offending field and serde's message.
///
/// Data errors read `...target type: <path>: <message>` or carry
/// ``missing field `<name>` ``; anything else belongs to the body as a whole.
fn split_rejection(text: &str) -> (Cow<'static, str>, String) {
    let detail = text
        .split_once("target type: ")
        .map_or(text, |(_, d)| d)
        .trim();

    if let Some((_, rest)) = detail.split_once("missing field `") {
        if let Some((name, _)) = rest.split_once('`') {
            return (name.to_owned().into(), detail.to_owned());
        }
    }
    match detail.split_once(": ") {
        Some((path, message))
            if !path.is_empty()
                && path
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']')) =>
        {
            (path.to_owned().into(), message.to_owned())
        }
        _ => (NON_FIELD_ERRORS.into(), detail.to_owned()),
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => {
                let (field, message) = split_rejection(&e.body_text());
                Self::validation(field, message)
            }
            other => Self::validation(NON_FIELD_ERRORS, other.body_text()),
        }
    }
}
