//! Error type shared by every route and its mapping onto HTTP responses.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::users::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Incorrect password")]
    Unauthorized,

    #[error("User not found")]
    NotFound,

    #[error("Phone number already registered")]
    Conflict,

    /// The record store failed while performing `action`.
    #[error("{action}: {source}")]
    Store {
        action: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Builds a mapper from [`StoreError`] tagged with the failing action.
    pub fn store(action: &'static str) -> impl FnOnce(StoreError) -> AppError {
        move |e| match e {
            StoreError::DuplicatePhone => AppError::Conflict,
            StoreError::Backend(source) => AppError::Store { action, source },
            cast @ StoreError::Cast { .. } => AppError::Store {
                action,
                source: cast.into(),
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Conflict => StatusCode::CONFLICT,
            AppError::Store { .. } | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Store { action, source } => {
                let details = format!("{source:#}");
                error!(error = %details, action, "store failure");
                json!({ "error": action, "details": details })
            }
            AppError::Internal(e) => {
                let details = format!("{e:#}");
                error!(error = %details, "internal error");
                json!({ "error": "Internal error", "details": details })
            }
            other => {
                warn!(%status, error = %other, "request rejected");
                json!({ "error": other.to_string() })
            }
        };
        (status, Json(body)).into_response()
    }
}
