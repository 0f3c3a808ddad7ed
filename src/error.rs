use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(
        "bad request: shift {shift_id} cannot end while {} order(s) are still open: {}",
        .order_ids.len(),
        join_ids(.order_ids)
    )]
    OpenOrders { shift_id: Uuid, order_ids: Vec<Uuid> },

    #[error("internal error: {0}")]
    Internal(String),
}

/// The closed set of outcomes the transport layer distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    Validation,
    Conflict,
    BadRequest,
    Internal,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::Conflict(_) => ErrorKind::Conflict,
            AppError::BadRequest(_) | AppError::OpenOrders { .. } => ErrorKind::BadRequest,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }
}

fn join_ids(ids: &[Uuid]) -> String {
    ids.iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(constraint) => AppError::Conflict(format!(
                "duplicate value violates unique constraint: {constraint}"
            )),
            StoreError::ForeignKeyViolation(constraint) => AppError::Conflict(format!(
                "row is still referenced: {constraint}"
            )),
            StoreError::CheckViolation(constraint) => AppError::Validation(format!(
                "value violates check constraint: {constraint}"
            )),
            StoreError::RowNotFound { table, id } => {
                AppError::NotFound(format!("{table} row {id} not found"))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = match kind {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match &self {
            AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::Conflict(msg)
            | AppError::BadRequest(msg) => json!({ "error": msg, "code": kind }),
            AppError::OpenOrders { order_ids, .. } => json!({
                "error": self.to_string(),
                "code": kind,
                "order_ids": order_ids,
            }),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                json!({ "error": "an internal error occurred", "code": kind })
            }
        };

        (status, Json(body)).into_response()
    }
}
