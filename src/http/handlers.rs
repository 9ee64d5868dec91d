//! Demo application handlers.
//!
//! Small enough to exercise every interceptor path: success with and
//! without a body, handler errors, and transaction annotation.

use axum::{
    body::Bytes,
    extract::{Path, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use opentelemetry::KeyValue;
use serde_json::{json, Value};
use thiserror::Error;

use crate::apm::TransactionExt;
use crate::interceptor::HandlerError;

/// Application errors rendered as responses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("item {0} not found")]
    NotFound(u64),

    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let mut response = (status, self.to_string()).into_response();
        response.extensions_mut().insert(HandlerError::new(&self));
        response
    }
}

/// Routes of the demo application.
pub fn routes() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/items", post(create_item))
        .route("/items/{id}", get(get_item).delete(delete_item))
        .route("/boom", get(boom))
}

async fn health() -> &'static str {
    "ok"
}

async fn get_item(Path(id): Path<u64>, request: Request) -> Result<Json<Value>, ApiError> {
    if let Some(txn) = request.transaction() {
        txn.add_attribute(KeyValue::new("item.id", id as i64));
    }
    if id == 0 {
        return Err(ApiError::NotFound(id));
    }
    Ok(Json(json!({ "id": id })))
}

async fn create_item(body: Bytes) -> (StatusCode, Json<Value>) {
    (StatusCode::CREATED, Json(json!({ "received": body.len() })))
}

async fn delete_item(Path(_id): Path<u64>) -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn boom() -> Result<(), ApiError> {
    Err(ApiError::Internal("boom".to_string()))
}
