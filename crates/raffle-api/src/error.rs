//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error body is `{"error": "<message>", "kind": "<kind>"}`. `kind`
//! lets a client tell "pick another ticket" (`already_sold`, `conflict`) from
//! "try again later" (`store_unavailable`).

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use raffle_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error(transparent)]
  Core(#[from] CoreError),
}

impl ApiError {
  fn parts(&self) -> (StatusCode, &'static str, String) {
    match self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.clone()),
      ApiError::Core(e) => match e {
        CoreError::InvalidInput(m) => (StatusCode::BAD_REQUEST, "invalid_input", m.clone()),
        CoreError::UnknownTicket(_) => (StatusCode::NOT_FOUND, "unknown_ticket", e.to_string()),
        CoreError::AlreadySold(n) => (
          StatusCode::CONFLICT,
          "already_sold",
          format!("ticket {n} is no longer available; pick another ticket"),
        ),
        CoreError::Conflict(n) => (
          StatusCode::CONFLICT,
          "conflict",
          format!("ticket {n} is no longer available; pick another ticket"),
        ),
        CoreError::SalesClosed => (StatusCode::CONFLICT, "sales_closed", e.to_string()),
        CoreError::AlreadyDrawn(_) => (StatusCode::CONFLICT, "already_drawn", e.to_string()),
        CoreError::NoSoldTickets => {
          (StatusCode::UNPROCESSABLE_ENTITY, "no_sold_tickets", e.to_string())
        }
        CoreError::StoreUnavailable(_) => (
          StatusCode::SERVICE_UNAVAILABLE,
          "store_unavailable",
          "the ticket store is unavailable; try again later".to_owned(),
        ),
      },
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    if let ApiError::Core(e @ CoreError::StoreUnavailable(_)) = &self {
      tracing::error!(error = %e, "store failure");
    }
    let (status, kind, message) = self.parts();
    (status, Json(json!({ "error": message, "kind": kind }))).into_response()
  }
}
