//! Session identity.
//!
//! The core only needs an opaque, stable identifier per client. Clients get
//! one from `POST /session` and send it back in the `x-session-id` header.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/session` | Returns 201 + `{"session_id":"..."}` |

use std::convert::Infallible;

use axum::{
  Json,
  extract::FromRequestParts,
  http::{StatusCode, request::Parts},
  response::IntoResponse,
};
use raffle_core::{Error as CoreError, ticket::BuyerId};
use serde::Serialize;

use crate::error::ApiError;

/// Header carrying the caller's session identifier.
pub const SESSION_HEADER: &str = "x-session-id";

fn session_from(parts: &Parts) -> Option<&str> {
  parts
    .headers
    .get(SESSION_HEADER)
    .and_then(|v| v.to_str().ok())
    .map(str::trim)
    .filter(|s| !s.is_empty())
}

/// A required session. Rejects with `invalid_input` when the header is
/// missing or blank.
pub struct Session(pub BuyerId);

impl<St: Send + Sync> FromRequestParts<St> for Session {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _: &St) -> Result<Self, Self::Rejection> {
    let raw = session_from(parts).ok_or_else(|| {
      CoreError::InvalidInput(format!("missing {SESSION_HEADER} header"))
    })?;
    Ok(Session(BuyerId::new(raw)?))
  }
}

/// An optional session, used to mark the viewer's own tickets.
pub struct Viewer(pub Option<BuyerId>);

impl Viewer {
  pub fn id(&self) -> Option<&BuyerId> { self.0.as_ref() }
}

impl<St: Send + Sync> FromRequestParts<St> for Viewer {
  type Rejection = Infallible;

  async fn from_request_parts(parts: &mut Parts, _: &St) -> Result<Self, Self::Rejection> {
    Ok(Viewer(session_from(parts).and_then(|s| BuyerId::new(s).ok())))
  }
}

#[derive(Debug, Serialize)]
pub struct SessionBody {
  pub session_id: BuyerId,
}

/// `POST /session` — mint a fresh anonymous session id.
pub async fn create() -> impl IntoResponse {
  (StatusCode::CREATED, Json(SessionBody { session_id: BuyerId::generate() }))
}
