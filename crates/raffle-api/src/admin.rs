//! Operator handlers. These expose buyer contact and payout details, so the
//! router built from them must sit behind authentication.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/admin/draw` | Draw the winner; 201 + full [`RaffleInfo`] |
//! | `GET`  | `/admin/raffle` | Full raffle record; 404 before the first draw |
//! | `GET`  | `/admin/tickets` | Sold tickets; `?buyer_id=&limit=&offset=` |

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use raffle_core::{
  raffle::RaffleInfo,
  store::{TicketQuery, TicketStore},
  ticket::{BuyerId, SoldTicket},
};
use serde::Deserialize;

use crate::{ApiState, error::ApiError};

/// `POST /admin/draw`
pub async fn draw<S>(State(state): State<ApiState<S>>) -> Result<impl IntoResponse, ApiError>
where
  S: TicketStore,
{
  let info = state.draws.draw_winner().await?;
  Ok((StatusCode::CREATED, Json(info)))
}

/// `GET /admin/raffle`
pub async fn raffle_info<S>(
  State(state): State<ApiState<S>>,
) -> Result<Json<RaffleInfo>, ApiError>
where
  S: TicketStore,
{
  state
    .draws
    .raffle_info()
    .await?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound("no winner has been drawn yet".into()))
}

#[derive(Debug, Default, Deserialize)]
pub struct SoldParams {
  pub buyer_id: Option<String>,
  pub limit:    Option<usize>,
  pub offset:   Option<usize>,
}

/// `GET /admin/tickets`
pub async fn sold_tickets<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<SoldParams>,
) -> Result<Json<Vec<SoldTicket>>, ApiError>
where
  S: TicketStore,
{
  let query = TicketQuery {
    buyer_id: params.buyer_id.map(BuyerId::new).transpose()?,
    limit:    params.limit,
    offset:   params.offset,
  };
  Ok(Json(state.tickets.sold_tickets(&query).await?))
}
