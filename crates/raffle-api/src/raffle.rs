//! Handlers for `/raffle` endpoints. Everything here is the public projection:
//! no winner details ever leave through these routes.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/raffle` | 404 until the first draw creates the record |
//! | `GET`  | `/raffle/events` | SSE: current `raffle` state first (if any), then one per change |

use axum::{
  Json,
  extract::State,
  response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt as _, stream};
use raffle_core::{
  draw::DrawService,
  feed::{Delivery, Subscription},
  raffle::{PublicRaffleInfo, RaffleInfo},
  store::TicketStore,
};

use crate::{ApiState, error::ApiError};

/// `GET /raffle`
pub async fn get_public<S>(
  State(state): State<ApiState<S>>,
) -> Result<Json<PublicRaffleInfo>, ApiError>
where
  S: TicketStore,
{
  let info = state
    .draws
    .public_info()
    .await?
    .ok_or_else(|| ApiError::NotFound("no winner has been drawn yet".into()))?;
  Ok(Json(info))
}

fn raffle_event(info: &PublicRaffleInfo) -> Result<Event, axum::Error> {
  Event::default().event("raffle").json_data(info)
}

struct RaffleFeed<S> {
  service:      DrawService<S>,
  subscription: Subscription<RaffleInfo>,
}

impl<S: TicketStore> RaffleFeed<S> {
  async fn next(mut self) -> Option<(Result<Event, axum::Error>, Self)> {
    let info = match self.subscription.recv().await? {
      Delivery::Change(info) => info.public(),
      // The record is a singleton, so the latest state replaces everything
      // that was missed.
      Delivery::Resync { .. } => match self.service.public_info().await {
        Ok(Some(info)) => info,
        Ok(None) => return None,
        Err(e) => {
          tracing::warn!(error = %e, "raffle resync failed; closing stream");
          return None;
        }
      },
    };
    Some((raffle_event(&info), self))
  }
}

/// `GET /raffle/events` — `SubscribeRaffleInfo` as server-sent events.
pub async fn events<S>(
  State(state): State<ApiState<S>>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError>
where
  S: TicketStore + 'static,
{
  let subscription = state.draws.subscribe();
  let current = state.draws.public_info().await?;

  let first = stream::iter(current.as_ref().map(raffle_event));
  let feed = RaffleFeed { service: state.draws, subscription };
  let rest = stream::unfold(feed, RaffleFeed::next);

  Ok(Sse::new(first.chain(rest)).keep_alive(KeepAlive::default()))
}
