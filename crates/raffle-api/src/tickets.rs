//! Handlers for `/tickets` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/tickets` | Every ticket `1..=N`; `mine` set for the `x-session-id` viewer |
//! | `GET`  | `/tickets/events` | SSE: `snapshot` first, then one `ticket` event per sale |
//! | `GET`  | `/tickets/mine` | Sold tickets of the session, with details; session required |
//! | `GET`  | `/tickets/:number` | Public projection of one ticket |
//! | `POST` | `/tickets/:number/purchase` | Body: [`PurchaseBody`]; session required; 201 + record |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::{
    IntoResponse,
    sse::{Event, KeepAlive, Sse},
  },
};
use futures::{Stream, StreamExt as _, stream};
use raffle_core::{
  allocation::AllocationService,
  board::TicketBoard,
  feed::{Delivery, Subscription},
  store::TicketStore,
  ticket::{BuyerId, PurchaseRequest, SoldTicket, Ticket, TicketSnapshot},
};
use serde::Deserialize;

use crate::{
  ApiState,
  error::ApiError,
  session::{Session, Viewer},
};

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /tickets`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  viewer: Viewer,
) -> Result<Json<Vec<TicketSnapshot>>, ApiError>
where
  S: TicketStore,
{
  let board = state.tickets.snapshot().await?;
  Ok(Json(board.view(viewer.id())))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /tickets/:number`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(number): Path<u32>,
  viewer: Viewer,
) -> Result<Json<TicketSnapshot>, ApiError>
where
  S: TicketStore,
{
  let ticket = state.tickets.ticket(number).await?;
  Ok(Json(ticket.snapshot(viewer.id())))
}

// ─── Mine ─────────────────────────────────────────────────────────────────────

/// `GET /tickets/mine`
pub async fn mine<S>(
  State(state): State<ApiState<S>>,
  Session(buyer_id): Session,
) -> Result<Json<Vec<SoldTicket>>, ApiError>
where
  S: TicketStore,
{
  Ok(Json(state.tickets.tickets_of(&buyer_id).await?))
}

// ─── Purchase ─────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /tickets/:number/purchase`. The buyer id comes
/// from the session header, never from the body. A missing field reads as
/// blank and is rejected by validation like any other blank field.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PurchaseBody {
  pub buyer_name:    String,
  pub buyer_contact: String,
  pub payout_key:    String,
}

/// `POST /tickets/:number/purchase` — returns 201 + the committed
/// [`SoldTicket`].
///
/// A lost race answers 409 with kind `already_sold` or `conflict`; the
/// client should pick a different ticket rather than retry this one.
pub async fn purchase<S>(
  State(state): State<ApiState<S>>,
  Path(number): Path<u32>,
  Session(buyer_id): Session,
  Json(body): Json<PurchaseBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: TicketStore,
{
  let request = PurchaseRequest {
    number,
    buyer_id:      buyer_id.as_str().to_owned(),
    buyer_name:    body.buyer_name,
    buyer_contact: body.buyer_contact,
    payout_key:    body.payout_key,
  };
  let ticket = state.tickets.purchase_ticket(request).await?;
  Ok((StatusCode::CREATED, Json(ticket)))
}

// ─── Events ───────────────────────────────────────────────────────────────────

struct TicketFeed<S> {
  service:      AllocationService<S>,
  subscription: Subscription<SoldTicket>,
  board:        TicketBoard,
  viewer:       Option<BuyerId>,
}

fn snapshot_event(board: &TicketBoard, viewer: Option<&BuyerId>) -> Result<Event, axum::Error> {
  Event::default().event("snapshot").json_data(board.view(viewer))
}

impl<S: TicketStore> TicketFeed<S> {
  /// Wait for the next event worth sending. `None` ends the stream.
  async fn next(mut self) -> Option<(Result<Event, axum::Error>, Self)> {
    loop {
      match self.subscription.recv().await? {
        Delivery::Change(ticket) => {
          // Already reflected in the board if it landed before the snapshot.
          if !self.board.apply(&ticket) {
            continue;
          }
          let snapshot = Ticket::Sold(ticket).snapshot(self.viewer.as_ref());
          let event = Event::default().event("ticket").json_data(snapshot);
          return Some((event, self));
        }
        Delivery::Resync { missed } => match self.service.snapshot().await {
          Ok(board) => {
            tracing::debug!(missed, "resending ticket snapshot");
            self.board = board;
            let event = snapshot_event(&self.board, self.viewer.as_ref());
            return Some((event, self));
          }
          Err(e) => {
            tracing::warn!(error = %e, "ticket resync failed; closing stream");
            return None;
          }
        },
      }
    }
  }
}

/// `GET /tickets/events` — `SubscribeTickets` as server-sent events.
///
/// The first event is a full `snapshot`; each later `ticket` event carries one
/// newly sold ticket. A `snapshot` is sent again whenever the subscriber fell
/// behind the feed.
pub async fn events<S>(
  State(state): State<ApiState<S>>,
  viewer: Viewer,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError>
where
  S: TicketStore + 'static,
{
  // Subscribe before the snapshot so no sale can fall between them.
  let subscription = state.tickets.subscribe();
  let board = state.tickets.snapshot().await?;
  let first = snapshot_event(&board, viewer.id());

  let feed = TicketFeed {
    service: state.tickets,
    subscription,
    board,
    viewer: viewer.0,
  };
  let rest = stream::unfold(feed, TicketFeed::next);

  Ok(Sse::new(stream::once(async move { first }).chain(rest)).keep_alive(KeepAlive::default()))
}
