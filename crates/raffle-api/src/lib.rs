//! JSON and server-sent-event API for the raffle.
//!
//! Exposes two axum [`Router`]s backed by any
//! [`raffle_core::store::TicketStore`]:
//!
//! - [`public_router`] — ticket board, purchases, raffle status, live feeds.
//! - [`admin_router`] — drawing the winner and reading buyer details.
//!
//! Neither router authenticates anyone. The admin router must be mounted
//! behind an access policy; auth, TLS, and transport concerns are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", raffle_api::public_router(state.clone()))
//! ```

pub mod admin;
pub mod error;
pub mod raffle;
pub mod session;
pub mod tickets;


use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use raffle_core::{
  allocation::AllocationService, config::RaffleConfig, draw::DrawService, store::TicketStore,
};

pub use error::ApiError;

/// Services shared by every handler.
pub struct ApiState<S> {
  pub tickets: AllocationService<S>,
  pub draws:   DrawService<S>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self { tickets: self.tickets.clone(), draws: self.draws.clone() }
  }
}

impl<S: TicketStore> ApiState<S> {
  /// Build both services around one shared store handle.
  pub fn new(store: Arc<S>, config: RaffleConfig) -> Self {
    let draws = DrawService::new(Arc::clone(&store), config.clone());
    Self { tickets: AllocationService::new(store, config), draws }
  }
}

/// Build the public router. Safe to expose to untrusted clients.
pub fn public_router<S>(state: ApiState<S>) -> Router<()>
where
  S: TicketStore + 'static,
{
  Router::new()
    .route("/session", post(session::create))
    // Tickets
    .route("/tickets", get(tickets::list::<S>))
    .route("/tickets/events", get(tickets::events::<S>))
    .route("/tickets/mine", get(tickets::mine::<S>))
    .route("/tickets/{number}", get(tickets::get_one::<S>))
    .route("/tickets/{number}/purchase", post(tickets::purchase::<S>))
    // Raffle
    .route("/raffle", get(raffle::get_public::<S>))
    .route("/raffle/events", get(raffle::events::<S>))
    .with_state(state)
}

/// Build the operator router. Mount it behind authentication.
pub fn admin_router<S>(state: ApiState<S>) -> Router<()>
where
  S: TicketStore + 'static,
{
  Router::new()
    .route("/admin/draw", post(admin::draw::<S>))
    .route("/admin/raffle", get(admin::raffle_info::<S>))
    .route("/admin/tickets", get(admin::sold_tickets::<S>))
    .with_state(state)
}
