//! The `TicketStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `raffle-store-sqlite`).
//! Higher layers (`raffle-api`, `raffle-server`) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use crate::{
  feed::Subscription,
  raffle::{RaffleInfo, WinnerGuard, WinnerRecord},
  ticket::{BuyerId, SoldTicket},
};

// ─── Conditional writes ──────────────────────────────────────────────────────

/// Precondition on the current record for a ticket number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
  /// No record exists, i.e. the ticket is available.
  Absent,
  /// No record exists and the raffle has no winner yet. Both conditions are
  /// evaluated atomically with the write.
  AbsentWhileOpen,
  /// A record already exists.
  Present,
}

/// Result of a conditional write that reached the store.
///
/// A failed precondition is an ordinary outcome, not an error: backends
/// reserve `Self::Error` for infrastructure failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum WriteOutcome {
  Committed,
  Conflict,
  /// [`Expect::AbsentWhileOpen`] found a winner already recorded.
  Closed,
}

impl WriteOutcome {
  pub fn is_committed(self) -> bool { matches!(self, Self::Committed) }
}

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`TicketStore::query`]. Results are ordered by number.
#[derive(Debug, Clone, Default)]
pub struct TicketQuery {
  /// Restrict to tickets bought by one session.
  pub buyer_id: Option<BuyerId>,
  pub limit:    Option<usize>,
  pub offset:   Option<usize>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a raffle store backend.
///
/// The store is sparse: only sold tickets have records. Writes are
/// conditional and atomic per key; there is no unconditional ticket write.
/// Every committed change is published to the matching feed after commit, in
/// commit order.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait TicketStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Tickets ───────────────────────────────────────────────────────────

  /// Return the record for `number`, or `None` if it is available.
  fn get_ticket(
    &self,
    number: u32,
  ) -> impl Future<Output = Result<Option<SoldTicket>, Self::Error>> + Send + '_;

  /// Write `ticket` only if the current state of its number matches
  /// `expect` at commit time.
  fn conditional_set(
    &self,
    ticket: SoldTicket,
    expect: Expect,
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + '_;

  /// Return every sold ticket matching `query`.
  fn query<'a>(
    &'a self,
    query: &'a TicketQuery,
  ) -> impl Future<Output = Result<Vec<SoldTicket>, Self::Error>> + Send + 'a;

  // ── Raffle singleton ──────────────────────────────────────────────────

  /// Return the raffle record, or `None` before the first draw.
  fn get_raffle_info(
    &self,
  ) -> impl Future<Output = Result<Option<RaffleInfo>, Self::Error>> + Send + '_;

  /// Merge a winner into the raffle record, creating it if needed, and
  /// increment its draw counter. Returns the record as committed, or `None`
  /// when `guard` rejected the write.
  fn record_draw(
    &self,
    winner: WinnerRecord,
    guard: WinnerGuard,
  ) -> impl Future<Output = Result<Option<RaffleInfo>, Self::Error>> + Send + '_;

  // ── Change feeds ──────────────────────────────────────────────────────

  fn subscribe_tickets(&self) -> Subscription<SoldTicket>;

  fn subscribe_raffle(&self) -> Subscription<RaffleInfo>;
}
