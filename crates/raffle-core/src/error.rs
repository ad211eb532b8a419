//! Error types for `raffle-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("ticket {0} does not exist in this raffle")]
  UnknownTicket(u32),

  #[error("ticket {0} is already sold")]
  AlreadySold(u32),

  /// Another purchase for the same ticket committed between our read and our
  /// conditional write.
  #[error("ticket {0} was sold to another buyer while this purchase was in flight")]
  Conflict(u32),

  #[error("ticket sales are closed: the winner has been drawn")]
  SalesClosed,

  #[error("no tickets have been sold")]
  NoSoldTickets,

  #[error("the raffle has already been drawn (winning ticket {0})")]
  AlreadyDrawn(u32),

  #[error("store unavailable: {0}")]
  StoreUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error. Every store failure is treated as transient.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::StoreUnavailable(Box::new(err))
  }

  /// `true` when the caller lost a race for a ticket and should pick a
  /// different one rather than retry.
  pub fn is_race_lost(&self) -> bool {
    matches!(self, Self::AlreadySold(_) | Self::Conflict(_))
  }

  /// `true` when retrying the same call later may succeed.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::StoreUnavailable(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
