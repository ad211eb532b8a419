//! Raffle-level state: the singleton winner record and its public projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ticket::SoldTicket;

/// Where a raffle is in its lifecycle. `Open -> Drawn` is the only transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RaffleStatus {
  Open,
  Drawn,
}

/// Buyer details of the winning ticket. Operator-facing only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerSummary {
  pub name:       String,
  pub contact:    String,
  pub payout_key: String,
}

/// The singleton raffle record, created by the first draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaffleInfo {
  pub winner_ticket_number: Option<u32>,
  pub winner_summary:       Option<WinnerSummary>,
  pub draw_timestamp:       Option<DateTime<Utc>>,
  /// How many draws have been recorded. Greater than one only when redraws
  /// are allowed.
  pub draws:                u32,
}

impl RaffleInfo {
  pub fn status(&self) -> RaffleStatus {
    if self.winner_ticket_number.is_some() {
      RaffleStatus::Drawn
    } else {
      RaffleStatus::Open
    }
  }

  /// Strip the winner summary for broadcast to the general audience.
  pub fn public(&self) -> PublicRaffleInfo {
    PublicRaffleInfo {
      status:               self.status(),
      winner_ticket_number: self.winner_ticket_number,
      draw_timestamp:       self.draw_timestamp,
    }
  }
}

/// The view of [`RaffleInfo`] handed to every observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicRaffleInfo {
  pub status:               RaffleStatus,
  pub winner_ticket_number: Option<u32>,
  pub draw_timestamp:       Option<DateTime<Utc>>,
}

/// The winner fields written by one draw. Merged into the stored
/// [`RaffleInfo`]; unrelated fields are left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinnerRecord {
  pub ticket_number: u32,
  pub summary:       WinnerSummary,
  pub drawn_at:      DateTime<Utc>,
}

impl WinnerRecord {
  pub fn from_ticket(ticket: &SoldTicket, drawn_at: DateTime<Utc>) -> Self {
    Self {
      ticket_number: ticket.number,
      summary:       WinnerSummary {
        name:       ticket.buyer.name.clone(),
        contact:    ticket.buyer.contact.clone(),
        payout_key: ticket.buyer.payout_key.clone(),
      },
      drawn_at,
    }
  }
}

/// Precondition for [`crate::store::TicketStore::record_draw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinnerGuard {
  /// Commit only if no winner is recorded yet.
  RequireOpen,
  /// Overwrite any existing winner.
  Overwrite,
}
