//! Ticket types: the unit of allocation in a raffle.
//!
//! A raffle has a fixed population of tickets numbered `1..=N`. The store is
//! sparse: only sold tickets are persisted, and a number with no record is
//! available. A ticket goes from available to sold exactly once and never
//! back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Identity ────────────────────────────────────────────────────────────────

/// Opaque per-session identifier for an anonymous buyer.
///
/// The value is supplied by whatever session layer fronts the raffle; the core
/// only requires it to be stable and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuyerId(String);

impl BuyerId {
  /// Wrap an existing identifier. Fails on an empty or blank string.
  pub fn new(id: impl Into<String>) -> Result<Self> {
    let id = id.into();
    if id.trim().is_empty() {
      return Err(Error::InvalidInput("buyer id must not be empty".into()));
    }
    Ok(Self(id))
  }

  /// Mint a fresh anonymous identifier.
  pub fn generate() -> Self { Self(Uuid::new_v4().hyphenated().to_string()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl std::fmt::Display for BuyerId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// Buyer-supplied details, recorded atomically with the sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buyer {
  pub buyer_id:   BuyerId,
  pub name:       String,
  pub contact:    String,
  /// Where the buyer wants to be paid out if they win.
  pub payout_key: String,
}

/// The persisted record of a sold ticket. Never updated after commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoldTicket {
  pub number:       u32,
  pub buyer:        Buyer,
  pub purchased_at: DateTime<Utc>,
}

/// The materialised state of one ticket number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Ticket {
  Available { number: u32 },
  Sold(SoldTicket),
}

impl Ticket {
  /// Build the view of `number` from an optional store record.
  pub fn from_record(number: u32, record: Option<SoldTicket>) -> Self {
    match record {
      Some(sold) => Self::Sold(sold),
      None => Self::Available { number },
    }
  }

  pub fn number(&self) -> u32 {
    match self {
      Self::Available { number } => *number,
      Self::Sold(sold) => sold.number,
    }
  }

  pub fn is_sold(&self) -> bool { matches!(self, Self::Sold(_)) }

  /// The public projection of this ticket as seen by `viewer`.
  pub fn snapshot(&self, viewer: Option<&BuyerId>) -> TicketSnapshot {
    match self {
      Self::Available { number } => TicketSnapshot {
        number: *number,
        sold:   false,
        mine:   false,
      },
      Self::Sold(sold) => TicketSnapshot {
        number: sold.number,
        sold:   true,
        mine:   viewer == Some(&sold.buyer.buyer_id),
      },
    }
  }
}

/// What observers are told about a ticket. Buyer details never leave the
/// core through this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketSnapshot {
  pub number: u32,
  pub sold:   bool,
  /// Whether the viewing session bought this ticket.
  pub mine:   bool,
}

// ─── Purchase input ──────────────────────────────────────────────────────────

/// Input to [`crate::allocation::AllocationService::purchase_ticket`].
/// `purchased_at` is always assigned by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseRequest {
  pub number:        u32,
  pub buyer_id:      String,
  pub buyer_name:    String,
  pub buyer_contact: String,
  pub payout_key:    String,
}

impl PurchaseRequest {
  /// Check that every string field is non-blank and build the [`Buyer`].
  ///
  /// Fields are trimmed; the error names the first empty field.
  pub fn validate(&self) -> Result<Buyer> {
    let fields = [
      ("buyer_id", &self.buyer_id),
      ("buyer_name", &self.buyer_name),
      ("buyer_contact", &self.buyer_contact),
      ("payout_key", &self.payout_key),
    ];
    if let Some((field, _)) = fields.iter().find(|(_, v)| v.trim().is_empty()) {
      return Err(Error::InvalidInput(format!("{field} must not be empty")));
    }

    Ok(Buyer {
      buyer_id:   BuyerId::new(self.buyer_id.trim())?,
      name:       self.buyer_name.trim().to_owned(),
      contact:    self.buyer_contact.trim().to_owned(),
      payout_key: self.payout_key.trim().to_owned(),
    })
  }
}
