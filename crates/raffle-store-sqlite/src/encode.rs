//! Encoding and decoding helpers between raffle domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings. Ticket numbers and counters are
//! stored as integers.

use chrono::{DateTime, Utc};
use raffle_core::{
  raffle::{RaffleInfo, WinnerSummary},
  ticket::{Buyer, BuyerId, SoldTicket},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const TICKET_COLUMNS: &str =
  "number, buyer_id, buyer_name, buyer_contact, payout_key, purchased_at";

/// Raw values read directly from a `tickets` row.
pub struct RawTicket {
  pub number:        u32,
  pub buyer_id:      String,
  pub buyer_name:    String,
  pub buyer_contact: String,
  pub payout_key:    String,
  pub purchased_at:  String,
}

impl RawTicket {
  /// Read a row selected with [`TICKET_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      number:        row.get(0)?,
      buyer_id:      row.get(1)?,
      buyer_name:    row.get(2)?,
      buyer_contact: row.get(3)?,
      payout_key:    row.get(4)?,
      purchased_at:  row.get(5)?,
    })
  }

  pub fn into_ticket(self) -> Result<SoldTicket> {
    Ok(SoldTicket {
      number:       self.number,
      buyer:        Buyer {
        buyer_id:   BuyerId::new(self.buyer_id)?,
        name:       self.buyer_name,
        contact:    self.buyer_contact,
        payout_key: self.payout_key,
      },
      purchased_at: decode_dt(&self.purchased_at)?,
    })
  }
}

pub const RAFFLE_COLUMNS: &str = "winner_ticket_number, winner_name, \
                                  winner_contact, winner_payout_key, drawn_at, \
                                  draws";

/// Raw values read directly from the `raffle_info` row.
pub struct RawRaffleInfo {
  pub winner_ticket_number: Option<u32>,
  pub winner_name:          Option<String>,
  pub winner_contact:       Option<String>,
  pub winner_payout_key:    Option<String>,
  pub drawn_at:             Option<String>,
  pub draws:                u32,
}

impl RawRaffleInfo {
  /// Read a row selected with [`RAFFLE_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      winner_ticket_number: row.get(0)?,
      winner_name:          row.get(1)?,
      winner_contact:       row.get(2)?,
      winner_payout_key:    row.get(3)?,
      drawn_at:             row.get(4)?,
      draws:                row.get(5)?,
    })
  }

  pub fn into_info(self) -> Result<RaffleInfo> {
    let winner_summary = match (self.winner_name, self.winner_contact, self.winner_payout_key) {
      (Some(name), Some(contact), Some(payout_key)) => {
        Some(WinnerSummary { name, contact, payout_key })
      }
      (None, None, None) => None,
      _ => return Err(Error::CorruptRow("partial winner summary in raffle_info".into())),
    };

    if winner_summary.is_some() != self.winner_ticket_number.is_some() {
      return Err(Error::CorruptRow(
        "winner number and summary must be set together".into(),
      ));
    }

    Ok(RaffleInfo {
      winner_ticket_number: self.winner_ticket_number,
      winner_summary,
      draw_timestamp: self.drawn_at.as_deref().map(decode_dt).transpose()?,
      draws: self.draws,
    })
  }
}
