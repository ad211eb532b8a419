//! Per-raffle settings and policies.

use serde::Deserialize;
use strum::{Display, EnumString};

use crate::{Error, Result};

/// Largest raffle a single store is configured for.
pub const MAX_TOTAL_TICKETS: u32 = 100_000;

/// What a second call to draw a winner does.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RedrawPolicy {
  /// The first draw is final; later draws fail with `AlreadyDrawn`.
  #[default]
  Final,
  /// Every draw picks afresh and overwrites the previous winner.
  Allow,
}

/// Whether tickets may still be bought once a winner exists.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SalesAfterDraw {
  #[default]
  Reject,
  Allow,
}

/// Settings for one raffle.
#[derive(Debug, Clone, Deserialize)]
pub struct RaffleConfig {
  /// Tickets are numbered `1..=total_tickets`.
  #[serde(default = "default_total_tickets")]
  pub total_tickets:    u32,
  #[serde(default)]
  pub redraw:           RedrawPolicy,
  #[serde(default)]
  pub sales_after_draw: SalesAfterDraw,
}

fn default_total_tickets() -> u32 { 150 }

impl Default for RaffleConfig {
  fn default() -> Self {
    Self {
      total_tickets:    default_total_tickets(),
      redraw:           RedrawPolicy::default(),
      sales_after_draw: SalesAfterDraw::default(),
    }
  }
}

impl RaffleConfig {
  pub fn with_total_tickets(total_tickets: u32) -> Self {
    Self { total_tickets, ..Self::default() }
  }

  pub fn contains(&self, number: u32) -> bool {
    (1..=self.total_tickets).contains(&number)
  }

  /// Reject ticket counts outside `1..=MAX_TOTAL_TICKETS`.
  pub fn validate(&self) -> Result<()> {
    if !(1..=MAX_TOTAL_TICKETS).contains(&self.total_tickets) {
      return Err(Error::InvalidInput(format!(
        "total_tickets must be between 1 and {MAX_TOTAL_TICKETS}, got {}",
        self.total_tickets
      )));
    }
    Ok(())
  }
}
