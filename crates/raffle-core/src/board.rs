//! A client's cached view of ticket availability.
//!
//! The board is what ticket selection is checked against. It is built from a
//! store snapshot and kept current by applying changes from the ticket feed.
//! It is advisory: the conditional write in the allocation service is the
//! only authoritative check.

use crate::{
  Error, Result,
  ticket::{BuyerId, SoldTicket, TicketSnapshot},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketBoard {
  /// Index `n - 1` holds the buyer of ticket `n`, if sold.
  slots: Vec<Option<BuyerId>>,
}

impl TicketBoard {
  /// A board of `total` tickets, all available.
  pub fn new(total: u32) -> Self { Self { slots: vec![None; total as usize] } }

  /// A board of `total` tickets with `sold` already applied.
  pub fn from_sold<'a>(
    total: u32,
    sold: impl IntoIterator<Item = &'a SoldTicket>,
  ) -> Self {
    let mut board = Self::new(total);
    for ticket in sold {
      board.apply(ticket);
    }
    board
  }

  pub fn total(&self) -> u32 { self.slots.len() as u32 }

  fn slot(&self, number: u32) -> Option<&Option<BuyerId>> {
    number.checked_sub(1).and_then(|i| self.slots.get(i as usize))
  }

  /// Record a sale. Returns `true` if the board changed.
  ///
  /// Sold slots never revert, and a later record for an already-sold number
  /// is ignored. Numbers outside the board are ignored.
  pub fn apply(&mut self, ticket: &SoldTicket) -> bool {
    let Some(index) = ticket.number.checked_sub(1) else {
      return false;
    };
    match self.slots.get_mut(index as usize) {
      Some(slot) if slot.is_none() => {
        *slot = Some(ticket.buyer.buyer_id.clone());
        true
      }
      _ => false,
    }
  }

  pub fn is_sold(&self, number: u32) -> bool {
    matches!(self.slot(number), Some(Some(_)))
  }

  /// Select a ticket for purchase.
  ///
  /// Rejected with [`Error::AlreadySold`] if this view already shows it sold.
  pub fn select(&self, number: u32) -> Result<u32> {
    match self.slot(number) {
      None => Err(Error::UnknownTicket(number)),
      Some(Some(_)) => Err(Error::AlreadySold(number)),
      Some(None) => Ok(number),
    }
  }

  pub fn snapshot_of(&self, number: u32, viewer: Option<&BuyerId>) -> Option<TicketSnapshot> {
    self.slot(number).map(|slot| TicketSnapshot {
      number,
      sold: slot.is_some(),
      mine: slot.is_some() && slot.as_ref() == viewer,
    })
  }

  /// Every ticket in number order, projected for `viewer`.
  pub fn view(&self, viewer: Option<&BuyerId>) -> Vec<TicketSnapshot> {
    self
      .slots
      .iter()
      .zip(1u32..)
      .map(|(slot, number)| TicketSnapshot {
        number,
        sold: slot.is_some(),
        mine: slot.is_some() && slot.as_ref() == viewer,
      })
      .collect()
  }

  /// Numbers still shown as available.
  pub fn available(&self) -> impl Iterator<Item = u32> + '_ {
    self
      .slots
      .iter()
      .zip(1u32..)
      .filter(|(slot, _)| slot.is_none())
      .map(|(_, number)| number)
  }

  pub fn sold_count(&self) -> usize { self.slots.iter().filter(|s| s.is_some()).count() }
}
