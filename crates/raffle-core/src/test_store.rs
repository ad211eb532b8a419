//! In-memory [`TicketStore`] used by the unit tests in this crate.

use std::{
  collections::BTreeMap,
  sync::{
    Mutex,
    atomic::{AtomicBool, Ordering},
  },
};

use crate::{
  feed::{ChangeFeed, Subscription},
  raffle::{RaffleInfo, WinnerGuard, WinnerRecord},
  store::{Expect, TicketQuery, TicketStore, WriteOutcome},
  ticket::SoldTicket,
};

#[derive(Debug, thiserror::Error)]
#[error("memory store is offline")]
pub struct Offline;

#[derive(Default)]
pub struct MemoryStore {
  tickets:        Mutex<BTreeMap<u32, SoldTicket>>,
  raffle:         Mutex<Option<RaffleInfo>>,
  ticket_feed:    ChangeFeed<SoldTicket>,
  raffle_feed:    ChangeFeed<RaffleInfo>,
  offline:        AtomicBool,
  /// Committed just before the next conditional write is evaluated, as if a
  /// concurrent buyer won the race.
  interloper:     Mutex<Option<SoldTicket>>,
  /// Recorded just before the next write of either kind, as if an operator
  /// drew concurrently.
  pending_draw:   Mutex<Option<WinnerRecord>>,
}

impl MemoryStore {
  pub fn set_offline(&self, offline: bool) { self.offline.store(offline, Ordering::SeqCst); }

  pub fn race_next_write_with(&self, ticket: SoldTicket) {
    *self.interloper.lock().unwrap() = Some(ticket);
  }

  pub fn draw_before_next_write(&self, winner: WinnerRecord) {
    *self.pending_draw.lock().unwrap() = Some(winner);
  }

  fn commit_pending_draw(&self) {
    if let Some(winner) = self.pending_draw.lock().unwrap().take() {
      let mut raffle = self.raffle.lock().unwrap();
      let info = raffle.get_or_insert(RaffleInfo {
        winner_ticket_number: None,
        winner_summary:       None,
        draw_timestamp:       None,
        draws:                0,
      });
      info.winner_ticket_number = Some(winner.ticket_number);
      info.winner_summary = Some(winner.summary);
      info.draw_timestamp = Some(winner.drawn_at);
      info.draws += 1;
      self.raffle_feed.publish(info.clone());
    }
  }

  pub fn len(&self) -> usize { self.tickets.lock().unwrap().len() }

  fn check(&self) -> Result<(), Offline> {
    if self.offline.load(Ordering::SeqCst) { Err(Offline) } else { Ok(()) }
  }
}

impl TicketStore for MemoryStore {
  type Error = Offline;

  async fn get_ticket(&self, number: u32) -> Result<Option<SoldTicket>, Offline> {
    self.check()?;
    Ok(self.tickets.lock().unwrap().get(&number).cloned())
  }

  async fn conditional_set(
    &self,
    ticket: SoldTicket,
    expect: Expect,
  ) -> Result<WriteOutcome, Offline> {
    self.check()?;
    self.commit_pending_draw();
    let mut tickets = self.tickets.lock().unwrap();

    if let Some(other) = self.interloper.lock().unwrap().take() {
      tickets.insert(other.number, other.clone());
      self.ticket_feed.publish(other);
    }

    // Held until the insert so no draw lands between the check and the write.
    let raffle = (expect == Expect::AbsentWhileOpen).then(|| self.raffle.lock().unwrap());

    let present = tickets.contains_key(&ticket.number);
    let ok = match expect {
      Expect::Absent => !present,
      Expect::AbsentWhileOpen => {
        let drawn = raffle
          .as_ref()
          .and_then(|r| (**r).as_ref())
          .is_some_and(|info| info.winner_ticket_number.is_some());
        if drawn {
          return Ok(WriteOutcome::Closed);
        }
        !present
      }
      Expect::Present => present,
    };
    if !ok {
      return Ok(WriteOutcome::Conflict);
    }
    tickets.insert(ticket.number, ticket.clone());
    self.ticket_feed.publish(ticket);
    Ok(WriteOutcome::Committed)
  }

  async fn query<'a>(&'a self, query: &'a TicketQuery) -> Result<Vec<SoldTicket>, Offline> {
    self.check()?;
    Ok(
      self
        .tickets
        .lock()
        .unwrap()
        .values()
        .filter(|t| query.buyer_id.as_ref().is_none_or(|id| *id == t.buyer.buyer_id))
        .skip(query.offset.unwrap_or(0))
        .take(query.limit.unwrap_or(usize::MAX))
        .cloned()
        .collect(),
    )
  }

  async fn get_raffle_info(&self) -> Result<Option<RaffleInfo>, Offline> {
    self.check()?;
    Ok(self.raffle.lock().unwrap().clone())
  }

  async fn record_draw(
    &self,
    winner: WinnerRecord,
    guard: WinnerGuard,
  ) -> Result<Option<RaffleInfo>, Offline> {
    self.check()?;
    self.commit_pending_draw();
    let mut raffle = self.raffle.lock().unwrap();
    let info = raffle.get_or_insert(RaffleInfo {
      winner_ticket_number: None,
      winner_summary:       None,
      draw_timestamp:       None,
      draws:                0,
    });
    if guard == WinnerGuard::RequireOpen && info.winner_ticket_number.is_some() {
      return Ok(None);
    }
    info.winner_ticket_number = Some(winner.ticket_number);
    info.winner_summary = Some(winner.summary);
    info.draw_timestamp = Some(winner.drawn_at);
    info.draws += 1;
    self.raffle_feed.publish(info.clone());
    Ok(Some(info.clone()))
  }

  fn subscribe_tickets(&self) -> Subscription<SoldTicket> { self.ticket_feed.subscribe() }

  fn subscribe_raffle(&self) -> Subscription<RaffleInfo> { self.raffle_feed.subscribe() }
}
