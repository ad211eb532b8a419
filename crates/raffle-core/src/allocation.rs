//! [`AllocationService`] — sells each ticket at most once.
//!
//! Purchases use optimistic concurrency: read the ticket, build the sold
//! record, then commit with [`Expect::AbsentWhileOpen`] (or
//! [`Expect::Absent`] when sales stay open after the draw). No lock is held between the
//! read and the write; the store's conditional write is the only source of
//! atomicity, so of any number of concurrent buyers for one ticket exactly
//! one commits and the rest see [`Error::AlreadySold`] or [`Error::Conflict`].

use std::sync::Arc;

use chrono::Utc;

use crate::{
  Error, Result,
  board::TicketBoard,
  config::{RaffleConfig, SalesAfterDraw},
  feed::Subscription,
  store::{Expect, TicketQuery, TicketStore, WriteOutcome},
  ticket::{BuyerId, PurchaseRequest, SoldTicket, Ticket},
};

/// The only writer of ticket records.
pub struct AllocationService<S> {
  store:  Arc<S>,
  config: RaffleConfig,
}

impl<S> Clone for AllocationService<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), config: self.config.clone() }
  }
}

impl<S: TicketStore> AllocationService<S> {
  pub fn new(store: Arc<S>, config: RaffleConfig) -> Self { Self { store, config } }

  pub fn config(&self) -> &RaffleConfig { &self.config }

  fn check_range(&self, number: u32) -> Result<()> {
    if self.config.contains(number) {
      Ok(())
    } else {
      Err(Error::UnknownTicket(number))
    }
  }

  /// Advisory selection against a client's cached board.
  pub fn select_ticket(&self, board: &TicketBoard, number: u32) -> Result<u32> {
    self.check_range(number)?;
    board.select(number)
  }

  /// Buy `request.number` for the requesting session.
  ///
  /// The returned record is authoritative; it does not wait for the change
  /// feed to deliver the same record to subscribers.
  pub async fn purchase_ticket(&self, request: PurchaseRequest) -> Result<SoldTicket> {
    let buyer = request.validate()?;
    let number = request.number;
    self.check_range(number)?;

    if self.store.get_ticket(number).await.map_err(Error::store)?.is_some() {
      tracing::debug!(number, "purchase rejected: ticket already sold");
      return Err(Error::AlreadySold(number));
    }

    let ticket = SoldTicket { number, buyer, purchased_at: Utc::now() };
    let expect = match self.config.sales_after_draw {
      SalesAfterDraw::Reject => Expect::AbsentWhileOpen,
      SalesAfterDraw::Allow => Expect::Absent,
    };

    match self
      .store
      .conditional_set(ticket.clone(), expect)
      .await
      .map_err(Error::store)?
    {
      WriteOutcome::Committed => {
        tracing::info!(number, buyer_id = %ticket.buyer.buyer_id, "ticket sold");
        Ok(ticket)
      }
      WriteOutcome::Conflict => {
        tracing::debug!(number, "purchase lost the race for ticket");
        Err(Error::Conflict(number))
      }
      WriteOutcome::Closed => {
        tracing::debug!(number, "purchase rejected: winner already drawn");
        Err(Error::SalesClosed)
      }
    }
  }

  /// The current state of one ticket.
  pub async fn ticket(&self, number: u32) -> Result<Ticket> {
    self.check_range(number)?;
    let record = self.store.get_ticket(number).await.map_err(Error::store)?;
    Ok(Ticket::from_record(number, record))
  }

  /// Materialise all tickets `1..=N`; numbers with no record are available.
  pub async fn snapshot(&self) -> Result<TicketBoard> {
    let sold = self
      .store
      .query(&TicketQuery::default())
      .await
      .map_err(Error::store)?;
    Ok(TicketBoard::from_sold(self.config.total_tickets, &sold))
  }

  /// Tickets bought by one session, in number order.
  pub async fn tickets_of(&self, buyer_id: &BuyerId) -> Result<Vec<SoldTicket>> {
    let query = TicketQuery { buyer_id: Some(buyer_id.clone()), ..TicketQuery::default() };
    self.store.query(&query).await.map_err(Error::store)
  }

  /// Every sold ticket with buyer details. Operator-facing.
  pub async fn sold_tickets(&self, query: &TicketQuery) -> Result<Vec<SoldTicket>> {
    self.store.query(query).await.map_err(Error::store)
  }

  /// Subscribe to sales committed from now on.
  ///
  /// Subscribe before taking a [`AllocationService::snapshot`] so that no
  /// sale falls between the two.
  pub fn subscribe(&self) -> Subscription<SoldTicket> { self.store.subscribe_tickets() }
}
