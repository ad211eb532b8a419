//! [`DrawService`] — picks the winner and owns the raffle record.
//!
//! Drawing is an operator action. The service performs no authorization of
//! its own; whatever exposes [`DrawService::draw_winner`] must put an access
//! policy in front of it.

use std::sync::Arc;

use chrono::Utc;
use rand::{Rng, rngs::OsRng, seq::SliceRandom};

use crate::{
  Error, Result,
  config::{RaffleConfig, RedrawPolicy},
  feed::Subscription,
  raffle::{PublicRaffleInfo, RaffleInfo, WinnerGuard, WinnerRecord},
  store::{TicketQuery, TicketStore},
};

pub struct DrawService<S> {
  store:  Arc<S>,
  config: RaffleConfig,
}

impl<S> Clone for DrawService<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), config: self.config.clone() }
  }
}

impl<S: TicketStore> DrawService<S> {
  pub fn new(store: Arc<S>, config: RaffleConfig) -> Self { Self { store, config } }

  pub fn policy(&self) -> RedrawPolicy { self.config.redraw }

  /// Draw a winner using the operating system's random source.
  pub async fn draw_winner(&self) -> Result<RaffleInfo> { self.draw_winner_with(&mut OsRng).await }

  /// Draw a winner uniformly at random from the sold tickets using `rng`.
  ///
  /// Only numbers in `1..=total_tickets` are candidates; stored sales outside
  /// the configured range are skipped. Fails with [`Error::NoSoldTickets`]
  /// and writes nothing when no ticket is sold. Under [`RedrawPolicy::Final`] a raffle that already has a winner
  /// fails with [`Error::AlreadyDrawn`], including when another draw commits
  /// while this one is in flight.
  pub async fn draw_winner_with<R>(&self, rng: &mut R) -> Result<RaffleInfo>
  where
    R: Rng + Send + ?Sized,
  {
    if self.policy() == RedrawPolicy::Final
      && let Some(number) = self.current_winner().await?
    {
      return Err(Error::AlreadyDrawn(number));
    }

    let mut sold = self
      .store
      .query(&TicketQuery::default())
      .await
      .map_err(Error::store)?;
    let stored = sold.len();
    sold.retain(|t| self.config.contains(t.number));
    if sold.len() < stored {
      tracing::warn!(
        skipped = stored - sold.len(),
        total_tickets = self.config.total_tickets,
        "sold tickets outside the raffle range are not eligible"
      );
    }

    let winner = {
      let Some(ticket) = sold.choose(rng) else {
        tracing::info!("draw requested with no sold tickets");
        return Err(Error::NoSoldTickets);
      };
      WinnerRecord::from_ticket(ticket, Utc::now())
    };
    let number = winner.ticket_number;

    let guard = match self.policy() {
      RedrawPolicy::Final => WinnerGuard::RequireOpen,
      RedrawPolicy::Allow => WinnerGuard::Overwrite,
    };

    let Some(info) = self.store.record_draw(winner, guard).await.map_err(Error::store)? else {
      let existing = self.current_winner().await?.unwrap_or(number);
      return Err(Error::AlreadyDrawn(existing));
    };

    tracing::info!(number, candidates = sold.len(), policy = %self.policy(), "winner drawn");
    Ok(info)
  }

  async fn current_winner(&self) -> Result<Option<u32>> {
    Ok(
      self
        .store
        .get_raffle_info()
        .await
        .map_err(Error::store)?
        .and_then(|info| info.winner_ticket_number),
    )
  }

  /// The full raffle record, including the winner's details. Operator-facing.
  pub async fn raffle_info(&self) -> Result<Option<RaffleInfo>> {
    self.store.get_raffle_info().await.map_err(Error::store)
  }

  /// The raffle record as shown to every observer: no winner details.
  pub async fn public_info(&self) -> Result<Option<PublicRaffleInfo>> {
    Ok(self.raffle_info().await?.map(|info| info.public()))
  }

  /// Subscribe to raffle record changes. Project each one with
  /// [`RaffleInfo::public`] before handing it to a general audience.
  pub fn subscribe(&self) -> Subscription<RaffleInfo> { self.store.subscribe_raffle() }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use rand::{SeedableRng, rngs::StdRng};

  use super::*;
  use crate::{
    allocation::AllocationService,
    feed::Delivery,
    raffle::RaffleStatus,
    store::Expect,
    test_store::MemoryStore,
    ticket::{Buyer, BuyerId, PurchaseRequest, SoldTicket},
  };

  fn service(store: Arc<MemoryStore>, redraw: RedrawPolicy) -> DrawService<MemoryStore> {
    DrawService::new(store, RaffleConfig { redraw, ..RaffleConfig::default() })
  }

  fn sold(number: u32) -> SoldTicket {
    SoldTicket {
      number,
      buyer: Buyer {
        buyer_id:   BuyerId::new(format!("session-{number}")).unwrap(),
        name:       format!("Buyer {number}"),
        contact:    format!("buyer{number}@example.com"),
        payout_key: format!("payout-{number}"),
      },
      purchased_at: Utc::now(),
    }
  }

  async fn store_with_sold(numbers: &[u32]) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::default());
    let alloc = AllocationService::new(Arc::clone(&store), RaffleConfig::default());
    for &number in numbers {
      alloc
        .purchase_ticket(PurchaseRequest {
          number,
          buyer_id:      format!("session-{number}"),
          buyer_name:    format!("Buyer {number}"),
          buyer_contact: format!("buyer{number}@example.com"),
          payout_key:    format!("payout-{number}"),
        })
        .await
        .unwrap();
    }
    store
  }

  #[tokio::test]
  async fn empty_raffle_cannot_be_drawn() {
    let store = store_with_sold(&[]).await;
    let draws = service(store, RedrawPolicy::Final);

    assert!(matches!(draws.draw_winner().await, Err(Error::NoSoldTickets)));
    assert!(draws.public_info().await.unwrap().is_none());
  }

  #[tokio::test]
  async fn winner_is_a_sold_ticket_and_stays_fixed() {
    let store = store_with_sold(&[3, 7, 42]).await;
    let draws = service(store, RedrawPolicy::Final);

    let info = draws.draw_winner_with(&mut StdRng::seed_from_u64(7)).await.unwrap();
    let number = info.winner_ticket_number.unwrap();
    assert!([3, 7, 42].contains(&number));
    assert_eq!(info.status(), RaffleStatus::Drawn);
    assert_eq!(info.draws, 1);

    let summary = info.winner_summary.unwrap();
    assert_eq!(summary.name, format!("Buyer {number}"));
    assert_eq!(summary.payout_key, format!("payout-{number}"));

    let err = draws.draw_winner().await.unwrap_err();
    assert!(matches!(err, Error::AlreadyDrawn(n) if n == number));

    let public = draws.public_info().await.unwrap().unwrap();
    assert_eq!(public.winner_ticket_number, Some(number));
    assert_eq!(public.status, RaffleStatus::Drawn);
  }

  #[tokio::test]
  async fn redraws_overwrite_when_allowed() {
    let store = store_with_sold(&[1, 2]).await;
    let draws = service(store, RedrawPolicy::Allow);
    let mut rng = StdRng::seed_from_u64(11);

    draws.draw_winner_with(&mut rng).await.unwrap();
    let second = draws.draw_winner_with(&mut rng).await.unwrap();

    assert_eq!(second.draws, 2);
    assert!(matches!(second.winner_ticket_number, Some(1 | 2)));
  }

  #[tokio::test]
  async fn draw_is_published_to_subscribers() {
    let store = store_with_sold(&[5]).await;
    let draws = service(store, RedrawPolicy::Final);
    let mut sub = draws.subscribe();

    draws.draw_winner().await.unwrap();

    match sub.recv().await {
      Some(Delivery::Change(info)) => assert_eq!(info.public().winner_ticket_number, Some(5)),
      other => panic!("expected a change, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn selection_is_uniform_over_sold_tickets() {
    let sold = [3, 7, 42, 99];
    let store = store_with_sold(&sold).await;
    let draws = service(store, RedrawPolicy::Allow);
    let mut rng = StdRng::seed_from_u64(2024);

    let trials = 4_000;
    let mut counts: HashMap<u32, u32> = HashMap::new();
    for _ in 0..trials {
      let info = draws.draw_winner_with(&mut rng).await.unwrap();
      *counts.entry(info.winner_ticket_number.unwrap()).or_default() += 1;
    }

    assert_eq!(counts.len(), sold.len());
    let expected = f64::from(trials) / sold.len() as f64;
    let chi_squared: f64 = counts
      .values()
      .map(|&c| (f64::from(c) - expected).powi(2) / expected)
      .sum();
    // 3 degrees of freedom; p = 0.001 critical value is 16.27.
    assert!(chi_squared < 16.27, "chi-squared {chi_squared} for {counts:?}");
  }

  #[tokio::test]
  async fn concurrent_draw_committing_first_wins() {
    let store = store_with_sold(&[3, 7]).await;
    let draws = service(Arc::clone(&store), RedrawPolicy::Final);

    // Lands after the open-raffle check but before this draw is recorded.
    store.draw_before_next_write(WinnerRecord::from_ticket(&sold(7), Utc::now()));
    let err = draws.draw_winner_with(&mut StdRng::seed_from_u64(3)).await.unwrap_err();

    assert!(matches!(err, Error::AlreadyDrawn(7)));
    let info = draws.raffle_info().await.unwrap().unwrap();
    assert_eq!(info.winner_ticket_number, Some(7));
    assert_eq!(info.draws, 1);
  }

  #[tokio::test]
  async fn sales_outside_the_configured_range_never_win() {
    let store = Arc::new(MemoryStore::default());
    for number in [3, 12, 40] {
      assert!(store.conditional_set(sold(number), Expect::Absent).await.unwrap().is_committed());
    }
    let config = RaffleConfig { redraw: RedrawPolicy::Allow, ..RaffleConfig::with_total_tickets(10) };
    let draws = DrawService::new(Arc::clone(&store), config);

    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..50 {
      let info = draws.draw_winner_with(&mut rng).await.unwrap();
      assert_eq!(info.winner_ticket_number, Some(3));
    }
  }

  #[tokio::test]
  async fn only_out_of_range_sales_means_nothing_to_draw() {
    let store = Arc::new(MemoryStore::default());
    assert!(store.conditional_set(sold(12), Expect::Absent).await.unwrap().is_committed());
    let draws = DrawService::new(Arc::clone(&store), RaffleConfig::with_total_tickets(10));

    assert!(matches!(draws.draw_winner().await, Err(Error::NoSoldTickets)));
    assert!(draws.raffle_info().await.unwrap().is_none());
  }
}
