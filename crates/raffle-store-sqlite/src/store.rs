//! [`SqliteStore`] — the SQLite implementation of [`TicketStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;

use raffle_core::{
  feed::{ChangeFeed, DEFAULT_CAPACITY, Subscription},
  raffle::{RaffleInfo, WinnerGuard, WinnerRecord},
  store::{Expect, TicketQuery, TicketStore, WriteOutcome},
  ticket::SoldTicket,
};

use crate::{
  Result,
  encode::{RAFFLE_COLUMNS, RawRaffleInfo, RawTicket, TICKET_COLUMNS, encode_dt},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A raffle store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection and both feeds are
/// reference-counted, and every clone publishes to the same subscribers.
#[derive(Clone)]
pub struct SqliteStore {
  conn:    tokio_rusqlite::Connection,
  tickets: ChangeFeed<SoldTicket>,
  raffle:  ChangeFeed<RaffleInfo>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn, DEFAULT_CAPACITY).await
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn, DEFAULT_CAPACITY).await
  }

  /// Replace the change feeds with ones buffering `capacity` changes per
  /// subscriber. Call before anyone subscribes.
  pub fn with_feed_capacity(mut self, capacity: usize) -> Self {
    self.tickets = ChangeFeed::new(capacity);
    self.raffle = ChangeFeed::new(capacity);
    self
  }

  async fn init(conn: tokio_rusqlite::Connection, capacity: usize) -> Result<Self> {
    let store = Self {
      conn,
      tickets: ChangeFeed::new(capacity),
      raffle: ChangeFeed::new(capacity),
    };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Close the underlying connection. Other clones of this store fail with
  /// a database error afterwards.
  pub async fn close(self) -> Result<()> {
    self.conn.close().await?;
    tracing::debug!("sqlite store closed");
    Ok(())
  }
}

// ─── TicketStore impl ────────────────────────────────────────────────────────

impl TicketStore for SqliteStore {
  type Error = crate::Error;

  // ── Tickets ───────────────────────────────────────────────────────────────

  async fn get_ticket(&self, number: u32) -> Result<Option<SoldTicket>> {
    let raw: Option<RawTicket> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE number = ?1"),
              rusqlite::params![number],
              RawTicket::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawTicket::into_ticket).transpose()
  }

  async fn conditional_set(&self, ticket: SoldTicket, expect: Expect) -> Result<WriteOutcome> {
    let number       = ticket.number;
    let buyer_id     = ticket.buyer.buyer_id.as_str().to_owned();
    let name         = ticket.buyer.name.clone();
    let contact      = ticket.buyer.contact.clone();
    let payout_key   = ticket.buyer.payout_key.clone();
    let purchased_at = encode_dt(ticket.purchased_at);
    let feed         = self.tickets.clone();

    let sql = match expect {
      Expect::Absent => {
        "INSERT INTO tickets (
           number, buyer_id, buyer_name, buyer_contact, payout_key, purchased_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(number) DO NOTHING"
      }
      Expect::AbsentWhileOpen => {
        "INSERT INTO tickets (
           number, buyer_id, buyer_name, buyer_contact, payout_key, purchased_at
         ) SELECT ?1, ?2, ?3, ?4, ?5, ?6
            WHERE NOT EXISTS (
              SELECT 1 FROM raffle_info WHERE winner_ticket_number IS NOT NULL
            )
         ON CONFLICT(number) DO NOTHING"
      }
      Expect::Present => {
        "UPDATE tickets
            SET buyer_id = ?2, buyer_name = ?3, buyer_contact = ?4,
                payout_key = ?5, purchased_at = ?6
          WHERE number = ?1"
      }
    };

    let outcome = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          sql,
          rusqlite::params![number, buyer_id, name, contact, payout_key, purchased_at],
        )?;
        if changed == 0 {
          // Still on the connection thread, so no draw can commit in between.
          let closed = expect == Expect::AbsentWhileOpen
            && conn.query_row(
              "SELECT EXISTS (
                 SELECT 1 FROM raffle_info WHERE winner_ticket_number IS NOT NULL
               )",
              [],
              |r| r.get::<_, bool>(0),
            )?;
          return Ok(if closed { WriteOutcome::Closed } else { WriteOutcome::Conflict });
        }
        // Published on the connection thread so feed order is commit order.
        feed.publish(ticket);
        Ok(WriteOutcome::Committed)
      })
      .await?;

    if !outcome.is_committed() {
      tracing::debug!(number, ?expect, ?outcome, "conditional write rejected");
    }
    Ok(outcome)
  }

  async fn query(&self, query: &TicketQuery) -> Result<Vec<SoldTicket>> {
    let buyer_id   = query.buyer_id.as_ref().map(|id| id.as_str().to_owned());
    // SQLite treats a negative LIMIT as "no limit".
    let limit_val  = query.limit.map_or(-1, |l| l as i64);
    let offset_val = query.offset.unwrap_or(0) as i64;

    let raws: Vec<RawTicket> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {TICKET_COLUMNS} FROM tickets
            WHERE (?1 IS NULL OR buyer_id = ?1)
            ORDER BY number
            LIMIT ?2 OFFSET ?3"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![buyer_id, limit_val, offset_val],
            RawTicket::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTicket::into_ticket).collect()
  }

  // ── Raffle singleton ──────────────────────────────────────────────────────

  async fn get_raffle_info(&self) -> Result<Option<RaffleInfo>> {
    let raw: Option<RawRaffleInfo> = self
      .conn
      .call(|conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {RAFFLE_COLUMNS} FROM raffle_info WHERE id = 1"),
              [],
              RawRaffleInfo::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRaffleInfo::into_info).transpose()
  }

  async fn record_draw(
    &self,
    winner: WinnerRecord,
    guard:  WinnerGuard,
  ) -> Result<Option<RaffleInfo>> {
    let number   = winner.ticket_number;
    let drawn_at = encode_dt(winner.drawn_at);
    let feed     = self.raffle.clone();

    // Only the winner columns and the counter are touched; any other
    // column of an existing record is left as is.
    let guard_clause = match guard {
      WinnerGuard::RequireOpen => "WHERE raffle_info.winner_ticket_number IS NULL",
      WinnerGuard::Overwrite => "",
    };
    let sql = format!(
      "INSERT INTO raffle_info (
         id, winner_ticket_number, winner_name, winner_contact,
         winner_payout_key, drawn_at, draws
       ) VALUES (1, ?1, ?2, ?3, ?4, ?5, 1)
       ON CONFLICT(id) DO UPDATE SET
         winner_ticket_number = excluded.winner_ticket_number,
         winner_name          = excluded.winner_name,
         winner_contact       = excluded.winner_contact,
         winner_payout_key    = excluded.winner_payout_key,
         drawn_at             = excluded.drawn_at,
         draws                = raffle_info.draws + 1
       {guard_clause}"
    );

    let committed = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          &sql,
          rusqlite::params![
            number,
            winner.summary.name,
            winner.summary.contact,
            winner.summary.payout_key,
            drawn_at,
          ],
        )?;
        if changed == 0 {
          return Ok(None);
        }

        let draws: u32 =
          conn.query_row("SELECT draws FROM raffle_info WHERE id = 1", [], |r| r.get(0))?;
        let info = RaffleInfo {
          winner_ticket_number: Some(winner.ticket_number),
          winner_summary:       Some(winner.summary),
          draw_timestamp:       Some(winner.drawn_at),
          draws,
        };
        feed.publish(info.clone());
        Ok(Some(info))
      })
      .await?;

    if committed.is_none() {
      tracing::debug!(number, "draw rejected: winner already recorded");
    }
    Ok(committed)
  }

  // ── Change feeds ──────────────────────────────────────────────────────────

  fn subscribe_tickets(&self) -> Subscription<SoldTicket> { self.tickets.subscribe() }

  fn subscribe_raffle(&self) -> Subscription<RaffleInfo> { self.raffle.subscribe() }
}
