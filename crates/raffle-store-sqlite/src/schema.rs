//! SQL schema for the raffle SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Sparse: a row exists only for a sold ticket; no row means available.
-- Rows are inserted once and never deleted.
CREATE TABLE IF NOT EXISTS tickets (
    number        INTEGER PRIMARY KEY CHECK (number > 0),
    buyer_id      TEXT NOT NULL CHECK (buyer_id <> ''),
    buyer_name    TEXT NOT NULL CHECK (buyer_name <> ''),
    buyer_contact TEXT NOT NULL CHECK (buyer_contact <> ''),
    payout_key    TEXT NOT NULL CHECK (payout_key <> ''),
    purchased_at  TEXT NOT NULL    -- ISO 8601 UTC; set at commit
);

CREATE INDEX IF NOT EXISTS tickets_buyer_idx ON tickets(buyer_id);

-- Singleton raffle record, created by the first draw.
CREATE TABLE IF NOT EXISTS raffle_info (
    id                   INTEGER PRIMARY KEY CHECK (id = 1),
    winner_ticket_number INTEGER REFERENCES tickets(number),
    winner_name          TEXT,
    winner_contact       TEXT,
    winner_payout_key    TEXT,
    drawn_at             TEXT,
    draws                INTEGER NOT NULL DEFAULT 0
);

PRAGMA user_version = 1;
";
