//! SQLite backend for the raffle ticket store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. That thread also serialises writes,
//! which makes each conditional write atomic and keeps change-feed
//! publication in commit order.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
