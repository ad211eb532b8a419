//! Core types and trait definitions for the raffle ticket allocator.
//!
//! This crate has no HTTP or database dependencies. It defines the ticket
//! and raffle models, the [`store::TicketStore`] contract, the in-process
//! change feed, and the two services built on top of them:
//! [`allocation::AllocationService`] and [`draw::DrawService`].

pub mod allocation;
pub mod board;
pub mod config;
pub mod draw;
pub mod error;
pub mod feed;
pub mod raffle;
pub mod store;
pub mod ticket;

#[cfg(test)]
mod test_store;

pub use error::{Error, Result};
