//! HTTP server for the raffle.
//!
//! Mounts the public router as is and the operator router behind HTTP Basic
//! auth, backed by any [`TicketStore`].

pub mod auth;
pub mod error;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, middleware};
use raffle_api::ApiState;
use raffle_core::{config::RaffleConfig, feed::DEFAULT_CAPACITY, store::TicketStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::{AuthConfig, require_operator};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `RAFFLE_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:               String,
  #[serde(default = "default_port")]
  pub port:               u16,
  #[serde(default = "default_store_path")]
  pub store_path:         PathBuf,
  pub auth_username:      String,
  pub auth_password_hash: String,
  /// Changes buffered per live subscriber before it must resync.
  #[serde(default = "default_feed_capacity")]
  pub feed_capacity:      usize,
  #[serde(default)]
  pub raffle:             RaffleConfig,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("raffle.db") }
fn default_feed_capacity() -> usize { DEFAULT_CAPACITY }

// ─── Application state ────────────────────────────────────────────────────────

/// Everything the router needs.
pub struct AppState<S> {
  pub api:  ApiState<S>,
  pub auth: Arc<AuthConfig>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self { Self { api: self.api.clone(), auth: Arc::clone(&self.auth) } }
}

impl<S: TicketStore> AppState<S> {
  pub fn new(store: Arc<S>, config: &ServerConfig) -> Self {
    Self {
      api:  ApiState::new(store, config.raffle.clone()),
      auth: Arc::new(AuthConfig {
        username:      config.auth_username.clone(),
        password_hash: config.auth_password_hash.clone(),
      }),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the complete server [`Router`].
pub fn router<S>(state: AppState<S>) -> Router
where
  S: TicketStore + 'static,
{
  let admin = raffle_api::admin_router(state.api.clone())
    .route_layer(middleware::from_fn_with_state(state.auth, require_operator));

  raffle_api::public_router(state.api)
    .merge(admin)
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────
