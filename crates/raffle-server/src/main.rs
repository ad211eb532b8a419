//! raffle-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered with
//! `RAFFLE_*` environment variables, opens the SQLite ticket store, and serves
//! the raffle API over HTTP until Ctrl-C.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `auth_password_hash`:
//!
//! ```
//! cargo run -p raffle-server -- --hash-password
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use clap::Parser;
use raffle_server::{AppState, ServerConfig, auth};
use raffle_store_sqlite::SqliteStore;
use tokio::{net::TcpListener, signal, sync::Notify};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// How long open connections (live event streams included) may linger once
/// shutdown has begun.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(author, version, about = "Raffle ticket server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    let password = read_password()?;
    let hash = auth::hash_password(&password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
    println!("{hash}");
    return Ok(());
  }

  // Nested keys come from e.g. `RAFFLE_RAFFLE__TOTAL_TICKETS`.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("RAFFLE")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  server_cfg.raffle.validate().context("invalid [raffle] settings")?;

  let store_path = expand_tilde(&server_cfg.store_path);

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?
    .with_feed_capacity(server_cfg.feed_capacity);

  let state = AppState::new(Arc::new(store.clone()), &server_cfg);
  let app = raffle_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!(
    total_tickets = server_cfg.raffle.total_tickets,
    redraw = %server_cfg.raffle.redraw,
    sales_after_draw = %server_cfg.raffle.sales_after_draw,
    "Listening on http://{address}"
  );
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  let shutdown = Arc::new(Notify::new());
  let server = axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal(Arc::clone(&shutdown)))
    .into_future();

  // Event streams never end on their own, so the graceful wait is bounded.
  tokio::select! {
    res = server => res.context("server error")?,
    () = async {
      shutdown.notified().await;
      tokio::time::sleep(SHUTDOWN_GRACE).await;
    } => {
      tracing::warn!("connections still open after {SHUTDOWN_GRACE:?}; closing anyway");
    }
  }

  tracing::info!("shutting down");
  store.close().await.context("failed to close store")?;

  Ok(())
}

/// Resolves on Ctrl-C or SIGTERM, then wakes `notify`.
async fn shutdown_signal(notify: Arc<Notify>) {
  let ctrl_c = async {
    if let Err(e) = signal::ctrl_c().await {
      tracing::error!(error = %e, "failed to install ctrl-c handler");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
      Ok(mut sig) => {
        sig.recv().await;
      }
      Err(e) => {
        tracing::error!(error = %e, "failed to install SIGTERM handler");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    () = ctrl_c => tracing::info!("received ctrl-c"),
    () = terminate => tracing::info!("received SIGTERM"),
  }
  notify.notify_one();
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(line.trim_end_matches('\n').trim_end_matches('\r').to_string())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
