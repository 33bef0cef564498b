//! sluice server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) layered under
//! `SLUICE_*` environment variables, opens the SQLite snapshot store, and
//! serves the API until Ctrl-C or SIGTERM. Nested keys use a double
//! underscore, e.g. `SLUICE_GENERATOR__CEILING=3`.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use sluice_bus_redis::RedisBus;
use sluice_engine::{Hub, templates::TemplatePool};
use sluice_server::ServerConfig;
use sluice_store_sqlite::SqliteStore;
use tokio::{net::TcpListener, signal};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Sluice pipeline server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Start the demo generator immediately.
  #[arg(long)]
  demo: bool,
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

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("SLUICE")
        .prefix_separator("_")
        .separator("__"),
    )
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let templates = match &server_cfg.templates_path {
    Some(path) => {
      let path = expand_tilde(path);
      TemplatePool::from_json_file(&path)
        .with_context(|| format!("failed to load templates from {path:?}"))?
    }
    None => TemplatePool::builtin(),
  };
  info!(templates = templates.len(), "template pool ready");

  let hub = Arc::new(
    Hub::new(server_cfg.engine(), Arc::new(store), templates)
      .await
      .context("invalid engine configuration")?,
  );

  if let Some(url) = &server_cfg.redis_url {
    let bus = RedisBus::open(url)
      .await
      .context("failed to connect to redis")?;
    hub
      .attach_transport(Arc::new(bus))
      .await
      .context("failed to subscribe to redis channels")?;
  } else {
    info!("no redis_url configured; running as a single instance");
  }

  if cli.demo {
    hub.start_demo().context("failed to start demo generator")?;
  }

  let app = sluice_server::app(hub.clone());
  let address = server_cfg.address();

  info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  hub.shutdown();
  hub.flush().await;
  info!("server stopped");
  Ok(())
}

/// Resolve once Ctrl-C or SIGTERM arrives.
async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = signal::ctrl_c().await {
      tracing::warn!(error = %e, "failed to listen for Ctrl-C");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
      Ok(mut sigterm) => {
        sigterm.recv().await;
      }
      Err(e) => {
        tracing::warn!(error = %e, "failed to listen for SIGTERM");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => info!("received Ctrl-C, shutting down"),
    _ = terminate => info!("received SIGTERM, shutting down"),
  }
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
