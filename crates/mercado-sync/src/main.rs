//! `mercado-sync`: synchronize market data into a local SQLite database.
//!
//! # Usage
//!
//! ```
//! MERCADO_API__TOKEN=... mercado-sync --reference-csv companies.csv
//! mercado-sync --config mercado.toml dump --out raw/
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use clap::{Parser, Subcommand};
use mercado_client::MarketDataClient;
use mercado_store_sqlite::SqliteStore;
use mercado_sync::{Error, SyncConfig, dump::dump, run};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Market data synchronization")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "mercado.toml")]
  config: PathBuf,

  /// SQLite database path; overrides `database_path`.
  #[arg(long, value_name = "PATH")]
  database: Option<PathBuf>,

  /// Load the reference set from this CSV instead of the API listing.
  #[arg(long, value_name = "PATH")]
  reference_csv: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Reconcile the database with the reference set (default).
  Sync,
  /// Fetch raw payloads into CSV files without touching the database.
  Dump {
    #[arg(long, value_name = "DIR")]
    out: PathBuf,
  },
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

  let result = execute(Cli::parse()).await;
  if let Err(e) = &result {
    tracing::error!("{e:#}");
  }
  result
}

async fn execute(cli: Cli) -> anyhow::Result<()> {
  let mut config = SyncConfig::load(&cli.config).context("failed to load configuration")?;
  if let Some(path) = cli.database {
    config.database_path = path;
  }
  if let Some(path) = cli.reference_csv {
    config.reference.csv_path = Some(path);
  }

  let client = MarketDataClient::new(config.client_config()?)
    .context("failed to build HTTP client")?;

  match cli.command.unwrap_or(Command::Sync) {
    Command::Sync => sync(&config, &client).await,
    Command::Dump { out } => {
      let files = dump(&config, &client, &out).await.context("dump aborted")?;
      tracing::info!(files = files.len(), dir = %out.display(), "dump finished");
      Ok(())
    }
  }
}

async fn sync(config: &SyncConfig, client: &MarketDataClient) -> anyhow::Result<()> {
  let db_path = expand_tilde(&config.database_path);
  let store = SqliteStore::open(&db_path)
    .await
    .map_err(|e| Error::Connection(e.into()))
    .with_context(|| format!("failed to open store at {db_path:?}"))?;

  let outcome = run(config, &store, client).await;
  let closed = store.close().await;

  let report = outcome.context("sync aborted")?;
  closed.context("failed to close the database")?;

  if report.has_failures() {
    let failed: Vec<String> = report
      .tables
      .iter()
      .filter(|(_, t)| t.failed())
      .map(|(table, _)| table.to_string())
      .collect();
    bail!("sync finished with failed tables: {}", failed.join(", "));
  }
  Ok(())
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

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn missing_token_fails_before_any_work() {
    let dir = tempfile::TempDir::new().unwrap();
    let cli = Cli::try_parse_from([
      "mercado-sync",
      "--config",
      dir.path().join("absent.toml").to_str().unwrap(),
      "--database",
      dir.path().join("never.db").to_str().unwrap(),
    ])
    .unwrap();

    let err = execute(cli).await.unwrap_err();
    assert!(format!("{err:#}").contains("missing API token"));
    assert!(!dir.path().join("never.db").exists());
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(
      expand_tilde(Path::new("~/data/mercado.db")),
      PathBuf::from(home).join("data/mercado.db")
    );
    assert_eq!(expand_tilde(Path::new("/abs.db")), PathBuf::from("/abs.db"));
  }
}
