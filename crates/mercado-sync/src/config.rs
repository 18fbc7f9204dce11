//! Run configuration.
//!
//! Built once at process start from an optional TOML file layered with
//! `MERCADO_*` environment variables (`__` separates nested keys, e.g.
//! `MERCADO_API__TOKEN`), then passed by reference to everything that needs
//! it.

use std::{
  collections::BTreeMap,
  path::{Path, PathBuf},
  time::Duration,
};

use mercado_client::{ClientConfig, DEFAULT_BASE_URL};
use mercado_core::ident::{ColumnName, FactCategory, TableName};
use serde::Deserialize;

use crate::{Error, Result, reference::ReferenceSource};

pub const ENV_PREFIX: &str = "MERCADO";

/// `MERCADO_DATABASE_PATH`, `MERCADO_API__TOKEN` and so on.
fn environment() -> config::Environment {
  config::Environment::with_prefix(ENV_PREFIX)
    .prefix_separator("_")
    .separator("__")
    .try_parsing(true)
}

// ─── Write mode ──────────────────────────────────────────────────────────────

/// How rows are written into a table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WriteMode {
  /// Insert rows not already stored verbatim.
  InsertIgnoreDuplicates,
  /// Last write wins per `conflict_columns`.
  Upsert { conflict_columns: Vec<ColumnName> },
}

impl WriteMode {
  pub fn default_for(table: TableName) -> Self {
    match table {
      TableName::Companies => Self::Upsert {
        conflict_columns: vec![ColumnName::cvm_code()],
      },
      _ => Self::InsertIgnoreDuplicates,
    }
  }
}

// ─── Sections ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  pub base_url:            String,
  pub token:               Option<String>,
  pub request_interval_ms: u64,
  pub timeout_secs:        u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url:            DEFAULT_BASE_URL.to_owned(),
      token:               None,
      request_interval_ms: 1000,
      timeout_secs:        30,
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
  /// Curated company list. When unset, the API listing is used.
  pub csv_path: Option<PathBuf>,
}

// ─── SyncConfig ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
  pub database_path: PathBuf,
  pub api:           ApiConfig,
  pub reference:     ReferenceConfig,
  /// Restrict the run to these fact categories. Order is always the fixed
  /// sync order.
  pub categories:    Option<Vec<FactCategory>>,
  /// Per-table write-mode overrides.
  pub tables:        BTreeMap<TableName, WriteMode>,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      database_path: PathBuf::from("mercado.db"),
      api:           ApiConfig::default(),
      reference:     ReferenceConfig::default(),
      categories:    None,
      tables:        BTreeMap::new(),
    }
  }
}

impl SyncConfig {
  /// Read `path` (optional) and the environment.
  pub fn load(path: &Path) -> Result<Self> { Self::load_with(path, environment()) }

  fn load_with(path: &Path, env: config::Environment) -> Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(env)
      .build()
      .map_err(|e| Error::Config(e.to_string()))?;
    Self::from_settings(settings)
  }

  pub fn from_settings(settings: config::Config) -> Result<Self> {
    settings
      .try_deserialize()
      .map_err(|e| Error::Config(e.to_string()))
  }

  pub fn write_mode(&self, table: TableName) -> WriteMode {
    self
      .tables
      .get(&table)
      .cloned()
      .unwrap_or_else(|| WriteMode::default_for(table))
  }

  /// Categories to sync, in fixed order.
  pub fn categories(&self) -> Vec<FactCategory> {
    match &self.categories {
      None => FactCategory::ALL.to_vec(),
      Some(selected) => FactCategory::ALL
        .into_iter()
        .filter(|c| selected.contains(c))
        .collect(),
    }
  }

  pub fn reference_source(&self) -> ReferenceSource {
    match &self.reference.csv_path {
      Some(path) => ReferenceSource::Csv(path.clone()),
      None => ReferenceSource::Api,
    }
  }

  /// Settings for the HTTP client. Fails if no token is configured.
  pub fn client_config(&self) -> Result<ClientConfig> {
    let token = self
      .api
      .token
      .as_deref()
      .map(str::trim)
      .filter(|t| !t.is_empty())
      .ok_or_else(|| {
        Error::Config(format!(
          "missing API token: set api.token or {ENV_PREFIX}_API__TOKEN"
        ))
      })?;
    Ok(ClientConfig {
      base_url:         self.api.base_url.clone(),
      token:            token.to_owned(),
      request_interval: Duration::from_millis(self.api.request_interval_ms),
      timeout:          Duration::from_secs(self.api.timeout_secs),
    })
  }
}

#[cfg(test)]
mod tests {
  use config::{File, FileFormat};
  use pretty_assertions::assert_eq;

  use super::*;

  fn parse(toml: &str) -> Result<SyncConfig> {
    let settings = config::Config::builder()
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()
      .unwrap();
    SyncConfig::from_settings(settings)
  }

  fn col(s: &str) -> ColumnName { ColumnName::new(s).unwrap() }

  #[test]
  fn environment_overrides_use_single_underscore_prefix() {
    let dir = tempfile::TempDir::new().unwrap();
    let file = dir.path().join("mercado.toml");
    std::fs::write(&file, "database_path = \"from-file.db\"\n").unwrap();

    let mut vars = config::Map::new();
    vars.insert("MERCADO_API__TOKEN".to_owned(), "from-env".to_owned());
    vars.insert("MERCADO_DATABASE_PATH".to_owned(), "/tmp/env.db".to_owned());
    let cfg = SyncConfig::load_with(&file, environment().source(Some(vars))).unwrap();

    assert_eq!(cfg.api.token.as_deref(), Some("from-env"));
    assert_eq!(cfg.database_path, PathBuf::from("/tmp/env.db"));
  }

  #[test]
  fn missing_file_still_reads_environment() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut vars = config::Map::new();
    vars.insert("MERCADO_API__TOKEN".to_owned(), "from-env".to_owned());
    let cfg = SyncConfig::load_with(
      &dir.path().join("absent.toml"),
      environment().source(Some(vars)),
    )
    .unwrap();

    assert_eq!(cfg.api.token.as_deref(), Some("from-env"));
    assert_eq!(cfg.database_path, PathBuf::from("mercado.db"));
    assert!(cfg.client_config().is_ok());
  }

  #[test]
  fn defaults_apply_to_empty_file() {
    let cfg = parse("").unwrap();
    assert_eq!(cfg.database_path, PathBuf::from("mercado.db"));
    assert_eq!(cfg.api.base_url, DEFAULT_BASE_URL);
    assert_eq!(cfg.categories(), FactCategory::ALL.to_vec());
    assert!(matches!(cfg.reference_source(), ReferenceSource::Api));
    assert_eq!(
      cfg.write_mode(TableName::Companies),
      WriteMode::Upsert { conflict_columns: vec![col("cvm_code")] }
    );
    assert_eq!(
      cfg.write_mode(TableName::BalanceSheet),
      WriteMode::InsertIgnoreDuplicates
    );
  }

  #[test]
  fn missing_token_is_a_config_error() {
    let err = parse("").unwrap().client_config().unwrap_err();
    assert!(matches!(err, Error::Config(_)));
  }

  #[test]
  fn reads_every_section() {
    let cfg = parse(
      r#"
database_path = "/tmp/m.db"
categories = ["market_ratios", "balance_sheet"]

[api]
token = "abc"
request_interval_ms = 250
timeout_secs = 5

[reference]
csv_path = "companies.csv"

[tables.balance_sheet]
mode = "upsert"
conflict_columns = ["cvm_code", "year"]
"#,
    )
    .unwrap();

    let client = cfg.client_config().unwrap();
    assert_eq!(client.token, "abc");
    assert_eq!(client.request_interval, Duration::from_millis(250));
    assert_eq!(client.timeout, Duration::from_secs(5));
    assert_eq!(
      cfg.categories(),
      vec![FactCategory::Balances, FactCategory::MarketRatios]
    );
    assert_eq!(
      cfg.write_mode(TableName::BalanceSheet),
      WriteMode::Upsert { conflict_columns: vec![col("cvm_code"), col("year")] }
    );
    assert!(matches!(
      cfg.reference_source(),
      ReferenceSource::Csv(p) if p == PathBuf::from("companies.csv")
    ));
  }

  #[test]
  fn rejects_unsafe_conflict_column() {
    let err = parse(
      r#"
[tables.companies]
mode = "upsert"
conflict_columns = ["cvm_code; DROP TABLE companies"]
"#,
    )
    .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
  }
}
