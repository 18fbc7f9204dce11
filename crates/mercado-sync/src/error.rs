//! Error type for `mercado-sync`.

use mercado_core::ident::TableName;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("could not open the database: {0}")]
  Connection(#[source] BoxError),

  #[error("schema error on {table}: {source}")]
  Schema {
    table:  TableName,
    #[source]
    source: BoxError,
  },

  #[error("reference source unavailable: {0}")]
  SourceUnavailable(#[source] BoxError),

  #[error("write to {table} failed: {source}")]
  Persistence {
    table:  TableName,
    #[source]
    source: BoxError,
  },

  #[error("configuration error: {0}")]
  Config(String),

  #[error("could not write dump file: {0}")]
  Dump(#[source] BoxError),
}

impl Error {
  pub fn schema(table: TableName, source: impl Into<BoxError>) -> Self {
    Self::Schema { table, source: source.into() }
  }

  pub fn persistence(table: TableName, source: impl Into<BoxError>) -> Self {
    Self::Persistence { table, source: source.into() }
  }

  pub fn source_unavailable(source: impl Into<BoxError>) -> Self {
    Self::SourceUnavailable(source.into())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
