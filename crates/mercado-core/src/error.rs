//! Error types for `mercado-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown table name: {0:?}")]
  UnknownTable(String),

  #[error("invalid column name: {0:?}")]
  InvalidColumnName(String),

  #[error("invalid company code: {0:?}")]
  InvalidCode(String),

  #[error("duplicate column in frame: {0}")]
  DuplicateColumn(String),

  #[error("row has {got} cells but the frame has {expected} columns")]
  RowWidth { expected: usize, got: usize },

  #[error("expected a JSON array of objects, found {0}")]
  NotARecordArray(&'static str),

  #[error("conflict key is empty")]
  EmptyConflictKey,

  #[error("conflict column {0} is not present in the frame")]
  UnknownConflictColumn(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
