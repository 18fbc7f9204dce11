//! Error type for `mercado-store-sqlite`.

use mercado_core::ident::TableName;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] mercado_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// A write was attempted against a table that has not been created.
  #[error("table {0} does not exist")]
  TableMissing(TableName),

  /// The table holds a column whose name would not pass validation, so it
  /// cannot be addressed safely.
  #[error("table {table} has an unaddressable column {column:?}")]
  ForeignColumn { table: TableName, column: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
