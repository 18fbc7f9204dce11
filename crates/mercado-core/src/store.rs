//! The `SyncStore` trait: the persistence gateway seen by the reconciler.
//!
//! Implemented by storage backends (e.g. `mercado-store-sqlite`). The
//! reconciler and the pipeline depend on this abstraction, not on any
//! concrete backend.

use std::{future::Future, ops::AddAssign};

use serde::Serialize;

use crate::{
  frame::Frame,
  ident::{ColumnName, TableName},
  schema::ColumnSpec,
};

// ─── Write accounting ────────────────────────────────────────────────────────

/// Row counts produced by a single write call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteOutcome {
  pub inserted: usize,
  pub updated:  usize,
  /// Rows that were already present and left untouched.
  pub skipped:  usize,
}

impl WriteOutcome {
  pub fn total(&self) -> usize { self.inserted + self.updated + self.skipped }
}

impl AddAssign for WriteOutcome {
  fn add_assign(&mut self, rhs: Self) {
    self.inserted += rhs.inserted;
    self.updated += rhs.updated;
    self.skipped += rhs.skipped;
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the relational store the engine synchronizes into.
///
/// Tables carry no declared uniqueness or foreign-key constraints; keys are
/// enforced by the write methods themselves. Each write call is atomic: it
/// either commits every row of the frame or none.
pub trait SyncStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Catalog ───────────────────────────────────────────────────────────

  /// Whether `table` exists. A failing catalog query is an error, never
  /// `false`.
  fn table_exists(
    &self,
    table: TableName,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Column names of `table` in declaration order; empty if it does not
  /// exist.
  fn table_columns(
    &self,
    table: TableName,
  ) -> impl Future<Output = Result<Vec<ColumnName>, Self::Error>> + Send + '_;

  /// Create `table` with exactly `spec` unless it already exists. Never alters
  /// an existing table. Returns `true` if the table was created.
  fn ensure_table(
    &self,
    table: TableName,
    spec: ColumnSpec,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Distinct non-null `cvm_code` values of `table`, sorted; empty if the
  /// table does not exist.
  fn current_identifiers(
    &self,
    table: TableName,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  /// Number of rows in `table`; zero if it does not exist.
  fn row_count(
    &self,
    table: TableName,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Every row of `table` in insertion order.
  fn select_all(
    &self,
    table: TableName,
  ) -> impl Future<Output = Result<Frame, Self::Error>> + Send + '_;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Last-write-wins per `conflict` key: rows whose key matches a stored row
  /// update every non-key column of it, other rows are inserted.
  fn upsert(
    &self,
    table: TableName,
    frame: Frame,
    conflict: Vec<ColumnName>,
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + '_;

  /// Deduplicate `frame`, then insert each row unless an equal row is already
  /// stored.
  fn insert_ignore_duplicates(
    &self,
    table: TableName,
    frame: Frame,
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + '_;

  /// Delete every row whose `cvm_code` is one of `codes`, in one transaction.
  /// Returns the number of rows removed per code, in input order.
  fn delete_identifiers(
    &self,
    table: TableName,
    codes: Vec<String>,
  ) -> impl Future<Output = Result<Vec<(String, usize)>, Self::Error>> + Send + '_;
}
