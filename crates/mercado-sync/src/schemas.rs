//! Infer-then-freeze table layouts.
//!
//! The first time a table is written during a run its column set is fixed:
//! an existing table keeps the columns it already has, a missing one is
//! created from the first payload. Every later payload is projected onto that
//! set.

use std::collections::HashMap;

use mercado_core::{
  frame::Frame,
  ident::{ColumnName, TableName},
  schema::ColumnSpec,
  store::SyncStore,
};
use tracing::{debug, info};

use crate::{Error, Result};

#[derive(Debug, Default)]
pub struct TableSchemas {
  frozen: HashMap<TableName, Vec<ColumnName>>,
}

impl TableSchemas {
  pub fn new() -> Self { Self::default() }

  pub fn columns(&self, table: TableName) -> Option<&[ColumnName]> {
    self.frozen.get(&table).map(Vec::as_slice)
  }

  /// Fix the column set of `table`, creating it from `spec` if it does not
  /// exist. Later calls return the set frozen by the first.
  pub async fn freeze<S: SyncStore>(
    &mut self,
    store: &S,
    table: TableName,
    spec:  ColumnSpec,
  ) -> Result<&[ColumnName]> {
    if !self.frozen.contains_key(&table) {
      let columns = Self::resolve(store, table, spec).await?;
      self.frozen.insert(table, columns);
    }
    Ok(self.columns(table).unwrap_or_default())
  }

  async fn resolve<S: SyncStore>(
    store: &S,
    table: TableName,
    spec:  ColumnSpec,
  ) -> Result<Vec<ColumnName>> {
    if store
      .table_exists(table)
      .await
      .map_err(|e| Error::schema(table, e))?
    {
      let columns = store
        .table_columns(table)
        .await
        .map_err(|e| Error::schema(table, e))?;
      debug!(%table, columns = columns.len(), "using existing table layout");
      return Ok(columns);
    }

    if spec.is_empty() {
      return Err(Error::schema(table, "no columns to create the table with"));
    }
    let columns = spec.names();
    store
      .ensure_table(table, spec)
      .await
      .map_err(|e| Error::schema(table, e))?;
    info!(%table, columns = columns.len(), "created table");
    Ok(columns)
  }

  /// Freeze `table` from `frame` if needed, then project `frame` onto the
  /// frozen columns. Unknown columns are dropped, missing ones become null.
  pub async fn conform<S: SyncStore>(
    &mut self,
    store: &S,
    table: TableName,
    frame: Frame,
  ) -> Result<Frame> {
    let spec = ColumnSpec::infer(&frame);
    let columns = self.freeze(store, table, spec).await?;
    if columns == frame.columns() {
      return Ok(frame);
    }
    let (projected, dropped) = frame.project(columns);
    if !dropped.is_empty() {
      let dropped: Vec<&str> = dropped.iter().map(ColumnName::as_str).collect();
      debug!(%table, ?dropped, "dropping columns absent from the table");
    }
    Ok(projected)
  }
}

#[cfg(test)]
mod tests {
  use mercado_core::frame::Cell;
  use mercado_store_sqlite::SqliteStore;
  use pretty_assertions::assert_eq;
  use serde_json::json;

  use super::*;

  fn names(columns: &[ColumnName]) -> Vec<&str> {
    columns.iter().map(ColumnName::as_str).collect()
  }

  #[tokio::test]
  async fn first_payload_fixes_the_layout() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let mut schemas = TableSchemas::new();
    let table = TableName::BalanceSheet;

    let first = Frame::from_json(json!([{ "cvm_code": "100", "year": "2020", "assets": "1" }])).unwrap();
    let out = schemas.conform(&store, table, first).await.unwrap();
    assert_eq!(names(out.columns()), ["cvm_code", "year", "assets"]);

    let second = Frame::from_json(json!([{ "cvm_code": "200", "year": "2021", "debt": "9" }])).unwrap();
    let out = schemas.conform(&store, table, second).await.unwrap();
    assert_eq!(names(out.columns()), ["cvm_code", "year", "assets"]);
    assert_eq!(out.rows()[0], vec![Cell::text("200"), Cell::text("2021"), Cell::Null]);

    let stored = store.table_columns(table).await.unwrap();
    assert_eq!(names(&stored), ["cvm_code", "year", "assets"]);
  }

  #[tokio::test]
  async fn existing_table_wins_over_payload() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    store
      .ensure_table(
        TableName::MarketRatios,
        ColumnSpec::new()
          .with(ColumnName::cvm_code(), mercado_core::schema::ColumnType::Text)
          .unwrap()
          .with(ColumnName::new("pe").unwrap(), mercado_core::schema::ColumnType::Text)
          .unwrap(),
      )
      .await
      .unwrap();

    let mut schemas = TableSchemas::new();
    let frame = Frame::from_json(json!([{ "cvm_code": "100", "pe": "7", "pb": "1" }])).unwrap();
    let out = schemas
      .conform(&store, TableName::MarketRatios, frame)
      .await
      .unwrap();
    assert_eq!(names(out.columns()), ["cvm_code", "pe"]);
    assert_eq!(
      names(&store.table_columns(TableName::MarketRatios).await.unwrap()),
      ["cvm_code", "pe"]
    );
  }
}
