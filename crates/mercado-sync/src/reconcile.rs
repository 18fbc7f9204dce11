//! Keeping stored tables consistent with the reference set.

use std::collections::BTreeSet;

use mercado_core::{
  frame::Frame,
  ident::TableName,
  reference::ReferenceSet,
  store::{SyncStore, WriteOutcome},
};
use tracing::{info, warn};

use crate::{Error, Result, config::WriteMode};

/// Delete every row of `table` whose `cvm_code` is not in `valid`.
///
/// Returns the removed codes. A missing table yields an empty set.
pub async fn prune_invalid<S: SyncStore>(
  store: &S,
  table: TableName,
  valid: &ReferenceSet,
) -> Result<BTreeSet<String>> {
  let exists = store
    .table_exists(table)
    .await
    .map_err(|e| Error::schema(table, e))?;
  if !exists {
    warn!(%table, "table does not exist, nothing to prune");
    return Ok(BTreeSet::new());
  }

  let current = store
    .current_identifiers(table)
    .await
    .map_err(|e| Error::persistence(table, e))?;
  let stale: BTreeSet<String> = current
    .into_iter()
    .filter(|code| !valid.contains(code))
    .collect();
  if stale.is_empty() {
    info!(%table, "no invalid codes");
    return Ok(stale);
  }

  let removed = store
    .delete_identifiers(table, stale.iter().cloned().collect())
    .await
    .map_err(|e| Error::persistence(table, e))?;
  for (code, rows) in &removed {
    info!(%table, cvm_code = %code, rows, "removed entries");
  }
  info!(%table, codes = stale.len(), "pruned invalid codes");
  Ok(stale)
}

/// Write `frame` into `table` according to `mode`.
pub async fn write<S: SyncStore>(
  store: &S,
  table: TableName,
  frame: Frame,
  mode:  &WriteMode,
) -> Result<WriteOutcome> {
  let outcome = match mode {
    WriteMode::InsertIgnoreDuplicates => store.insert_ignore_duplicates(table, frame).await,
    WriteMode::Upsert { conflict_columns } => {
      store.upsert(table, frame, conflict_columns.clone()).await
    }
  };
  outcome.map_err(|e| Error::persistence(table, e))
}

#[cfg(test)]
mod tests {
  use mercado_core::{ident::CvmCode, reference::Company, schema::ColumnSpec};
  use mercado_store_sqlite::SqliteStore;
  use pretty_assertions::assert_eq;
  use serde_json::json;

  use super::*;

  fn reference(codes: &[&str]) -> ReferenceSet {
    ReferenceSet::from_companies(
      codes
        .iter()
        .map(|c| Company::new(CvmCode::new(c).unwrap())),
    )
  }

  async fn seeded(codes: &[&str]) -> SqliteStore {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let rows: Vec<_> = codes
      .iter()
      .map(|c| json!({ "cvm_code": c, "year": "2020" }))
      .collect();
    let frame = Frame::from_json(json!(rows)).unwrap();
    store
      .ensure_table(TableName::BalanceSheet, ColumnSpec::infer(&frame))
      .await
      .unwrap();
    store
      .insert_ignore_duplicates(TableName::BalanceSheet, frame)
      .await
      .unwrap();
    store
  }

  #[tokio::test]
  async fn removes_only_codes_outside_the_reference() {
    let store = seeded(&["100", "200", "300"]).await;
    let valid = reference(&["100", "200"]);

    let removed = prune_invalid(&store, TableName::BalanceSheet, &valid)
      .await
      .unwrap();
    assert_eq!(removed, BTreeSet::from(["300".to_owned()]));
    assert_eq!(
      store.current_identifiers(TableName::BalanceSheet).await.unwrap(),
      ["100", "200"]
    );

    let again = prune_invalid(&store, TableName::BalanceSheet, &valid)
      .await
      .unwrap();
    assert!(again.is_empty());
    assert_eq!(store.row_count(TableName::BalanceSheet).await.unwrap(), 2);
  }

  #[tokio::test]
  async fn missing_table_prunes_nothing() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let removed = prune_invalid(&store, TableName::FinancialRatios, &reference(&["100"]))
      .await
      .unwrap();
    assert!(removed.is_empty());
  }

  #[tokio::test]
  async fn write_failure_names_the_table() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let frame = Frame::from_json(json!([{ "cvm_code": "100" }])).unwrap();
    let err = write(&store, TableName::IncomeStatement, frame, &WriteMode::InsertIgnoreDuplicates)
      .await
      .unwrap_err();
    assert!(matches!(
      err,
      Error::Persistence { table: TableName::IncomeStatement, .. }
    ));
  }
}
