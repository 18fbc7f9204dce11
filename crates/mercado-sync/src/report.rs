//! Per-run outcome summary.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use mercado_core::{ident::TableName, store::WriteOutcome};
use serde::Serialize;
use tracing::{error, info};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableReport {
  pub written:       WriteOutcome,
  /// Codes with a non-empty payload.
  pub fetched:       usize,
  /// Codes whose fetch was empty or failed.
  pub empty:         usize,
  pub pruned_before: BTreeSet<String>,
  pub pruned_after:  BTreeSet<String>,
  /// Why this table's step was aborted, if it was.
  pub failure:       Option<String>,
}

impl TableReport {
  pub fn failed(&self) -> bool { self.failure.is_some() }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
  pub started_at:  DateTime<Utc>,
  pub finished_at: Option<DateTime<Utc>>,
  pub companies:   usize,
  pub tables:      BTreeMap<TableName, TableReport>,
}

impl RunReport {
  pub fn start() -> Self {
    Self {
      started_at:  Utc::now(),
      finished_at: None,
      companies:   0,
      tables:      TableName::ALL
        .into_iter()
        .map(|t| (t, TableReport::default()))
        .collect(),
    }
  }

  pub fn table(&self, table: TableName) -> Option<&TableReport> { self.tables.get(&table) }

  pub fn table_mut(&mut self, table: TableName) -> &mut TableReport {
    self.tables.entry(table).or_default()
  }

  /// Mark `table` as failed. The first recorded reason is kept.
  pub fn fail(&mut self, table: TableName, reason: impl ToString) {
    self
      .table_mut(table)
      .failure
      .get_or_insert_with(|| reason.to_string());
  }

  pub fn has_failures(&self) -> bool { self.tables.values().any(TableReport::failed) }

  pub fn finish(&mut self) { self.finished_at = Some(Utc::now()); }

  pub fn log_summary(&self) {
    let elapsed = self
      .finished_at
      .map(|end| (end - self.started_at).num_seconds())
      .unwrap_or_default();
    info!(companies = self.companies, elapsed_secs = elapsed, "sync finished");
    for (table, report) in &self.tables {
      let removed = report.pruned_before.len() + report.pruned_after.len();
      match &report.failure {
        Some(reason) => error!(%table, %reason, "table step failed"),
        None => info!(
          %table,
          inserted = report.written.inserted,
          updated = report.written.updated,
          skipped = report.written.skipped,
          fetched = report.fetched,
          empty = report.empty,
          removed,
          "table synced"
        ),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn failures_are_per_table() {
    let mut report = RunReport::start();
    assert!(!report.has_failures());
    report.fail(TableName::IncomeStatement, "disk full");
    assert!(report.has_failures());
    assert!(report.table(TableName::IncomeStatement).unwrap().failed());
    assert!(!report.table(TableName::BalanceSheet).unwrap().failed());
  }

  #[test]
  fn first_failure_reason_wins() {
    let mut report = RunReport::start();
    report.fail(TableName::Companies, "conflict column quarter is not present");
    report.fail(TableName::Companies, "database is locked");
    assert_eq!(
      report.table(TableName::Companies).unwrap().failure.as_deref(),
      Some("conflict column quarter is not present")
    );
  }

  #[test]
  fn serializes_with_table_names_as_keys() {
    let mut report = RunReport::start();
    report.table_mut(TableName::MarketRatios).written.inserted = 3;
    report.finish();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["tables"]["market_ratios"]["written"]["inserted"], 3);
    assert!(json["finished_at"].is_string());
  }
}
