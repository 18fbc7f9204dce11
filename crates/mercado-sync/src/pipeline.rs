//! One synchronization run.

use mercado_client::MarketDataClient;
use mercado_core::{
  ident::{FactCategory, TableName},
  reference::ReferenceSet,
  schema::ColumnSpec,
  store::{SyncStore, WriteOutcome},
};
use tracing::{Instrument, error, info, info_span};

use crate::{
  Result, SyncConfig,
  reconcile::{prune_invalid, write},
  reference::load_reference_set,
  report::RunReport,
  schemas::TableSchemas,
};

/// Run a full sync of `store` against the API.
///
/// Only a reference-set failure aborts the run. Schema and write failures
/// abort the affected table's step and are recorded in the returned report.
/// Pruning runs on every table in both passes, including tables whose write
/// step failed.
pub async fn run<S: SyncStore>(
  config: &SyncConfig,
  store:  &S,
  client: &MarketDataClient,
) -> Result<RunReport> {
  let mut report = RunReport::start();
  let reference = load_reference_set(&config.reference_source(), client).await?;
  report.companies = reference.len();

  let mut schemas = TableSchemas::new();
  sync_companies(config, store, &reference, &mut schemas, &mut report).await;

  prune_all(store, &reference, &mut report, Pass::Before).await;

  for category in config.categories() {
    let table = category.table();
    sync_category(config, store, client, &reference, &mut schemas, &mut report, category)
      .instrument(info_span!("category", %table))
      .await;
  }

  prune_all(store, &reference, &mut report, Pass::After).await;

  report.finish();
  report.log_summary();
  Ok(report)
}

async fn sync_companies<S: SyncStore>(
  config:    &SyncConfig,
  store:     &S,
  reference: &ReferenceSet,
  schemas:   &mut TableSchemas,
  report:    &mut RunReport,
) {
  let table = TableName::Companies;
  match write_companies(config, store, reference, schemas).await {
    Ok(outcome) => {
      info!(%table, rows = outcome.total(), "wrote companies");
      report.table_mut(table).written += outcome;
    }
    Err(e) => {
      error!(%table, operation = "write companies", "{e}");
      report.fail(table, e);
    }
  }
}

async fn write_companies<S: SyncStore>(
  config:    &SyncConfig,
  store:     &S,
  reference: &ReferenceSet,
  schemas:   &mut TableSchemas,
) -> Result<WriteOutcome> {
  let table = TableName::Companies;
  schemas.freeze(store, table, ColumnSpec::companies()).await?;
  let frame = schemas
    .conform(store, table, reference.companies_frame())
    .await?;
  write(store, table, frame, &config.write_mode(table)).await
}

#[derive(Clone, Copy)]
enum Pass {
  Before,
  After,
}

async fn prune_all<S: SyncStore>(
  store:     &S,
  reference: &ReferenceSet,
  report:    &mut RunReport,
  pass:      Pass,
) {
  for table in TableName::ALL {
    match prune_invalid(store, table, reference).await {
      Ok(removed) => {
        let entry = report.table_mut(table);
        match pass {
          Pass::Before => entry.pruned_before = removed,
          Pass::After => entry.pruned_after = removed,
        }
      }
      Err(e) => {
        error!(%table, operation = "prune", "{e}");
        report.fail(table, e);
      }
    }
  }
}

async fn sync_category<S: SyncStore>(
  config:    &SyncConfig,
  store:     &S,
  client:    &MarketDataClient,
  reference: &ReferenceSet,
  schemas:   &mut TableSchemas,
  report:    &mut RunReport,
  category:  FactCategory,
) {
  let table = category.table();
  if report.table(table).is_some_and(|t| t.failed()) {
    info!(%table, "skipping table after an earlier failure");
    return;
  }
  let mode = config.write_mode(table);
  info!(%category, companies = reference.len(), "fetching");

  for code in reference.codes() {
    let frame = client.fetch_facts(category, code).await;
    if frame.is_empty() {
      report.table_mut(table).empty += 1;
      continue;
    }
    report.table_mut(table).fetched += 1;

    let written = match schemas.conform(store, table, frame).await {
      Ok(frame) => write(store, table, frame, &mode).await,
      Err(e) => Err(e),
    };
    match written {
      Ok(outcome) => report.table_mut(table).written += outcome,
      Err(e) => {
        error!(%table, cvm_code = %code, operation = "write facts", "{e}");
        report.fail(table, e);
        return;
      }
    }
  }
}
