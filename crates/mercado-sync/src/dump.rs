//! Raw dump: fetch every category for every company into CSV files, without
//! touching the database.

use std::path::{Path, PathBuf};

use mercado_client::MarketDataClient;
use mercado_core::{frame::Frame, ident::TableName};
use tracing::info;

use crate::{Error, Result, SyncConfig, error::BoxError, reference::load_reference_set};

/// Write each non-empty payload to `{out_dir}/{cvm_code}_{table}.csv`.
/// Returns the files written.
pub async fn dump(
  config:  &SyncConfig,
  client:  &MarketDataClient,
  out_dir: &Path,
) -> Result<Vec<PathBuf>> {
  let reference = load_reference_set(&config.reference_source(), client).await?;
  tokio::fs::create_dir_all(out_dir)
    .await
    .map_err(|e| Error::Dump(e.into()))?;

  let mut written = vec![];
  for category in config.categories() {
    let table = category.table();
    for code in reference.codes() {
      let frame = client.fetch_facts(category, code).await;
      if frame.is_empty() {
        continue;
      }
      let path = out_dir.join(file_name(code.as_str(), table));
      let bytes = to_csv(&frame).map_err(Error::Dump)?;
      tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| Error::Dump(e.into()))?;
      info!(path = %path.display(), rows = frame.len(), "saved raw payload");
      written.push(path);
    }
  }
  Ok(written)
}

fn file_name(code: &str, table: TableName) -> String { format!("{code}_{table}.csv") }

/// Header row plus one record per row; nulls are empty fields.
pub fn to_csv(frame: &Frame) -> Result<Vec<u8>, BoxError> {
  let mut wtr = csv::Writer::from_writer(vec![]);
  wtr.write_record(frame.columns().iter().map(|c| c.as_str()))?;
  for row in frame.rows() {
    wtr.write_record(row.iter().map(|cell| cell.to_field()))?;
  }
  wtr.into_inner().map_err(|e| e.into_error().into())
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;
  use serde_json::json;

  use super::*;

  #[test]
  fn renders_header_and_nulls() {
    let frame = Frame::from_json(json!([
      { "cvm_code": "100", "year": "2020", "note": null },
      { "cvm_code": "100", "year": "2021", "note": "restated, twice" },
    ]))
    .unwrap();
    let text = String::from_utf8(to_csv(&frame).unwrap()).unwrap();
    assert_eq!(
      text,
      "cvm_code,year,note\n100,2020,\n100,2021,\"restated, twice\"\n"
    );
  }

  #[test]
  fn file_names_combine_code_and_table() {
    assert_eq!(file_name("906", TableName::CashFlowStatement), "906_cash_flow_statement.csv");
  }
}
