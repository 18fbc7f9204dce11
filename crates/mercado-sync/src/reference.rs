//! Loading the reference set of valid company codes.

use std::{io::Read, path::PathBuf};

use mercado_client::MarketDataClient;
use mercado_core::{
  ident::{CVM_CODE, CvmCode},
  reference::{Company, ReferenceSet},
};
use tracing::{info, warn};

use crate::{
  Error, Result,
  error::BoxError,
};

/// Where the reference set comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceSource {
  /// A curated CSV file, taken as-is.
  Csv(PathBuf),
  /// The API company listing, filtered to domestic B3-listed companies.
  Api,
}

/// Load the reference set for this run. Any failure, including an empty
/// result, is [`Error::SourceUnavailable`].
pub async fn load_reference_set(
  source: &ReferenceSource,
  client: &MarketDataClient,
) -> Result<ReferenceSet> {
  let set = match source {
    ReferenceSource::Csv(path) => {
      let bytes = tokio::fs::read(path).await.map_err(|e| {
        Error::source_unavailable(format!("cannot read {}: {e}", path.display()))
      })?;
      let companies = read_companies_csv(bytes.as_slice())
        .map_err(Error::source_unavailable)?;
      info!(path = %path.display(), rows = companies.len(), "read reference CSV");
      ReferenceSet::from_companies(companies)
    }
    ReferenceSource::Api => {
      let listed = client
        .list_companies()
        .await
        .map_err(Error::source_unavailable)?;
      let total = listed.len();
      let set = ReferenceSet::from_companies(
        listed.into_iter().filter(Company::is_domestic_listed),
      );
      info!(total, kept = set.len(), "filtered API listing to domestic B3-listed companies");
      set
    }
  };

  if set.is_empty() {
    return Err(Error::source_unavailable("reference set is empty"));
  }
  info!(companies = set.len(), "loaded reference set");
  Ok(set)
}

/// Parse company rows from CSV. Only `cvm_code` is required; any other
/// missing attribute column is read as null. Rows with an unusable code are
/// skipped.
pub fn read_companies_csv<R: Read>(reader: R) -> Result<Vec<Company>, BoxError> {
  let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
  let headers = rdr.headers()?.clone();
  let position = |name: &str| headers.iter().position(|h| h == name);

  let code_idx = position(CVM_CODE).ok_or("missing `cvm_code` column")?;
  let name_idx = position("name");
  let sector_idx = position("sector");
  let sub_sector_idx = position("sub_sector");
  let segment_idx = position("segment");
  let foreign_idx = position("is_foreign");
  let listed_idx = position("is_b3_listed");

  let mut companies = vec![];
  for (line, record) in rdr.records().enumerate() {
    let record = record?;
    let field = |idx: Option<usize>| {
      idx
        .and_then(|i| record.get(i))
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
    };

    let raw = record.get(code_idx).unwrap_or_default();
    let code = match CvmCode::new(normalize_code(raw)) {
      Ok(code) => code,
      Err(e) => {
        warn!(line = line + 2, error = %e, "skipping reference row");
        continue;
      }
    };

    let mut company = Company::new(code);
    company.name = field(name_idx);
    company.sector = field(sector_idx);
    company.sub_sector = field(sub_sector_idx);
    company.segment = field(segment_idx);
    company.is_foreign = field(foreign_idx).as_deref().and_then(parse_flag);
    company.is_b3_listed = field(listed_idx).as_deref().and_then(parse_flag);
    companies.push(company);
  }
  Ok(companies)
}

/// Integral codes written with a float suffix (`"1234.0"`) lose it.
fn normalize_code(raw: &str) -> &str {
  match raw.strip_suffix(".0") {
    Some(int) if !int.is_empty() && int.bytes().all(|b| b.is_ascii_digit()) => int,
    _ => raw,
  }
}

fn parse_flag(raw: &str) -> Option<bool> {
  match raw.to_ascii_lowercase().as_str() {
    "true" | "1" | "yes" | "t" => Some(true),
    "false" | "0" | "no" | "f" => Some(false),
    _ => None,
  }
}
