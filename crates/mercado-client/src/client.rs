//! [`MarketDataClient`]: the paced, authenticated HTTP fetcher.

use std::time::Duration;

use mercado_core::{
  frame::Frame,
  ident::{CvmCode, FactCategory},
  reference::Company,
};
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::{
  error::{FetchError, Result},
  limiter::RateGate,
  status::StatusCategory,
};

pub const DEFAULT_BASE_URL: &str = "https://api.dadosdemercado.com.br/v1";

/// Connection settings for the market-data API.
#[derive(Debug, Clone)]
pub struct ClientConfig {
  pub base_url:         String,
  pub token:            String,
  /// Minimum spacing between two requests.
  pub request_interval: Duration,
  pub timeout:          Duration,
}

impl ClientConfig {
  pub fn new(token: impl Into<String>) -> Self {
    Self {
      base_url:         DEFAULT_BASE_URL.to_owned(),
      token:            token.into(),
      request_interval: Duration::from_secs(1),
      timeout:          Duration::from_secs(30),
    }
  }
}

/// Async client for the company listing and the per-company fact endpoints.
pub struct MarketDataClient {
  client: Client,
  config: ClientConfig,
  gate:   RateGate,
}

impl MarketDataClient {
  pub fn new(config: ClientConfig) -> Result<Self> {
    if config.token.trim().is_empty() {
      return Err(FetchError::Config("API token is empty".into()));
    }
    let client = Client::builder()
      .timeout(config.timeout)
      .build()
      .map_err(|e| FetchError::Config(e.to_string()))?;
    let gate = RateGate::fixed_interval(config.request_interval);
    Ok(Self { client, config, gate })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  /// Paced, authenticated `GET` returning the decoded JSON body.
  async fn get_json(&self, path: &str) -> Result<Value> {
    self.gate.wait().await;
    let url = self.url(path);
    debug!(%url, "GET");

    let resp = self
      .client
      .get(&url)
      .bearer_auth(&self.config.token)
      .send()
      .await
      .map_err(FetchError::from_reqwest)?;

    let status = resp.status();
    if !status.is_success() {
      return Err(FetchError::Status(StatusCategory::from(status)));
    }
    resp.json().await.map_err(FetchError::from_reqwest)
  }

  // ── Companies ─────────────────────────────────────────────────────────────

  /// `GET /companies`: every company record the API lists.
  ///
  /// Records without a usable `cvm_code` are skipped with a warning; any
  /// request or decode failure is returned to the caller.
  pub async fn list_companies(&self) -> Result<Vec<Company>> {
    let body = self.get_json("/companies").await?;
    let Value::Array(records) = body else {
      return Err(FetchError::Decode("company listing is not a JSON array".into()));
    };

    let mut companies = Vec::with_capacity(records.len());
    for record in &records {
      let Some(fields) = record.as_object() else {
        warn!("skipping non-object company record");
        continue;
      };
      match company_from_record(fields) {
        Ok(company) => companies.push(company),
        Err(e) => warn!(error = %e, "skipping company record"),
      }
    }
    info!(listed = records.len(), decoded = companies.len(), "fetched company listing");
    Ok(companies)
  }

  // ── Facts ─────────────────────────────────────────────────────────────────

  /// `GET /companies/{code}/{endpoint}` as a frame whose every row carries
  /// `cvm_code`. Keys that cannot be stored as column names are dropped with
  /// a warning.
  pub async fn fetch_frame(&self, category: FactCategory, code: &CvmCode) -> Result<Frame> {
    let path = format!("/companies/{code}/{}", category.endpoint());
    let body = self.get_json(&path).await?;
    let (frame, rejected) = Frame::from_json_lossy(body)?;
    for key in &rejected {
      warn!(%category, cvm_code = %code, column = %key, "skipping key that is not a valid column name");
    }
    Ok(frame.with_identifier(code))
  }

  /// Like [`fetch_frame`](Self::fetch_frame), but a failure is logged with
  /// its category message and yields an empty frame.
  pub async fn fetch_facts(&self, category: FactCategory, code: &CvmCode) -> Frame {
    match self.fetch_frame(category, code).await {
      Ok(frame) => {
        debug!(%category, cvm_code = %code, rows = frame.len(), "fetched");
        frame
      }
      Err(e) => {
        warn!(%category, cvm_code = %code, "fetch failed: {e}");
        Frame::default()
      }
    }
  }
}

fn company_from_record(fields: &Map<String, Value>) -> Result<Company, mercado_core::Error> {
  let code = fields.get("cvm_code").unwrap_or(&Value::Null);
  let text = |key: &str| match fields.get(key) {
    None | Some(Value::Null) => None,
    Some(Value::String(s)) => Some(s.clone()),
    Some(other) => Some(other.to_string()),
  };
  let flag = |key: &str| fields.get(key).and_then(Value::as_bool);

  let mut company = Company::new(CvmCode::from_json(code)?);
  company.name = text("name");
  company.sector = text("sector");
  company.sub_sector = text("sub_sector");
  company.segment = text("segment");
  company.is_foreign = flag("is_foreign");
  company.is_b3_listed = flag("is_b3_listed");
  Ok(company)
}
