//! Raw dump to CSV files.

use mercado_client::MarketDataClient;
use mercado_core::ident::FactCategory;
use mercado_sync::{SyncConfig, dump::dump};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use wiremock::{
  Mock, MockServer, ResponseTemplate,
  matchers::{method, path},
};

#[tokio::test]
async fn writes_one_file_per_non_empty_payload() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/companies/100/incomes"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!([
      { "year": 2023, "revenue": 10 },
    ])))
    .mount(&server)
    .await;

  let dir = TempDir::new().unwrap();
  let csv = dir.path().join("companies.csv");
  std::fs::write(&csv, "cvm_code\n100\n200\n").unwrap();
  let out = dir.path().join("raw");

  let mut config = SyncConfig::default();
  config.api.base_url = server.uri();
  config.api.token = Some("token".into());
  config.api.request_interval_ms = 0;
  config.reference.csv_path = Some(csv);
  config.categories = Some(vec![FactCategory::Incomes, FactCategory::Ratios]);
  let client = MarketDataClient::new(config.client_config().unwrap()).unwrap();

  let files = dump(&config, &client, &out).await.unwrap();
  assert_eq!(files, vec![out.join("100_income_statement.csv")]);

  let text = std::fs::read_to_string(&files[0]).unwrap();
  assert_eq!(text, "cvm_code,year,revenue\n100,2023,10\n");
}
