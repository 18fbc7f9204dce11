//! Identifiers: company codes, table names, and column names.
//!
//! Table names form a closed allow-list and column names are validated before
//! any SQL is built, so every identifier that reaches a query string is known
//! to be safe to quote. Values are never interpolated; backends bind them.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use crate::{Error, Result};

// ─── Company code ────────────────────────────────────────────────────────────

/// The CVM code: the business key that identifies a company across every
/// table.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct CvmCode(String);

impl CvmCode {
  /// Parse a code from text. Surrounding whitespace is trimmed; the result
  /// must be non-empty and contain only ASCII alphanumerics, `-` or `_`, so
  /// it can be embedded in a URL path segment.
  pub fn new(raw: impl AsRef<str>) -> Result<Self> {
    let trimmed = raw.as_ref().trim();
    let valid = !trimmed.is_empty()
      && trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
      return Err(Error::InvalidCode(raw.as_ref().to_owned()));
    }
    Ok(Self(trimmed.to_owned()))
  }

  /// Coerce a JSON scalar to a code. Integral numbers keep their integer
  /// form, so `1234` and `1234.0` both become `"1234"`.
  pub fn from_json(value: &Value) -> Result<Self> {
    match value {
      Value::String(s) => Self::new(s),
      Value::Number(n) => Self::new(number_text(n)),
      other => Err(Error::InvalidCode(other.to_string())),
    }
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

/// Decimal text for a JSON number, dropping a zero fractional part.
pub(crate) fn number_text(n: &serde_json::Number) -> String {
  if let Some(i) = n.as_i64() {
    return i.to_string();
  }
  if let Some(u) = n.as_u64() {
    return u.to_string();
  }
  match n.as_f64() {
    Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{f:.0}"),
    _ => n.to_string(),
  }
}

impl fmt::Display for CvmCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl FromStr for CvmCode {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Self::new(s) }
}

impl TryFrom<String> for CvmCode {
  type Error = Error;

  fn try_from(s: String) -> Result<Self> { Self::new(s) }
}

impl From<CvmCode> for String {
  fn from(code: CvmCode) -> Self { code.0 }
}

// ─── Tables ──────────────────────────────────────────────────────────────────

/// Every table the engine is allowed to touch.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TableName {
  Companies,
  BalanceSheet,
  IncomeStatement,
  CashFlowStatement,
  MarketRatios,
  FinancialRatios,
}

impl TableName {
  /// All tables, `companies` first.
  pub const ALL: [TableName; 6] = [
    TableName::Companies,
    TableName::BalanceSheet,
    TableName::IncomeStatement,
    TableName::CashFlowStatement,
    TableName::MarketRatios,
    TableName::FinancialRatios,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Companies => "companies",
      Self::BalanceSheet => "balance_sheet",
      Self::IncomeStatement => "income_statement",
      Self::CashFlowStatement => "cash_flow_statement",
      Self::MarketRatios => "market_ratios",
      Self::FinancialRatios => "financial_ratios",
    }
  }

  /// The name wrapped in double quotes, ready to splice into SQL.
  pub fn quoted(&self) -> String { format!("\"{}\"", self.as_str()) }

  /// Resolve a user-supplied name against the allow-list.
  pub fn parse(name: &str) -> Result<Self> {
    name
      .parse()
      .map_err(|_| Error::UnknownTable(name.to_owned()))
  }
}

// ─── Fact categories ─────────────────────────────────────────────────────────

/// A category of per-company financial data served by the market-data API.
///
/// Serialised by the name of the table it lands in.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FactCategory {
  #[serde(rename = "balance_sheet")]
  #[strum(serialize = "balance_sheet")]
  Balances,
  #[serde(rename = "income_statement")]
  #[strum(serialize = "income_statement")]
  Incomes,
  #[serde(rename = "cash_flow_statement")]
  #[strum(serialize = "cash_flow_statement")]
  CashFlows,
  MarketRatios,
  #[serde(rename = "financial_ratios")]
  #[strum(serialize = "financial_ratios")]
  Ratios,
}

impl FactCategory {
  /// Sync order.
  pub const ALL: [FactCategory; 5] = [
    FactCategory::Balances,
    FactCategory::Incomes,
    FactCategory::CashFlows,
    FactCategory::MarketRatios,
    FactCategory::Ratios,
  ];

  /// Path segment under `/companies/{code}/`.
  pub fn endpoint(&self) -> &'static str {
    match self {
      Self::Balances => "balances",
      Self::Incomes => "incomes",
      Self::CashFlows => "cash_flows",
      Self::MarketRatios => "market_ratios",
      Self::Ratios => "ratios",
    }
  }

  pub fn table(&self) -> TableName {
    match self {
      Self::Balances => TableName::BalanceSheet,
      Self::Incomes => TableName::IncomeStatement,
      Self::CashFlows => TableName::CashFlowStatement,
      Self::MarketRatios => TableName::MarketRatios,
      Self::Ratios => TableName::FinancialRatios,
    }
  }
}

// ─── Columns ─────────────────────────────────────────────────────────────────

const MAX_COLUMN_LEN: usize = 63;

/// A validated column name: `[A-Za-z_][A-Za-z0-9_]*`, at most 63 bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "String")]
pub struct ColumnName(String);

impl ColumnName {
  pub fn new(raw: impl Into<String>) -> Result<Self> {
    let raw = raw.into();
    let mut chars = raw.chars();
    let valid = raw.len() <= MAX_COLUMN_LEN
      && chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
      && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
      return Err(Error::InvalidColumnName(raw));
    }
    Ok(Self(raw))
  }

  /// The identifier column shared by every table.
  pub fn cvm_code() -> Self { Self::trusted(CVM_CODE) }

  /// For names known at compile time to be valid.
  pub(crate) fn trusted(name: &'static str) -> Self { Self(name.to_owned()) }

  pub fn is_cvm_code(&self) -> bool { self.0 == CVM_CODE }

  pub fn as_str(&self) -> &str { &self.0 }

  /// The name wrapped in double quotes, ready to splice into SQL.
  pub fn quoted(&self) -> String { format!("\"{}\"", self.0) }
}

/// Name of the identifier column.
pub const CVM_CODE: &str = "cvm_code";

impl fmt::Display for ColumnName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<ColumnName> for String {
  fn from(c: ColumnName) -> Self { c.0 }
}

impl<'de> Deserialize<'de> for ColumnName {
  fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(d)?;
    ColumnName::new(raw).map_err(serde::de::Error::custom)
  }
}
