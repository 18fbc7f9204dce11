//! Column specifications handed to the schema manager.

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  frame::Frame,
  ident::ColumnName,
};

/// Declared storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
  Text,
  Boolean,
}

impl ColumnType {
  pub fn as_sql(&self) -> &'static str {
    match self {
      Self::Text => "TEXT",
      Self::Boolean => "BOOLEAN",
    }
  }
}

/// An ordered mapping from column name to declared type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSpec {
  columns: Vec<(ColumnName, ColumnType)>,
}

impl ColumnSpec {
  pub fn new() -> Self { Self::default() }

  /// Append a column. Re-declaring a name is an error.
  pub fn with(mut self, name: ColumnName, ty: ColumnType) -> Result<Self> {
    if self.columns.iter().any(|(n, _)| *n == name) {
      return Err(Error::DuplicateColumn(name.to_string()));
    }
    self.columns.push((name, ty));
    Ok(self)
  }

  /// The fixed layout of the `companies` table.
  pub fn companies() -> Self {
    let text = |n: &'static str| (column(n), ColumnType::Text);
    let boolean = |n: &'static str| (column(n), ColumnType::Boolean);
    Self {
      columns: vec![
        text("cvm_code"),
        text("name"),
        text("sector"),
        text("sub_sector"),
        text("segment"),
        boolean("is_foreign"),
        boolean("is_b3_listed"),
      ],
    }
  }

  /// Infer a layout from a fetched payload: `cvm_code` first, then the
  /// payload's columns in order, every column typed `TEXT`.
  pub fn infer(sample: &Frame) -> Self {
    let mut columns = vec![(ColumnName::cvm_code(), ColumnType::Text)];
    columns.extend(
      sample
        .columns()
        .iter()
        .filter(|c| !c.is_cvm_code())
        .map(|c| (c.clone(), ColumnType::Text)),
    );
    Self { columns }
  }

  pub fn columns(&self) -> &[(ColumnName, ColumnType)] { &self.columns }

  pub fn names(&self) -> Vec<ColumnName> {
    self.columns.iter().map(|(n, _)| n.clone()).collect()
  }

  pub fn is_empty(&self) -> bool { self.columns.is_empty() }
}

fn column(name: &'static str) -> ColumnName { ColumnName::trusted(name) }

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn infer_puts_cvm_code_first() {
    let sample = Frame::from_json(json!([
      { "period_end": "2020", "cvm_code": "9512", "ebit": 3 }
    ]))
    .unwrap();
    let spec = ColumnSpec::infer(&sample);
    let names: Vec<String> = spec.names().into_iter().map(String::from).collect();
    assert_eq!(names, ["cvm_code", "period_end", "ebit"]);
    assert!(spec.columns().iter().all(|(_, t)| *t == ColumnType::Text));
  }

  #[test]
  fn companies_layout_is_fixed() {
    let spec = ColumnSpec::companies();
    assert_eq!(spec.columns().len(), 7);
    assert_eq!(spec.columns()[5].1, ColumnType::Boolean);
  }

  #[test]
  fn with_rejects_redeclaration() {
    let spec = ColumnSpec::new()
      .with(ColumnName::cvm_code(), ColumnType::Text)
      .unwrap();
    assert!(spec.with(ColumnName::cvm_code(), ColumnType::Text).is_err());
  }
}
