//! Tabular payloads: an ordered column list plus rows of cells.
//!
//! A [`Frame`] is what the fetcher hands to the reconciler and what the store
//! writes. Column order is significant: it drives schema inference.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::{
  Error, Result,
  ident::{ColumnName, CvmCode, number_text},
};

// ─── Cell ────────────────────────────────────────────────────────────────────

/// A single stored value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Cell {
  Null,
  Text(String),
  Bool(bool),
}

impl Cell {
  /// Convert a JSON value into the opaque text form used by inferred columns.
  /// Nested arrays and objects are kept as compact JSON.
  pub fn from_json(value: &Value) -> Self {
    match value {
      Value::Null => Cell::Null,
      Value::String(s) => Cell::Text(s.clone()),
      Value::Number(n) => Cell::Text(number_text(n)),
      Value::Bool(b) => Cell::Text(b.to_string()),
      nested => Cell::Text(nested.to_string()),
    }
  }

  pub fn text(s: impl Into<String>) -> Self { Cell::Text(s.into()) }

  pub fn is_null(&self) -> bool { matches!(self, Cell::Null) }

  /// Render for CSV output; `NULL` becomes the empty string.
  pub fn to_field(&self) -> String {
    match self {
      Cell::Null => String::new(),
      Cell::Text(s) => s.clone(),
      Cell::Bool(b) => b.to_string(),
    }
  }
}

impl From<Option<String>> for Cell {
  fn from(v: Option<String>) -> Self { v.map_or(Cell::Null, Cell::Text) }
}

impl From<Option<bool>> for Cell {
  fn from(v: Option<bool>) -> Self { v.map_or(Cell::Null, Cell::Bool) }
}

// ─── Frame ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
  columns: Vec<ColumnName>,
  rows:    Vec<Vec<Cell>>,
}

impl Frame {
  /// An empty frame with the given columns. Duplicate names are rejected.
  pub fn new(columns: Vec<ColumnName>) -> Result<Self> {
    let mut seen = HashSet::new();
    for c in &columns {
      if !seen.insert(c) {
        return Err(Error::DuplicateColumn(c.to_string()));
      }
    }
    Ok(Self { columns, rows: vec![] })
  }

  /// Build a frame from a JSON array of objects.
  ///
  /// Columns are the union of all keys in first-seen order; a record that
  /// lacks a key gets `Null` in that column. A key that is not a valid
  /// column name is an error.
  pub fn from_json(value: Value) -> Result<Self> {
    Self::from_records(&json_records(value)?)
  }

  /// Like [`from_json`](Self::from_json), but keys that are not valid column
  /// names are left out. Returns them, in first-seen order, next to the frame.
  pub fn from_json_lossy(value: Value) -> Result<(Self, Vec<String>)> {
    Ok(Self::build(&json_records(value)?))
  }

  pub fn from_records(records: &[Map<String, Value>]) -> Result<Self> {
    let (frame, rejected) = Self::build(records);
    match rejected.into_iter().next() {
      Some(key) => Err(Error::InvalidColumnName(key)),
      None => Ok(frame),
    }
  }

  fn build(records: &[Map<String, Value>]) -> (Self, Vec<String>) {
    let mut columns: Vec<ColumnName> = vec![];
    let mut rejected: Vec<String> = vec![];
    let mut seen: HashSet<&str> = HashSet::new();
    for record in records {
      for key in record.keys() {
        if seen.insert(key.as_str()) {
          match ColumnName::new(key.as_str()) {
            Ok(column) => columns.push(column),
            Err(_) => rejected.push(key.clone()),
          }
        }
      }
    }

    let rows = records
      .iter()
      .map(|record| {
        columns
          .iter()
          .map(|c| record.get(c.as_str()).map_or(Cell::Null, Cell::from_json))
          .collect()
      })
      .collect();

    (Self { columns, rows }, rejected)
  }

  pub fn push_row(&mut self, row: Vec<Cell>) -> Result<()> {
    if row.len() != self.columns.len() {
      return Err(Error::RowWidth {
        expected: self.columns.len(),
        got:      row.len(),
      });
    }
    self.rows.push(row);
    Ok(())
  }

  pub fn columns(&self) -> &[ColumnName] { &self.columns }

  pub fn rows(&self) -> &[Vec<Cell>] { &self.rows }

  pub fn into_rows(self) -> Vec<Vec<Cell>> { self.rows }

  pub fn len(&self) -> usize { self.rows.len() }

  pub fn is_empty(&self) -> bool { self.rows.is_empty() }

  pub fn column_index(&self, name: &str) -> Option<usize> {
    self.columns.iter().position(|c| c.as_str() == name)
  }

  /// Value of `column` in row `row`, if both exist.
  pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
    let idx = self.column_index(column)?;
    self.rows.get(row).map(|r| &r[idx])
  }

  /// Guarantee a `cvm_code` column.
  ///
  /// If the payload has no such column, one is prepended holding `code`.
  /// If it has one, `Null` cells in it are filled with `code`.
  pub fn with_identifier(mut self, code: &CvmCode) -> Self {
    match self.columns.iter().position(ColumnName::is_cvm_code) {
      Some(idx) => {
        for row in &mut self.rows {
          if row[idx].is_null() {
            row[idx] = Cell::text(code.as_str());
          }
        }
      }
      None => {
        self.columns.insert(0, ColumnName::cvm_code());
        for row in &mut self.rows {
          row.insert(0, Cell::text(code.as_str()));
        }
      }
    }
    self
  }

  /// Drop exact duplicate rows, keeping the first occurrence.
  pub fn dedup(&mut self) {
    let mut seen: HashSet<Vec<Cell>> = HashSet::with_capacity(self.rows.len());
    self.rows.retain(|row| seen.insert(row.clone()));
  }

  /// Re-shape the frame onto `target` columns.
  ///
  /// Columns missing from the frame are filled with `Null`. Returns the new
  /// frame together with the frame columns that `target` does not contain.
  pub fn project(&self, target: &[ColumnName]) -> (Frame, Vec<ColumnName>) {
    let mapping: Vec<Option<usize>> = target
      .iter()
      .map(|c| self.column_index(c.as_str()))
      .collect();

    let dropped = self
      .columns
      .iter()
      .filter(|c| !target.contains(c))
      .cloned()
      .collect();

    let rows = self
      .rows
      .iter()
      .map(|row| {
        mapping
          .iter()
          .map(|m| m.map_or(Cell::Null, |i| row[i].clone()))
          .collect()
      })
      .collect();

    (Frame { columns: target.to_vec(), rows }, dropped)
  }
}

fn json_records(value: Value) -> Result<Vec<Map<String, Value>>> {
  let items = match value {
    Value::Array(items) => items,
    other => return Err(Error::NotARecordArray(json_kind(&other))),
  };
  items
    .into_iter()
    .map(|item| match item {
      Value::Object(map) => Ok(map),
      other => Err(Error::NotARecordArray(json_kind(&other))),
    })
    .collect()
}

fn json_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;
  use serde_json::json;

  use super::*;

  fn col(s: &str) -> ColumnName { ColumnName::new(s).unwrap() }

  #[test]
  fn from_json_keeps_first_seen_column_order() {
    let frame = Frame::from_json(json!([
      { "period_end": "2020-12-31", "assets": 10 },
      { "period_end": "2021-12-31", "liabilities": 4.5, "assets": 12 },
    ]))
    .unwrap();

    let names: Vec<&str> = frame.columns().iter().map(|c| c.as_str()).collect();
    assert_eq!(names, ["period_end", "assets", "liabilities"]);
    assert_eq!(frame.get(0, "liabilities"), Some(&Cell::Null));
    assert_eq!(frame.get(1, "liabilities"), Some(&Cell::text("4.5")));
    assert_eq!(frame.get(0, "assets"), Some(&Cell::text("10")));
  }

  #[test]
  fn from_json_rejects_non_arrays() {
    let err = Frame::from_json(json!({ "error": "nope" })).unwrap_err();
    assert!(matches!(err, Error::NotARecordArray("an object")));
    let err = Frame::from_json(json!([1, 2])).unwrap_err();
    assert!(matches!(err, Error::NotARecordArray("a number")));
  }

  #[test]
  fn lossy_build_skips_only_unaddressable_keys() {
    let payload = json!([
      { "year": "2020", "net-income": "5", "ebit": "1" },
      { "year": "2021", "ebit": "2", "net-income": "6" },
    ]);
    assert!(matches!(
      Frame::from_json(payload.clone()),
      Err(Error::InvalidColumnName(key)) if key == "net-income"
    ));

    let (frame, rejected) = Frame::from_json_lossy(payload).unwrap();
    let names: Vec<&str> = frame.columns().iter().map(|c| c.as_str()).collect();
    assert_eq!(names, ["year", "ebit"]);
    assert_eq!(rejected, ["net-income"]);
    assert_eq!(frame.len(), 2);
    assert_eq!(frame.get(1, "ebit"), Some(&Cell::text("2")));
  }

  #[test]
  fn empty_array_is_an_empty_frame() {
    let frame = Frame::from_json(json!([])).unwrap();
    assert!(frame.is_empty());
    assert!(frame.columns().is_empty());
  }

  #[test]
  fn with_identifier_prepends_missing_column() {
    let frame = Frame::from_json(json!([{ "ebit": "50" }]))
      .unwrap()
      .with_identifier(&CvmCode::new("100").unwrap());
    assert_eq!(frame.columns()[0], ColumnName::cvm_code());
    assert_eq!(frame.rows()[0], vec![Cell::text("100"), Cell::text("50")]);
  }

  #[test]
  fn with_identifier_fills_null_codes() {
    let frame = Frame::from_json(json!([
      { "cvm_code": null, "ebit": "1" },
      { "cvm_code": 200, "ebit": "2" },
    ]))
    .unwrap()
    .with_identifier(&CvmCode::new("100").unwrap());
    assert_eq!(frame.get(0, "cvm_code"), Some(&Cell::text("100")));
    assert_eq!(frame.get(1, "cvm_code"), Some(&Cell::text("200")));
  }

  #[test]
  fn dedup_keeps_first_occurrence() {
    let mut frame = Frame::new(vec![col("a"), col("b")]).unwrap();
    frame.push_row(vec![Cell::text("1"), Cell::Null]).unwrap();
    frame.push_row(vec![Cell::text("2"), Cell::Null]).unwrap();
    frame.push_row(vec![Cell::text("1"), Cell::Null]).unwrap();
    frame.dedup();
    assert_eq!(frame.len(), 2);
    assert_eq!(frame.rows()[1][0], Cell::text("2"));
  }

  #[test]
  fn project_fills_and_reports_dropped() {
    let frame = Frame::from_json(json!([{ "a": "1", "x": "9" }])).unwrap();
    let (projected, dropped) = frame.project(&[col("a"), col("b")]);
    assert_eq!(projected.rows()[0], vec![Cell::text("1"), Cell::Null]);
    assert_eq!(dropped, vec![col("x")]);
  }

  #[test]
  fn push_row_checks_width() {
    let mut frame = Frame::new(vec![col("a")]).unwrap();
    let err = frame.push_row(vec![]).unwrap_err();
    assert!(matches!(err, Error::RowWidth { expected: 1, got: 0 }));
  }

  #[test]
  fn new_rejects_duplicate_columns() {
    assert!(Frame::new(vec![col("a"), col("a")]).is_err());
  }
}
