//! Conversions between [`Cell`] and SQLite values.
//!
//! Booleans are stored as integers `0`/`1`, the SQLite convention. When
//! reading back, integers in a `BOOLEAN` column become [`Cell::Bool`]; in any
//! other column every scalar is returned as text.

use mercado_core::frame::Cell;
use rusqlite::types::Value;

pub fn encode_cell(cell: &Cell) -> Value {
  match cell {
    Cell::Null => Value::Null,
    Cell::Text(s) => Value::Text(s.clone()),
    Cell::Bool(b) => Value::Integer(i64::from(*b)),
  }
}

pub fn encode_row(row: &[Cell]) -> Vec<Value> {
  row.iter().map(encode_cell).collect()
}

pub fn decode_cell(value: Value, declared: &str) -> Cell {
  let boolean = declared.eq_ignore_ascii_case("BOOLEAN");
  match value {
    Value::Null => Cell::Null,
    Value::Integer(i) if boolean => Cell::Bool(i != 0),
    Value::Integer(i) => Cell::Text(i.to_string()),
    Value::Real(f) => Cell::Text(f.to_string()),
    Value::Text(s) => Cell::Text(s),
    Value::Blob(b) => Cell::Text(String::from_utf8_lossy(&b).into_owned()),
  }
}

/// Text form of a stored identifier, whatever its storage class.
pub fn decode_code(value: Value) -> Option<String> {
  match value {
    Value::Null => None,
    Value::Integer(i) => Some(i.to_string()),
    Value::Real(f) => Some(f.to_string()),
    Value::Text(s) => Some(s),
    Value::Blob(b) => Some(String::from_utf8_lossy(&b).into_owned()),
  }
}
