//! SQL text for the SQLite store.
//!
//! Identifiers come from [`TableName`] (a closed allow-list) and
//! [`ColumnName`] (validated on construction) and are always double-quoted.
//! Every value is a numbered `?N` placeholder bound by the caller.

use mercado_core::{
  ident::{CVM_CODE, ColumnName, TableName},
  schema::ColumnSpec,
};

/// Connection-level settings applied once at open.
pub const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = OFF;
";

pub const TABLE_EXISTS: &str =
  "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)";

pub const TABLE_INFO: &str =
  "SELECT name, type FROM pragma_table_info(?1) ORDER BY cid";

/// `CREATE TABLE` with exactly the columns of `spec`; no constraints.
pub fn create_table(table: TableName, spec: &ColumnSpec) -> String {
  let columns = spec
    .columns()
    .iter()
    .map(|(name, ty)| format!("{} {}", name.quoted(), ty.as_sql()))
    .collect::<Vec<_>>()
    .join(", ");
  format!("CREATE TABLE {} ({columns})", table.quoted())
}

pub fn distinct_codes(table: TableName) -> String {
  format!(
    "SELECT DISTINCT \"{CVM_CODE}\" FROM {} WHERE \"{CVM_CODE}\" IS NOT NULL ORDER BY 1",
    table.quoted()
  )
}

pub fn delete_code(table: TableName) -> String {
  format!("DELETE FROM {} WHERE \"{CVM_CODE}\" = ?1", table.quoted())
}

pub fn count_rows(table: TableName) -> String {
  format!("SELECT COUNT(*) FROM {}", table.quoted())
}

pub fn select_all(table: TableName, columns: &[ColumnName]) -> String {
  format!(
    "SELECT {} FROM {} ORDER BY rowid",
    quoted_list(columns),
    table.quoted()
  )
}

pub fn insert(table: TableName, columns: &[ColumnName]) -> String {
  format!(
    "INSERT INTO {} ({}) VALUES ({})",
    table.quoted(),
    quoted_list(columns),
    placeholders(1, columns.len())
  )
}

/// Insert the row bound to `?1..?N` unless a stored row is equal on every
/// listed column. `IS` makes `NULL` compare equal to `NULL`.
pub fn insert_if_absent(table: TableName, columns: &[ColumnName]) -> String {
  format!(
    "INSERT INTO {t} ({cols}) SELECT {vals} WHERE NOT EXISTS (SELECT 1 FROM {t} WHERE {matches})",
    t = table.quoted(),
    cols = quoted_list(columns),
    vals = placeholders(1, columns.len()),
    matches = match_clause(columns, 1),
  )
}

/// `UPDATE` of `set` columns (bound first) for rows matching `key` columns
/// (bound after).
pub fn update_by_key(
  table: TableName,
  set: &[ColumnName],
  key: &[ColumnName],
) -> String {
  let assignments = set
    .iter()
    .enumerate()
    .map(|(i, c)| format!("{} = ?{}", c.quoted(), i + 1))
    .collect::<Vec<_>>()
    .join(", ");
  format!(
    "UPDATE {} SET {assignments} WHERE {}",
    table.quoted(),
    match_clause(key, set.len() + 1)
  )
}

pub fn exists_by_key(table: TableName, key: &[ColumnName]) -> String {
  format!(
    "SELECT EXISTS (SELECT 1 FROM {} WHERE {})",
    table.quoted(),
    match_clause(key, 1)
  )
}

fn quoted_list(columns: &[ColumnName]) -> String {
  columns
    .iter()
    .map(ColumnName::quoted)
    .collect::<Vec<_>>()
    .join(", ")
}

fn placeholders(first: usize, n: usize) -> String {
  (first..first + n)
    .map(|i| format!("?{i}"))
    .collect::<Vec<_>>()
    .join(", ")
}

fn match_clause(columns: &[ColumnName], first: usize) -> String {
  columns
    .iter()
    .enumerate()
    .map(|(i, c)| format!("{} IS ?{}", c.quoted(), first + i))
    .collect::<Vec<_>>()
    .join(" AND ")
}
