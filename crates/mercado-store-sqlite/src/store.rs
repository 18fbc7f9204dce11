//! [`SqliteStore`]: the SQLite implementation of [`SyncStore`].

use std::path::Path;

use mercado_core::{
  frame::Frame,
  ident::{ColumnName, TableName},
  schema::ColumnSpec,
  store::{SyncStore, WriteOutcome},
};
use rusqlite::{params_from_iter, types::Value};

use crate::{
  Error, Result,
  encode::{decode_cell, decode_code, encode_cell, encode_row},
  schema::{self, PRAGMAS, TABLE_EXISTS, TABLE_INFO},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A store backed by a single SQLite connection.
///
/// Not `Clone`: the connection is owned by exactly one store and released by
/// [`SqliteStore::close`].
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) the database at `path`.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init().await?;
    Ok(store)
  }

  /// Open a private in-memory database.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init().await?;
    Ok(store)
  }

  /// Close the connection, flushing any pending work.
  pub async fn close(self) -> Result<()> {
    self.conn.close().await?;
    Ok(())
  }

  async fn init(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(PRAGMAS)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Gateway helpers ───────────────────────────────────────────────────────

  /// Run `f` against the connection outside any explicit transaction.
  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&rusqlite::Connection) -> rusqlite::Result<T> + Send + 'static,
    T: Send + 'static,
  {
    Ok(self.conn.call(move |conn| Ok(f(conn)?)).await?)
  }

  /// Run `f` inside one transaction. Commits if `f` succeeds; the
  /// transaction is rolled back on drop otherwise.
  async fn transaction<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&rusqlite::Transaction<'_>) -> rusqlite::Result<T> + Send + 'static,
    T: Send + 'static,
  {
    Ok(
      self
        .conn
        .call(move |conn| {
          let tx = conn.transaction()?;
          let out = f(&tx)?;
          tx.commit()?;
          Ok(out)
        })
        .await?,
    )
  }

  /// Execute `sql` once per parameter row in one transaction. Returns the
  /// number of rows each execution changed.
  async fn write_many(&self, sql: String, rows: Vec<Vec<Value>>) -> Result<Vec<usize>> {
    self
      .transaction(move |tx| {
        let mut stmt = tx.prepare_cached(&sql)?;
        let changed = rows
          .iter()
          .map(|params| stmt.execute(params_from_iter(params)))
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(changed)
      })
      .await
  }

  async fn require_table(&self, table: TableName) -> Result<()> {
    if self.table_exists(table).await? {
      Ok(())
    } else {
      Err(Error::TableMissing(table))
    }
  }

  /// `(name, declared type)` of every column; empty if the table is missing.
  async fn column_types(&self, table: TableName) -> Result<Vec<(String, String)>> {
    self
      .read(move |conn| {
        let mut stmt = conn.prepare(TABLE_INFO)?;
        let columns = stmt
          .query_map([table.as_str()], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(columns)
      })
      .await
  }

  fn validate_columns(table: TableName, raw: &[(String, String)]) -> Result<Vec<ColumnName>> {
    raw
      .iter()
      .map(|(name, _)| {
        ColumnName::new(name.as_str()).map_err(|_| Error::ForeignColumn {
          table,
          column: name.clone(),
        })
      })
      .collect()
  }
}

// ─── SyncStore impl ──────────────────────────────────────────────────────────

impl SyncStore for SqliteStore {
  type Error = Error;

  // ── Catalog ───────────────────────────────────────────────────────────────

  async fn table_exists(&self, table: TableName) -> Result<bool> {
    self
      .read(move |conn| conn.query_row(TABLE_EXISTS, [table.as_str()], |r| r.get(0)))
      .await
  }

  async fn table_columns(&self, table: TableName) -> Result<Vec<ColumnName>> {
    let raw = self.column_types(table).await?;
    Self::validate_columns(table, &raw)
  }

  async fn ensure_table(&self, table: TableName, spec: ColumnSpec) -> Result<bool> {
    let ddl = schema::create_table(table, &spec);
    self
      .transaction(move |tx| {
        let exists: bool = tx.query_row(TABLE_EXISTS, [table.as_str()], |r| r.get(0))?;
        if exists {
          return Ok(false);
        }
        tx.execute(&ddl, [])?;
        Ok(true)
      })
      .await
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn current_identifiers(&self, table: TableName) -> Result<Vec<String>> {
    if !self.table_exists(table).await? {
      return Ok(vec![]);
    }
    let sql = schema::distinct_codes(table);
    let values: Vec<Value> = self
      .read(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let codes = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(codes)
      })
      .await?;
    Ok(values.into_iter().filter_map(decode_code).collect())
  }

  async fn row_count(&self, table: TableName) -> Result<u64> {
    if !self.table_exists(table).await? {
      return Ok(0);
    }
    let sql = schema::count_rows(table);
    let n: i64 = self
      .read(move |conn| conn.query_row(&sql, [], |r| r.get(0)))
      .await?;
    Ok(u64::try_from(n).unwrap_or(0))
  }

  async fn select_all(&self, table: TableName) -> Result<Frame> {
    let raw = self.column_types(table).await?;
    if raw.is_empty() {
      return Ok(Frame::default());
    }
    let columns = Self::validate_columns(table, &raw)?;
    let sql = schema::select_all(table, &columns);
    let width = columns.len();

    let rows: Vec<Vec<Value>> = self
      .read(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |row| {
            (0..width)
              .map(|i| row.get(i))
              .collect::<rusqlite::Result<Vec<Value>>>()
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut frame = Frame::new(columns)?;
    for row in rows {
      let cells = row
        .into_iter()
        .zip(&raw)
        .map(|(value, (_, declared))| decode_cell(value, declared))
        .collect();
      frame.push_row(cells)?;
    }
    Ok(frame)
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn upsert(
    &self,
    table:    TableName,
    frame:    Frame,
    conflict: Vec<ColumnName>,
  ) -> Result<WriteOutcome> {
    if conflict.is_empty() {
      return Err(mercado_core::Error::EmptyConflictKey.into());
    }
    let key_idx = conflict
      .iter()
      .map(|c| {
        frame
          .column_index(c.as_str())
          .ok_or_else(|| mercado_core::Error::UnknownConflictColumn(c.to_string()))
      })
      .collect::<Result<Vec<_>, _>>()?;
    if frame.is_empty() {
      return Ok(WriteOutcome::default());
    }
    self.require_table(table).await?;

    let set_idx: Vec<usize> = (0..frame.columns().len())
      .filter(|i| !key_idx.contains(i))
      .collect();
    let set_cols: Vec<ColumnName> =
      set_idx.iter().map(|&i| frame.columns()[i].clone()).collect();

    let update_sql = schema::update_by_key(table, &set_cols, &conflict);
    let exists_sql = schema::exists_by_key(table, &conflict);
    let insert_sql = schema::insert(table, frame.columns());
    let rows = frame.into_rows();

    self
      .transaction(move |tx| {
        let mut outcome = WriteOutcome::default();
        for row in &rows {
          let key: Vec<Value> = key_idx.iter().map(|&i| encode_cell(&row[i])).collect();

          let matched = if set_idx.is_empty() {
            // Nothing to update: a key match leaves the stored row as is.
            tx.prepare_cached(&exists_sql)?
              .query_row(params_from_iter(&key), |r| r.get::<_, bool>(0))?
          } else {
            let params = set_idx
              .iter()
              .map(|&i| encode_cell(&row[i]))
              .chain(key);
            tx.prepare_cached(&update_sql)?
              .execute(params_from_iter(params))?
              > 0
          };

          match (matched, set_idx.is_empty()) {
            (true, true) => outcome.skipped += 1,
            (true, false) => outcome.updated += 1,
            (false, _) => {
              tx.prepare_cached(&insert_sql)?
                .execute(params_from_iter(encode_row(row)))?;
              outcome.inserted += 1;
            }
          }
        }
        Ok(outcome)
      })
      .await
  }

  async fn insert_ignore_duplicates(
    &self,
    table: TableName,
    mut frame: Frame,
  ) -> Result<WriteOutcome> {
    if frame.is_empty() {
      return Ok(WriteOutcome::default());
    }
    self.require_table(table).await?;

    let incoming = frame.len();
    frame.dedup();
    let sql = schema::insert_if_absent(table, frame.columns());
    let params = frame.rows().iter().map(|row| encode_row(row)).collect();

    let changes = self.write_many(sql, params).await?;
    let inserted = changes.iter().filter(|&&n| n > 0).count();
    Ok(WriteOutcome {
      inserted,
      updated: 0,
      skipped: incoming - inserted,
    })
  }

  async fn delete_identifiers(
    &self,
    table: TableName,
    codes: Vec<String>,
  ) -> Result<Vec<(String, usize)>> {
    if codes.is_empty() {
      return Ok(vec![]);
    }
    let sql = schema::delete_code(table);
    let params = codes
      .iter()
      .map(|c| vec![Value::Text(c.clone())])
      .collect();
    let removed = self.write_many(sql, params).await?;
    Ok(codes.into_iter().zip(removed).collect())
  }
}
