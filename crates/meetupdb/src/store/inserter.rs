//! Bulk inserter: allocates surrogate keys, enforces natural-key
//! consistency and writes each table with as few statements as possible.

use std::collections::HashMap;

use indexmap::IndexMap;
use indexmap::map::Entry;
use rusqlite::{Connection, OptionalExtension, params_from_iter};
use tracing::debug;

use crate::error::{MeetupError, Result};
use crate::schema::{TableDef, TableKind, TableRegistry};

use super::row::{Row, Value, display_value, key_repr};

/// Upper bound of bound parameters in one statement (SQLite's default
/// `SQLITE_MAX_VARIABLE_NUMBER`).
const MAX_PARAMS: usize = 32766;

static NULL: Value = Value::Null;

/// Per-table counts of one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableStats {
    /// Rows newly written.
    pub inserted: usize,
    /// Rows dropped because an identical row already existed.
    pub deduplicated: usize,
}

/// Counts of one batch, by table.
#[derive(Debug, Clone, Default)]
pub struct BatchStats {
    pub tables: IndexMap<TableKind, TableStats>,
}

impl BatchStats {
    /// Counts of one table.
    pub fn table(&self, kind: TableKind) -> TableStats {
        self.tables.get(&kind).copied().unwrap_or_default()
    }

    /// Rows newly written across all tables.
    pub fn total_inserted(&self) -> usize {
        self.tables.values().map(|s| s.inserted).sum()
    }

    /// Rows deduplicated across all tables.
    pub fn total_deduplicated(&self) -> usize {
        self.tables.values().map(|s| s.deduplicated).sum()
    }
}

/// Rows of one table waiting for the flush.
#[derive(Debug)]
struct PendingTable {
    /// Column set fixed by the first row.
    columns: Vec<&'static str>,
    next_id: i64,
    rows: Vec<(Option<i64>, Row)>,
    by_key: HashMap<String, usize>,
    /// Rows already in the store, by natural key, read with the first row.
    stored: HashMap<String, (Option<i64>, Row)>,
}

/// Buffers rows per table and writes them in one go.
///
/// Nothing reaches the connection until [`BulkInserter::flush`]; dropping the
/// inserter discards the buffer. Use [`bulk_insert`] to scope a batch.
pub struct BulkInserter<'c> {
    conn: &'c Connection,
    registry: &'c TableRegistry,
    tables: IndexMap<TableKind, PendingTable>,
    stats: BatchStats,
}

impl<'c> BulkInserter<'c> {
    /// Start an empty batch against `conn`.
    pub fn new(conn: &'c Connection, registry: &'c TableRegistry) -> Self {
        Self {
            conn,
            registry,
            tables: IndexMap::new(),
            stats: BatchStats::default(),
        }
    }

    /// Stage a row. Returns its surrogate id for tables that have one.
    ///
    /// A row whose natural key is already staged or stored is not staged
    /// again: if every compared column is equal the existing id is returned,
    /// otherwise the call fails with
    /// [`MeetupError::ConflictingDuplicateKey`].
    pub fn insert(&mut self, kind: TableKind, row: Row) -> Result<Option<i64>> {
        let def = self.registry.get(kind);
        let table = match self.tables.entry(kind) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                let columns: Vec<&'static str> = row.columns().collect();
                check_key_columns(def, &columns)?;
                let stored = load_stored(self.conn, def, &columns)?;
                let next_id = stored
                    .values()
                    .filter_map(|(id, _)| *id)
                    .max()
                    .map_or(0, |id| id + 1);
                e.insert(PendingTable {
                    columns,
                    next_id,
                    rows: Vec::new(),
                    by_key: HashMap::new(),
                    stored,
                })
            }
        };

        if !row.has_columns(&table.columns) {
            return Err(MeetupError::SchemaDrift {
                table: def.name(),
                expected: table.columns.join(", "),
                found: row.columns().collect::<Vec<_>>().join(", "),
            });
        }

        let key_values: Vec<&Value> = def
            .natural_key
            .iter()
            .map(|c| row.get(c).unwrap_or(&NULL))
            .collect();
        let key = key_repr(key_values.iter().copied());
        let stats = self.stats.tables.entry(kind).or_default();

        if let Some(&pos) = table.by_key.get(&key) {
            let (id, existing) = &table.rows[pos];
            ensure_same(def, &key_values, existing, &row)?;
            stats.deduplicated += 1;
            return Ok(*id);
        }

        if let Some((id, existing)) = table.stored.get(&key) {
            ensure_same(def, &key_values, existing, &row)?;
            stats.deduplicated += 1;
            return Ok(*id);
        }

        let id = def.has_id.then(|| {
            let id = table.next_id;
            table.next_id += 1;
            id
        });
        table.by_key.insert(key, table.rows.len());
        table.rows.push((id, row));
        stats.inserted += 1;
        Ok(id)
    }

    /// Stage a row of a table with surrogate ids and return its id.
    pub fn insert_keyed(&mut self, kind: TableKind, row: Row) -> Result<i64> {
        self.insert(kind, row)?.ok_or_else(|| MeetupError::SchemaDrift {
            table: kind.table_name(),
            expected: "id".to_string(),
            found: "no surrogate id".to_string(),
        })
    }

    /// Surrogate id of the row with the given natural key, staged or stored.
    pub fn find_id(&self, kind: TableKind, key: &[Value]) -> Result<Option<i64>> {
        if let Some(table) = self.tables.get(&kind) {
            let key = key_repr(key);
            if let Some(&pos) = table.by_key.get(&key) {
                return Ok(table.rows[pos].0);
            }
            return Ok(table.stored.get(&key).and_then(|(id, _)| *id));
        }
        find_stored_id(self.conn, self.registry.get(kind), key)
    }

    /// Counts so far.
    pub fn stats(&self) -> &BatchStats {
        &self.stats
    }

    /// Write every staged row, one multi-row `INSERT` per table, parents
    /// before children. Storage errors are returned unchanged.
    pub fn flush(self) -> Result<BatchStats> {
        for def in self.registry.tables() {
            let Some(table) = self.tables.get(&def.kind) else {
                continue;
            };
            if table.rows.is_empty() {
                continue;
            }

            let mut columns: Vec<&str> = Vec::with_capacity(table.columns.len() + 1);
            if def.has_id {
                columns.push("id");
            }
            columns.extend(table.columns.iter().copied());

            let rows_per_statement = (MAX_PARAMS / columns.len()).max(1);
            for chunk in table.rows.chunks(rows_per_statement) {
                let sql = insert_sql(def.name(), &columns, chunk.len());
                let mut params: Vec<Value> = Vec::with_capacity(chunk.len() * columns.len());
                for (id, row) in chunk {
                    if let Some(id) = id {
                        params.push(Value::Integer(*id));
                    }
                    for column in &table.columns {
                        params.push(row.get(column).cloned().unwrap_or(Value::Null));
                    }
                }
                self.conn.execute(&sql, params_from_iter(params.iter()))?;
            }
            debug!(table = def.name(), rows = table.rows.len(), "Flushed table");
        }
        Ok(self.stats)
    }
}

/// Run `f` against a fresh inserter and flush it when `f` succeeds.
///
/// On error nothing is written.
pub fn bulk_insert<'c, T, F>(
    conn: &'c Connection,
    registry: &'c TableRegistry,
    f: F,
) -> Result<(T, BatchStats)>
where
    F: FnOnce(&mut BulkInserter<'c>) -> Result<T>,
{
    let mut inserter = BulkInserter::new(conn, registry);
    let value = f(&mut inserter)?;
    let stats = inserter.flush()?;
    Ok((value, stats))
}

fn check_key_columns(def: &TableDef, columns: &[&'static str]) -> Result<()> {
    if def.natural_key.iter().all(|k| columns.contains(k)) {
        return Ok(());
    }
    Err(MeetupError::SchemaDrift {
        table: def.name(),
        expected: def.natural_key.join(", "),
        found: columns.join(", "),
    })
}

/// Every stored row of a table, keyed like staged rows.
fn load_stored(
    conn: &Connection,
    def: &TableDef,
    columns: &[&'static str],
) -> Result<HashMap<String, (Option<i64>, Row)>> {
    let mut select: Vec<String> = Vec::new();
    if def.has_id {
        select.push("\"id\"".to_string());
    }
    select.extend(columns.iter().map(|c| format!("\"{}\"", c)));
    let sql = format!("SELECT {} FROM \"{}\"", select.join(", "), def.name());

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    let offset = usize::from(def.has_id);
    let mut stored = HashMap::new();
    while let Some(found) = rows.next()? {
        let id = if def.has_id { Some(found.get(0)?) } else { None };
        let mut row = Row::new();
        for (i, column) in columns.iter().enumerate() {
            row = row.with(*column, found.get::<_, Value>(i + offset)?);
        }
        let key = key_repr(def.natural_key.iter().map(|c| row.get(c).unwrap_or(&NULL)));
        stored.insert(key, (id, row));
    }
    Ok(stored)
}

/// Id of a stored row by natural key, for tables nothing was staged in.
fn find_stored_id(conn: &Connection, def: &TableDef, key: &[Value]) -> Result<Option<i64>> {
    if !def.has_id {
        return Ok(None);
    }
    let filter: Vec<String> = def
        .natural_key
        .iter()
        .enumerate()
        .map(|(i, c)| format!("\"{}\" IS ?{}", c, i + 1))
        .collect();
    let sql = format!(
        "SELECT \"id\" FROM \"{}\" WHERE {} LIMIT 1",
        def.name(),
        filter.join(" AND ")
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    Ok(stmt.query_row(params_from_iter(key.iter()), |r| r.get(0)).optional()?)
}

/// Fail unless `new` matches `existing` on every compared column.
fn ensure_same(def: &TableDef, key: &[&Value], existing: &Row, new: &Row) -> Result<()> {
    for column in new.columns() {
        if def.is_compared(column) && existing.get(column) != new.get(column) {
            let key = def
                .natural_key
                .iter()
                .zip(key)
                .map(|(c, v)| format!("{}={}", c, display_value(v)))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(MeetupError::ConflictingDuplicateKey {
                table: def.name(),
                key,
                column,
            });
        }
    }
    Ok(())
}

fn insert_sql(table: &str, columns: &[&str], rows: usize) -> String {
    let column_list = columns
        .iter()
        .map(|c| format!("\"{}\"", c))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = format!("({})", vec!["?"; columns.len()].join(", "));
    let values = vec![placeholders.as_str(); rows].join(", ");
    format!("INSERT INTO \"{}\" ({}) VALUES {}", table, column_list, values)
}
