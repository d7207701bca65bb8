//! Transactional key-ordered table store
//!
//! A [`Package`] is one authoring session over a package container. All
//! mutations land in an in-memory transaction buffer; nothing touches the
//! persisted artifact until [`Package::commit`], which writes the whole
//! container in a single atomic rename. Commit is terminal; rollback restores
//! the state loaded at open and leaves the handle usable.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::schema::{self, TableDef};
use crate::summary::SummaryInformation;
use crate::value::{Row, Value};

/// How a package container is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read access only; all mutating calls fail
    ReadOnly,
    /// Buffered writes, flushed atomically by commit
    Transact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Committed,
    Closed,
}

type Key = Vec<Value>;
type Table = BTreeMap<Key, Row>;

#[derive(serde::Serialize, serde::Deserialize)]
struct Container {
    summary: Option<SummaryInformation>,
    tables: BTreeMap<String, Vec<Row>>,
}

/// Handle over one package container
#[derive(Debug)]
pub struct Package {
    path: PathBuf,
    mode: OpenMode,
    state: State,
    tables: BTreeMap<String, Table>,
    summary: Option<SummaryInformation>,
    baseline_tables: BTreeMap<String, Table>,
    baseline_summary: Option<SummaryInformation>,
}

impl Package {
    /// Start a fresh transacted package with the builtin schema and no rows.
    ///
    /// Nothing is written to `path` until [`Self::commit`].
    pub fn create(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let tables: BTreeMap<String, Table> = schema::builtin()
            .iter()
            .map(|def| (def.name.to_string(), Table::new()))
            .collect();
        info!(path = %path.display(), "creating package");
        Self {
            path,
            mode: OpenMode::Transact,
            state: State::Open,
            baseline_tables: tables.clone(),
            baseline_summary: None,
            tables,
            summary: None,
        }
    }

    /// Open an existing package container.
    ///
    /// Fails with [`Error::Open`] when the container is missing, malformed,
    /// or names a table outside the builtin schema.
    pub fn open(path: impl Into<PathBuf>, mode: OpenMode) -> Result<Self> {
        let path = path.into();
        let bytes = fs::read(&path)
            .map_err(|e| Error::open(path.display().to_string(), e.to_string()))?;
        let container: Container = serde_json::from_slice(&bytes)
            .map_err(|e| Error::open(path.display().to_string(), format!("malformed container: {e}")))?;

        let mut tables: BTreeMap<String, Table> = schema::builtin()
            .iter()
            .map(|def| (def.name.to_string(), Table::new()))
            .collect();
        for (name, rows) in container.tables {
            let def = schema::table(&name).ok_or_else(|| {
                Error::open(path.display().to_string(), format!("unknown table {name}"))
            })?;
            let table = tables.entry(def.name.to_string()).or_default();
            for row in rows {
                // A container is only well-formed when every stored row
                // still satisfies the schema it was written under.
                validate_row(def, &row)
                    .map_err(|e| Error::open(path.display().to_string(), e.to_string()))?;
                let key = key_of(def, &row);
                if table.insert(key.clone(), row).is_some() {
                    return Err(Error::open(
                        path.display().to_string(),
                        format!("duplicate primary key {} in table {name}", format_key(&key)),
                    ));
                }
            }
            for col in def.unique_columns() {
                let mut seen = std::collections::BTreeSet::new();
                for row in table.values() {
                    let value = row.get(col.name).cloned().unwrap_or(Value::Null);
                    if !seen.insert(value.clone()) {
                        return Err(Error::open(
                            path.display().to_string(),
                            format!("duplicate {} value {value} in table {name}", col.name),
                        ));
                    }
                }
            }
        }

        debug!(path = %path.display(), ?mode, "opened package");
        Ok(Self {
            path,
            mode,
            state: State::Open,
            baseline_tables: tables.clone(),
            baseline_summary: container.summary.clone(),
            tables,
            summary: container.summary,
        })
    }

    /// The container path this handle writes to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the handle still accepts operations
    pub fn is_open(&self) -> bool {
        self.state == State::Open
    }

    fn writable(&self) -> Result<()> {
        if self.state != State::Open {
            return Err(Error::validation("package handle is no longer open"));
        }
        if self.mode != OpenMode::Transact {
            return Err(Error::validation("package opened read-only"));
        }
        Ok(())
    }

    /// Every builtin table is materialized at construction, so a miss here
    /// means the schema and buffer went out of sync.
    fn table_mut(&mut self, def: &TableDef) -> Result<&mut Table> {
        self.tables
            .get_mut(def.name)
            .ok_or_else(|| Error::schema(format!("table {} missing from buffer", def.name)))
    }

    /// Insert a batch of rows, atomically relative to the transaction buffer.
    ///
    /// The whole batch is validated against the schema, primary keys, and
    /// unique-column constraints before any row lands; on error the buffer is
    /// unchanged.
    pub fn insert(&mut self, rows: impl IntoIterator<Item = impl Into<Row>>) -> Result<()> {
        self.writable()?;

        let mut staged: Vec<(&'static TableDef, Key, Row)> = Vec::new();
        for row in rows {
            let row = row.into();
            let def = table_def(row.table())?;
            validate_row(def, &row)?;
            let key = key_of(def, &row);

            let table = self
                .tables
                .get(def.name)
                .ok_or_else(|| Error::schema(format!("table {} missing from buffer", def.name)))?;
            let batch_dup = staged
                .iter()
                .any(|(d, k, _)| d.name == def.name && *k == key);
            if batch_dup || table.contains_key(&key) {
                return Err(Error::duplicate_key(def.name, format_key(&key)));
            }
            for col in def.unique_columns() {
                let value = row.get(col.name).cloned().unwrap_or(Value::Null);
                let collides = table
                    .values()
                    .chain(staged.iter().filter(|(d, _, _)| d.name == def.name).map(|(_, _, r)| r))
                    .any(|existing| existing.get(col.name) == Some(&value));
                if collides {
                    return Err(match value {
                        Value::Int(n) => Error::duplicate_sequence(def.name, n),
                        other => Error::duplicate_key(def.name, other.to_string()),
                    });
                }
            }
            staged.push((def, key, row));
        }

        for (def, key, row) in staged {
            self.table_mut(def)?.insert(key, row);
        }
        Ok(())
    }

    /// Rewrite the non-key fields of rows matched by `predicate`.
    ///
    /// With no predicate, the target is the row identified by `row`'s own
    /// primary key. Only listed, non-null fields of `row` are written; key
    /// columns are never rewritten. Fails with [`Error::NotFound`] when no
    /// row matches. Returns the number of rows rewritten.
    pub fn update(&mut self, row: impl Into<Row>, predicate: Option<Row>) -> Result<usize> {
        self.writable()?;
        let row = row.into();
        let def = table_def(row.table())?;
        validate_fields(def, &row)?;

        if let Some(pred) = &predicate {
            if pred.table() != def.name {
                return Err(Error::schema(format!(
                    "predicate table {} does not match {}",
                    pred.table(),
                    def.name
                )));
            }
            validate_fields(def, pred)?;
        }
        let key = key_of(def, &row);

        let table = self.table_mut(def)?;
        let mut planned: Vec<(Key, Row)> = Vec::new();
        for (candidate_key, candidate) in table.iter() {
            let hit = match &predicate {
                Some(pred) => matches(candidate, pred),
                None => *candidate_key == key,
            };
            if !hit {
                continue;
            }
            let mut updated = candidate.clone();
            for (column, value) in row.fields() {
                let is_key = def.column(column).is_some_and(|c| c.key);
                if is_key || value.is_null() {
                    continue;
                }
                updated = updated.set(column, value.clone());
            }
            planned.push((candidate_key.clone(), updated));
        }

        if planned.is_empty() {
            return Err(Error::not_found(def.name, format_key(&key)));
        }

        // Rewritten rows must still satisfy the unique-column constraints
        // against the untouched rows and against each other.
        for col in def.unique_columns() {
            for (updated_key, updated) in &planned {
                let value = updated.get(col.name).cloned().unwrap_or(Value::Null);
                let collides = table
                    .iter()
                    .filter(|(k, _)| !planned.iter().any(|(pk, _)| pk == *k))
                    .map(|(_, r)| r)
                    .chain(
                        planned
                            .iter()
                            .filter(|(pk, _)| pk != updated_key)
                            .map(|(_, r)| r),
                    )
                    .any(|existing| existing.get(col.name) == Some(&value));
                if collides {
                    return Err(match value {
                        Value::Int(n) => Error::duplicate_sequence(def.name, n),
                        other => Error::duplicate_key(def.name, other.to_string()),
                    });
                }
            }
        }

        let rewritten = planned.len();
        for (key, updated) in planned {
            table.insert(key, updated);
        }
        Ok(rewritten)
    }

    /// Delete rows whose set fields all match the predicate.
    ///
    /// A predicate matching nothing is a documented no-op, not an error.
    /// Returns the number of rows removed.
    pub fn delete(&mut self, predicate: impl Into<Row>) -> Result<usize> {
        self.writable()?;
        let pred = predicate.into();
        let def = table_def(pred.table())?;
        validate_fields(def, &pred)?;

        let table = self.table_mut(def)?;
        let doomed: Vec<Key> = table
            .iter()
            .filter(|(_, row)| matches(row, &pred))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            table.remove(key);
        }
        Ok(doomed.len())
    }

    /// All rows of a table, in primary-key order
    pub fn rows(&self, table: &str) -> Result<Vec<&Row>> {
        let def = table_def(table)?;
        Ok(self
            .tables
            .get(def.name)
            .map(|t| t.values().collect())
            .unwrap_or_default())
    }

    /// Rows matching the predicate's set fields, in primary-key order
    pub fn query(&self, predicate: impl Into<Row>) -> Result<Vec<Row>> {
        let pred = predicate.into();
        let def = table_def(pred.table())?;
        validate_fields(def, &pred)?;
        Ok(self
            .tables
            .get(def.name)
            .map(|t| {
                t.values()
                    .filter(|row| matches(row, &pred))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    /// The summary property set, editable until persisted back.
    ///
    /// Returns the staged set when one exists, otherwise a fresh one with the
    /// given codepage.
    pub fn open_summary_information(&self, codepage: u16) -> SummaryInformation {
        self.summary
            .clone()
            .unwrap_or_else(|| SummaryInformation::new(codepage))
    }

    /// Stage the summary property set so it commits atomically with the tables
    pub fn persist_summary(&mut self, info: SummaryInformation) -> Result<()> {
        self.writable()?;
        self.summary = Some(info);
        Ok(())
    }

    /// Flush the transaction buffer to the container in one durable write.
    ///
    /// The container is staged to a temp file in the target directory and
    /// renamed over the destination, so a failure partway leaves the previous
    /// artifact untouched. Commit is terminal for this handle.
    pub fn commit(&mut self) -> Result<()> {
        self.writable()?;

        let container = Container {
            summary: self.summary.clone(),
            tables: self
                .tables
                .iter()
                .map(|(name, table)| (name.clone(), table.values().cloned().collect()))
                .collect(),
        };
        let bytes = serde_json::to_vec_pretty(&container)
            .map_err(|e| Error::Commit(std::io::Error::other(e)))?;

        let dir = self.path.parent().filter(|p| !p.as_os_str().is_empty());
        let mut staged = tempfile::NamedTempFile::new_in(dir.unwrap_or_else(|| Path::new(".")))
            .map_err(Error::Commit)?;
        staged.write_all(&bytes).map_err(Error::Commit)?;
        staged.as_file().sync_all().map_err(Error::Commit)?;
        staged
            .persist(&self.path)
            .map_err(|e| Error::Commit(e.error))?;

        let row_count: usize = self.tables.values().map(BTreeMap::len).sum();
        info!(path = %self.path.display(), rows = row_count, "package committed");
        self.state = State::Committed;
        Ok(())
    }

    /// Discard the transaction buffer, restoring the state loaded at open.
    ///
    /// The handle stays open for further work.
    pub fn rollback(&mut self) -> Result<()> {
        if self.state != State::Open {
            return Err(Error::validation("package handle is no longer open"));
        }
        debug!(path = %self.path.display(), "rolling back transaction buffer");
        self.tables = self.baseline_tables.clone();
        self.summary = self.baseline_summary.clone();
        Ok(())
    }

    /// Release the handle; uncommitted changes are discarded
    pub fn close(mut self) {
        self.state = State::Closed;
    }
}

fn table_def(name: &str) -> Result<&'static TableDef> {
    schema::table(name).ok_or_else(|| Error::schema(format!("unknown table {name}")))
}

/// Full row validation for insert: every listed column must exist and
/// type-check, and non-nullable columns must carry a value.
fn validate_row(def: &TableDef, row: &Row) -> Result<()> {
    validate_fields(def, row)?;
    for col in def.columns {
        let value = row.get(col.name).unwrap_or(&Value::Null);
        if value.is_null() && !col.nullable {
            return Err(Error::schema(format!(
                "column {} in table {} may not be null",
                col.name, def.name
            )));
        }
    }
    Ok(())
}

/// Partial validation for predicates and update payloads: listed columns must
/// exist and non-null values must match the column type.
fn validate_fields(def: &TableDef, row: &Row) -> Result<()> {
    for (name, value) in row.fields() {
        let col = def
            .column(name)
            .ok_or_else(|| Error::schema(format!("unknown column {name} in table {}", def.name)))?;
        if !value.is_null() && !col.kind.accepts(value) {
            return Err(Error::schema(format!(
                "value {value} does not fit column {} in table {}",
                col.name, def.name
            )));
        }
    }
    Ok(())
}

fn key_of(def: &TableDef, row: &Row) -> Key {
    def.key_columns()
        .map(|col| row.get(col.name).cloned().unwrap_or(Value::Null))
        .collect()
}

fn format_key(key: &Key) -> String {
    key.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("/")
}

/// Predicate match: every listed, non-null field of `pred` equals the row's
fn matches(row: &Row, pred: &Row) -> bool {
    pred.fields()
        .filter(|(_, value)| !value.is_null())
        .all(|(name, value)| row.get(name) == Some(value))
}
