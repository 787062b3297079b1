use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::entities::Category;
use crate::error::{ExpenseError, Result};

/// Store file used when no `--db` path is configured
pub const DEFAULT_DB_PATH: &str = "expense.db";

/// Dates are stored as ISO-8601 text
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// AMOUNT
// ============================================================================

/// Amount as read back from the `amount REAL` column.
///
/// SQLite keeps text that does not look numeric as TEXT even in a REAL
/// column, so stores written by older versions of the form (which accepted
/// anything in the amount box) can hold non-numeric amounts. Those are kept
/// verbatim instead of failing the whole listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Amount {
    Value(f64),
    Text(String),
}

impl Amount {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Amount::Value(v) => Some(*v),
            Amount::Text(_) => None,
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Amount::Value(v) => f.write_str(&money_text(*v)),
            Amount::Text(s) => f.write_str(s),
        }
    }
}

/// Shortest text that reads back as `v`, padded to at least two decimals
/// (`12.5` -> `12.50`, `60.125` -> `60.125`).
fn money_text(v: f64) -> String {
    let mut text = v.to_string();
    match text.find('.') {
        Some(dot) => {
            for _ in (text.len() - dot - 1)..2 {
                text.push('0');
            }
        }
        None if v.is_finite() => text.push_str(".00"),
        None => {}
    }
    text
}

impl FromSql for Amount {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Real(v) => Ok(Amount::Value(v)),
            ValueRef::Integer(i) => Ok(Amount::Value(i as f64)),
            ValueRef::Text(bytes) => Ok(Amount::Text(String::from_utf8_lossy(bytes).into_owned())),
            ValueRef::Null => Ok(Amount::Text(String::new())),
            ValueRef::Blob(_) => Err(FromSqlError::InvalidType),
        }
    }
}

// ============================================================================
// EXPENSE
// ============================================================================

/// One persisted row of the `expenses` table.
///
/// `date` and `category` are returned exactly as stored; the store does not
/// constrain them, only the form does.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expense {
    pub id: i64,
    pub date: String,
    pub category: String,
    pub amount: Amount,
    pub description: String,
}

/// A validated expense that has not been written yet (no id).
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub date: NaiveDate,
    pub category: Category,
    pub amount: f64,
    pub description: String,
}

impl NewExpense {
    pub fn new(date: NaiveDate, category: Category, amount: f64, description: impl Into<String>) -> Self {
        Self {
            date,
            category,
            amount,
            description: description.into(),
        }
    }

    /// Build from raw text fields (CLI arguments, CSV cells).
    pub fn parse(date: &str, category: &str, amount: &str, description: &str) -> Result<Self> {
        Ok(Self {
            date: parse_date(date)?,
            category: category.parse()?,
            amount: parse_amount(amount)?,
            description: description.to_string(),
        })
    }

    pub fn date_text(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }
}

pub fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
        .map_err(|_| ExpenseError::InvalidDate(text.to_string()))
}

/// Amounts must be finite numbers; "nan"/"inf" parse as f64 but are rejected.
pub fn parse_amount(text: &str) -> Result<f64> {
    match text.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ExpenseError::InvalidAmount(text.to_string())),
    }
}

// ============================================================================
// STORAGE GATEWAY
// ============================================================================

/// Owns the single connection to the expense store.
///
/// Opened once at start-up and handed to the form controller; every read
/// goes back to the database, nothing is cached here.
pub struct ExpenseStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl ExpenseStore {
    /// Open (or create) the file-backed store.
    ///
    /// SQLite defers some failures until the file is first read, so the
    /// header is probed here to surface an unusable path immediately.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let unopenable = |source| ExpenseError::StoreUnopenable {
            path: path.to_path_buf(),
            source,
        };

        let conn = Connection::open(path).map_err(unopenable)?;
        conn.query_row("PRAGMA schema_version", [], |row| row.get::<_, i64>(0))
            .map_err(unopenable)?;

        debug!(path = %path.display(), "opened expense store");

        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Create the `expenses` table if it does not exist yet. Idempotent.
    pub fn ensure_schema(&self) -> Result<()> {
        // WAL for crash recovery; in-memory stores have no journal file
        if self.path.is_some() {
            let mode: String = self.conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
            debug!(journal_mode = %mode, "journal mode set");
        }

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS expenses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT,
                category TEXT,
                amount REAL,
                description TEXT
            )",
            [],
        )?;

        Ok(())
    }

    /// Every stored expense, in store-native (insertion) order.
    pub fn list_all(&self) -> Result<Vec<Expense>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, date, category, amount, description
             FROM expenses",
        )?;

        let expenses = stmt
            .query_map([], |row| {
                let date: Option<String> = row.get(1)?;
                let category: Option<String> = row.get(2)?;
                let description: Option<String> = row.get(4)?;

                Ok(Expense {
                    id: row.get(0)?,
                    date: date.unwrap_or_default(),
                    category: category.unwrap_or_default(),
                    amount: row.get(3)?,
                    description: description.unwrap_or_default(),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!(rows = expenses.len(), "listed expenses");

        Ok(expenses)
    }

    /// Append one expense and return the id the store assigned to it.
    pub fn insert(&self, expense: &NewExpense) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO expenses (date, category, amount, description)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                expense.date_text(),
                expense.category.as_str(),
                expense.amount,
                expense.description,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        info!(id, category = %expense.category, amount = expense.amount, "expense added");

        Ok(id)
    }

    /// Remove the expense with `id`. Unknown ids are a no-op (returns 0).
    pub fn delete(&self, id: i64) -> Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM expenses WHERE id = ?1", params![id])?;

        if removed == 0 {
            debug!(id, "delete matched no expense");
        } else {
            info!(id, "expense deleted");
        }

        Ok(removed)
    }

    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM expenses", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Close the connection explicitly so shutdown errors are reported.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| ExpenseError::Storage(e))?;
        debug!("expense store closed");
        Ok(())
    }

    // ========================================================================
    // CSV IMPORT / EXPORT
    // ========================================================================

    /// Write every row to `csv_path` with columns Id, Date, Category, Amount, Description.
    ///
    /// Non-numeric amounts left by older versions are written verbatim, so a
    /// file containing them cannot be fed back to `import_csv`, which only
    /// accepts numbers. Each such row is logged as a warning.
    pub fn export_csv(&self, csv_path: &Path) -> Result<usize> {
        let expenses = self.list_all()?;
        let mut wtr = csv::Writer::from_path(csv_path)?;

        for expense in expenses.iter().filter(|e| e.amount.as_f64().is_none()) {
            warn!(id = expense.id, amount = %expense.amount, "exporting non-numeric amount; file will not re-import");
        }

        for expense in &expenses {
            wtr.serialize(ExportRecord::from(expense))?;
        }
        wtr.flush()?;

        info!(rows = expenses.len(), path = %csv_path.display(), "exported expenses");

        Ok(expenses.len())
    }

    /// Insert every row of `csv_path` (columns Date, Category, Amount, Description).
    ///
    /// All rows are validated first and inserted in one transaction, so a bad
    /// line or a failed insert leaves the store untouched.
    pub fn import_csv(&self, csv_path: &Path) -> Result<usize> {
        let mut rdr = csv::Reader::from_path(csv_path)?;

        let mut pending = Vec::new();
        for result in rdr.deserialize() {
            let record: ImportRecord = result?;
            pending.push(NewExpense::parse(
                &record.date,
                &record.category,
                &record.amount,
                &record.description,
            )?);
        }

        let tx = self.conn.unchecked_transaction()?;
        for expense in &pending {
            self.insert(expense)?;
        }
        tx.commit()?;

        info!(rows = pending.len(), path = %csv_path.display(), "imported expenses");

        Ok(pending.len())
    }
}

#[derive(Debug, Serialize)]
struct ExportRecord<'a> {
    #[serde(rename = "Id")]
    id: i64,
    #[serde(rename = "Date")]
    date: &'a str,
    #[serde(rename = "Category")]
    category: &'a str,
    #[serde(rename = "Amount")]
    amount: String,
    #[serde(rename = "Description")]
    description: &'a str,
}

impl<'a> From<&'a Expense> for ExportRecord<'a> {
    fn from(expense: &'a Expense) -> Self {
        // Full precision on export; the table view rounds to cents
        let amount = match &expense.amount {
            Amount::Value(v) => v.to_string(),
            Amount::Text(s) => s.clone(),
        };

        Self {
            id: expense.id,
            date: &expense.date,
            category: &expense.category,
            amount,
            description: &expense.description,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ImportRecord {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Category")]
    category: String,
    #[serde(rename = "Amount")]
    amount: String,
    #[serde(rename = "Description", default)]
    description: String,
}
