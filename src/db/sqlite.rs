//! SQLite execution adapter.
//!
//! Opens a fresh connection to the database file for every call and closes
//! it when the call completes. Scripts run inside a transaction that is
//! committed on success and rolled back on failure.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use sqlx::query::Query;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column as _, ConnectOptions, Connection, Database, Row as _, Sqlite, TypeInfo, ValueRef};
use tracing::{debug, warn};

use crate::error::{CrewError, Result};
use crate::safety::requires_autocommit;

use super::schema::{self, quote_identifier, Schema};
use super::types::{ColumnInfo, InsertOutcome, QueryResult, Record, Row, Value};
use super::DatabaseRef;

/// Default maximum number of rows returned from a read.
pub const DEFAULT_MAX_ROWS: usize = 1000;

/// Default read timeout in seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

type SqliteQuery<'q> = Query<'q, Sqlite, <Sqlite as Database>::Arguments<'q>>;

/// Limits applied to reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadLimits {
    /// Rows returned before the result is truncated.
    pub max_rows: usize,
    pub timeout: Duration,
}

impl Default for ReadLimits {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_ROWS,
            timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
        }
    }
}

/// Executes statements against SQLite database files under a data directory.
#[derive(Debug, Clone)]
pub struct SqliteExecutor {
    data_dir: PathBuf,
    limits: ReadLimits,
}

impl SqliteExecutor {
    /// Creates an executor resolving database names against `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            limits: ReadLimits::default(),
        }
    }

    /// Sets the limits applied to reads.
    pub fn with_limits(mut self, limits: ReadLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> ReadLimits {
        self.limits
    }

    /// Returns the directory database files are resolved against.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Returns the file path for a database reference.
    pub fn path_for(&self, db: &DatabaseRef) -> PathBuf {
        db.resolve(&self.data_dir)
    }

    /// Runs `sql` as a script and returns the number of rows changed.
    ///
    /// The database file is created if it does not exist. Scripts run inside
    /// a transaction and any failure rolls back every statement, unless the
    /// script controls transactions itself (see [`requires_autocommit`]).
    pub async fn execute_script(&self, db: &DatabaseRef, sql: &str) -> Result<u64> {
        let mut conn = self.open(db, Access::ReadWrite).await?;
        let result = run_script(&mut conn, sql).await;
        close(conn).await;
        result
    }

    /// Runs a single read statement and returns its rows.
    ///
    /// The connection is opened with `query_only`, so the engine itself
    /// refuses any write smuggled past the statement classifier.
    pub async fn execute_read(&self, db: &DatabaseRef, sql: &str) -> Result<QueryResult> {
        let mut conn = self.open(db, Access::QueryOnly).await?;
        let result = run_read(&mut conn, sql, self.limits).await;
        close(conn).await;
        result
    }

    /// Inserts `record` into `table`.
    ///
    /// Keys of the record must all be columns of the table; they are written
    /// in the table's column order with bound parameters. When `return_row`
    /// is set the inserted row is read back; failures while reading it back
    /// are logged and yield no row.
    pub async fn insert_record(
        &self,
        db: &DatabaseRef,
        table: &str,
        record: &Record,
        return_row: bool,
    ) -> Result<InsertOutcome> {
        let mut conn = self.open(db, Access::ReadWrite).await?;
        let result = run_insert(&mut conn, db, table, record, return_row).await;
        close(conn).await;
        result
    }

    /// Introspects the user tables of the database.
    pub async fn introspect(&self, db: &DatabaseRef) -> Result<Schema> {
        let mut conn = self.open(db, Access::ReadWrite).await?;
        let result = schema::introspect(&mut conn).await;
        close(conn).await;
        result
    }

    async fn open(&self, db: &DatabaseRef, access: Access) -> Result<SqliteConnection> {
        let path = self.path_for(db);
        ensure_parent_dirs(&path)?;

        debug!(?access, "Opening SQLite database at {}", path.display());
        let mut options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);
        if access == Access::QueryOnly {
            options = options.pragma("query_only", "ON");
        }
        options
            .connect()
            .await
            .map_err(|e| {
                CrewError::database(format!(
                    "failed to open database '{}': {}",
                    db,
                    format_open_error(e)
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    ReadWrite,
    QueryOnly,
}

/// Closing also rolls back a transaction a failed script left open.
async fn close(conn: SqliteConnection) {
    if let Err(e) = conn.close().await {
        warn!("Failed to close SQLite connection: {}", e);
    }
}

fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CrewError::database(format!(
                    "failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }
    Ok(())
}

fn format_open_error(error: sqlx::Error) -> String {
    match error {
        sqlx::Error::Io(io) => io.to_string(),
        other => other.to_string(),
    }
}

async fn run_script(conn: &mut SqliteConnection, sql: &str) -> Result<u64> {
    if requires_autocommit(sql) {
        debug!("Script controls its own transactions, running without a wrapping transaction");
        return match sqlx::raw_sql(sql).execute(&mut *conn).await {
            Ok(done) => Ok(done.rows_affected()),
            Err(e) => {
                warn!("Script failed: {}", e);
                Err(CrewError::from_sqlx(e))
            }
        };
    }

    let mut tx = conn.begin().await.map_err(CrewError::from_sqlx)?;

    match sqlx::raw_sql(sql).execute(&mut *tx).await {
        Ok(done) => {
            tx.commit().await.map_err(CrewError::from_sqlx)?;
            Ok(done.rows_affected())
        }
        Err(e) => {
            warn!("Script failed, rolling back: {}", e);
            if let Err(rollback) = tx.rollback().await {
                warn!("Rollback failed: {}", rollback);
            }
            Err(CrewError::from_sqlx(e))
        }
    }
}

async fn run_read(
    conn: &mut SqliteConnection,
    sql: &str,
    limits: ReadLimits,
) -> Result<QueryResult> {
    let start = Instant::now();

    let result = tokio::time::timeout(limits.timeout, sqlx::query(sql).fetch_all(&mut *conn))
        .await
        .map_err(|_| {
            CrewError::operational(format!(
                "query timed out after {} seconds",
                limits.timeout.as_secs()
            ))
        })?
        .map_err(CrewError::from_sqlx)?;

    let execution_time = start.elapsed();

    // Column names come from the first row; an empty result has none to report.
    let columns: Vec<ColumnInfo> = result
        .first()
        .map(|first_row| {
            first_row
                .columns()
                .iter()
                .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                .collect()
        })
        .unwrap_or_default();

    let total_rows = result.len();
    let was_truncated = total_rows > limits.max_rows;
    if was_truncated {
        warn!(
            "Query returned {} rows, truncating to {} rows",
            total_rows, limits.max_rows
        );
    }

    let rows: Vec<Row> = result.iter().take(limits.max_rows).map(convert_row).collect();
    let row_count = rows.len();

    Ok(QueryResult {
        columns,
        rows,
        execution_time,
        row_count,
        total_rows,
        was_truncated,
    })
}

async fn run_insert(
    conn: &mut SqliteConnection,
    db: &DatabaseRef,
    table: &str,
    record: &Record,
    return_row: bool,
) -> Result<InsertOutcome> {
    if record.is_empty() {
        return Err(CrewError::invalid_input("the record is empty"));
    }

    if !schema::table_exists(conn, table).await? {
        return Err(CrewError::invalid_input(format!(
            "table '{table}' does not exist in database '{db}'"
        )));
    }

    let columns = schema::fetch_columns(conn, table).await?;
    let valid: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();

    let mut invalid: Vec<&str> = record.keys().filter(|k| !valid.contains(k)).collect();
    if !invalid.is_empty() {
        invalid.sort_unstable();
        let mut sorted_valid = valid.clone();
        sorted_valid.sort_unstable();
        return Err(CrewError::invalid_input(format!(
            "columns {:?} do not exist in table '{}'. Valid columns: {:?}",
            invalid, table, sorted_valid
        )));
    }

    // Table column order, restricted to the keys actually supplied.
    let insert_columns: Vec<&str> = valid
        .iter()
        .copied()
        .filter(|c| record.contains_key(c))
        .collect();
    let values: Vec<Value> = insert_columns
        .iter()
        .map(|c| record.get(c).cloned().unwrap_or_default())
        .collect();

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(table),
        insert_columns
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", "),
        vec!["?"; insert_columns.len()].join(", ")
    );

    let rowid = {
        let mut tx = conn.begin().await.map_err(CrewError::from_sqlx)?;
        let query = values
            .iter()
            .fold(sqlx::query(&sql), |query, value| bind_value(query, value));

        match query.execute(&mut *tx).await {
            Ok(done) => {
                tx.commit().await.map_err(CrewError::from_sqlx)?;
                done.last_insert_rowid()
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!("Rollback failed: {}", rollback);
                }
                return Err(CrewError::from_sqlx(e));
            }
        }
    };

    let row = if return_row {
        fetch_inserted_row(conn, table, rowid, &insert_columns, &values).await
    } else {
        None
    };

    Ok(InsertOutcome { rowid, row })
}

/// Reads back an inserted row by rowid, falling back to matching the
/// supplied values. Errors are logged and yield `None`.
async fn fetch_inserted_row(
    conn: &mut SqliteConnection,
    table: &str,
    rowid: i64,
    columns: &[&str],
    values: &[Value],
) -> Option<Record> {
    if rowid > 0 {
        let sql = format!(
            "SELECT * FROM {} WHERE rowid = ? LIMIT 1",
            quote_identifier(table)
        );
        match sqlx::query(&sql).bind(rowid).fetch_optional(&mut *conn).await {
            Ok(Some(row)) => return Some(convert_record(&row)),
            Ok(None) => {}
            Err(e) => debug!("Row lookup by rowid failed on '{}': {}", table, e),
        }
    }

    if columns.is_empty() {
        return None;
    }

    let predicate = columns
        .iter()
        .map(|c| format!("{} IS ?", quote_identifier(c)))
        .collect::<Vec<_>>()
        .join(" AND ");
    let sql = format!(
        "SELECT * FROM {} WHERE {} LIMIT 1",
        quote_identifier(table),
        predicate
    );
    let query = values
        .iter()
        .fold(sqlx::query(&sql), |query, value| bind_value(query, value));

    match query.fetch_optional(&mut *conn).await {
        Ok(row) => row.as_ref().map(convert_record),
        Err(e) => {
            debug!("Row lookup by value failed on '{}': {}", table, e);
            None
        }
    }
}

fn bind_value<'q>(query: SqliteQuery<'q>, value: &Value) -> SqliteQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Int(i) => query.bind(*i),
        Value::Float(f) => query.bind(*f),
        Value::String(s) => query.bind(s.clone()),
        Value::Bytes(b) => query.bind(b.clone()),
    }
}

fn convert_row(row: &SqliteRow) -> Row {
    (0..row.columns().len())
        .map(|i| convert_value(row, i))
        .collect()
}

fn convert_record(row: &SqliteRow) -> Record {
    Record::from_pairs(
        row.columns()
            .iter()
            .enumerate()
            .map(|(i, col)| (col.name().to_string(), convert_value(row, i))),
    )
}

/// Converts a column to a value using the storage class of the stored value,
/// since SQLite columns are dynamically typed.
fn convert_value(row: &SqliteRow, index: usize) -> Value {
    let storage_class = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_uppercase(),
        Err(_) => return Value::Null,
    };

    match storage_class.as_str() {
        "INTEGER" => row
            .try_get_unchecked::<i64, _>(index)
            .map(Value::Int)
            .unwrap_or(Value::Null),
        "REAL" => row
            .try_get_unchecked::<f64, _>(index)
            .map(Value::Float)
            .unwrap_or(Value::Null),
        "BLOB" => row
            .try_get_unchecked::<Vec<u8>, _>(index)
            .map(Value::Bytes)
            .unwrap_or(Value::Null),
        _ => row
            .try_get_unchecked::<String, _>(index)
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn setup() -> (TempDir, SqliteExecutor, DatabaseRef) {
        let dir = TempDir::new().unwrap();
        let executor = SqliteExecutor::new(dir.path());
        let db = DatabaseRef::new("t1").unwrap();
        (dir, executor, db)
    }

    #[tokio::test]
    async fn test_script_creates_file_and_commits() {
        let (dir, executor, db) = setup();
        let affected = executor
            .execute_script(
                &db,
                "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT); \
                 INSERT INTO users (name) VALUES ('Ana');",
            )
            .await
            .unwrap();
        assert_eq!(affected, 1);
        assert!(dir.path().join("t1.db").exists());

        let result = executor
            .execute_read(&db, "SELECT id, name FROM users")
            .await
            .unwrap();
        assert_eq!(result.row_count, 1);
        assert_eq!(result.rows[0], vec![Value::Int(1), Value::from("Ana")]);
    }

    #[tokio::test]
    async fn test_failing_script_rolls_back() {
        let (_dir, executor, db) = setup();
        executor
            .execute_script(&db, "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)")
            .await
            .unwrap();

        let err = executor
            .execute_script(
                &db,
                "INSERT INTO users (name) VALUES ('Ana'); INSERT INTO missing VALUES (1);",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CrewError::Operational(_)));

        let result = executor
            .execute_read(&db, "SELECT COUNT(*) AS n FROM users")
            .await
            .unwrap();
        assert_eq!(result.rows[0], vec![Value::Int(0)]);
    }

    #[tokio::test]
    async fn test_read_empty_result() {
        let (_dir, executor, db) = setup();
        executor
            .execute_script(&db, "CREATE TABLE users (id INTEGER PRIMARY KEY)")
            .await
            .unwrap();
        let result = executor.execute_read(&db, "SELECT * FROM users").await.unwrap();
        assert!(result.is_empty());
        assert!(!result.was_truncated);
    }

    #[tokio::test]
    async fn test_read_converts_storage_classes() {
        let (_dir, executor, db) = setup();
        let result = executor
            .execute_read(&db, "SELECT 1 AS i, 1.5 AS r, 'x' AS t, NULL AS n, x'0102' AS b")
            .await
            .unwrap();
        assert_eq!(
            result.rows[0],
            vec![
                Value::Int(1),
                Value::Float(1.5),
                Value::from("x"),
                Value::Null,
                Value::Bytes(vec![1, 2]),
            ]
        );
        let names: Vec<_> = result.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["i", "r", "t", "n", "b"]);
    }

    #[tokio::test]
    async fn test_syntax_error_is_operational() {
        let (_dir, executor, db) = setup();
        let err = executor.execute_read(&db, "SELEC 1").await.unwrap_err();
        assert!(matches!(err, CrewError::Operational(_)));
    }

    #[tokio::test]
    async fn test_insert_returns_row() {
        let (_dir, executor, db) = setup();
        executor
            .execute_script(&db, "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)")
            .await
            .unwrap();

        let record = Record::from_pairs([("name", "Ana")]);
        let outcome = executor
            .insert_record(&db, "users", &record, true)
            .await
            .unwrap();
        assert_eq!(outcome.rowid, 1);
        assert_eq!(
            outcome.row,
            Some(Record::from_pairs([
                ("id", Value::Int(1)),
                ("name", Value::from("Ana"))
            ]))
        );
    }

    #[tokio::test]
    async fn test_insert_rejects_unknown_columns() {
        let (_dir, executor, db) = setup();
        executor
            .execute_script(&db, "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)")
            .await
            .unwrap();

        let record = Record::from_pairs([("name", "Ana"), ("email", "a@x")]);
        let err = executor
            .insert_record(&db, "users", &record, false)
            .await
            .unwrap_err();
        match err {
            CrewError::InvalidInput(msg) => {
                assert!(msg.contains("email"), "{msg}");
                assert!(msg.contains(r#"Valid columns: ["id", "name"]"#), "{msg}");
            }
            other => panic!("expected invalid input, got {other:?}"),
        }

        let result = executor
            .execute_read(&db, "SELECT COUNT(*) FROM users")
            .await
            .unwrap();
        assert_eq!(result.rows[0], vec![Value::Int(0)]);
    }

    #[tokio::test]
    async fn test_insert_into_missing_table() {
        let (_dir, executor, db) = setup();
        let record = Record::from_pairs([("name", "Ana")]);
        let err = executor
            .insert_record(&db, "ghosts", &record, false)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CrewError::invalid_input("table 'ghosts' does not exist in database 't1.db'")
        );
    }

    #[tokio::test]
    async fn test_insert_constraint_violation_is_integrity() {
        let (_dir, executor, db) = setup();
        executor
            .execute_script(
                &db,
                "CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT UNIQUE NOT NULL)",
            )
            .await
            .unwrap();

        let record = Record::from_pairs([("email", "a@x")]);
        executor
            .insert_record(&db, "users", &record, false)
            .await
            .unwrap();
        let err = executor
            .insert_record(&db, "users", &record, false)
            .await
            .unwrap_err();
        assert!(matches!(err, CrewError::Integrity(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_insert_without_rowid_falls_back_to_values() {
        let (_dir, executor, db) = setup();
        executor
            .execute_script(
                &db,
                "CREATE TABLE tags (name TEXT PRIMARY KEY, color TEXT) WITHOUT ROWID",
            )
            .await
            .unwrap();

        let record = Record::from_pairs([("color", "red"), ("name", "urgent")]);
        let outcome = executor
            .insert_record(&db, "tags", &record, true)
            .await
            .unwrap();
        assert_eq!(outcome.rowid, 0);
        assert_eq!(
            outcome.row,
            Some(Record::from_pairs([
                ("name", Value::from("urgent")),
                ("color", Value::from("red"))
            ]))
        );
    }

    #[tokio::test]
    async fn test_introspect_excludes_internal_tables() {
        let (_dir, executor, db) = setup();
        executor
            .execute_script(
                &db,
                "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, notes); \
                 INSERT INTO users (name) VALUES ('Ana'), ('Bia');",
            )
            .await
            .unwrap();

        let schema = executor.introspect(&db).await.unwrap();
        let names: Vec<_> = schema.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["users"]);

        let users = schema.table("users").unwrap();
        assert_eq!(users.row_count, 2);
        assert_eq!(users.column_names(), vec!["id", "name", "notes"]);
        assert!(users.columns[0].is_primary_key());
        assert!(users.columns[1].not_null);
        assert_eq!(users.columns[2].display_type(), "TEXT");
    }

    #[tokio::test]
    async fn test_read_connection_refuses_writes() {
        let (_dir, executor, db) = setup();
        executor
            .execute_script(
                &db,
                "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT); \
                 INSERT INTO users (name) VALUES ('Ana');",
            )
            .await
            .unwrap();

        for sql in [
            "DELETE FROM users",
            "SELECT 1 /* /* */; DELETE FROM users; -- */",
        ] {
            let err = executor.execute_read(&db, sql).await.unwrap_err();
            assert!(matches!(err, CrewError::Operational(_)), "{sql}: {err}");
        }

        let result = executor
            .execute_read(&db, "SELECT COUNT(*) FROM users")
            .await
            .unwrap();
        assert_eq!(result.rows[0], vec![Value::Int(1)]);
    }

    #[tokio::test]
    async fn test_read_limits_truncate() {
        let (_dir, executor, db) = setup();
        let executor = executor.with_limits(ReadLimits {
            max_rows: 2,
            ..ReadLimits::default()
        });

        let result = executor
            .execute_read(
                &db,
                "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 5) \
                 SELECT x FROM c",
            )
            .await
            .unwrap();

        assert_eq!(result.row_count, 2);
        assert_eq!(result.total_rows, 5);
        assert!(result.was_truncated);
    }

    #[tokio::test]
    async fn test_script_with_own_transaction() {
        let (_dir, executor, db) = setup();
        executor
            .execute_script(&db, "BEGIN TRANSACTION; CREATE TABLE a (id INTEGER); COMMIT;")
            .await
            .unwrap();

        let err = executor
            .execute_script(
                &db,
                "BEGIN; CREATE TABLE b (id INTEGER); INSERT INTO missing VALUES (1); COMMIT;",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CrewError::Operational(_)));

        let schema = executor.introspect(&db).await.unwrap();
        assert!(schema.table("a").is_some());
        assert!(schema.table("b").is_none());
    }

    #[tokio::test]
    async fn test_journal_mode_pragma() {
        let (_dir, executor, db) = setup();
        executor
            .execute_script(&db, "PRAGMA journal_mode=WAL")
            .await
            .unwrap();

        let result = executor
            .execute_read(&db, "PRAGMA journal_mode")
            .await
            .unwrap();
        assert_eq!(result.rows[0], vec![Value::from("wal")]);
    }
}
