//! Database schema types and SQLite catalog introspection.
//!
//! Represents the user tables of a database file with their columns and row
//! counts, read from `sqlite_master` and `pragma_table_info`.

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteConnection;
use sqlx::Row as _;

use crate::error::{CrewError, Result};

/// Represents the user tables of a database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    /// All user tables, ordered by name.
    pub tables: Vec<Table>,
}

impl Schema {
    /// Creates a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the table with the given name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Represents a database table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,

    /// Columns in declaration order.
    pub columns: Vec<Column>,

    /// Number of rows at introspection time.
    pub row_count: i64,
}

impl Table {
    /// Returns the column names in declaration order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Represents a table column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Declared type, empty when the column was declared without one.
    pub data_type: String,

    /// Whether the column has a NOT NULL constraint.
    pub not_null: bool,

    /// Default value expression, if any.
    pub default: Option<String>,

    /// 1-based position in the primary key, 0 when not part of it.
    pub primary_key: i64,
}

impl Column {
    /// Creates a new column with the given name and declared type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            ..Default::default()
        }
    }

    /// Sets the primary key position.
    pub fn primary_key(mut self, position: i64) -> Self {
        self.primary_key = position;
        self
    }

    /// Returns true if the column is part of the primary key.
    pub fn is_primary_key(&self) -> bool {
        self.primary_key > 0
    }

    /// Returns the declared type, or `TEXT` when none was declared.
    pub fn display_type(&self) -> &str {
        if self.data_type.trim().is_empty() {
            "TEXT"
        } else {
            &self.data_type
        }
    }
}

/// Quotes an identifier for interpolation into SQL.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Returns true if a table with the given name exists.
pub async fn table_exists(conn: &mut SqliteConnection, table: &str) -> Result<bool> {
    let row = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
        .bind(table)
        .fetch_optional(&mut *conn)
        .await
        .map_err(CrewError::from_sqlx)?;
    Ok(row.is_some())
}

/// Fetches the names of all user tables, excluding SQLite's internal ones.
pub async fn fetch_table_names(conn: &mut SqliteConnection) -> Result<Vec<String>> {
    let rows = sqlx::query(
        r#"
        SELECT name FROM sqlite_master
        WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
        ORDER BY name
        "#,
    )
    .fetch_all(&mut *conn)
    .await
    .map_err(CrewError::from_sqlx)?;

    rows.iter()
        .map(|row| row.try_get::<String, _>("name").map_err(CrewError::from_sqlx))
        .collect()
}

/// Fetches the columns of `table` in declaration order.
pub async fn fetch_columns(conn: &mut SqliteConnection, table: &str) -> Result<Vec<Column>> {
    let rows = sqlx::query(
        r#"
        SELECT name, type, "notnull", dflt_value, pk
        FROM pragma_table_info(?)
        ORDER BY cid
        "#,
    )
    .bind(table)
    .fetch_all(&mut *conn)
    .await
    .map_err(CrewError::from_sqlx)?;

    rows.iter()
        .map(|row| {
            Ok(Column {
                name: row.try_get("name").map_err(CrewError::from_sqlx)?,
                data_type: row
                    .try_get::<Option<String>, _>("type")
                    .map_err(CrewError::from_sqlx)?
                    .unwrap_or_default(),
                not_null: row
                    .try_get::<i64, _>("notnull")
                    .map_err(CrewError::from_sqlx)?
                    != 0,
                default: row.try_get("dflt_value").map_err(CrewError::from_sqlx)?,
                primary_key: row.try_get("pk").map_err(CrewError::from_sqlx)?,
            })
        })
        .collect()
}

/// Counts the rows of `table`.
pub async fn count_rows(conn: &mut SqliteConnection, table: &str) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
    sqlx::query_scalar::<_, i64>(&sql)
        .fetch_one(&mut *conn)
        .await
        .map_err(CrewError::from_sqlx)
}

/// Introspects every user table with its columns and row count.
pub async fn introspect(conn: &mut SqliteConnection) -> Result<Schema> {
    let mut tables = Vec::new();
    for name in fetch_table_names(conn).await? {
        let columns = fetch_columns(conn, &name).await?;
        let row_count = count_rows(conn, &name).await?;
        tables.push(Table {
            name,
            columns,
            row_count,
        });
    }
    Ok(Schema { tables })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("users"), "\"users\"");
        assert_eq!(quote_identifier("odd\"name"), "\"odd\"\"name\"");
    }

    #[test]
    fn test_column_display_type_defaults_to_text() {
        assert_eq!(Column::new("notes", "").display_type(), "TEXT");
        assert_eq!(Column::new("id", "INTEGER").display_type(), "INTEGER");
    }

    #[test]
    fn test_column_primary_key() {
        assert!(Column::new("id", "INTEGER").primary_key(1).is_primary_key());
        assert!(!Column::new("name", "TEXT").is_primary_key());
    }

    #[test]
    fn test_schema_lookup() {
        let schema = Schema {
            tables: vec![Table {
                name: "users".to_string(),
                columns: vec![Column::new("id", "INTEGER"), Column::new("name", "TEXT")],
                row_count: 0,
            }],
        };
        assert_eq!(schema.table("users").unwrap().column_names(), vec!["id", "name"]);
        assert!(schema.table("orders").is_none());
    }
}
