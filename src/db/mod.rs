//! Database layer for DevCrew.
//!
//! Provides database name normalization, the value and record types, schema
//! introspection and the SQLite execution adapter.

mod schema;
mod sqlite;
mod types;

pub use schema::{quote_identifier, Column, Schema, Table};
pub use sqlite::{ReadLimits, SqliteExecutor, DEFAULT_MAX_ROWS, DEFAULT_QUERY_TIMEOUT_SECS};
pub use types::{ColumnInfo, InsertOutcome, QueryResult, Record, Row, Value};

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CrewError, Result};

/// File extension every database name carries.
pub const DATABASE_EXTENSION: &str = ".db";

/// Database used when nothing has been selected and none is configured.
pub const DEFAULT_DATABASE_NAME: &str = "devcrew";

/// A normalized database name.
///
/// Always ends in `.db`; normalizing an already normalized name is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DatabaseRef(String);

impl DatabaseRef {
    /// Normalizes a user-supplied database name.
    ///
    /// Surrounding whitespace is trimmed and `.db` is appended when missing.
    /// Empty names are rejected.
    pub fn new(name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CrewError::invalid_input("database name is empty"));
        }
        if name.ends_with(DATABASE_EXTENSION) {
            Ok(Self(name.to_string()))
        } else {
            Ok(Self(format!("{name}{DATABASE_EXTENSION}")))
        }
    }

    /// Returns the normalized name, including the extension.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolves the database file against `data_dir`. Absolute names are
    /// used as-is.
    pub fn resolve(&self, data_dir: &Path) -> PathBuf {
        let path = Path::new(&self.0);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            data_dir.join(path)
        }
    }
}

impl Default for DatabaseRef {
    fn default() -> Self {
        Self(format!("{DEFAULT_DATABASE_NAME}{DATABASE_EXTENSION}"))
    }
}

impl fmt::Display for DatabaseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DatabaseRef {
    type Error = CrewError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<DatabaseRef> for String {
    fn from(value: DatabaseRef) -> Self {
        value.0
    }
}

impl std::str::FromStr for DatabaseRef {
    type Err = CrewError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_extension() {
        assert_eq!(DatabaseRef::new("shop").unwrap().as_str(), "shop.db");
    }

    #[test]
    fn test_keeps_existing_extension() {
        assert_eq!(DatabaseRef::new("shop.db").unwrap().as_str(), "shop.db");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let once = DatabaseRef::new("t1").unwrap();
        let twice = DatabaseRef::new(once.as_str()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_default_reference() {
        assert_eq!(DatabaseRef::default().as_str(), "devcrew.db");
    }

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(DatabaseRef::new("  t1 \n").unwrap().as_str(), "t1.db");
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(matches!(
            DatabaseRef::new("   "),
            Err(CrewError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let dir = Path::new("/var/lib/devcrew");
        assert_eq!(
            DatabaseRef::new("t1").unwrap().resolve(dir),
            PathBuf::from("/var/lib/devcrew/t1.db")
        );
        assert_eq!(
            DatabaseRef::new("/tmp/other.db").unwrap().resolve(dir),
            PathBuf::from("/tmp/other.db")
        );
    }

    #[test]
    fn test_serde_roundtrip_normalizes() {
        let parsed: DatabaseRef = serde_json::from_str("\"inventory\"").unwrap();
        assert_eq!(parsed.as_str(), "inventory.db");
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"inventory.db\"");
    }
}
