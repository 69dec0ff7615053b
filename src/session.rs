//! Session context carrying the active database.
//!
//! Owned by whoever drives a conversation (the chat loop, a crew run, a CLI
//! invocation) and passed by `&mut` to every tool call, so there is no
//! process-wide state to race on.

use tracing::debug;

use crate::db::DatabaseRef;
use crate::error::Result;

/// Per-conversation state shared by the tools.
#[derive(Debug, Clone)]
pub struct SessionContext {
    default_database: DatabaseRef,
    active: Option<DatabaseRef>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new(DatabaseRef::default())
    }
}

impl SessionContext {
    /// Creates a session falling back to `default_database` until one is selected.
    pub fn new(default_database: DatabaseRef) -> Self {
        Self {
            default_database,
            active: None,
        }
    }

    /// Normalizes `name` and makes it the active database.
    pub fn set(&mut self, name: &str) -> Result<&DatabaseRef> {
        let db = DatabaseRef::new(name)?;
        debug!("Active database set to {}", db);
        Ok(self.active.insert(db))
    }

    /// Returns the active database.
    ///
    /// The first read with nothing selected stores the default as the active
    /// database.
    pub fn get(&mut self) -> &DatabaseRef {
        self.active
            .get_or_insert_with(|| self.default_database.clone())
    }

    /// Returns the active database without recording the default.
    pub fn peek(&self) -> &DatabaseRef {
        self.active.as_ref().unwrap_or(&self.default_database)
    }

    /// Returns true if a database has been selected or stored.
    pub fn has_active(&self) -> bool {
        self.active.is_some()
    }

    /// Resolves an optional per-call database name, falling back to the
    /// active database.
    pub fn resolve(&mut self, name: Option<&str>) -> Result<DatabaseRef> {
        match name {
            Some(name) => DatabaseRef::new(name),
            None => Ok(self.get().clone()),
        }
    }
}
