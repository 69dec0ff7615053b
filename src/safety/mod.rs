//! Statement safety: classification and the guard policy.
//!
//! Every statement an agent sends passes through [`classify_statement`] and
//! then [`GuardPolicy::check`] before the execution adapter opens a
//! connection. The policy is a single component parameterised by the
//! [`CallSite`] the statement arrived through.

mod classifier;
mod policy;

pub use classifier::{
    classify_statement, count_statements, is_ddl_like, requires_autocommit, StatementClassifier,
};
pub use policy::{GuardDecision, GuardPolicy};

use std::fmt;

/// Coarse category of a SQL statement, decided from its leading keyword(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementCategory {
    /// Starts with SELECT, PRAGMA or EXPLAIN.
    Read,
    /// Schema management (CREATE/ALTER/PRAGMA), possibly a multi-statement script.
    Ddl,
    /// Anything else; only the generic executor accepts these.
    Unrestricted,
}

impl fmt::Display for StatementCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "Read"),
            Self::Ddl => write!(f, "DDL"),
            Self::Unrestricted => write!(f, "Unrestricted"),
        }
    }
}

/// Result of classifying a statement string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// The category decided from the leading keyword(s).
    pub category: StatementCategory,
    /// Lower-cased first keyword of the statement (e.g. `select`).
    pub leading_keyword: String,
    /// Number of statements in the text.
    pub statement_count: usize,
}

impl Classification {
    /// Returns true if the text holds exactly one read statement.
    pub fn is_single_read(&self) -> bool {
        self.category == StatementCategory::Read && self.statement_count == 1
    }

    /// Returns true if the text starts with PRAGMA.
    pub fn is_pragma(&self) -> bool {
        self.leading_keyword == "pragma"
    }
}

/// The tool entry point a statement arrived through.
///
/// Each call site carries its own allowances: which categories it accepts,
/// which keywords it forbids, and whether the caller may override the denylist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallSite {
    /// Database creation from a schema script. No override.
    SchemaCreation,
    /// Explicit DDL execution; `force` overrides the denylist.
    Ddl,
    /// Read-only query execution.
    Query,
    /// Execute-anything; `force` overrides the denylist.
    Generic,
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchemaCreation => write!(f, "schema creation"),
            Self::Ddl => write!(f, "DDL"),
            Self::Query => write!(f, "query"),
            Self::Generic => write!(f, "generic"),
        }
    }
}
