//! Statement classification by leading keyword.
//!
//! Statements are classified from their stripped, lower-cased prefix against
//! fixed keyword lists. Multi-statement scripts that do not start with a known
//! prefix are still recognised as DDL when `create`, `alter` or `pragma`
//! appears anywhere as a whole word.

use std::sync::OnceLock;

use regex::Regex;
use sqlparser::dialect::SQLiteDialect;
use sqlparser::tokenizer::{Token, Tokenizer};

use crate::error::{CrewError, Result};

use super::{Classification, StatementCategory};

/// Prefixes of read-only statements.
const READ_PREFIXES: &[&str] = &["select", "pragma", "explain"];

/// Prefixes of schema-management statements.
const DDL_PREFIXES: &[&str] = &[
    "create",
    "alter",
    "create index",
    "create unique index",
    "create trigger",
    "create view",
    "create table",
];

/// Leading keywords of statements that cannot run inside a wrapping transaction.
const AUTOCOMMIT_LEADERS: &[&str] = &[
    "begin", "commit", "end", "rollback", "vacuum", "attach", "detach",
];

fn ddl_keyword_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(create|alter|pragma)\b").expect("valid DDL keyword regex"))
}

/// Classifier for SQL statement strings.
#[derive(Debug)]
pub struct StatementClassifier {
    dialect: SQLiteDialect,
}

impl Default for StatementClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl StatementClassifier {
    /// Creates a new statement classifier.
    pub fn new() -> Self {
        Self {
            dialect: SQLiteDialect {},
        }
    }

    /// Classifies a statement string.
    ///
    /// Empty or whitespace-only input is rejected as invalid input.
    pub fn classify(&self, sql: &str) -> Result<Classification> {
        let normalized = sql.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(CrewError::invalid_input("SQL statement is empty"));
        }

        let category = if READ_PREFIXES.iter().any(|p| normalized.starts_with(p)) {
            StatementCategory::Read
        } else if is_ddl_like(&normalized) {
            StatementCategory::Ddl
        } else {
            StatementCategory::Unrestricted
        };

        Ok(Classification {
            category,
            leading_keyword: leading_keyword(&normalized),
            statement_count: self.count_statements(sql),
        })
    }

    /// Counts the statements in `sql`.
    ///
    /// Semicolons inside string literals, quoted identifiers and comments do
    /// not separate statements. Falls back to a plain split on `;` when the
    /// text cannot be tokenized (e.g. an unterminated literal).
    pub fn count_statements(&self, sql: &str) -> usize {
        let tokens = match Tokenizer::new(&self.dialect, sql).tokenize() {
            Ok(tokens) => tokens,
            Err(_) => {
                return sql.split(';').filter(|s| !s.trim().is_empty()).count();
            }
        };

        let mut count = 0;
        let mut current_has_content = false;
        for token in &tokens {
            match token {
                Token::SemiColon => {
                    if current_has_content {
                        count += 1;
                    }
                    current_has_content = false;
                }
                Token::Whitespace(_) | Token::EOF => {}
                _ => current_has_content = true,
            }
        }
        if current_has_content {
            count += 1;
        }
        count
    }

    /// Returns true if `sql` controls transactions itself or contains a
    /// statement SQLite refuses inside a transaction (`VACUUM`,
    /// `PRAGMA journal_mode`, `ATTACH`...).
    ///
    /// The `END` closing a trigger body is not a transaction statement.
    pub fn requires_autocommit(&self, sql: &str) -> bool {
        let Ok(tokens) = Tokenizer::new(&self.dialect, sql).tokenize() else {
            return false;
        };

        let mut in_trigger_body = false;
        for statement in tokens.split(|t| *t == Token::SemiColon) {
            let words: Vec<String> = statement
                .iter()
                .filter_map(|t| match t {
                    Token::Word(w) => Some(w.value.to_lowercase()),
                    _ => None,
                })
                .collect();
            let Some(first) = words.first().map(String::as_str) else {
                continue;
            };

            if in_trigger_body {
                if first == "end" {
                    in_trigger_body = false;
                }
                continue;
            }

            match first {
                "create" if words.iter().any(|w| w == "trigger") => {
                    in_trigger_body = words.iter().any(|w| w == "begin");
                }
                "pragma" if words.iter().any(|w| w == "journal_mode") => return true,
                leader if AUTOCOMMIT_LEADERS.contains(&leader) => return true,
                _ => {}
            }
        }
        false
    }
}

/// Convenience function to classify SQL without creating a classifier instance.
pub fn classify_statement(sql: &str) -> Result<Classification> {
    StatementClassifier::new().classify(sql)
}

/// Counts the statements in `sql` with a default classifier.
pub fn count_statements(sql: &str) -> usize {
    StatementClassifier::new().count_statements(sql)
}

/// Checks [`StatementClassifier::requires_autocommit`] with a default classifier.
pub fn requires_autocommit(sql: &str) -> bool {
    StatementClassifier::new().requires_autocommit(sql)
}

/// Returns true if the (lower-cased, trimmed) text looks like schema management.
///
/// Accepts the DDL prefixes, a leading PRAGMA, or a whole-word `create`,
/// `alter` or `pragma` anywhere in a multi-statement script.
pub fn is_ddl_like(normalized: &str) -> bool {
    DDL_PREFIXES.iter().any(|p| normalized.starts_with(p))
        || normalized.starts_with("pragma")
        || ddl_keyword_regex().is_match(normalized)
}

fn leading_keyword(normalized: &str) -> String {
    normalized
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}
