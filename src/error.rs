//! Error types for DevCrew.
//!
//! Defines the main error enum used throughout the application. Tool calls
//! return `Result<T>` internally and only the tool boundary renders an error
//! to the text an agent receives (see [`CrewError::to_agent_message`]).

use thiserror::Error;

/// Main error type for DevCrew operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrewError {
    /// Caller-supplied input is missing or malformed (empty SQL, bad JSON record, etc.).
    /// Raised before any connection is opened.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The guard policy refused the statement.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Constraint violations reported by the engine (UNIQUE, NOT NULL, FOREIGN KEY, CHECK).
    #[error("Integrity violation: {0}")]
    Integrity(String),

    /// Any other error reported by the engine itself (syntax errors, missing tables, etc.).
    #[error("Operational error: {0}")]
    Operational(String),

    /// Driver-level database failures (I/O, connection setup, decoding).
    #[error("Database error: {0}")]
    Database(String),

    /// LLM API errors (rate limits, auth, timeouts, etc.)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CrewError {
    /// Creates an invalid-input error with the given message.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Creates a policy denial with the given reason.
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Creates an integrity error with the given message.
    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }

    /// Creates an operational error with the given message.
    pub fn operational(msg: impl Into<String>) -> Self {
        Self::Operational(msg.into())
    }

    /// Creates a database error with the given message.
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Creates an LLM error with the given message.
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Classifies an engine error, keeping the engine's message verbatim.
    pub fn from_sqlx(error: sqlx::Error) -> Self {
        match error.as_database_error() {
            Some(db_error) => {
                let message = db_error.message().to_string();
                match db_error.kind() {
                    sqlx::error::ErrorKind::UniqueViolation
                    | sqlx::error::ErrorKind::ForeignKeyViolation
                    | sqlx::error::ErrorKind::NotNullViolation
                    | sqlx::error::ErrorKind::CheckViolation => Self::Integrity(message),
                    _ => Self::Operational(message),
                }
            }
            None => Self::Database(error.to_string()),
        }
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "Invalid Input",
            Self::Forbidden(_) => "Forbidden",
            Self::Integrity(_) => "Integrity Error",
            Self::Operational(_) => "Operational Error",
            Self::Database(_) => "Database Error",
            Self::Llm(_) => "LLM Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns true if this error is a guard policy denial.
    pub fn is_denial(&self) -> bool {
        matches!(self, Self::Forbidden(_))
    }

    /// Renders the error as the text handed back to the calling agent.
    ///
    /// Denials use the `🚫` prefix so the agent can tell a refused statement
    /// from a failed one; everything else uses `⚠️`.
    pub fn to_agent_message(&self) -> String {
        match self {
            Self::Forbidden(reason) => format!("🚫 Forbidden: {reason}"),
            Self::Internal(msg) => format!("⚠️ Unexpected error: {msg}"),
            other => format!("⚠️ {other}"),
        }
    }
}

/// Result type alias using CrewError.
pub type Result<T> = std::result::Result<T, CrewError>;
