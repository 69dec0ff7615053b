//! Tasks and the intent router.

use crate::crew::agents::AgentKind;

const DATABASE_KEYWORDS: &[&str] = &[
    "create table",
    "insert into",
    "select",
    "sqlite",
    "database",
    "table",
    "users",
    "banco",
    "tabela",
    "usuário",
];

const CODE_KEYWORDS: &[&str] = &[
    "golang",
    "go code",
    "package main",
    "func main",
    "api",
    "endpoint",
    "struct",
];

/// Coarse classification of a user request.
///
/// Only used to describe the expected output; it never picks the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Database,
    CodeGeneration,
    General,
}

impl Intent {
    /// Classifies free text by keyword. Database terms win over code terms.
    pub fn classify(text: &str) -> Self {
        let lower = text.to_lowercase();
        let matches = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

        if matches(DATABASE_KEYWORDS) {
            Self::Database
        } else if matches(CODE_KEYWORDS) {
            Self::CodeGeneration
        } else {
            Self::General
        }
    }

    pub fn expected_output(&self) -> &'static str {
        match self {
            Self::Database => {
                "Interaction with the SQLite database: creating, inserting or listing data."
            }
            Self::CodeGeneration => "Go code generated as requested.",
            Self::General => "An action related to code or databases.",
        }
    }
}

/// A unit of work handed to one agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub description: String,
    pub expected_output: String,
    pub agent: AgentKind,
}

impl Task {
    pub fn new(
        description: impl Into<String>,
        expected_output: impl Into<String>,
        agent: AgentKind,
    ) -> Self {
        Self {
            description: description.into(),
            expected_output: expected_output.into(),
            agent,
        }
    }

    /// Builds a task from user input, deriving the expected output from its intent.
    pub fn from_input(input: &str, agent: AgentKind) -> Self {
        let intent = Intent::classify(input);
        Self::new(input.trim(), intent.expected_output(), agent)
    }

    /// The sample API task: a Go login endpoint returning a JWT.
    pub fn build_api() -> Self {
        Self::new(
            "Create a REST service in Go with a login endpoint that receives a user and \
             password and returns a valid JWT token.",
            "Working Go code and a detailed execution plan.",
            AgentKind::Coder,
        )
    }
}
