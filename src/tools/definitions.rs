//! Tool names and the JSON-schema definitions advertised to the LLM.

use std::fmt;
use std::str::FromStr;

use serde_json::json;

use crate::error::CrewError;
use crate::llm::ToolDefinition;

/// Every tool the crew can call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    CreateDatabaseWithSchema,
    ExecuteDdl,
    ExecuteQuery,
    ExecuteAnySql,
    InsertRecord,
    AnalyzeDatabase,
    SetCurrentDatabase,
    GetCurrentDatabase,
}

impl ToolName {
    /// All tools, in the order they are advertised.
    pub const ALL: [ToolName; 8] = [
        Self::CreateDatabaseWithSchema,
        Self::ExecuteDdl,
        Self::ExecuteQuery,
        Self::ExecuteAnySql,
        Self::InsertRecord,
        Self::AnalyzeDatabase,
        Self::SetCurrentDatabase,
        Self::GetCurrentDatabase,
    ];

    /// Returns the wire name of the tool.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateDatabaseWithSchema => "create_database_with_schema",
            Self::ExecuteDdl => "execute_ddl",
            Self::ExecuteQuery => "execute_query",
            Self::ExecuteAnySql => "execute_any_sql",
            Self::InsertRecord => "insert_record",
            Self::AnalyzeDatabase => "analyze_database",
            Self::SetCurrentDatabase => "set_current_database",
            Self::GetCurrentDatabase => "get_current_database",
        }
    }

    /// Returns the definition advertised to the LLM.
    pub fn definition(&self) -> ToolDefinition {
        let (description, parameters) = match self {
            Self::CreateDatabaseWithSchema => (
                "Create a SQLite database (or update an existing one) by running a schema \
                 script of CREATE statements and optional seed INSERTs. Destructive \
                 statements (DROP, DELETE, TRUNCATE, REPLACE INTO, ALTER) are refused.",
                json!({
                    "type": "object",
                    "properties": {
                        "db_name": db_name_property(),
                        "schema_sql": {
                            "type": "string",
                            "description": "SQL script creating the tables"
                        }
                    },
                    "required": ["schema_sql"]
                }),
            ),
            Self::ExecuteDdl => (
                "Execute DDL (CREATE/ALTER/PRAGMA/etc.) on a SQLite database. Statements \
                 containing DROP, DELETE, TRUNCATE or REPLACE INTO are refused unless force \
                 is true.",
                json!({
                    "type": "object",
                    "properties": {
                        "db_name": db_name_property(),
                        "ddl_sql": {
                            "type": "string",
                            "description": "DDL statement(s) to execute"
                        },
                        "force": force_property()
                    },
                    "required": ["ddl_sql"]
                }),
            ),
            Self::ExecuteQuery => (
                "Run a single read-only statement (SELECT, PRAGMA or EXPLAIN) and return the \
                 rows as a JSON list of objects.",
                json!({
                    "type": "object",
                    "properties": {
                        "db_name": db_name_property(),
                        "sql": {
                            "type": "string",
                            "description": "The read-only SQL statement"
                        }
                    },
                    "required": ["sql"]
                }),
            ),
            Self::ExecuteAnySql => (
                "Execute any SQL (INSERT, UPDATE, scripts, or a SELECT). Returns rows for a \
                 single SELECT, otherwise the affected row count. Destructive keywords are \
                 refused unless force is true.",
                json!({
                    "type": "object",
                    "properties": {
                        "db_name": db_name_property(),
                        "sql": {
                            "type": "string",
                            "description": "SQL statement or script to execute"
                        },
                        "force": force_property()
                    },
                    "required": ["sql"]
                }),
            ),
            Self::InsertRecord => (
                "Insert one record into a table. Keys must be existing columns of the table; \
                 values are bound as parameters. Optionally returns the inserted row.",
                json!({
                    "type": "object",
                    "properties": {
                        "db_name": db_name_property(),
                        "table_name": {
                            "type": "string",
                            "description": "Target table"
                        },
                        "record": {
                            "type": "object",
                            "description": "Column name to value mapping, e.g. {\"name\": \"Ana\"}"
                        },
                        "return_row": {
                            "type": "boolean",
                            "description": "Return the inserted row (default: false)"
                        }
                    },
                    "required": ["table_name", "record"]
                }),
            ),
            Self::AnalyzeDatabase => (
                "Describe every table of a SQLite database: row count and columns with \
                 types and primary keys.",
                json!({
                    "type": "object",
                    "properties": {
                        "db_name": db_name_property()
                    },
                    "required": []
                }),
            ),
            Self::SetCurrentDatabase => (
                "Select the database the other tools use when db_name is omitted.",
                json!({
                    "type": "object",
                    "properties": {
                        "db_name": {
                            "type": "string",
                            "description": "Database name, e.g. 'devcrew' or 'devcrew.db'"
                        }
                    },
                    "required": ["db_name"]
                }),
            ),
            Self::GetCurrentDatabase => (
                "Return the database currently selected for this session.",
                json!({
                    "type": "object",
                    "properties": {},
                    "required": []
                }),
            ),
        };

        ToolDefinition {
            name: self.as_str().to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

fn db_name_property() -> serde_json::Value {
    json!({
        "type": "string",
        "description": "Database name; '.db' is appended if missing. Defaults to the active database."
    })
}

fn force_property() -> serde_json::Value {
    json!({
        "type": "boolean",
        "description": "Allow destructive keywords (default: false). Only use when the user asked for it."
    })
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = CrewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|tool| tool.as_str() == s.trim())
            .ok_or_else(|| CrewError::invalid_input(format!("unknown tool '{s}'")))
    }
}

/// Returns the definitions of the given tools.
pub fn tool_definitions(tools: &[ToolName]) -> Vec<ToolDefinition> {
    tools.iter().map(ToolName::definition).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_roundtrip() {
        for tool in ToolName::ALL {
            assert_eq!(tool.as_str().parse::<ToolName>().unwrap(), tool);
        }
    }

    #[test]
    fn test_unknown_name() {
        assert!("nope".parse::<ToolName>().is_err());
    }

    #[test]
    fn test_definitions_are_objects_with_required_lists() {
        for definition in tool_definitions(&ToolName::ALL) {
            assert_eq!(definition.parameters["type"], "object", "{}", definition.name);
            assert!(
                definition.parameters["required"].is_array(),
                "{}",
                definition.name
            );
            assert!(!definition.description.is_empty());
        }
    }

    #[test]
    fn test_insert_requires_table_and_record() {
        let definition = ToolName::InsertRecord.definition();
        assert_eq!(
            definition.parameters["required"],
            json!(["table_name", "record"])
        );
    }
}
