//! Typed tool arguments.
//!
//! Tool-call arguments arrive as a JSON object string. They are decoded once
//! here into a [`ToolRequest`]; the tools themselves only see typed values.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::db::Record;
use crate::error::{CrewError, Result};

use super::definitions::ToolName;

/// A decoded tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    CreateDatabaseWithSchema {
        db_name: Option<String>,
        schema_sql: String,
    },
    ExecuteDdl {
        db_name: Option<String>,
        ddl_sql: String,
        force: bool,
    },
    ExecuteQuery {
        db_name: Option<String>,
        sql: String,
    },
    ExecuteAnySql {
        db_name: Option<String>,
        sql: String,
        force: bool,
    },
    InsertRecord {
        db_name: Option<String>,
        table_name: String,
        record: Record,
        return_row: bool,
    },
    AnalyzeDatabase {
        db_name: Option<String>,
    },
    SetCurrentDatabase {
        db_name: String,
    },
    GetCurrentDatabase,
}

#[derive(Debug, Deserialize)]
struct SchemaArgs {
    #[serde(default)]
    db_name: Option<String>,
    schema_sql: String,
}

#[derive(Debug, Deserialize)]
struct DdlArgs {
    #[serde(default)]
    db_name: Option<String>,
    ddl_sql: String,
    #[serde(default)]
    force: bool,
}

#[derive(Debug, Deserialize)]
struct SqlArgs {
    #[serde(default)]
    db_name: Option<String>,
    sql: String,
    #[serde(default)]
    force: bool,
}

#[derive(Debug, Deserialize)]
struct InsertArgs {
    #[serde(default)]
    db_name: Option<String>,
    table_name: String,
    record: serde_json::Value,
    #[serde(default)]
    return_row: bool,
}

#[derive(Debug, Deserialize)]
struct DatabaseArgs {
    #[serde(default)]
    db_name: Option<String>,
}

impl ToolRequest {
    /// Decodes the arguments of a call to `name`.
    ///
    /// Empty argument strings are treated as `{}`.
    pub fn parse(name: &str, arguments: &str) -> Result<Self> {
        let tool: ToolName = name.parse()?;
        let arguments = if arguments.trim().is_empty() {
            "{}"
        } else {
            arguments
        };

        let request = match tool {
            ToolName::CreateDatabaseWithSchema => {
                let args: SchemaArgs = decode(tool, arguments)?;
                Self::CreateDatabaseWithSchema {
                    db_name: non_blank(args.db_name),
                    schema_sql: args.schema_sql,
                }
            }
            ToolName::ExecuteDdl => {
                let args: DdlArgs = decode(tool, arguments)?;
                Self::ExecuteDdl {
                    db_name: non_blank(args.db_name),
                    ddl_sql: args.ddl_sql,
                    force: args.force,
                }
            }
            ToolName::ExecuteQuery => {
                let args: SqlArgs = decode(tool, arguments)?;
                Self::ExecuteQuery {
                    db_name: non_blank(args.db_name),
                    sql: args.sql,
                }
            }
            ToolName::ExecuteAnySql => {
                let args: SqlArgs = decode(tool, arguments)?;
                Self::ExecuteAnySql {
                    db_name: non_blank(args.db_name),
                    sql: args.sql,
                    force: args.force,
                }
            }
            ToolName::InsertRecord => {
                let args: InsertArgs = decode(tool, arguments)?;
                let table_name = args.table_name.trim().to_string();
                if table_name.is_empty() {
                    return Err(CrewError::invalid_input("table_name is empty"));
                }
                Self::InsertRecord {
                    db_name: non_blank(args.db_name),
                    table_name,
                    record: decode_record(&args.record)?,
                    return_row: args.return_row,
                }
            }
            ToolName::AnalyzeDatabase => {
                let args: DatabaseArgs = decode(tool, arguments)?;
                Self::AnalyzeDatabase {
                    db_name: non_blank(args.db_name),
                }
            }
            ToolName::SetCurrentDatabase => {
                let args: DatabaseArgs = decode(tool, arguments)?;
                let db_name = non_blank(args.db_name)
                    .ok_or_else(|| CrewError::invalid_input("db_name is required"))?;
                Self::SetCurrentDatabase { db_name }
            }
            ToolName::GetCurrentDatabase => Self::GetCurrentDatabase,
        };

        Ok(request)
    }

    /// Returns the tool this request targets.
    pub fn tool(&self) -> ToolName {
        match self {
            Self::CreateDatabaseWithSchema { .. } => ToolName::CreateDatabaseWithSchema,
            Self::ExecuteDdl { .. } => ToolName::ExecuteDdl,
            Self::ExecuteQuery { .. } => ToolName::ExecuteQuery,
            Self::ExecuteAnySql { .. } => ToolName::ExecuteAnySql,
            Self::InsertRecord { .. } => ToolName::InsertRecord,
            Self::AnalyzeDatabase { .. } => ToolName::AnalyzeDatabase,
            Self::SetCurrentDatabase { .. } => ToolName::SetCurrentDatabase,
            Self::GetCurrentDatabase => ToolName::GetCurrentDatabase,
        }
    }
}

fn decode<T: DeserializeOwned>(tool: ToolName, arguments: &str) -> Result<T> {
    serde_json::from_str(arguments)
        .map_err(|e| CrewError::invalid_input(format!("invalid arguments for {tool}: {e}")))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Decodes a record given either as a JSON object or as a string holding one.
fn decode_record(value: &serde_json::Value) -> Result<Record> {
    match value {
        serde_json::Value::String(text) => {
            let parsed: serde_json::Value = serde_json::from_str(text).map_err(|_| {
                CrewError::invalid_input(
                    "'record' is a string but not valid JSON; pass a JSON object",
                )
            })?;
            Record::from_json(&parsed)
        }
        other => Record::from_json(other),
    }
}
