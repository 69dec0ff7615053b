//! Rendering of tool results to the text handed back to an agent.

use std::fmt;

use crate::db::{DatabaseRef, InsertOutcome, QueryResult, Schema};

/// Successful result of a tool call.
///
/// Rendered to text with `Display` at the tool boundary.
#[derive(Debug, Clone)]
pub enum ToolOutput {
    /// A schema script was applied.
    SchemaApplied { database: DatabaseRef },

    /// A DDL script was applied.
    DdlExecuted { database: DatabaseRef },

    /// Rows returned by a read.
    Rows(QueryResult),

    /// A write script was applied. `rows_affected` is `None` when the
    /// engine cannot report a meaningful count.
    Written {
        database: DatabaseRef,
        rows_affected: Option<u64>,
    },

    /// A record was inserted.
    Inserted(InsertOutcome),

    /// Schema analysis report.
    Analysis { database: DatabaseRef, schema: Schema },

    /// The active database was changed.
    ActiveDatabaseSet(DatabaseRef),

    /// The active database, `selected` is false when the default is in use.
    ActiveDatabase { database: DatabaseRef, selected: bool },
}

impl fmt::Display for ToolOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchemaApplied { database } => {
                write!(f, "✅ Database '{database}' created/updated successfully!")
            }
            Self::DdlExecuted { database } => {
                write!(f, "✅ DDL executed successfully on database '{database}'.")
            }
            Self::Rows(result) => f.write_str(&format_rows(result)),
            Self::Written {
                database,
                rows_affected,
            } => write!(
                f,
                "✅ Statement executed successfully on database '{}'. Rows affected: {}",
                database,
                rows_affected.map_or_else(|| "N/A".to_string(), |n| n.to_string())
            ),
            Self::Inserted(outcome) => f.write_str(&format_insert(outcome)),
            Self::Analysis { database, schema } => f.write_str(&format_analysis(database, schema)),
            Self::ActiveDatabaseSet(database) => {
                write!(f, "✅ Active database set to '{database}'.")
            }
            Self::ActiveDatabase {
                database,
                selected: true,
            } => write!(f, "📦 Active database: '{database}'."),
            Self::ActiveDatabase {
                database,
                selected: false,
            } => write!(
                f,
                "📦 No database selected; using the default '{database}'. Use set_current_database to choose one."
            ),
        }
    }
}

fn to_pretty_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<unserializable: {e}>"))
}

/// Formats read results as a pretty-printed JSON list of row objects.
pub fn format_rows(result: &QueryResult) -> String {
    if result.is_empty() {
        return "📭 No results found.".to_string();
    }

    let mut output = format!("📊 Query result:\n\n{}", to_pretty_json(&result.records()));
    if let Some(warning) = result.truncation_warning() {
        output.push_str("\n\n");
        output.push_str(&warning);
    }
    output
}

/// Formats an insert outcome, including the row when it was read back.
pub fn format_insert(outcome: &InsertOutcome) -> String {
    match &outcome.row {
        Some(row) => format!(
            "✅ Inserted successfully (rowid={}).\nRow:\n{}",
            outcome.rowid,
            to_pretty_json(row)
        ),
        None => format!("✅ Inserted successfully (rowid={}).", outcome.rowid),
    }
}

/// Formats the schema analysis report: row count and ordered columns per table.
pub fn format_analysis(database: &DatabaseRef, schema: &Schema) -> String {
    if schema.is_empty() {
        return format!("⚠️ No tables found in database '{database}'.");
    }

    let mut lines = vec![format!("🧩 Database analysis: **{database}**\n")];
    for table in &schema.tables {
        lines.push(format!("### 🗂️ Table: `{}`", table.name));
        lines.push(format!("- Rows: **{}**", table.row_count));
        lines.push(format!("- Columns ({}):", table.columns.len()));
        for column in &table.columns {
            let pk = if column.is_primary_key() { " (PK)" } else { "" };
            lines.push(format!(
                "  • `{}` — {}{}",
                column.name,
                column.display_type(),
                pk
            ));
        }
        lines.push(String::new());
    }
    lines.join("\n")
}
