//! Database tools exposed to the agents.
//!
//! Each tool takes typed arguments and returns `Result<ToolOutput>`. The
//! [`Toolbox::call`] boundary decodes raw tool-call arguments and renders both
//! outputs and errors to the text the calling agent receives.

mod args;
mod definitions;
mod format;

pub use args::ToolRequest;
pub use definitions::{tool_definitions, ToolName};
pub use format::{format_analysis, format_insert, format_rows, ToolOutput};

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::db::{Record, SqliteExecutor};
use crate::error::Result;
use crate::safety::{CallSite, GuardPolicy, StatementCategory};
use crate::session::SessionContext;

/// The tools, bound to an execution adapter and the guard policy.
#[derive(Debug)]
pub struct Toolbox {
    executor: SqliteExecutor,
    policy: GuardPolicy,
}

impl Toolbox {
    /// Creates a toolbox executing against `executor`.
    pub fn new(executor: SqliteExecutor) -> Self {
        Self {
            executor,
            policy: GuardPolicy::new(),
        }
    }

    /// Returns the execution adapter.
    pub fn executor(&self) -> &SqliteExecutor {
        &self.executor
    }

    /// Invokes a tool by name with JSON arguments and renders the result.
    ///
    /// Never fails: errors are rendered with [`crate::error::CrewError::to_agent_message`].
    pub async fn call(&self, session: &mut SessionContext, name: &str, arguments: &str) -> String {
        let start = Instant::now();
        let result = match ToolRequest::parse(name, arguments) {
            Ok(request) => self.execute(session, request).await,
            Err(e) => Err(e),
        };

        let text = match result {
            Ok(output) => output.to_string(),
            Err(e) => {
                warn!(tool = name, category = e.category(), "Tool call failed: {}", e);
                e.to_agent_message()
            }
        };

        debug!(
            tool = name,
            duration_ms = start.elapsed().as_millis(),
            result_len = text.len(),
            "Tool execution complete"
        );
        text
    }

    /// Executes a decoded tool request.
    pub async fn execute(
        &self,
        session: &mut SessionContext,
        request: ToolRequest,
    ) -> Result<ToolOutput> {
        match request {
            ToolRequest::CreateDatabaseWithSchema {
                db_name,
                schema_sql,
            } => {
                self.create_database_with_schema(session, db_name.as_deref(), &schema_sql)
                    .await
            }
            ToolRequest::ExecuteDdl {
                db_name,
                ddl_sql,
                force,
            } => {
                self.execute_ddl(session, db_name.as_deref(), &ddl_sql, force)
                    .await
            }
            ToolRequest::ExecuteQuery { db_name, sql } => {
                self.execute_query(session, db_name.as_deref(), &sql).await
            }
            ToolRequest::ExecuteAnySql {
                db_name,
                sql,
                force,
            } => {
                self.execute_any_sql(session, db_name.as_deref(), &sql, force)
                    .await
            }
            ToolRequest::InsertRecord {
                db_name,
                table_name,
                record,
                return_row,
            } => {
                self.insert_record(session, db_name.as_deref(), &table_name, &record, return_row)
                    .await
            }
            ToolRequest::AnalyzeDatabase { db_name } => {
                self.analyze_database(session, db_name.as_deref()).await
            }
            ToolRequest::SetCurrentDatabase { db_name } => {
                self.set_current_database(session, &db_name)
            }
            ToolRequest::GetCurrentDatabase => Ok(self.get_current_database(session)),
        }
    }

    /// Creates or updates a database from a schema script.
    ///
    /// Destructive keywords and `alter` are always refused on this path.
    pub async fn create_database_with_schema(
        &self,
        session: &mut SessionContext,
        db_name: Option<&str>,
        schema_sql: &str,
    ) -> Result<ToolOutput> {
        let database = session.resolve(db_name)?;
        self.policy
            .check(schema_sql, CallSite::SchemaCreation, false)?;

        info!(database = %database, "Applying schema script");
        self.executor.execute_script(&database, schema_sql).await?;
        Ok(ToolOutput::SchemaApplied { database })
    }

    /// Executes DDL. `force` lifts the destructive-keyword denylist.
    pub async fn execute_ddl(
        &self,
        session: &mut SessionContext,
        db_name: Option<&str>,
        ddl_sql: &str,
        force: bool,
    ) -> Result<ToolOutput> {
        let database = session.resolve(db_name)?;
        self.policy.check(ddl_sql, CallSite::Ddl, force)?;

        info!(database = %database, force, "Executing DDL");
        self.executor.execute_script(&database, ddl_sql).await?;
        Ok(ToolOutput::DdlExecuted { database })
    }

    /// Runs a single read-only statement.
    pub async fn execute_query(
        &self,
        session: &mut SessionContext,
        db_name: Option<&str>,
        sql: &str,
    ) -> Result<ToolOutput> {
        let database = session.resolve(db_name)?;
        self.policy.check(sql, CallSite::Query, false)?;

        info!(database = %database, "Executing read query");
        let result = self.executor.execute_read(&database, sql).await?;
        Ok(ToolOutput::Rows(result))
    }

    /// Executes any SQL. A single read statement returns rows; anything else
    /// runs as a script and reports the affected row count.
    pub async fn execute_any_sql(
        &self,
        session: &mut SessionContext,
        db_name: Option<&str>,
        sql: &str,
        force: bool,
    ) -> Result<ToolOutput> {
        let database = session.resolve(db_name)?;
        let classification = self.policy.check(sql, CallSite::Generic, force)?;

        if classification.is_single_read() {
            info!(database = %database, "Executing read through generic executor");
            let result = self.executor.execute_read(&database, sql).await?;
            return Ok(ToolOutput::Rows(result));
        }

        info!(database = %database, force, category = %classification.category, "Executing script");
        let affected = self.executor.execute_script(&database, sql).await?;
        let rows_affected = match classification.category {
            StatementCategory::Ddl => None,
            _ => Some(affected),
        };
        Ok(ToolOutput::Written {
            database,
            rows_affected,
        })
    }

    /// Inserts one record into a table.
    pub async fn insert_record(
        &self,
        session: &mut SessionContext,
        db_name: Option<&str>,
        table_name: &str,
        record: &Record,
        return_row: bool,
    ) -> Result<ToolOutput> {
        let database = session.resolve(db_name)?;

        info!(database = %database, table = table_name, "Inserting record");
        let outcome = self
            .executor
            .insert_record(&database, table_name, record, return_row)
            .await?;
        Ok(ToolOutput::Inserted(outcome))
    }

    /// Reports every table with its row count and columns.
    pub async fn analyze_database(
        &self,
        session: &mut SessionContext,
        db_name: Option<&str>,
    ) -> Result<ToolOutput> {
        let database = session.resolve(db_name)?;

        info!(database = %database, "Analyzing database");
        let schema = self.executor.introspect(&database).await?;
        Ok(ToolOutput::Analysis { database, schema })
    }

    /// Selects the session's active database.
    pub fn set_current_database(
        &self,
        session: &mut SessionContext,
        db_name: &str,
    ) -> Result<ToolOutput> {
        let database = session.set(db_name)?.clone();
        info!(database = %database, "Active database changed");
        Ok(ToolOutput::ActiveDatabaseSet(database))
    }

    /// Returns the session's active database.
    pub fn get_current_database(&self, session: &SessionContext) -> ToolOutput {
        ToolOutput::ActiveDatabase {
            database: session.peek().clone(),
            selected: session.has_active(),
        }
    }
}
