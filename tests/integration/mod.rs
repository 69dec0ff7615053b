//! Integration tests for DevCrew.

pub mod crew_test;
pub mod insert_test;
pub mod tools_test;

use devcrew::db::SqliteExecutor;
use devcrew::session::SessionContext;
use devcrew::tools::Toolbox;
use tempfile::TempDir;

/// A toolbox rooted in a fresh temporary directory.
pub struct Fixture {
    pub dir: TempDir,
    pub toolbox: Toolbox,
    pub session: SessionContext,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let toolbox = Toolbox::new(SqliteExecutor::new(dir.path()));
        Self {
            dir,
            toolbox,
            session: SessionContext::default(),
        }
    }

    /// Calls a tool the way an agent would and returns its text.
    pub async fn call(&mut self, tool: &str, arguments: serde_json::Value) -> String {
        self.toolbox
            .call(&mut self.session, tool, &arguments.to_string())
            .await
    }
}
