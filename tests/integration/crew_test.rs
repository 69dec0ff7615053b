//! End-to-end crew tests with the mock LLM.

use devcrew::chat::sanitize_markdown;
use devcrew::crew::{AgentKind, Crew};
use devcrew::db::SqliteExecutor;
use devcrew::llm::{Conversation, MockLlmClient};
use devcrew::session::SessionContext;
use devcrew::tools::Toolbox;
use tempfile::tempdir;

#[tokio::test]
async fn test_crew_builds_and_fills_a_database() {
    let dir = tempdir().unwrap();
    let client = MockLlmClient::new()
        .with_tool_call("blog", "set_current_database", r#"{"db_name": "blog"}"#)
        .with_tool_call(
            "blog",
            "create_database_with_schema",
            r#"{"schema_sql": "CREATE TABLE posts (id INTEGER PRIMARY KEY, title TEXT NOT NULL);"}"#,
        )
        .with_tool_call(
            "blog",
            "insert_record",
            r#"{"table_name": "posts", "record": {"title": "Hello"}, "return_row": true}"#,
        );
    let crew = Crew::new(
        Box::new(client),
        Toolbox::new(SqliteExecutor::new(dir.path())),
    );
    let mut session = SessionContext::default();
    let mut conversation = Conversation::new();

    let answer = crew
        .run_task(
            &mut session,
            &mut conversation,
            "Create a blog database with a posts table",
            AgentKind::Coder,
        )
        .await
        .unwrap();

    assert!(answer.contains("✅ Active database set to 'blog.db'."));
    assert!(answer.contains("✅ Database 'blog.db' created/updated successfully!"));
    assert!(answer.contains("✅ Inserted successfully (rowid=1)."));
    assert!(dir.path().join("blog.db").exists());
    assert_eq!(session.peek().as_str(), "blog.db");
    assert_eq!(conversation.len(), 2);
}

#[tokio::test]
async fn test_crew_reports_denied_statements() {
    let dir = tempdir().unwrap();
    let client = MockLlmClient::new();
    let crew = Crew::new(
        Box::new(client),
        Toolbox::new(SqliteExecutor::new(dir.path())),
    );
    let mut session = SessionContext::default();
    let mut conversation = Conversation::new();

    // The mock turns a ```sql block into an execute_any_sql call.
    let answer = crew
        .run_task(
            &mut session,
            &mut conversation,
            "Please run:\n```sql\nDELETE FROM users\n```",
            AgentKind::Coder,
        )
        .await
        .unwrap();

    assert!(answer.contains("🚫 Forbidden"));
    assert!(answer.contains("'delete'"));
}

#[tokio::test]
async fn test_planner_answers_in_text() {
    let dir = tempdir().unwrap();
    let client = MockLlmClient::new().with_response("jwt", "1. Model users\n2. Write the handler");
    let crew = Crew::new(
        Box::new(client),
        Toolbox::new(SqliteExecutor::new(dir.path())),
    );
    let mut session = SessionContext::default();
    let mut conversation = Conversation::new();

    let answer = crew
        .run_task(
            &mut session,
            &mut conversation,
            "Plan a Go login endpoint returning a JWT",
            AgentKind::Planner,
        )
        .await
        .unwrap();

    assert_eq!(
        sanitize_markdown(&answer),
        "1. Model users\n2. Write the handler"
    );
    assert!(!dir.path().join("devcrew.db").exists());
}
