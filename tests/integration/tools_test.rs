//! Tool surface integration tests.
//!
//! Exercises the guard policy and the execution adapter together, through the
//! same text boundary the agents use.

use devcrew::db::{DatabaseRef, SqliteExecutor};
use devcrew::error::CrewError;
use devcrew::tools::ToolOutput;
use pretty_assertions::assert_eq;
use serde_json::json;

use super::Fixture;

const USERS_SCHEMA: &str =
    "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL UNIQUE);";

async fn count_users(fx: &Fixture, db: &str) -> i64 {
    let result = fx
        .toolbox
        .executor()
        .execute_read(
            &DatabaseRef::new(db).unwrap(),
            "SELECT COUNT(*) AS n FROM users",
        )
        .await
        .unwrap();
    let records = result.records();
    serde_json::to_value(&records[0]).unwrap()["n"]
        .as_i64()
        .unwrap()
}

#[tokio::test]
async fn test_create_insert_select() {
    let mut fx = Fixture::new();

    let created = fx
        .call(
            "create_database_with_schema",
            json!({"db_name": "t1", "schema_sql": USERS_SCHEMA}),
        )
        .await;
    assert_eq!(created, "✅ Database 't1.db' created/updated successfully!");

    let inserted = fx
        .call(
            "insert_record",
            json!({"db_name": "t1", "table_name": "users", "record": {"name": "Ana"}}),
        )
        .await;
    assert_eq!(inserted, "✅ Inserted successfully (rowid=1).");

    let output = fx
        .toolbox
        .execute_query(&mut fx.session, Some("t1"), "SELECT * FROM users")
        .await
        .unwrap();
    let ToolOutput::Rows(result) = output else {
        panic!("expected rows");
    };
    assert_eq!(
        serde_json::to_value(result.records()).unwrap(),
        json!([{"id": 1, "name": "Ana"}])
    );
}

#[tokio::test]
async fn test_drop_requires_force() {
    let mut fx = Fixture::new();
    fx.call(
        "create_database_with_schema",
        json!({"db_name": "t2", "schema_sql": USERS_SCHEMA}),
    )
    .await;

    let denied = fx
        .call(
            "execute_ddl",
            json!({"db_name": "t2", "ddl_sql": "DROP TABLE users"}),
        )
        .await;
    assert!(denied.starts_with("🚫 Forbidden"), "{denied}");
    assert!(denied.contains("'drop'"));
    assert_eq!(count_users(&fx, "t2").await, 0);

    let forced = fx
        .call(
            "execute_ddl",
            json!({"db_name": "t2", "ddl_sql": "DROP TABLE users", "force": true}),
        )
        .await;
    assert_eq!(forced, "✅ DDL executed successfully on database 't2.db'.");

    let schema = fx
        .toolbox
        .executor()
        .introspect(&DatabaseRef::new("t2").unwrap())
        .await
        .unwrap();
    assert!(schema.table("users").is_none());
}

#[tokio::test]
async fn test_query_tool_is_read_only() {
    let mut fx = Fixture::new();
    fx.call(
        "create_database_with_schema",
        json!({"db_name": "t3", "schema_sql": USERS_SCHEMA}),
    )
    .await;
    fx.call(
        "insert_record",
        json!({"db_name": "t3", "table_name": "users", "record": {"name": "Ana"}}),
    )
    .await;

    let denied = fx
        .call(
            "execute_query",
            json!({"db_name": "t3", "sql": "DELETE FROM users"}),
        )
        .await;
    assert!(denied.starts_with("🚫 Forbidden"));
    assert!(denied.contains("read-only"));

    let stacked = fx
        .call(
            "execute_query",
            json!({"db_name": "t3", "sql": "SELECT 1; DELETE FROM users"}),
        )
        .await;
    assert!(stacked.starts_with("🚫 Forbidden"));

    assert_eq!(count_users(&fx, "t3").await, 1);
}

#[tokio::test]
async fn test_schema_creation_refuses_alter_and_drop() {
    let mut fx = Fixture::new();

    for sql in [
        "CREATE TABLE a (id INTEGER); ALTER TABLE a ADD COLUMN b TEXT;",
        "DROP TABLE IF EXISTS a; CREATE TABLE a (id INTEGER);",
    ] {
        let err = fx
            .toolbox
            .create_database_with_schema(&mut fx.session, Some("t4"), sql)
            .await
            .unwrap_err();
        assert!(err.is_denial(), "{sql}: {err}");
    }

    // Nothing was executed, so the file was never created.
    assert!(!fx.dir.path().join("t4.db").exists());
}

#[tokio::test]
async fn test_generic_executor() {
    let mut fx = Fixture::new();
    fx.call(
        "create_database_with_schema",
        json!({"db_name": "t5", "schema_sql": USERS_SCHEMA}),
    )
    .await;

    let written = fx
        .call(
            "execute_any_sql",
            json!({
                "db_name": "t5",
                "sql": "INSERT INTO users (name) VALUES ('Ana'); INSERT INTO users (name) VALUES ('Bia');"
            }),
        )
        .await;
    assert_eq!(
        written,
        "✅ Statement executed successfully on database 't5.db'. Rows affected: 2"
    );

    let rows = fx
        .call(
            "execute_any_sql",
            json!({"db_name": "t5", "sql": "SELECT name FROM users ORDER BY id"}),
        )
        .await;
    assert!(rows.starts_with("📊 Query result:"));
    assert!(rows.contains("\"Bia\""));

    let denied = fx
        .call(
            "execute_any_sql",
            json!({"db_name": "t5", "sql": "DELETE FROM users"}),
        )
        .await;
    assert!(denied.starts_with("🚫 Forbidden"));
    assert_eq!(count_users(&fx, "t5").await, 2);

    let forced = fx
        .call(
            "execute_any_sql",
            json!({"db_name": "t5", "sql": "DELETE FROM users", "force": true}),
        )
        .await;
    assert!(forced.ends_with("Rows affected: 2"));
    assert_eq!(count_users(&fx, "t5").await, 0);
}

#[tokio::test]
async fn test_failed_script_rolls_back() {
    let mut fx = Fixture::new();
    let err = fx
        .toolbox
        .create_database_with_schema(
            &mut fx.session,
            Some("t6"),
            "CREATE TABLE ok (id INTEGER); CREATE TABLE broken (;",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CrewError::Operational(_)), "{err}");

    let schema = fx
        .toolbox
        .executor()
        .introspect(&DatabaseRef::new("t6").unwrap())
        .await
        .unwrap();
    assert!(schema.is_empty());
}

#[tokio::test]
async fn test_active_database_is_used_when_name_omitted() {
    let mut fx = Fixture::new();

    let current = fx.call("get_current_database", json!({})).await;
    assert!(current.contains("'devcrew.db'"));

    let set = fx
        .call("set_current_database", json!({"db_name": "inventory"}))
        .await;
    assert_eq!(set, "✅ Active database set to 'inventory.db'.");

    fx.call("create_database_with_schema", json!({"schema_sql": USERS_SCHEMA}))
        .await;
    assert!(fx.dir.path().join("inventory.db").exists());
    assert!(!fx.dir.path().join("devcrew.db").exists());

    let current = fx.call("get_current_database", json!({})).await;
    assert_eq!(current, "📦 Active database: 'inventory.db'.");
}

#[tokio::test]
async fn test_database_name_normalization_is_idempotent() {
    let fx = Fixture::new();
    let executor = SqliteExecutor::new(fx.dir.path());

    let once = DatabaseRef::new("shop").unwrap();
    let twice = DatabaseRef::new(once.as_str()).unwrap();

    assert_eq!(once, twice);
    assert_eq!(executor.path_for(&once), fx.dir.path().join("shop.db"));
}

#[tokio::test]
async fn test_analyze_database() {
    let mut fx = Fixture::new();
    fx.call(
        "create_database_with_schema",
        json!({
            "db_name": "t7",
            "schema_sql": format!("{USERS_SCHEMA} INSERT INTO users (name) VALUES ('Ana');")
        }),
    )
    .await;

    let report = fx.call("analyze_database", json!({"db_name": "t7"})).await;

    assert!(report.starts_with("🧩 Database analysis: **t7.db**"));
    assert!(report.contains("### 🗂️ Table: `users`"));
    assert!(report.contains("- Rows: **1**"));
    assert!(report.contains("- Columns (2):"));
    assert!(!report.contains("sqlite_sequence"));
}

#[tokio::test]
async fn test_unknown_tool_and_bad_arguments() {
    let mut fx = Fixture::new();

    let unknown = fx.call("drop_everything", json!({})).await;
    assert!(unknown.starts_with("⚠️ Invalid input"));

    let missing = fx.call("execute_query", json!({"db_name": "t8"})).await;
    assert!(missing.starts_with("⚠️ Invalid input"));
}

#[tokio::test]
async fn test_query_tool_cannot_write_through_comment_tricks() {
    let mut fx = Fixture::new();
    fx.call(
        "create_database_with_schema",
        json!({
            "db_name": "t9",
            "schema_sql": format!("{USERS_SCHEMA} INSERT INTO users (name) VALUES ('Ana');")
        }),
    )
    .await;

    let text = fx
        .call(
            "execute_query",
            json!({"db_name": "t9", "sql": "SELECT 1 /* /* */; DELETE FROM users; -- */"}),
        )
        .await;

    assert!(text.starts_with("⚠️") || text.starts_with("🚫"), "{text}");
    assert!(!text.starts_with("📊"));
    assert_eq!(count_users(&fx, "t9").await, 1);
}

#[tokio::test]
async fn test_schema_script_with_own_transaction() {
    let mut fx = Fixture::new();

    let created = fx
        .call(
            "create_database_with_schema",
            json!({
                "db_name": "t10",
                "schema_sql": "BEGIN TRANSACTION; CREATE TABLE a (id INTEGER); COMMIT;"
            }),
        )
        .await;
    assert_eq!(created, "✅ Database 't10.db' created/updated successfully!");

    let schema = fx
        .toolbox
        .executor()
        .introspect(&DatabaseRef::new("t10").unwrap())
        .await
        .unwrap();
    assert!(schema.table("a").is_some());
}

#[tokio::test]
async fn test_journal_mode_pragma_through_ddl_tool() {
    let mut fx = Fixture::new();

    let switched = fx
        .call(
            "execute_ddl",
            json!({"db_name": "t11", "ddl_sql": "PRAGMA journal_mode=WAL"}),
        )
        .await;
    assert_eq!(switched, "✅ DDL executed successfully on database 't11.db'.");

    let mode = fx
        .call(
            "execute_query",
            json!({"db_name": "t11", "sql": "PRAGMA journal_mode"}),
        )
        .await;
    assert!(mode.contains("\"wal\""), "{mode}");
}
