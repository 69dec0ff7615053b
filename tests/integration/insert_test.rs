//! Generic insert path integration tests.

use devcrew::db::{Record, Value};
use devcrew::error::CrewError;
use devcrew::tools::ToolOutput;
use pretty_assertions::assert_eq;
use serde_json::json;

use super::Fixture;

const PRODUCTS_SCHEMA: &str = "CREATE TABLE products (\
    id INTEGER PRIMARY KEY, \
    name TEXT NOT NULL, \
    price REAL DEFAULT 0, \
    created TEXT DEFAULT 'today');";

async fn setup() -> Fixture {
    let mut fx = Fixture::new();
    fx.toolbox
        .create_database_with_schema(&mut fx.session, Some("shop"), PRODUCTS_SCHEMA)
        .await
        .unwrap();
    fx
}

#[tokio::test]
async fn test_insert_returns_row_with_defaults() {
    let mut fx = setup().await;
    let record = Record::from_pairs([("name", Value::from("Pen")), ("price", Value::from(1.5))]);

    let output = fx
        .toolbox
        .insert_record(&mut fx.session, Some("shop"), "products", &record, true)
        .await
        .unwrap();

    let ToolOutput::Inserted(outcome) = output else {
        panic!("expected an insert outcome");
    };
    assert_eq!(outcome.rowid, 1);
    assert_eq!(
        serde_json::to_value(outcome.row.unwrap()).unwrap(),
        json!({"id": 1, "name": "Pen", "price": 1.5, "created": "today"})
    );
}

#[tokio::test]
async fn test_insert_text_includes_row() {
    let mut fx = setup().await;

    let text = fx
        .call(
            "insert_record",
            json!({
                "db_name": "shop",
                "table_name": "products",
                "record": "{\"name\": \"Ink\"}",
                "return_row": true
            }),
        )
        .await;

    assert!(text.starts_with("✅ Inserted successfully (rowid=1).\nRow:\n"));
    assert!(text.contains("\"name\": \"Ink\""));
}

#[tokio::test]
async fn test_unknown_columns_are_rejected_in_any_order() {
    let mut fx = setup().await;

    for pairs in [
        vec![("nme", "x"), ("name", "y")],
        vec![("name", "y"), ("nme", "x")],
    ] {
        let record = Record::from_pairs(pairs);
        let err = fx
            .toolbox
            .insert_record(&mut fx.session, Some("shop"), "products", &record, false)
            .await
            .unwrap_err();

        let CrewError::InvalidInput(msg) = err else {
            panic!("expected invalid input, got {err:?}");
        };
        assert!(msg.contains("\"nme\""), "{msg}");
        assert!(msg.contains("Valid columns"));
    }

    let rows = fx
        .call(
            "execute_query",
            json!({"db_name": "shop", "sql": "SELECT * FROM products"}),
        )
        .await;
    assert_eq!(rows, "📭 No results found.");
}

#[tokio::test]
async fn test_insert_into_missing_table() {
    let mut fx = setup().await;
    let record = Record::from_pairs([("name", "Pen")]);

    let err = fx
        .toolbox
        .insert_record(&mut fx.session, Some("shop"), "orders", &record, false)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        CrewError::invalid_input("table 'orders' does not exist in database 'shop.db'")
    );
}

#[tokio::test]
async fn test_insert_constraint_violation() {
    let mut fx = setup().await;

    let text = fx
        .call(
            "insert_record",
            json!({"db_name": "shop", "table_name": "products", "record": {"price": 2}}),
        )
        .await;

    assert!(text.starts_with("⚠️ Integrity violation"), "{text}");
    assert!(text.contains("NOT NULL"));
}

#[tokio::test]
async fn test_insert_rejects_nested_values() {
    let mut fx = setup().await;

    let text = fx
        .call(
            "insert_record",
            json!({
                "db_name": "shop",
                "table_name": "products",
                "record": {"name": {"first": "Pen"}}
            }),
        )
        .await;

    assert!(text.starts_with("⚠️ Invalid input"), "{text}");
}

#[tokio::test]
async fn test_insert_empty_record() {
    let mut fx = setup().await;

    let err = fx
        .toolbox
        .insert_record(&mut fx.session, Some("shop"), "products", &Record::new(), false)
        .await
        .unwrap_err();

    assert!(matches!(err, CrewError::InvalidInput(_)));
}
