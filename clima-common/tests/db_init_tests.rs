//! Tests for database initialization on first run and reopen

use clima_common::db::init_database;
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("data").join("clima.db");
    assert!(!db_path.exists());

    let result = init_database(&db_path).await;
    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_reopen_keeps_rows() {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("clima.db");

    let pool = init_database(&db_path).await.unwrap();
    sqlx::query("INSERT INTO organizations (id, name, employee_count) VALUES ('o1', 'Acme', 50)")
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;

    let pool = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM organizations")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_all_tables_created() {
    let temp = TempDir::new().unwrap();
    let pool = init_database(&temp.path().join("clima.db")).await.unwrap();

    let tables: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .fetch_all(&pool)
            .await
            .unwrap();

    for expected in [
        "campaign_analytics",
        "campaign_results",
        "campaigns",
        "dimensions",
        "instruments",
        "items",
        "organizations",
        "respondents",
        "responses",
    ] {
        assert!(tables.iter().any(|t| t == expected), "missing table {}", expected);
    }
}
