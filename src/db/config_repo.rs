//! Repository functions for the `configs` key/value table, which carries the
//! deployment status flag.

use sqlx::SqlitePool;

/// Every stored configuration entry, ordered by key.
pub async fn list(db: &SqlitePool) -> sqlx::Result<Vec<(String, String)>> {
    sqlx::query_as("SELECT config_key, config_value FROM configs ORDER BY config_key")
        .fetch_all(db)
        .await
}

/// Read a configuration value by key.
pub async fn get(db: &SqlitePool, key: &str) -> sqlx::Result<Option<String>> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT config_value FROM configs WHERE config_key = ?")
            .bind(key)
            .fetch_optional(db)
            .await?;
    Ok(row.map(|(v,)| v))
}

/// Unconditionally set a configuration value, creating the row if needed.
pub async fn set(db: &SqlitePool, key: &str, value: &str) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO configs (config_key, config_value, created_at, modified_at, staging)
        VALUES (?, ?, datetime('now'), datetime('now'), 0)
        ON CONFLICT (config_key)
        DO UPDATE SET config_value = excluded.config_value,
                      modified_at = excluded.modified_at
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(db)
    .await?;
    Ok(())
}

/// Change an existing configuration value. Unlike [`set`], a missing key is
/// an error rather than an implicit create.
pub async fn update(db: &SqlitePool, key: &str, value: &str) -> sqlx::Result<()> {
    let res = sqlx::query(
        "UPDATE configs SET config_value = ?, modified_at = datetime('now') WHERE config_key = ?",
    )
    .bind(value)
    .bind(key)
    .execute(db)
    .await?;

    if res.rows_affected() == 0 {
        return Err(sqlx::Error::RowNotFound);
    }
    Ok(())
}

/// Remove a configuration entry.
pub async fn delete(db: &SqlitePool, key: &str) -> sqlx::Result<()> {
    let res = sqlx::query("DELETE FROM configs WHERE config_key = ?")
        .bind(key)
        .execute(db)
        .await?;

    if res.rows_affected() == 0 {
        return Err(sqlx::Error::RowNotFound);
    }
    Ok(())
}

/// Set `key` to `next` only if it currently holds `expected`. Returns whether
/// the swap happened; a `false` result means a concurrent writer got there
/// first or the stored value was never `expected`.
pub async fn compare_and_set(
    db: &SqlitePool,
    key: &str,
    expected: &str,
    next: &str,
) -> sqlx::Result<bool> {
    let res = sqlx::query(
        "UPDATE configs SET config_value = ?, modified_at = datetime('now') \
         WHERE config_key = ? AND config_value = ?",
    )
    .bind(next)
    .bind(key)
    .bind(expected)
    .execute(db)
    .await?;
    Ok(res.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;

    #[tokio::test]
    async fn deploy_status_is_seeded_clean() {
        let db = test_db().await;
        assert_eq!(
            get(&db, "deploy_status").await.unwrap().as_deref(),
            Some("clean")
        );
    }

    #[tokio::test]
    async fn compare_and_set_only_swaps_matching_values() {
        let db = test_db().await;
        assert!(compare_and_set(&db, "deploy_status", "clean", "staging")
            .await
            .unwrap());
        assert!(!compare_and_set(&db, "deploy_status", "clean", "deployed")
            .await
            .unwrap());
        assert_eq!(
            get(&db, "deploy_status").await.unwrap().as_deref(),
            Some("staging")
        );
    }

    #[tokio::test]
    async fn set_upserts_new_keys() {
        let db = test_db().await;
        set(&db, "servers", "10.1.1.1,10.1.1.2").await.unwrap();
        set(&db, "servers", "10.1.1.1").await.unwrap();
        assert_eq!(
            get(&db, "servers").await.unwrap().as_deref(),
            Some("10.1.1.1")
        );
    }

    #[tokio::test]
    async fn update_and_delete_require_an_existing_key() {
        let db = test_db().await;
        assert!(matches!(
            update(&db, "servers", "10.1.1.1").await.unwrap_err(),
            sqlx::Error::RowNotFound
        ));
        assert!(matches!(
            delete(&db, "servers").await.unwrap_err(),
            sqlx::Error::RowNotFound
        ));

        set(&db, "servers", "10.1.1.1").await.unwrap();
        update(&db, "servers", "10.1.1.2").await.unwrap();
        assert_eq!(
            get(&db, "servers").await.unwrap().as_deref(),
            Some("10.1.1.2")
        );

        delete(&db, "servers").await.unwrap();
        assert_eq!(get(&db, "servers").await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_returns_entries_in_key_order() {
        let db = test_db().await;
        set(&db, "servers", "10.1.1.1").await.unwrap();
        set(&db, "admin_email", "hostmaster@home").await.unwrap();

        let entries = list(&db).await.unwrap();
        let keys: Vec<_> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["admin_email", "deploy_status", "servers"]);
    }
}
