use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Code {
    pub id: i64,
    pub pool: String,
    pub value: String,
    pub issued: bool,
    pub issued_at: Option<String>,
}

/// Available and issued counts for one pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub available: u64,
    pub issued: u64,
}

impl Code {
    pub async fn find_unissued(
        pool: &sqlx::SqlitePool,
        pool_name: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Code>(
            "SELECT id, pool, value, issued, issued_at FROM codes WHERE pool = ? AND issued = 0 ORDER BY id"
        )
        .bind(pool_name)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_value(
        pool: &sqlx::SqlitePool,
        pool_name: &str,
        value: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Code>(
            "SELECT id, pool, value, issued, issued_at FROM codes WHERE pool = ? AND value = ?"
        )
        .bind(pool_name)
        .bind(value)
        .fetch_optional(pool)
        .await
    }

    /// Flips `issued` only if the row is still unissued. Returns whether this call won.
    pub async fn mark_issued(
        pool: &sqlx::SqlitePool,
        code_id: i64,
        issued_at: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE codes SET issued = 1, issued_at = ? WHERE id = ? AND issued = 0"
        )
        .bind(issued_at)
        .bind(code_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn mark_unissued(
        pool: &sqlx::SqlitePool,
        code_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE codes SET issued = 0, issued_at = NULL WHERE id = ? AND issued = 1"
        )
        .bind(code_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Inserts the given values, skipping ones already present in the pool.
    /// Returns the number of new rows.
    pub async fn insert_many(
        pool: &sqlx::SqlitePool,
        pool_name: &str,
        values: &[String],
    ) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut inserted = 0;

        for value in values {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO codes (pool, value, issued) VALUES (?, ?, 0)"
            )
            .bind(pool_name)
            .bind(value)
            .execute(&mut tx)
            .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    pub async fn stock(
        pool: &sqlx::SqlitePool,
        pool_name: &str,
    ) -> Result<StockLevel, sqlx::Error> {
        let (available, issued): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN issued = 0 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN issued = 1 THEN 1 ELSE 0 END), 0)
            FROM codes WHERE pool = ?
            "#
        )
        .bind(pool_name)
        .fetch_one(pool)
        .await?;

        Ok(StockLevel {
            available: available.max(0) as u64,
            issued: issued.max(0) as u64,
        })
    }
}
