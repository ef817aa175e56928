use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub id: i64,
    pub pool: String,
    pub position: i64,
    pub text: String,
}

impl MessageTemplate {
    pub async fn find_by_pool(
        pool: &sqlx::SqlitePool,
        pool_name: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, MessageTemplate>(
            "SELECT id, pool, position, text FROM messages WHERE pool = ? ORDER BY position"
        )
        .bind(pool_name)
        .fetch_all(pool)
        .await
    }

    /// Replaces every message of a pool with `texts`, keeping their order
    pub async fn replace_pool(
        pool: &sqlx::SqlitePool,
        pool_name: &str,
        texts: &[String],
    ) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM messages WHERE pool = ?")
            .bind(pool_name)
            .execute(&mut tx)
            .await?;

        for (position, text) in texts.iter().enumerate() {
            sqlx::query("INSERT INTO messages (pool, position, text) VALUES (?, ?, ?)")
                .bind(pool_name)
                .bind(position as i64)
                .bind(text)
                .execute(&mut tx)
                .await?;
        }

        tx.commit().await?;
        Ok(texts.len() as u64)
    }
}
