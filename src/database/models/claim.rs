use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Claim {
    pub id: i64,
    pub user_id: i64,
    pub display_name: String,
    pub handle: Option<String>,
    pub claimed_at: String, // RFC 3339, UTC, millisecond precision
    pub discount_code: Option<String>,
    pub drink_code: Option<String>,
}

/// Payload for appending a claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewClaim {
    pub user_id: i64,
    pub display_name: String,
    pub handle: Option<String>,
    pub claimed_at: String,
    pub discount_code: Option<String>,
    pub drink_code: Option<String>,
}

impl NewClaim {
    pub fn into_claim(self, id: i64) -> Claim {
        Claim {
            id,
            user_id: self.user_id,
            display_name: self.display_name,
            handle: self.handle,
            claimed_at: self.claimed_at,
            discount_code: self.discount_code,
            drink_code: self.drink_code,
        }
    }
}

impl Claim {
    pub async fn create(
        pool: &sqlx::SqlitePool,
        new_claim: NewClaim,
    ) -> Result<Self, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO claims (user_id, display_name, handle, claimed_at, discount_code, drink_code)
            VALUES (?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(new_claim.user_id)
        .bind(&new_claim.display_name)
        .bind(&new_claim.handle)
        .bind(&new_claim.claimed_at)
        .bind(&new_claim.discount_code)
        .bind(&new_claim.drink_code)
        .execute(pool)
        .await?;

        Ok(new_claim.into_claim(result.last_insert_rowid()))
    }

    /// Claims of one user with `from <= claimed_at < to`, in insertion order
    pub async fn find_for_user_between(
        pool: &sqlx::SqlitePool,
        user_id: i64,
        from: &str,
        to: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Claim>(
            r#"
            SELECT id, user_id, display_name, handle, claimed_at, discount_code, drink_code
            FROM claims
            WHERE user_id = ? AND claimed_at >= ? AND claimed_at < ?
            ORDER BY id
            "#
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await
    }

    /// Sets the drink code unless one is already attached. Returns whether the row changed.
    pub async fn set_drink_code(
        pool: &sqlx::SqlitePool,
        claim_id: i64,
        drink_code: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE claims SET drink_code = ? WHERE id = ? AND drink_code IS NULL"
        )
        .bind(drink_code)
        .bind(claim_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn count_between(
        pool: &sqlx::SqlitePool,
        from: &str,
        to: &str,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM claims WHERE claimed_at >= ? AND claimed_at < ?"
        )
        .bind(from)
        .bind(to)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }
}
