use async_trait::async_trait;

use crate::database::connection::DatabaseManager;
use crate::database::models::{Claim, Code, MessageTemplate, NewClaim, StockLevel};
use crate::store::{MessagePool, PoolKind, RowStore, StoreError};
use crate::utils::logging::{log_database_error, log_database_operation};

#[async_trait]
impl RowStore for DatabaseManager {
    async fn unissued_codes(&self, pool: PoolKind) -> Result<Vec<Code>, StoreError> {
        log_database_operation("SELECT", "codes", Some(pool.as_str()));
        Ok(Code::find_unissued(&self.pool, pool.as_str()).await?)
    }

    async fn mark_issued(&self, code_id: i64, issued_at: &str) -> Result<bool, StoreError> {
        log_database_operation("UPDATE", "codes", Some(&format!("issue {code_id}")));
        Ok(Code::mark_issued(&self.pool, code_id, issued_at).await?)
    }

    async fn mark_unissued(&self, code_id: i64) -> Result<(), StoreError> {
        log_database_operation("UPDATE", "codes", Some(&format!("release {code_id}")));
        if !Code::mark_unissued(&self.pool, code_id).await? {
            log_database_error("UPDATE", "codes", "code was not issued", Some(&code_id.to_string()));
            return Err(StoreError::Conflict(format!("code {code_id} was not issued")));
        }
        Ok(())
    }

    async fn stock(&self, pool: PoolKind) -> Result<StockLevel, StoreError> {
        Ok(Code::stock(&self.pool, pool.as_str()).await?)
    }

    async fn insert_claim(&self, claim: NewClaim) -> Result<Claim, StoreError> {
        log_database_operation("INSERT", "claims", Some(&format!("user {}", claim.user_id)));
        Ok(Claim::create(&self.pool, claim).await?)
    }

    async fn claims_between(
        &self,
        user_id: i64,
        from: &str,
        to: &str,
    ) -> Result<Vec<Claim>, StoreError> {
        Ok(Claim::find_for_user_between(&self.pool, user_id, from, to).await?)
    }

    async fn set_drink_code(&self, claim_id: i64, drink_code: &str) -> Result<bool, StoreError> {
        log_database_operation("UPDATE", "claims", Some(&format!("drink code on {claim_id}")));
        Ok(Claim::set_drink_code(&self.pool, claim_id, drink_code).await?)
    }

    async fn messages(&self, pool: MessagePool) -> Result<Vec<String>, StoreError> {
        let templates = MessageTemplate::find_by_pool(&self.pool, pool.as_str()).await?;
        Ok(templates.into_iter().map(|t| t.text).collect())
    }
}
