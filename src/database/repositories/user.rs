//! Profile repository implementation

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use crate::models::user::ProfileBackfill;
use crate::utils::errors::Result;

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Fill empty `phone`/`company` fields of the profile owning `email`.
    /// Returns whether a profile row was touched.
    async fn backfill_contact(&self, email: &str, backfill: &ProfileBackfill) -> Result<bool>;
}

#[derive(Clone, Debug)]
pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for PgProfileRepository {
    async fn backfill_contact(&self, email: &str, backfill: &ProfileBackfill) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET phone = CASE WHEN COALESCE(TRIM(phone), '') = '' THEN COALESCE($2, phone) ELSE phone END,
                company = CASE WHEN COALESCE(TRIM(company), '') = '' THEN COALESCE($3, company) ELSE company END,
                updated_at = $4
            WHERE LOWER(email) = LOWER($1)
              AND (($2::text IS NOT NULL AND COALESCE(TRIM(phone), '') = '')
                OR ($3::text IS NOT NULL AND COALESCE(TRIM(company), '') = ''))
            "#
        )
        .bind(email)
        .bind(backfill.phone.as_deref())
        .bind(backfill.company.as_deref())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
