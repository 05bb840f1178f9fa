use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use recovery_core::{
    Error, ResetToken, ResetTokenId, TokenState,
    error::DatabaseResultExt,
    repositories::ResetTokenRepository,
    storage::NewResetToken,
};

use crate::{SqliteResetToken, from_timestamp};

const TOKEN_COLUMNS: &str = "id, email, otp_hash, expires_at, failed_attempts, state, last_attempt_at, created_at, updated_at";

pub struct SqliteResetTokenRepository {
    pool: SqlitePool,
}

impl SqliteResetTokenRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn set_state(
        &self,
        id: &ResetTokenId,
        sql: &str,
        at: DateTime<Utc>,
        context: &str,
    ) -> Result<(), Error> {
        sqlx::query(sql)
            .bind(id.as_str())
            .bind(Utc::now().timestamp())
            .bind(at.timestamp())
            .execute(&self.pool)
            .await
            .map_db_err_with_context(context)?;
        Ok(())
    }
}

#[async_trait]
impl ResetTokenRepository for SqliteResetTokenRepository {
    async fn find_latest_active(&self, email: &str) -> Result<Option<ResetToken>, Error> {
        let row = sqlx::query_as::<_, SqliteResetToken>(&format!(
            r#"
            SELECT {TOKEN_COLUMNS}
            FROM reset_tokens
            WHERE email = ?1 AND state = 'active'
            ORDER BY created_at DESC, rowid DESC
            LIMIT 1
            "#
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_db_err_with_context("Failed to find reset token")?;

        row.map(ResetToken::try_from).transpose()
    }

    async fn create(&self, token: NewResetToken) -> Result<ResetToken, Error> {
        let now = Utc::now().timestamp();

        let row = sqlx::query_as::<_, SqliteResetToken>(&format!(
            r#"
            INSERT INTO reset_tokens (id, email, otp_hash, expires_at, failed_attempts, state, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, 0, 'active', ?5, ?5)
            RETURNING {TOKEN_COLUMNS}
            "#
        ))
        .bind(token.id.as_str())
        .bind(&token.email)
        .bind(&token.otp_hash)
        .bind(token.expires_at.timestamp())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_db_err_with_context("Failed to create reset token")?;

        row.try_into()
    }

    async fn mark_expired(&self, id: &ResetTokenId) -> Result<(), Error> {
        sqlx::query("UPDATE reset_tokens SET state = 'expired', updated_at = ?2 WHERE id = ?1")
            .bind(id.as_str())
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await
            .map_db_err_with_context("Failed to expire reset token")?;
        Ok(())
    }

    async fn record_failed_attempt(
        &self,
        id: &ResetTokenId,
        at: DateTime<Utc>,
    ) -> Result<Option<u32>, Error> {
        // A single UPDATE ... RETURNING keeps concurrent failures from sharing a count.
        let count: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE reset_tokens
            SET failed_attempts = failed_attempts + 1, last_attempt_at = ?2, updated_at = ?3
            WHERE id = ?1
            RETURNING failed_attempts
            "#,
        )
        .bind(id.as_str())
        .bind(at.timestamp())
        .bind(Utc::now().timestamp())
        .fetch_optional(&self.pool)
        .await
        .map_db_err_with_context("Failed to record failed attempt")?;

        Ok(count.map(|count| u32::try_from(count).unwrap_or(u32::MAX)))
    }

    async fn record_success(&self, id: &ResetTokenId, at: DateTime<Utc>) -> Result<(), Error> {
        self.set_state(
            id,
            "UPDATE reset_tokens SET failed_attempts = 0, updated_at = ?2, last_attempt_at = ?3 WHERE id = ?1",
            at,
            "Failed to record successful attempt",
        )
        .await
    }

    async fn consume(
        &self,
        id: &ResetTokenId,
        max_failed_attempts: u32,
        at: DateTime<Utc>,
    ) -> Result<bool, Error> {
        let result = sqlx::query(
            r#"
            UPDATE reset_tokens
            SET state = 'consumed', failed_attempts = 0, updated_at = ?2, last_attempt_at = ?3
            WHERE id = ?1 AND state = 'active' AND failed_attempts < ?4
            "#,
        )
        .bind(id.as_str())
        .bind(Utc::now().timestamp())
        .bind(at.timestamp())
        .bind(i64::from(max_failed_attempts))
        .execute(&self.pool)
        .await
        .map_db_err_with_context("Failed to consume reset token")?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, id: &ResetTokenId) -> Result<(), Error> {
        sqlx::query("DELETE FROM reset_tokens WHERE id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_db_err_with_context("Failed to delete reset token")?;
        Ok(())
    }

    async fn delete_all_for_email(&self, email: &str) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM reset_tokens WHERE email = ?1")
            .bind(email)
            .execute(&self.pool)
            .await
            .map_db_err_with_context("Failed to delete reset tokens")?;
        Ok(result.rows_affected())
    }

    async fn delete_others_for_email(
        &self,
        email: &str,
        keep: &ResetTokenId,
    ) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM reset_tokens WHERE email = ?1 AND id != ?2")
            .bind(email)
            .bind(keep.as_str())
            .execute(&self.pool)
            .await
            .map_db_err_with_context("Failed to delete reset tokens")?;
        Ok(result.rows_affected())
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM reset_tokens WHERE expires_at <= ?1")
            .bind(now.timestamp())
            .execute(&self.pool)
            .await
            .map_db_err_with_context("Failed to clean up expired reset tokens")?;
        Ok(result.rows_affected())
    }
}

impl TryFrom<SqliteResetToken> for ResetToken {
    type Error = Error;

    fn try_from(row: SqliteResetToken) -> Result<Self, Self::Error> {
        Ok(ResetToken {
            id: ResetTokenId::new(&row.id),
            email: row.email,
            otp_hash: row.otp_hash,
            expires_at: from_timestamp(row.expires_at)?,
            failed_attempts: u32::try_from(row.failed_attempts).unwrap_or(0),
            state: row.state.parse::<TokenState>().map_db_err()?,
            last_attempt_at: row.last_attempt_at.map(from_timestamp).transpose()?,
            created_at: from_timestamp(row.created_at)?,
            updated_at: from_timestamp(row.updated_at)?,
        })
    }
}
