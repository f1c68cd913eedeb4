//! OTP ledger records and the storage seam the protocol runs against.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::Instrument;
use uuid::Uuid;

/// One issuance in the append-mostly ledger. `is_used` is the only mutable
/// field; rows are never deleted.
#[derive(Debug, Clone, FromRow)]
pub struct OtpRecord {
    pub id: Uuid,
    pub email: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
}

impl OtpRecord {
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_used && now < self.expires_at
    }
}

/// Credential fields the reset protocol needs from the account store.
#[derive(Debug, Clone, FromRow)]
pub struct ResetAccount {
    pub id: Uuid,
    pub email: String,
    pub username: String,
}

/// Outcome of the paired consume-and-set-password write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitWrite {
    /// The caller won the conditional consume and the hash was updated.
    Applied,
    /// The record was already consumed by another caller.
    AlreadyUsed,
    /// The account vanished between validation and the write; the record
    /// was left unconsumed.
    AccountMissing,
}

/// Storage seam for the reset protocol: the OTP ledger plus the credential
/// lookups and the one password mutation the protocol performs.
#[async_trait]
pub trait ResetStore: Send + Sync {
    /// Look up an active account by exact email.
    async fn find_account(&self, email: &str) -> Result<Option<ResetAccount>>;

    /// Append a freshly issued record to the ledger.
    async fn insert_otp(&self, record: &OtpRecord) -> Result<()>;

    /// Most recently created unused record matching (email, code). A tie on
    /// `created_at` is broken deterministically by highest id.
    async fn latest_unused_otp(&self, email: &str, code: &str) -> Result<Option<OtpRecord>>;

    /// Atomically consume the record (only if still unused) and set the
    /// account's password hash. Both writes apply together or not at all.
    async fn consume_otp_and_set_password(
        &self,
        otp_id: Uuid,
        account_id: Uuid,
        password_hash: &str,
    ) -> Result<CommitWrite>;
}

/// Postgres-backed store.
pub struct PgResetStore {
    pool: PgPool,
}

impl PgResetStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResetStore for PgResetStore {
    async fn find_account(&self, email: &str) -> Result<Option<ResetAccount>> {
        let query = "SELECT id, email, username FROM app_users WHERE email = $1 AND is_active";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        sqlx::query_as::<_, ResetAccount>(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to look up account by email")
    }

    async fn insert_otp(&self, record: &OtpRecord) -> Result<()> {
        let query = r"
            INSERT INTO password_reset_otps
                (id, email, code, created_at, expires_at, is_used)
            VALUES ($1, $2, $3, $4, $5, $6)
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(record.id)
            .bind(&record.email)
            .bind(&record.code)
            .bind(record.created_at)
            .bind(record.expires_at)
            .bind(record.is_used)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to insert OTP record")?;

        Ok(())
    }

    async fn latest_unused_otp(&self, email: &str, code: &str) -> Result<Option<OtpRecord>> {
        let query = r"
            SELECT id, email, code, created_at, expires_at, is_used
            FROM password_reset_otps
            WHERE email = $1 AND code = $2 AND NOT is_used
            ORDER BY created_at DESC, id DESC
            LIMIT 1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        sqlx::query_as::<_, OtpRecord>(query)
            .bind(email)
            .bind(code)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to look up OTP record")
    }

    async fn consume_otp_and_set_password(
        &self,
        otp_id: Uuid,
        account_id: Uuid,
        password_hash: &str,
    ) -> Result<CommitWrite> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to start reset-commit transaction")?;

        // Conditional consume: exactly one concurrent caller can flip the
        // flag; everyone else sees zero rows affected.
        let consume = r"
            UPDATE password_reset_otps
            SET is_used = TRUE
            WHERE id = $1 AND NOT is_used
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = consume
        );
        let consumed = sqlx::query(consume)
            .bind(otp_id)
            .execute(&mut *tx)
            .instrument(span)
            .await
            .context("failed to consume OTP record")?;

        if consumed.rows_affected() == 0 {
            let _ = tx.rollback().await;
            return Ok(CommitWrite::AlreadyUsed);
        }

        let update = "UPDATE app_users SET password_hash = $2 WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = update
        );
        let updated = sqlx::query(update)
            .bind(account_id)
            .bind(password_hash)
            .execute(&mut *tx)
            .instrument(span)
            .await
            .context("failed to update password hash")?;

        if updated.rows_affected() == 0 {
            // Roll back so the code is not consumed without a password change.
            let _ = tx.rollback().await;
            return Ok(CommitWrite::AccountMissing);
        }

        tx.commit()
            .await
            .context("failed to commit reset-commit transaction")?;

        Ok(CommitWrite::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(minutes_left: i64, is_used: bool) -> OtpRecord {
        let now = Utc::now();
        OtpRecord {
            id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            code: "042917".to_string(),
            created_at: now - Duration::minutes(10 - minutes_left),
            expires_at: now + Duration::minutes(minutes_left),
            is_used,
        }
    }

    #[test]
    fn unused_unexpired_record_is_valid() {
        assert!(record(5, false).is_valid_at(Utc::now()));
    }

    #[test]
    fn used_record_is_invalid_even_inside_window() {
        assert!(!record(5, true).is_valid_at(Utc::now()));
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let rec = record(5, false);
        assert!(!rec.is_valid_at(rec.expires_at));
        assert!(rec.is_valid_at(rec.expires_at - Duration::seconds(1)));
    }
}
