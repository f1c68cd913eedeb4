//! Protocol operations: request, verify, commit.

use chrono::{Duration, Utc};
use rand::Rng;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::error::ResetError;
use super::ledger::{CommitWrite, OtpRecord, ResetStore};
use crate::crypto;
use crate::notify::{self, Delivery, Mailer};

/// Tunables for the reset protocol.
#[derive(Debug, Clone, Copy)]
pub struct ResetConfig {
    otp_window_minutes: i64,
    otp_length: u32,
    expose_code: bool,
}

impl ResetConfig {
    /// Defaults: 10 minute validity window, 6-digit codes, raw code never
    /// included in responses.
    #[must_use]
    pub fn new() -> Self {
        Self {
            otp_window_minutes: 10,
            otp_length: 6,
            expose_code: false,
        }
    }

    #[must_use]
    pub fn with_window_minutes(mut self, minutes: i64) -> Self {
        self.otp_window_minutes = minutes;
        self
    }

    #[must_use]
    pub fn with_otp_length(mut self, length: u32) -> Self {
        self.otp_length = length;
        self
    }

    #[must_use]
    pub fn with_expose_code(mut self, expose: bool) -> Self {
        self.expose_code = expose;
        self
    }

    #[must_use]
    pub fn normalize(self) -> Self {
        let otp_window_minutes = if self.otp_window_minutes <= 0 {
            10
        } else {
            self.otp_window_minutes
        };
        let otp_length = self.otp_length.clamp(4, 9);
        Self {
            otp_window_minutes,
            otp_length,
            expose_code: self.expose_code,
        }
    }

    #[must_use]
    pub fn otp_window_minutes(&self) -> i64 {
        self.otp_window_minutes
    }

    #[must_use]
    pub fn otp_length(&self) -> u32 {
        self.otp_length
    }

    #[must_use]
    pub fn expose_code(&self) -> bool {
        self.expose_code
    }
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Issuance confirmation returned by [`ResetService::request_reset`].
#[derive(Debug, Clone)]
pub struct Issued {
    pub email: String,
    pub code: String,
    pub delivery: Delivery,
}

/// Orchestrates the OTP ledger, credential store, and mailer.
pub struct ResetService {
    store: Arc<dyn ResetStore>,
    mailer: Arc<dyn Mailer>,
    config: ResetConfig,
}

impl ResetService {
    #[must_use]
    pub fn new(store: Arc<dyn ResetStore>, mailer: Arc<dyn Mailer>, config: ResetConfig) -> Self {
        Self {
            store,
            mailer,
            config: config.normalize(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ResetConfig {
        &self.config
    }

    /// Issue a fresh OTP for the account behind `email` and attempt
    /// delivery. Each call appends an independent record; outstanding codes
    /// for the same email stay valid. Delivery failure is reported in the
    /// returned metadata, never as an operation failure.
    ///
    /// # Errors
    /// `Validation` for an empty email, `NotFound` when no active account
    /// matches, `Storage` for ledger failures.
    pub async fn request_reset(&self, email: &str) -> Result<Issued, ResetError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(ResetError::Validation("email"));
        }

        let account = self
            .store
            .find_account(email)
            .await?
            .ok_or(ResetError::NotFound)?;

        let code = generate_code(self.config.otp_length);
        let now = Utc::now();
        let record = OtpRecord {
            id: Uuid::new_v4(),
            email: account.email.clone(),
            code: code.clone(),
            created_at: now,
            expires_at: now + Duration::minutes(self.config.otp_window_minutes),
            is_used: false,
        };
        self.store.insert_otp(&record).await?;

        // The ledger row is already persisted; delivery is best effort.
        let (subject, body) =
            notify::otp_message(&account.username, &code, self.config.otp_window_minutes);
        let delivery = self
            .mailer
            .send(&account.email, &account.username, &subject, &body)
            .await;

        if delivery.delivered {
            info!(email = %account.email, "reset OTP issued and dispatched");
        } else {
            warn!(
                email = %account.email,
                detail = %delivery.detail,
                "reset OTP issued but delivery failed"
            );
        }

        Ok(Issued {
            email: account.email,
            code,
            delivery,
        })
    }

    /// Read-only check that (email, code) currently resolves to a valid
    /// record. Never mutates the ledger; a later commit re-validates.
    ///
    /// # Errors
    /// `Validation`, `InvalidCode`, `Expired`, or `Storage`.
    pub async fn verify_reset(&self, email: &str, code: &str) -> Result<(), ResetError> {
        self.lookup_valid(email, code).await.map(|_| ())
    }

    /// Consume a valid code and set the account's new password. The consume
    /// is a conditional write, so of two racing commits exactly one applies;
    /// the loser fails with `InvalidCode`.
    ///
    /// # Errors
    /// `Validation`, `InvalidCode`, `Expired`, `NotFound` when the account
    /// vanished (the code is left unconsumed), or `Storage`.
    pub async fn commit_reset(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), ResetError> {
        if new_password.is_empty() {
            return Err(ResetError::Validation("new_password"));
        }

        // Independent re-check: time may have elapsed or the code may have
        // been consumed since any earlier verify call.
        let record = self.lookup_valid(email, code).await?;

        let account = self
            .store
            .find_account(&record.email)
            .await?
            .ok_or(ResetError::NotFound)?;

        let password_hash = crypto::hash_password(new_password)?;

        match self
            .store
            .consume_otp_and_set_password(record.id, account.id, &password_hash)
            .await?
        {
            CommitWrite::Applied => {
                info!(email = %account.email, "password reset committed");
                Ok(())
            }
            CommitWrite::AlreadyUsed => Err(ResetError::InvalidCode),
            CommitWrite::AccountMissing => Err(ResetError::NotFound),
        }
    }

    async fn lookup_valid(&self, email: &str, code: &str) -> Result<OtpRecord, ResetError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(ResetError::Validation("email"));
        }
        let code = code.trim();
        if code.is_empty() {
            return Err(ResetError::Validation("otp"));
        }

        let record = self
            .store
            .latest_unused_otp(email, code)
            .await?
            .ok_or(ResetError::InvalidCode)?;

        if Utc::now() >= record.expires_at {
            return Err(ResetError::Expired);
        }

        Ok(record)
    }
}

/// Draw a code uniformly from the full zero-padded digit space. Fixed-width
/// string, not an integer, so leading zeros survive.
pub(crate) fn generate_code(length: u32) -> String {
    let bound = 10u64.pow(length);
    let value = rand::thread_rng().gen_range(0..bound);
    format!("{value:0width$}", width = length as usize)
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn defaults_match_policy() {
        let config = ResetConfig::new();
        assert_eq!(config.otp_window_minutes(), 10);
        assert_eq!(config.otp_length(), 6);
        assert!(!config.expose_code());
    }

    #[test]
    fn normalize_rejects_degenerate_values() {
        let config = ResetConfig::new()
            .with_window_minutes(0)
            .with_otp_length(0)
            .normalize();
        assert_eq!(config.otp_window_minutes(), 10);
        assert_eq!(config.otp_length(), 4);

        let config = ResetConfig::new().with_otp_length(40).normalize();
        assert_eq!(config.otp_length(), 9);
    }

    #[test]
    fn generated_codes_keep_leading_zeros() {
        for _ in 0..200 {
            let code = generate_code(6);
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
        for _ in 0..50 {
            let code = generate_code(4);
            assert_eq!(code.len(), 4);
        }
    }
}
