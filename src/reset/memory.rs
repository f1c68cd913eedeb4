//! In-memory reset store.
//!
//! Backs the protocol test suite; the single mutex around both tables gives
//! the same atomicity for the consume-and-set write that the Postgres store
//! gets from a transaction.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;
use uuid::Uuid;

use super::ledger::{CommitWrite, OtpRecord, ResetAccount, ResetStore};

#[derive(Debug, Clone)]
pub(crate) struct MemoryAccount {
    pub(crate) account: ResetAccount,
    pub(crate) password_hash: String,
}

#[derive(Debug, Default)]
struct Tables {
    accounts: Vec<MemoryAccount>,
    otps: Vec<OtpRecord>,
}

#[derive(Debug, Default)]
pub struct MemoryResetStore {
    tables: Mutex<Tables>,
}

impl MemoryResetStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_account(&self, email: &str, username: &str, password_hash: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.tables
            .lock()
            .expect("reset store poisoned")
            .accounts
            .push(MemoryAccount {
                account: ResetAccount {
                    id,
                    email: email.to_string(),
                    username: username.to_string(),
                },
                password_hash: password_hash.to_string(),
            });
        id
    }

    pub fn remove_account(&self, email: &str) {
        self.tables
            .lock()
            .expect("reset store poisoned")
            .accounts
            .retain(|entry| entry.account.email != email);
    }

    #[must_use]
    pub fn password_hash(&self, email: &str) -> Option<String> {
        self.tables
            .lock()
            .expect("reset store poisoned")
            .accounts
            .iter()
            .find(|entry| entry.account.email == email)
            .map(|entry| entry.password_hash.clone())
    }

    #[must_use]
    pub fn otp_count(&self) -> usize {
        self.tables.lock().expect("reset store poisoned").otps.len()
    }

    /// Snapshot of the ledger rows for assertions.
    #[must_use]
    pub fn otps(&self) -> Vec<OtpRecord> {
        self.tables
            .lock()
            .expect("reset store poisoned")
            .otps
            .clone()
    }

    /// Shift every matching record's expiry into the past, simulating the
    /// validity window elapsing.
    pub fn expire_otps(&self, email: &str, code: &str) {
        let mut tables = self.tables.lock().expect("reset store poisoned");
        let now = chrono::Utc::now();
        for record in &mut tables.otps {
            if record.email == email && record.code == code {
                record.expires_at = now - chrono::Duration::minutes(1);
            }
        }
    }
}

#[async_trait]
impl ResetStore for MemoryResetStore {
    async fn find_account(&self, email: &str) -> Result<Option<ResetAccount>> {
        Ok(self
            .tables
            .lock()
            .expect("reset store poisoned")
            .accounts
            .iter()
            .find(|entry| entry.account.email == email)
            .map(|entry| entry.account.clone()))
    }

    async fn insert_otp(&self, record: &OtpRecord) -> Result<()> {
        self.tables
            .lock()
            .expect("reset store poisoned")
            .otps
            .push(record.clone());
        Ok(())
    }

    async fn latest_unused_otp(&self, email: &str, code: &str) -> Result<Option<OtpRecord>> {
        let tables = self.tables.lock().expect("reset store poisoned");
        let mut matches: Vec<&OtpRecord> = tables
            .otps
            .iter()
            .filter(|record| record.email == email && record.code == code && !record.is_used)
            .collect();
        // Same order as the Postgres query: created_at, id tie-break.
        matches.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(matches.first().map(|record| (*record).clone()))
    }

    async fn consume_otp_and_set_password(
        &self,
        otp_id: Uuid,
        account_id: Uuid,
        password_hash: &str,
    ) -> Result<CommitWrite> {
        let mut tables = self.tables.lock().expect("reset store poisoned");

        let Some(index) = tables.otps.iter().position(|record| record.id == otp_id) else {
            return Ok(CommitWrite::AlreadyUsed);
        };
        if tables.otps[index].is_used {
            return Ok(CommitWrite::AlreadyUsed);
        }

        // Check the account before consuming so a vanished account leaves
        // the record untouched.
        let Some(account_index) = tables
            .accounts
            .iter()
            .position(|entry| entry.account.id == account_id)
        else {
            return Ok(CommitWrite::AccountMissing);
        };

        tables.otps[index].is_used = true;
        tables.accounts[account_index].password_hash = password_hash.to_string();

        Ok(CommitWrite::Applied)
    }
}
