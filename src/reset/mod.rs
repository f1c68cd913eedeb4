//! One-time-password password-reset protocol.
//!
//! State machine per (email, code) pair: `ISSUED` (created, unused,
//! unexpired) → `VERIFIED` (transient read-only check) → `CONSUMED`
//! (`is_used = true`); or `EXPIRED` once the validity window elapses; or
//! `INVALID` when the pair never existed or was already consumed.
//!
//! Invariants the implementation holds:
//! - Every reset request creates a fresh ledger row; earlier unexpired codes
//!   for the same email stay valid until their own expiry.
//! - A record is valid iff `!is_used && now < expires_at`. Records are never
//!   deleted, only flipped to used.
//! - Consumption is a conditional write ("mark used only if still unused"),
//!   so two racing commits resolve to exactly one winner; the loser observes
//!   the consumed record and fails as invalid.
//! - Delivery failure never fails issuance; the ledger row is the source of
//!   truth and the delivery outcome is returned as metadata.

pub mod error;
pub mod ledger;
pub mod memory;
pub mod service;
#[cfg(test)]
mod tests;

pub use error::ResetError;
pub use ledger::{CommitWrite, OtpRecord, PgResetStore, ResetAccount, ResetStore};
pub use memory::MemoryResetStore;
pub use service::{Issued, ResetConfig, ResetService};
