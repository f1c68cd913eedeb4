//! # Pustak (e-book & poem reading platform backend)
//!
//! `pustak` is the HTTP backend for an e-book and poem reading platform:
//! account registration and login, catalog browsing (books, poems, authors,
//! categories), ratings/reviews, and media uploads delegated to Cloudinary.
//!
//! ## Password reset (OTP)
//!
//! The one part of the system with real protocol semantics is the
//! password-reset flow in [`reset`]: a short-lived 6-digit one-time password
//! is issued per request, delivered best-effort over email, and consumed
//! exactly once when the password is changed.
//!
//! - **Issuance:** every request creates a fresh ledger row; prior unexpired
//!   codes for the same email stay valid until their own expiry.
//! - **Single use:** consumption is a conditional write against the ledger,
//!   so two racing commits resolve to exactly one winner.
//! - **Delivery:** the mailer reports success or failure as metadata and
//!   never fails the issuance itself.
//!
//! ## Catalog & uploads
//!
//! Everything else is straight request/response mapping over Postgres.
//! Admin-gated mutations carry a `user_id` in the body which is checked
//! against the account's `is_admin` flag. File uploads stream through to a
//! [`media::BlobStore`] implementation (Cloudinary in production).

pub mod api;
pub mod cli;
pub mod crypto;
pub mod media;
pub mod notify;
pub mod reset;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        // Should be a hex string (full SHA-1 is 40 chars, but could be short)
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
