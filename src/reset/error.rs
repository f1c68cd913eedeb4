//! Failure taxonomy for the reset protocol.

use thiserror::Error;

/// Everything that can go wrong in a reset operation, distinguishable by
/// machine-stable reason. Storage failures are the only fatal class; the
/// rest are caller mistakes or protocol outcomes.
#[derive(Debug, Error)]
pub enum ResetError {
    /// A required field is missing or empty.
    #[error("{0} is required")]
    Validation(&'static str),

    /// No account exists for the email.
    #[error("No account found for this email")]
    NotFound,

    /// No unused record matches (email, code). Deliberately covers both
    /// "never issued" and "already consumed" so callers cannot probe which
    /// codes ever existed.
    #[error("Invalid OTP")]
    InvalidCode,

    /// A matching record exists but its validity window has elapsed.
    #[error("OTP has expired, please request a new one")]
    Expired,

    /// Underlying storage failed; surfaced to callers as a generic server
    /// error with no internals attached.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl ResetError {
    /// Stable machine-readable reason for API payloads.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound => "not_found",
            Self::InvalidCode => "invalid_otp",
            Self::Expired => "expired_otp",
            Self::Storage(_) => "server_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn reasons_are_stable() {
        assert_eq!(ResetError::Validation("email").reason(), "validation");
        assert_eq!(ResetError::NotFound.reason(), "not_found");
        assert_eq!(ResetError::InvalidCode.reason(), "invalid_otp");
        assert_eq!(ResetError::Expired.reason(), "expired_otp");
        assert_eq!(ResetError::Storage(anyhow!("boom")).reason(), "server_error");
    }

    #[test]
    fn expired_is_distinct_from_invalid() {
        assert_ne!(
            ResetError::Expired.to_string(),
            ResetError::InvalidCode.to_string()
        );
    }

    #[test]
    fn validation_names_the_field() {
        assert_eq!(
            ResetError::Validation("new_password").to_string(),
            "new_password is required"
        );
    }
}
