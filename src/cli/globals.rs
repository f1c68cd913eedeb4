use secrecy::SecretString;

/// Environment-sourced settings shared by the server wiring: mail delivery,
/// OTP policy, and media upload credentials.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub brevo_api_key: Option<SecretString>,
    pub from_address: String,
    pub from_name: String,
    pub mail_timeout_seconds: u64,
    pub otp_window_minutes: i64,
    pub otp_length: u32,
    pub expose_otp: bool,
    pub cloudinary_cloud: Option<String>,
    pub cloudinary_upload_preset: Option<String>,
    pub cloudinary_timeout_seconds: u64,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(from_address: String, from_name: String) -> Self {
        Self {
            brevo_api_key: None,
            from_address,
            from_name,
            mail_timeout_seconds: 10,
            otp_window_minutes: 10,
            otp_length: 6,
            expose_otp: false,
            cloudinary_cloud: None,
            cloudinary_upload_preset: None,
            cloudinary_timeout_seconds: 30,
        }
    }

    pub fn set_brevo_api_key(&mut self, key: SecretString) {
        self.brevo_api_key = Some(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_args() {
        let args = GlobalArgs::new("noreply@pustak.app".to_string(), "Pustak".to_string());
        assert_eq!(args.from_address, "noreply@pustak.app");
        assert_eq!(args.otp_window_minutes, 10);
        assert_eq!(args.otp_length, 6);
        assert!(!args.expose_otp);
        assert!(args.brevo_api_key.is_none());
    }
}
