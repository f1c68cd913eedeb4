use crate::cli::{actions::Action, globals::GlobalArgs};
use anyhow::Result;
use secrecy::SecretString;

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let mut globals = GlobalArgs::new(
        matches
            .get_one::<String>("from-address")
            .map(String::to_string)
            .unwrap_or_else(|| "noreply@pustak.app".to_string()),
        matches
            .get_one::<String>("from-name")
            .map(String::to_string)
            .unwrap_or_else(|| "Pustak".to_string()),
    );

    if let Some(key) = matches.get_one::<String>("brevo-api-key") {
        globals.set_brevo_api_key(SecretString::from(key.clone()));
    }

    globals.mail_timeout_seconds = matches
        .get_one::<u64>("mail-timeout")
        .copied()
        .unwrap_or(10);
    globals.otp_window_minutes = matches.get_one::<i64>("otp-window").copied().unwrap_or(10);
    globals.otp_length = matches.get_one::<u32>("otp-length").copied().unwrap_or(6);
    globals.expose_otp = matches.get_flag("expose-otp");
    globals.cloudinary_cloud = matches
        .get_one::<String>("cloudinary-cloud")
        .map(String::to_string);
    globals.cloudinary_upload_preset = matches
        .get_one::<String>("cloudinary-preset")
        .map(String::to_string);
    globals.cloudinary_timeout_seconds = matches
        .get_one::<u64>("cloudinary-timeout")
        .copied()
        .unwrap_or(30);

    Ok(Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        dsn: matches
            .get_one("dsn")
            .map(|s: &String| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --dsn"))?,
        globals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use secrecy::ExposeSecret;

    #[test]
    fn test_handler_defaults() -> Result<()> {
        let matches = commands::new().get_matches_from(vec![
            "pustak",
            "--dsn",
            "postgres://localhost/pustak",
        ]);

        let Action::Server { port, dsn, globals } = handler(&matches)?;
        assert_eq!(port, 8080);
        assert_eq!(dsn, "postgres://localhost/pustak");
        assert_eq!(globals.otp_window_minutes, 10);
        assert_eq!(globals.otp_length, 6);
        assert!(!globals.expose_otp);
        assert!(globals.brevo_api_key.is_none());
        Ok(())
    }

    #[test]
    fn test_handler_expose_otp_and_key() -> Result<()> {
        let matches = commands::new().get_matches_from(vec![
            "pustak",
            "--dsn",
            "postgres://localhost/pustak",
            "--brevo-api-key",
            "xkeysib-test",
            "--expose-otp",
        ]);

        let Action::Server { globals, .. } = handler(&matches)?;
        assert!(globals.expose_otp);
        assert_eq!(
            globals
                .brevo_api_key
                .as_ref()
                .map(ExposeSecret::expose_secret),
            Some("xkeysib-test")
        );
        Ok(())
    }
}
