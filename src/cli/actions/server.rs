use crate::{api, cli::actions::Action};
use anyhow::Result;

/// Handle the server action
/// # Errors
/// Return error if failed to start the server
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server { port, dsn, globals } => api::new(port, dsn, &globals).await,
    }
}
