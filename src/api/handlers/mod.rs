//! Request handlers, one module per resource.

use axum::{http::StatusCode, Json};
use serde_json::{json, Value};
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

pub mod accounts;
pub mod authors;
pub mod books;
pub mod categories;
pub mod health;
pub mod poems;
pub mod reset;
pub mod reviews;
pub mod uploads;

/// Status plus structured error body, the failure half of every handler.
pub(crate) type ApiFailure = (StatusCode, Json<Value>);

/// Every failure carries a stable machine reason and a human message;
/// internals never leak into the body.
pub(crate) fn json_error(reason: &str, message: &str) -> Json<Value> {
    Json(json!({ "error": reason, "message": message }))
}

pub(crate) fn server_error() -> ApiFailure {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        json_error("server_error", "Internal server error"),
    )
}

/// Basic email format check on trimmed input.
pub(crate) fn valid_email(email: &str) -> bool {
    regex::Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")
        .is_ok_and(|regex| regex.is_match(email))
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23503"),
        _ => false,
    }
}

/// Admin gate for catalog mutations: the caller sends its `user_id` in the
/// body and the account must carry the admin flag.
pub(crate) async fn ensure_admin(pool: &PgPool, user_id: Option<Uuid>) -> Result<(), ApiFailure> {
    let Some(user_id) = user_id else {
        return Err((
            StatusCode::BAD_REQUEST,
            json_error("validation", "user_id is required"),
        ));
    };

    let row = sqlx::query_as::<_, (bool,)>("SELECT is_admin FROM app_users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await;

    match row {
        Ok(Some((true,))) => Ok(()),
        Ok(Some((false,))) => Err((
            StatusCode::FORBIDDEN,
            json_error("forbidden", "Admin access required"),
        )),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            json_error("not_found", "User not found"),
        )),
        Err(err) => {
            error!("admin check failed: {err}");
            Err(server_error())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("name.surname@example.co"));
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("a@b"));
        assert!(!valid_email("two words@example.com"));
    }

    #[test]
    fn json_error_shape_is_stable() {
        let Json(body) = json_error("validation", "email is required");
        assert_eq!(body["error"], "validation");
        assert_eq!(body["message"], "email is required");
    }
}
