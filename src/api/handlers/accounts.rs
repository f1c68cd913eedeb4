//! Account registration, login, and profile endpoints.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{FromRow, PgPool};
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{is_unique_violation, json_error, server_error, valid_email};
use crate::crypto;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    pub profile_photo: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ProfileUpdateRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub profile_photo: Option<String>,
}

#[derive(ToSchema, Serialize, FromRow, Debug)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub is_admin: bool,
    pub profile_photo: Option<String>,
}

#[derive(FromRow)]
struct LoginRow {
    id: Uuid,
    email: String,
    username: String,
    is_admin: bool,
    profile_photo: Option<String>,
    password_hash: String,
}

#[utoipa::path(
    post,
    path = "/app/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration successful", body = UserResponse),
        (status = 400, description = "Missing or invalid fields, or email taken")
    ),
    tag = "accounts"
)]
pub async fn register(
    pool: Extension<PgPool>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            json_error("validation", "Missing payload"),
        )
            .into_response();
    };
    let (Some(email), Some(username), Some(password)) =
        (request.email, request.username, request.password)
    else {
        return (
            StatusCode::BAD_REQUEST,
            json_error("validation", "email, username and password are required"),
        )
            .into_response();
    };

    let email = email.trim().to_string();
    if !valid_email(&email) {
        return (
            StatusCode::BAD_REQUEST,
            json_error("validation", "Enter a valid email address"),
        )
            .into_response();
    }

    let password_hash = match crypto::hash_password(&password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("failed to hash password: {err}");
            return server_error().into_response();
        }
    };

    let row = sqlx::query_as::<_, UserResponse>(
        r"
        INSERT INTO app_users (email, username, password_hash, is_admin, profile_photo_url)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, email, username, is_admin, profile_photo_url AS profile_photo
        ",
    )
    .bind(&email)
    .bind(&username)
    .bind(&password_hash)
    .bind(request.is_admin)
    .bind(&request.profile_photo)
    .fetch_one(&*pool)
    .await;

    match row {
        Ok(user) => (
            StatusCode::CREATED,
            Json(json!({ "message": "Registered successfully", "user": user })),
        )
            .into_response(),
        Err(err) if is_unique_violation(&err) => (
            StatusCode::BAD_REQUEST,
            json_error("validation", "email already registered"),
        )
            .into_response(),
        Err(err) => {
            error!("failed to register user: {err}");
            server_error().into_response()
        }
    }
}

/// Password check happens even when the shapes allow an early exit, so
/// timing does not separate "no such user" from "wrong password" more than
/// the response text already does.
#[utoipa::path(
    post,
    path = "/app/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = UserResponse),
        (status = 400, description = "Invalid credentials")
    ),
    tag = "accounts"
)]
pub async fn login(
    pool: Extension<PgPool>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            json_error("validation", "Missing payload"),
        )
            .into_response();
    };
    let (Some(email), Some(password)) = (request.email, request.password) else {
        return (
            StatusCode::BAD_REQUEST,
            json_error("validation", "email and password are required"),
        )
            .into_response();
    };

    let row = sqlx::query_as::<_, LoginRow>(
        r"
        SELECT id, email, username, is_admin,
               profile_photo_url AS profile_photo, password_hash
        FROM app_users
        WHERE email = $1 AND is_active
        ",
    )
    .bind(email.trim())
    .fetch_optional(&*pool)
    .await;

    let row = match row {
        Ok(Some(row)) => row,
        Ok(None) => {
            return (
                StatusCode::BAD_REQUEST,
                json_error("invalid_credentials", "Invalid credentials"),
            )
                .into_response()
        }
        Err(err) => {
            error!("login lookup failed: {err}");
            return server_error().into_response();
        }
    };

    match crypto::verify_password(&password, &row.password_hash) {
        Ok(true) => (
            StatusCode::OK,
            Json(UserResponse {
                id: row.id,
                email: row.email,
                username: row.username,
                is_admin: row.is_admin,
                profile_photo: row.profile_photo,
            }),
        )
            .into_response(),
        Ok(false) => (
            StatusCode::BAD_REQUEST,
            json_error("invalid_credentials", "Invalid credentials"),
        )
            .into_response(),
        Err(err) => {
            error!("password verification failed: {err}");
            server_error().into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/app/profile/{id}",
    responses(
        (status = 200, description = "Profile", body = UserResponse),
        (status = 404, description = "User not found")
    ),
    tag = "accounts"
)]
pub async fn get_profile(pool: Extension<PgPool>, Path(id): Path<Uuid>) -> impl IntoResponse {
    let row = sqlx::query_as::<_, UserResponse>(
        r"
        SELECT id, email, username, is_admin, profile_photo_url AS profile_photo
        FROM app_users
        WHERE id = $1
        ",
    )
    .bind(id)
    .fetch_optional(&*pool)
    .await;

    match row {
        Ok(Some(user)) => (StatusCode::OK, Json(user)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            json_error("not_found", "User not found"),
        )
            .into_response(),
        Err(err) => {
            error!("profile lookup failed: {err}");
            server_error().into_response()
        }
    }
}

/// Partial update; `id` and `is_admin` are read-only here.
#[utoipa::path(
    put,
    path = "/app/profile/{id}",
    request_body = ProfileUpdateRequest,
    responses(
        (status = 200, description = "Updated profile", body = UserResponse),
        (status = 400, description = "Email taken"),
        (status = 404, description = "User not found")
    ),
    tag = "accounts"
)]
pub async fn update_profile(
    pool: Extension<PgPool>,
    Path(id): Path<Uuid>,
    payload: Option<Json<ProfileUpdateRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            json_error("validation", "Missing payload"),
        )
            .into_response();
    };

    if let Some(email) = &request.email {
        if !valid_email(email.trim()) {
            return (
                StatusCode::BAD_REQUEST,
                json_error("validation", "Enter a valid email address"),
            )
                .into_response();
        }
    }

    let row = sqlx::query_as::<_, UserResponse>(
        r"
        UPDATE app_users
        SET email = COALESCE($2, email),
            username = COALESCE($3, username),
            profile_photo_url = COALESCE($4, profile_photo_url)
        WHERE id = $1
        RETURNING id, email, username, is_admin, profile_photo_url AS profile_photo
        ",
    )
    .bind(id)
    .bind(request.email.as_deref().map(str::trim))
    .bind(&request.username)
    .bind(&request.profile_photo)
    .fetch_optional(&*pool)
    .await;

    match row {
        Ok(Some(user)) => (StatusCode::OK, Json(user)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            json_error("not_found", "User not found"),
        )
            .into_response(),
        Err(err) if is_unique_violation(&err) => (
            StatusCode::BAD_REQUEST,
            json_error("validation", "email already registered"),
        )
            .into_response(),
        Err(err) => {
            error!("profile update failed: {err}");
            server_error().into_response()
        }
    }
}
