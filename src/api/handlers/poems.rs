//! Poem listing, detail, and admin-gated creation.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{ensure_admin, json_error, server_error};

#[derive(ToSchema, Serialize, FromRow, Debug)]
pub struct Poem {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author_id: Option<Uuid>,
    pub author_name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CreatePoemRequest {
    pub user_id: Option<Uuid>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub author_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

const POEM_QUERY: &str = r"
    SELECT p.id, p.title, p.content,
           p.author_id, a.name AS author_name,
           p.is_active, p.created_at
    FROM poems p
    LEFT JOIN authors a ON a.id = p.author_id
";

#[utoipa::path(
    get,
    path = "/poems",
    responses(
        (status = 200, description = "Active poems, newest first", body = [Poem])
    ),
    tag = "catalog"
)]
pub async fn list(pool: Extension<PgPool>) -> impl IntoResponse {
    let query = format!("{POEM_QUERY} WHERE p.is_active ORDER BY p.created_at DESC");
    let rows = sqlx::query_as::<_, Poem>(&query).fetch_all(&*pool).await;

    match rows {
        Ok(poems) => (StatusCode::OK, Json(poems)).into_response(),
        Err(err) => {
            error!("poem list failed: {err}");
            server_error().into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/poems/{id}",
    responses(
        (status = 200, description = "Poem detail", body = Poem),
        (status = 404, description = "Poem not found")
    ),
    tag = "catalog"
)]
pub async fn get(pool: Extension<PgPool>, Path(id): Path<Uuid>) -> impl IntoResponse {
    let query = format!("{POEM_QUERY} WHERE p.id = $1");
    let row = sqlx::query_as::<_, Poem>(&query)
        .bind(id)
        .fetch_optional(&*pool)
        .await;

    match row {
        Ok(Some(poem)) => (StatusCode::OK, Json(poem)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            json_error("not_found", "Poem not found"),
        )
            .into_response(),
        Err(err) => {
            error!("poem lookup failed: {err}");
            server_error().into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/poems",
    request_body = CreatePoemRequest,
    responses(
        (status = 201, description = "Poem created", body = Poem),
        (status = 400, description = "Missing title or content"),
        (status = 403, description = "Admin access required")
    ),
    tag = "catalog"
)]
pub async fn create(
    pool: Extension<PgPool>,
    payload: Option<Json<CreatePoemRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            json_error("validation", "Missing payload"),
        )
            .into_response();
    };
    if let Err(denied) = ensure_admin(&pool, request.user_id).await {
        return denied.into_response();
    }
    let (Some(title), Some(content)) = (request.title, request.content) else {
        return (
            StatusCode::BAD_REQUEST,
            json_error("validation", "title and content are required"),
        )
            .into_response();
    };

    let inserted = sqlx::query_as::<_, (Uuid,)>(
        r"
        INSERT INTO poems (title, content, author_id, is_active)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        ",
    )
    .bind(&title)
    .bind(&content)
    .bind(request.author_id)
    .bind(request.is_active.unwrap_or(true))
    .fetch_one(&*pool)
    .await;

    let id = match inserted {
        Ok((id,)) => id,
        Err(err) => {
            error!("poem create failed: {err}");
            return server_error().into_response();
        }
    };

    let query = format!("{POEM_QUERY} WHERE p.id = $1");
    match sqlx::query_as::<_, Poem>(&query)
        .bind(id)
        .fetch_optional(&*pool)
        .await
    {
        Ok(Some(poem)) => (StatusCode::CREATED, Json(poem)).into_response(),
        Ok(None) => server_error().into_response(),
        Err(err) => {
            error!("poem reload failed: {err}");
            server_error().into_response()
        }
    }
}
