//! Author CRUD; all mutations are admin-gated.

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

use super::{ensure_admin, json_error, server_error};

#[derive(ToSchema, Serialize, FromRow, Debug)]
pub struct Author {
    pub id: Uuid,
    pub name: String,
    pub bio: String,
    pub photo_url: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CreateAuthorRequest {
    pub user_id: Option<Uuid>,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UpdateAuthorRequest {
    pub user_id: Option<Uuid>,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
}

#[utoipa::path(
    get,
    path = "/authors",
    responses(
        (status = 200, description = "All authors", body = [Author])
    ),
    tag = "catalog"
)]
pub async fn list(pool: Extension<PgPool>) -> impl IntoResponse {
    let rows =
        sqlx::query_as::<_, Author>("SELECT id, name, bio, photo_url FROM authors ORDER BY name")
            .fetch_all(&*pool)
            .await;

    match rows {
        Ok(authors) => (StatusCode::OK, Json(authors)).into_response(),
        Err(err) => {
            error!("author list failed: {err}");
            server_error().into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/authors",
    request_body = CreateAuthorRequest,
    responses(
        (status = 201, description = "Author created", body = Author),
        (status = 400, description = "Missing name"),
        (status = 403, description = "Admin access required")
    ),
    tag = "catalog"
)]
pub async fn create(
    pool: Extension<PgPool>,
    payload: Option<Json<CreateAuthorRequest>>,
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
    let Some(name) = request.name else {
        return (
            StatusCode::BAD_REQUEST,
            json_error("validation", "name is required"),
        )
            .into_response();
    };

    let row = sqlx::query_as::<_, Author>(
        r"
        INSERT INTO authors (name, bio, photo_url)
        VALUES ($1, $2, $3)
        RETURNING id, name, bio, photo_url
        ",
    )
    .bind(&name)
    .bind(request.bio.unwrap_or_default())
    .bind(&request.photo_url)
    .fetch_one(&*pool)
    .await;

    match row {
        Ok(author) => (StatusCode::CREATED, Json(author)).into_response(),
        Err(err) => {
            error!("author create failed: {err}");
            server_error().into_response()
        }
    }
}

#[utoipa::path(
    put,
    path = "/authors/{id}",
    request_body = UpdateAuthorRequest,
    responses(
        (status = 200, description = "Updated author", body = Author),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Author not found")
    ),
    tag = "catalog"
)]
pub async fn update(
    pool: Extension<PgPool>,
    Path(id): Path<Uuid>,
    payload: Option<Json<UpdateAuthorRequest>>,
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

    let row = sqlx::query_as::<_, Author>(
        r"
        UPDATE authors
        SET name = COALESCE($2, name),
            bio = COALESCE($3, bio),
            photo_url = COALESCE($4, photo_url)
        WHERE id = $1
        RETURNING id, name, bio, photo_url
        ",
    )
    .bind(id)
    .bind(&request.name)
    .bind(&request.bio)
    .bind(&request.photo_url)
    .fetch_optional(&*pool)
    .await;

    match row {
        Ok(Some(author)) => (StatusCode::OK, Json(author)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            json_error("not_found", "Author not found"),
        )
            .into_response(),
        Err(err) => {
            error!("author update failed: {err}");
            server_error().into_response()
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct DeleteRequest {
    pub user_id: Option<Uuid>,
}

#[utoipa::path(
    delete,
    path = "/authors/{id}",
    request_body = DeleteRequest,
    responses(
        (status = 200, description = "Author deleted"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Author not found")
    ),
    tag = "catalog"
)]
pub async fn remove(
    pool: Extension<PgPool>,
    Path(id): Path<Uuid>,
    payload: Option<Json<DeleteRequest>>,
) -> impl IntoResponse {
    let user_id = payload.and_then(|Json(request)| request.user_id);
    if let Err(denied) = ensure_admin(&pool, user_id).await {
        return denied.into_response();
    }

    let deleted = sqlx::query("DELETE FROM authors WHERE id = $1")
        .bind(id)
        .execute(&*pool)
        .await;

    match deleted {
        Ok(result) if result.rows_affected() > 0 => {
            (StatusCode::OK, Json(json!({ "message": "Author deleted" }))).into_response()
        }
        Ok(_) => (
            StatusCode::NOT_FOUND,
            json_error("not_found", "Author not found"),
        )
            .into_response(),
        Err(err) => {
            error!("author delete failed: {err}");
            server_error().into_response()
        }
    }
}
