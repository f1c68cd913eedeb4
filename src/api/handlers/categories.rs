//! Category listing and admin-gated creation.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{ensure_admin, is_unique_violation, json_error, server_error};

#[derive(ToSchema, Serialize, FromRow, Debug)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub is_active: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CreateCategoryRequest {
    pub user_id: Option<Uuid>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/categories",
    responses(
        (status = 200, description = "Active categories", body = [Category])
    ),
    tag = "catalog"
)]
pub async fn list(pool: Extension<PgPool>) -> impl IntoResponse {
    let rows = sqlx::query_as::<_, Category>(
        "SELECT id, name, description, is_active FROM categories WHERE is_active ORDER BY name",
    )
    .fetch_all(&*pool)
    .await;

    match rows {
        Ok(categories) => (StatusCode::OK, Json(categories)).into_response(),
        Err(err) => {
            error!("category list failed: {err}");
            server_error().into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 400, description = "Missing name or duplicate"),
        (status = 403, description = "Admin access required")
    ),
    tag = "catalog"
)]
pub async fn create(
    pool: Extension<PgPool>,
    payload: Option<Json<CreateCategoryRequest>>,
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

    let row = sqlx::query_as::<_, Category>(
        r"
        INSERT INTO categories (name, description, is_active)
        VALUES ($1, $2, $3)
        RETURNING id, name, description, is_active
        ",
    )
    .bind(&name)
    .bind(request.description.unwrap_or_default())
    .bind(request.is_active.unwrap_or(true))
    .fetch_one(&*pool)
    .await;

    match row {
        Ok(category) => (StatusCode::CREATED, Json(category)).into_response(),
        Err(err) if is_unique_violation(&err) => (
            StatusCode::BAD_REQUEST,
            json_error("validation", "category name already exists"),
        )
            .into_response(),
        Err(err) => {
            error!("category create failed: {err}");
            server_error().into_response()
        }
    }
}
