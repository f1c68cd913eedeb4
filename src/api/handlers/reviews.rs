//! Book reviews: one review per (user, book), writes are upserts.

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

use super::{is_foreign_key_violation, json_error, server_error};

#[derive(ToSchema, Serialize, FromRow, Debug)]
pub struct Review {
    pub id: Uuid,
    pub book_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UpsertReviewRequest {
    pub user_id: Option<Uuid>,
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

#[utoipa::path(
    get,
    path = "/books/{id}/reviews",
    responses(
        (status = 200, description = "Reviews for the book, newest first", body = [Review]),
        (status = 404, description = "Book not found")
    ),
    tag = "reviews"
)]
pub async fn list(pool: Extension<PgPool>, Path(book_id): Path<Uuid>) -> impl IntoResponse {
    let book = sqlx::query_as::<_, (Uuid,)>("SELECT id FROM books WHERE id = $1")
        .bind(book_id)
        .fetch_optional(&*pool)
        .await;

    match book {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                json_error("not_found", "Book not found"),
            )
                .into_response()
        }
        Err(err) => {
            error!("book lookup failed: {err}");
            return server_error().into_response();
        }
    }

    let rows = sqlx::query_as::<_, Review>(
        r"
        SELECT r.id, r.book_id, r.user_id, u.username,
               r.rating, r.comment, r.created_at, r.updated_at
        FROM reviews r
        JOIN app_users u ON u.id = r.user_id
        WHERE r.book_id = $1
        ORDER BY r.updated_at DESC
        ",
    )
    .bind(book_id)
    .fetch_all(&*pool)
    .await;

    match rows {
        Ok(reviews) => (StatusCode::OK, Json(reviews)).into_response(),
        Err(err) => {
            error!("review list failed: {err}");
            server_error().into_response()
        }
    }
}

/// A second submission by the same user for the same book replaces the
/// earlier rating and comment instead of adding a row.
#[utoipa::path(
    post,
    path = "/books/{id}/reviews",
    request_body = UpsertReviewRequest,
    responses(
        (status = 200, description = "Review stored", body = Review),
        (status = 400, description = "Missing fields or rating out of range"),
        (status = 404, description = "Book or user not found")
    ),
    tag = "reviews"
)]
pub async fn upsert(
    pool: Extension<PgPool>,
    Path(book_id): Path<Uuid>,
    payload: Option<Json<UpsertReviewRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            json_error("validation", "Missing payload"),
        )
            .into_response();
    };
    let (Some(user_id), Some(rating)) = (request.user_id, request.rating) else {
        return (
            StatusCode::BAD_REQUEST,
            json_error("validation", "user_id and rating are required"),
        )
            .into_response();
    };
    if !(1..=5).contains(&rating) {
        return (
            StatusCode::BAD_REQUEST,
            json_error("validation", "rating must be between 1 and 5"),
        )
            .into_response();
    }

    let book = sqlx::query_as::<_, (Uuid,)>("SELECT id FROM books WHERE id = $1")
        .bind(book_id)
        .fetch_optional(&*pool)
        .await;

    match book {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                json_error("not_found", "Book not found"),
            )
                .into_response()
        }
        Err(err) => {
            error!("book lookup failed: {err}");
            return server_error().into_response();
        }
    }

    let inserted = sqlx::query_as::<_, (Uuid,)>(
        r"
        INSERT INTO reviews (book_id, user_id, rating, comment)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, book_id) DO UPDATE
        SET rating = EXCLUDED.rating,
            comment = EXCLUDED.comment,
            updated_at = NOW()
        RETURNING id
        ",
    )
    .bind(book_id)
    .bind(user_id)
    .bind(rating)
    .bind(request.comment.unwrap_or_default())
    .fetch_one(&*pool)
    .await;

    let id = match inserted {
        Ok((id,)) => id,
        Err(err) if is_foreign_key_violation(&err) => {
            return (
                StatusCode::NOT_FOUND,
                json_error("not_found", "User not found"),
            )
                .into_response()
        }
        Err(err) => {
            error!("review upsert failed: {err}");
            return server_error().into_response();
        }
    };

    let row = sqlx::query_as::<_, Review>(
        r"
        SELECT r.id, r.book_id, r.user_id, u.username,
               r.rating, r.comment, r.created_at, r.updated_at
        FROM reviews r
        JOIN app_users u ON u.id = r.user_id
        WHERE r.id = $1
        ",
    )
    .bind(id)
    .fetch_optional(&*pool)
    .await;

    match row {
        Ok(Some(review)) => (StatusCode::OK, Json(review)).into_response(),
        Ok(None) => server_error().into_response(),
        Err(err) => {
            error!("review reload failed: {err}");
            server_error().into_response()
        }
    }
}
