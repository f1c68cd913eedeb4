//! Book catalog: filtered listing, genre choices, and admin-gated CRUD.

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{FromRow, PgPool};
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{ensure_admin, json_error, server_error, ApiFailure};

pub const GENRES: [&str; 9] = [
    "romance",
    "drama",
    "thriller",
    "mystery",
    "horror",
    "comedy",
    "action",
    "adventure",
    "fantasy",
];

pub const FILE_TYPES: [&str; 5] = ["pdf", "epub", "mobi", "txt", "other"];

#[derive(ToSchema, Serialize, FromRow, Debug)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub author_id: Option<Uuid>,
    pub author_name: Option<String>,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub genre: Option<String>,
    pub cover_image_url: Option<String>,
    pub content_url: Option<String>,
    pub file_type: String,
    pub language: String,
    pub is_paid: bool,
    pub price: Option<f64>,
    pub published_year: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Default)]
pub struct BookFilter {
    pub show_all: Option<bool>,
    pub category: Option<Uuid>,
    pub author: Option<Uuid>,
    pub genre: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CreateBookRequest {
    pub user_id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub author_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub genre: Option<String>,
    pub cover_image_url: Option<String>,
    pub content_url: Option<String>,
    pub file_type: Option<String>,
    pub language: Option<String>,
    pub is_paid: Option<bool>,
    pub price: Option<f64>,
    pub published_year: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct DeleteBookRequest {
    pub user_id: Option<Uuid>,
}

const BOOK_COLUMNS: &str = r"
    b.id, b.title, b.description,
    b.author_id, a.name AS author_name,
    b.category_id, c.name AS category_name,
    b.genre, b.cover_image_url, b.content_url, b.file_type, b.language,
    b.is_paid, b.price, b.published_year, b.is_active, b.created_at
";

async fn fetch_book(pool: &PgPool, id: Uuid) -> Result<Option<Book>, sqlx::Error> {
    let query = format!(
        r"
        SELECT {BOOK_COLUMNS}
        FROM books b
        LEFT JOIN authors a ON a.id = b.author_id
        LEFT JOIN categories c ON c.id = b.category_id
        WHERE b.id = $1
        "
    );
    sqlx::query_as::<_, Book>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
}

fn validate_choices(
    genre: Option<&str>,
    file_type: Option<&str>,
) -> Result<(), ApiFailure> {
    if let Some(genre) = genre {
        if !GENRES.contains(&genre) {
            return Err((
                StatusCode::BAD_REQUEST,
                json_error("validation", "genre is not a valid choice"),
            ));
        }
    }
    if let Some(file_type) = file_type {
        if !FILE_TYPES.contains(&file_type) {
            return Err((
                StatusCode::BAD_REQUEST,
                json_error("validation", "file_type is not a valid choice"),
            ));
        }
    }
    Ok(())
}

/// Active books by default; `show_all=true` includes inactive ones for the
/// admin console. Category, author, and genre filters combine.
#[utoipa::path(
    get,
    path = "/books",
    responses(
        (status = 200, description = "Books matching the filters", body = [Book])
    ),
    tag = "catalog"
)]
pub async fn list(pool: Extension<PgPool>, Query(filter): Query<BookFilter>) -> impl IntoResponse {
    let query = format!(
        r"
        SELECT {BOOK_COLUMNS}
        FROM books b
        LEFT JOIN authors a ON a.id = b.author_id
        LEFT JOIN categories c ON c.id = b.category_id
        WHERE ($1 OR b.is_active)
          AND ($2::uuid IS NULL OR b.category_id = $2)
          AND ($3::uuid IS NULL OR b.author_id = $3)
          AND ($4::text IS NULL OR b.genre = $4)
        ORDER BY b.created_at DESC
        "
    );
    let rows = sqlx::query_as::<_, Book>(&query)
        .bind(filter.show_all.unwrap_or(false))
        .bind(filter.category)
        .bind(filter.author)
        .bind(&filter.genre)
        .fetch_all(&*pool)
        .await;

    match rows {
        Ok(books) => (StatusCode::OK, Json(books)).into_response(),
        Err(err) => {
            error!("book list failed: {err}");
            server_error().into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/books/{id}",
    responses(
        (status = 200, description = "Book detail", body = Book),
        (status = 404, description = "Book not found")
    ),
    tag = "catalog"
)]
pub async fn get(pool: Extension<PgPool>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match fetch_book(&pool, id).await {
        Ok(Some(book)) => (StatusCode::OK, Json(book)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            json_error("not_found", "Book not found"),
        )
            .into_response(),
        Err(err) => {
            error!("book lookup failed: {err}");
            server_error().into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/books",
    request_body = CreateBookRequest,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Missing title or invalid choice"),
        (status = 403, description = "Admin access required")
    ),
    tag = "catalog"
)]
pub async fn create(
    pool: Extension<PgPool>,
    payload: Option<Json<CreateBookRequest>>,
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
    let Some(title) = request.title else {
        return (
            StatusCode::BAD_REQUEST,
            json_error("validation", "title is required"),
        )
            .into_response();
    };
    if let Err(invalid) =
        validate_choices(request.genre.as_deref(), request.file_type.as_deref())
    {
        return invalid.into_response();
    }

    let inserted = sqlx::query_as::<_, (Uuid,)>(
        r"
        INSERT INTO books
            (title, description, author_id, category_id, genre,
             cover_image_url, content_url, file_type, language,
             is_paid, price, published_year, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING id
        ",
    )
    .bind(&title)
    .bind(&request.description)
    .bind(request.author_id)
    .bind(request.category_id)
    .bind(&request.genre)
    .bind(&request.cover_image_url)
    .bind(&request.content_url)
    .bind(request.file_type.unwrap_or_else(|| "pdf".to_string()))
    .bind(request.language.unwrap_or_else(|| "Hindi".to_string()))
    .bind(request.is_paid.unwrap_or(false))
    .bind(request.price)
    .bind(request.published_year)
    .bind(request.is_active.unwrap_or(true))
    .fetch_one(&*pool)
    .await;

    let id = match inserted {
        Ok((id,)) => id,
        Err(err) => {
            error!("book create failed: {err}");
            return server_error().into_response();
        }
    };

    match fetch_book(&pool, id).await {
        Ok(Some(book)) => (StatusCode::CREATED, Json(book)).into_response(),
        Ok(None) => server_error().into_response(),
        Err(err) => {
            error!("book reload failed: {err}");
            server_error().into_response()
        }
    }
}

#[utoipa::path(
    put,
    path = "/books/{id}",
    request_body = CreateBookRequest,
    responses(
        (status = 200, description = "Updated book", body = Book),
        (status = 400, description = "Invalid choice"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Book not found")
    ),
    tag = "catalog"
)]
pub async fn update(
    pool: Extension<PgPool>,
    Path(id): Path<Uuid>,
    payload: Option<Json<CreateBookRequest>>,
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
    if let Err(invalid) =
        validate_choices(request.genre.as_deref(), request.file_type.as_deref())
    {
        return invalid.into_response();
    }

    let updated = sqlx::query_as::<_, (Uuid,)>(
        r"
        UPDATE books
        SET title = COALESCE($2, title),
            description = COALESCE($3, description),
            author_id = COALESCE($4, author_id),
            category_id = COALESCE($5, category_id),
            genre = COALESCE($6, genre),
            cover_image_url = COALESCE($7, cover_image_url),
            content_url = COALESCE($8, content_url),
            file_type = COALESCE($9, file_type),
            language = COALESCE($10, language),
            is_paid = COALESCE($11, is_paid),
            price = COALESCE($12, price),
            published_year = COALESCE($13, published_year),
            is_active = COALESCE($14, is_active)
        WHERE id = $1
        RETURNING id
        ",
    )
    .bind(id)
    .bind(&request.title)
    .bind(&request.description)
    .bind(request.author_id)
    .bind(request.category_id)
    .bind(&request.genre)
    .bind(&request.cover_image_url)
    .bind(&request.content_url)
    .bind(&request.file_type)
    .bind(&request.language)
    .bind(request.is_paid)
    .bind(request.price)
    .bind(request.published_year)
    .bind(request.is_active)
    .fetch_optional(&*pool)
    .await;

    match updated {
        Ok(Some((id,))) => match fetch_book(&pool, id).await {
            Ok(Some(book)) => (StatusCode::OK, Json(book)).into_response(),
            Ok(None) => server_error().into_response(),
            Err(err) => {
                error!("book reload failed: {err}");
                server_error().into_response()
            }
        },
        Ok(None) => (
            StatusCode::NOT_FOUND,
            json_error("not_found", "Book not found"),
        )
            .into_response(),
        Err(err) => {
            error!("book update failed: {err}");
            server_error().into_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/books/{id}",
    request_body = DeleteBookRequest,
    responses(
        (status = 200, description = "Book deleted"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Book not found")
    ),
    tag = "catalog"
)]
pub async fn remove(
    pool: Extension<PgPool>,
    Path(id): Path<Uuid>,
    payload: Option<Json<DeleteBookRequest>>,
) -> impl IntoResponse {
    let user_id = payload.and_then(|Json(request)| request.user_id);
    if let Err(denied) = ensure_admin(&pool, user_id).await {
        return denied.into_response();
    }

    let deleted = sqlx::query("DELETE FROM books WHERE id = $1")
        .bind(id)
        .execute(&*pool)
        .await;

    match deleted {
        Ok(result) if result.rows_affected() > 0 => {
            (StatusCode::OK, Json(json!({ "message": "Book deleted" }))).into_response()
        }
        Ok(_) => (
            StatusCode::NOT_FOUND,
            json_error("not_found", "Book not found"),
        )
            .into_response(),
        Err(err) => {
            error!("book delete failed: {err}");
            server_error().into_response()
        }
    }
}

/// Fixed genre choice list with display labels.
#[utoipa::path(
    get,
    path = "/genres",
    responses(
        (status = 200, description = "Available genre choices")
    ),
    tag = "catalog"
)]
pub async fn genres() -> impl IntoResponse {
    let choices: Vec<_> = GENRES
        .iter()
        .map(|genre| {
            let mut label = genre.to_string();
            if let Some(first) = label.get_mut(0..1) {
                first.make_ascii_uppercase();
            }
            json!({ "value": genre, "label": label })
        })
        .collect();

    (StatusCode::OK, Json(choices))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genre_and_file_type_choices_validate() {
        assert!(validate_choices(Some("fantasy"), Some("epub")).is_ok());
        assert!(validate_choices(None, None).is_ok());
        assert!(validate_choices(Some("biography"), None).is_err());
        assert!(validate_choices(None, Some("docx")).is_err());
    }

    #[test]
    fn genre_labels_are_capitalized() {
        assert!(GENRES.contains(&"romance"));
        let mut label = "romance".to_string();
        label.get_mut(0..1).map(|s| {
            s.make_ascii_uppercase();
            s
        });
        assert_eq!(label, "Romance");
    }
}
