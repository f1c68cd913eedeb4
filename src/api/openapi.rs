use utoipa::OpenApi;

use super::handlers::{
    accounts, authors, books, categories, health, poems, reset, reviews, uploads,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        accounts::register,
        accounts::login,
        accounts::get_profile,
        accounts::update_profile,
        reset::send_otp,
        reset::verify_otp,
        reset::reset_password,
        categories::list,
        categories::create,
        authors::list,
        authors::create,
        authors::update,
        authors::remove,
        books::genres,
        books::list,
        books::get,
        books::create,
        books::update,
        books::remove,
        reviews::list,
        reviews::upsert,
        poems::list,
        poems::get,
        poems::create,
        uploads::image,
        uploads::pdf,
        uploads::text,
    ),
    components(schemas(
        accounts::RegisterRequest,
        accounts::LoginRequest,
        accounts::ProfileUpdateRequest,
        accounts::UserResponse,
        reset::SendOtpRequest,
        reset::VerifyOtpRequest,
        reset::ResetPasswordRequest,
        categories::Category,
        categories::CreateCategoryRequest,
        authors::Author,
        authors::CreateAuthorRequest,
        authors::UpdateAuthorRequest,
        authors::DeleteRequest,
        books::Book,
        books::CreateBookRequest,
        books::DeleteBookRequest,
        reviews::Review,
        reviews::UpsertReviewRequest,
        poems::Poem,
        poems::CreatePoemRequest,
    )),
    tags(
        (name = "health", description = "Service liveness"),
        (name = "accounts", description = "Registration, login, and profiles"),
        (name = "password-reset", description = "OTP-based password reset"),
        (name = "catalog", description = "Categories, authors, books, and poems"),
        (name = "reviews", description = "Book reviews"),
        (name = "uploads", description = "Media uploads"),
    )
)]
pub struct ApiDoc;

#[must_use]
pub fn doc() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_includes_every_route() {
        let doc = doc();
        for path in [
            "/health",
            "/app/register",
            "/app/login",
            "/app/profile/{id}",
            "/forgot-password/send-otp",
            "/forgot-password/verify-otp",
            "/forgot-password/reset",
            "/categories",
            "/authors",
            "/authors/{id}",
            "/genres",
            "/books",
            "/books/{id}",
            "/books/{id}/reviews",
            "/poems",
            "/poems/{id}",
            "/upload/image",
            "/upload/pdf",
            "/upload/text",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
