//! HTTP server wiring: pool, services, routes, and middleware layers.

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Method, Request},
    routing::{get, post, put},
    Extension, Json, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug_span, info, warn, Span};
use ulid::Ulid;

use crate::cli::globals::GlobalArgs;
use crate::media::{BlobStore, CloudinaryStore, LogBlobStore};
use crate::notify::{BrevoMailer, LogMailer, Mailer};
use crate::reset::{PgResetStore, ResetConfig, ResetService};

pub(crate) mod handlers;
mod openapi;

pub use openapi::ApiDoc;

// Uploaded e-book files cap out here.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Build the application state and serve until shutdown.
///
/// # Errors
/// Returns an error if the database is unreachable, a client cannot be
/// constructed, or the listener fails to bind.
pub async fn new(port: u16, dsn: String, globals: &GlobalArgs) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let mailer: Arc<dyn Mailer> = match &globals.brevo_api_key {
        Some(api_key) => Arc::new(BrevoMailer::new(
            api_key.clone(),
            globals.from_address.clone(),
            globals.from_name.clone(),
            Duration::from_secs(globals.mail_timeout_seconds),
        )?),
        None => {
            warn!("no Brevo API key configured, OTP emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    let reset_config = ResetConfig::new()
        .with_window_minutes(globals.otp_window_minutes)
        .with_otp_length(globals.otp_length)
        .with_expose_code(globals.expose_otp);

    let reset = Arc::new(ResetService::new(
        Arc::new(PgResetStore::new(pool.clone())),
        mailer,
        reset_config,
    ));

    let blobs: Arc<dyn BlobStore> =
        match (&globals.cloudinary_cloud, &globals.cloudinary_upload_preset) {
            (Some(cloud), Some(preset)) => Arc::new(CloudinaryStore::new(
                cloud.clone(),
                preset.clone(),
                Duration::from_secs(globals.cloudinary_timeout_seconds),
            )?),
            _ => {
                warn!("no Cloudinary credentials configured, uploads will only be logged");
                Arc::new(LogBlobStore)
            }
        };

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .allow_origin(Any);

    let app = Router::new()
        .route("/openapi.json", get(openapi_json))
        .route("/app/register", post(handlers::accounts::register))
        .route("/app/login", post(handlers::accounts::login))
        .route(
            "/app/profile/:id",
            get(handlers::accounts::get_profile).put(handlers::accounts::update_profile),
        )
        .route("/forgot-password/send-otp", post(handlers::reset::send_otp))
        .route(
            "/forgot-password/verify-otp",
            post(handlers::reset::verify_otp),
        )
        .route(
            "/forgot-password/reset",
            post(handlers::reset::reset_password),
        )
        .route(
            "/categories",
            get(handlers::categories::list).post(handlers::categories::create),
        )
        .route(
            "/authors",
            get(handlers::authors::list).post(handlers::authors::create),
        )
        .route(
            "/authors/:id",
            put(handlers::authors::update).delete(handlers::authors::remove),
        )
        .route("/genres", get(handlers::books::genres))
        .route(
            "/books",
            get(handlers::books::list).post(handlers::books::create),
        )
        .route(
            "/books/:id",
            get(handlers::books::get)
                .put(handlers::books::update)
                .delete(handlers::books::remove),
        )
        .route(
            "/books/:id/reviews",
            get(handlers::reviews::list).post(handlers::reviews::upsert),
        )
        .route(
            "/poems",
            get(handlers::poems::list).post(handlers::poems::create),
        )
        .route("/poems/:id", get(handlers::poems::get))
        .route("/upload/image", post(handlers::uploads::image))
        .route("/upload/pdf", post(handlers::uploads::pdf))
        .route("/upload/text", post(handlers::uploads::text))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
                .layer(Extension(pool.clone()))
                .layer(Extension(reset))
                .layer(Extension(blobs)),
        )
        .route(
            "/health",
            get(handlers::health::health).options(handlers::health::health),
        )
        .layer(Extension(pool));

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi::doc())
}

fn make_span(request: &Request<Body>) -> Span {
    let headers = request.headers();
    let path = request.uri().path();
    let request_id = headers
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", path, ?headers, request_id)
}
