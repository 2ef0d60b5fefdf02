mod api;
pub mod auth;
mod config;
mod notice;
mod pages;

use std::sync::Arc;

use aset_anak_shared::api::API_V1_PREFIX;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware;
use axum::response::Response as AxumResponse;
use axum::{
    Router,
    http::{Method, StatusCode, header},
    routing::{delete, get, post, put},
};
pub use config::{AppConfig, ConfigError, DEFAULT_PORT};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info_span;
use uuid::Uuid;

use crate::service::{
    AssetAggregator, CategoryRegistry, ChildDirectory, RemoteError, ServiceError, SessionGate,
};
use crate::storage::Store;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: SessionGate,
    pub categories: CategoryRegistry,
    pub assets: AssetAggregator,
    pub children: ChildDirectory,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>) -> Result<Self, ConfigError> {
        let tz = config.tz()?;
        let sessions = SessionGate::new(
            store.clone(),
            config.jwt_secret.clone(),
            config.session_policy(),
        );
        Ok(Self {
            sessions,
            categories: CategoryRegistry::new(store.clone()),
            assets: AssetAggregator::new(store.clone()),
            children: ChildDirectory::new(store, tz),
            config: Arc::new(config),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

#[derive(Clone, Debug)]
struct ReqId(pub String);

pub fn router(state: AppState) -> Router {
    let api_private = Router::new()
        .route("/me", get(api::me))
        .route("/auth/logout", post(api::logout))
        .route(
            "/children",
            get(api::list_children).post(api::create_child),
        )
        .route(
            "/children/{id}",
            get(api::get_child).delete(api::delete_child),
        )
        .route(
            "/children/{id}/assets",
            get(api::list_assets).post(api::create_asset),
        )
        .route(
            "/assets/{id}",
            put(api::update_asset).delete(api::delete_asset),
        )
        .route(
            "/categories",
            get(api::list_categories).post(api::create_category),
        )
        .route("/categories/{id}", delete(api::delete_category))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    let api_routes = Router::new()
        .route("/auth/register", post(api::register))
        .route("/auth/login", post(api::login))
        .merge(api_private);

    let page_routes = Router::new()
        .route(aset_anak_shared::path::HOME_PAGE, get(pages::home))
        .route("/login", get(pages::login_page).post(pages::login))
        .route("/register", get(pages::register_page).post(pages::register))
        .route(aset_anak_shared::path::SIGN_OUT_ACTION, post(pages::sign_out))
        .route("/dashboard", get(pages::dashboard))
        .route("/dashboard/children", post(pages::create_child))
        .route("/dashboard/settings", get(pages::settings))
        .route("/dashboard/{child_id}", get(pages::child_page))
        .route("/dashboard/{child_id}/delete", post(pages::delete_child))
        .route("/dashboard/{child_id}/assets", post(pages::create_asset))
        .route(
            "/dashboard/{child_id}/assets/{asset_id}",
            post(pages::update_asset),
        )
        .route(
            "/dashboard/{child_id}/assets/{asset_id}/delete",
            post(pages::delete_asset),
        )
        .route("/settings", get(pages::settings))
        .route("/settings/categories", post(pages::create_category))
        .route(
            "/settings/categories/{id}/delete",
            post(pages::delete_category),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::page_gate,
        ));

    // Trace with request context (method, path, request_id)
    let trace = TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
        let request_id = req
            .extensions()
            .get::<ReqId>()
            .map(|r| r.0.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        info_span!(
            "request",
            method = %req.method(),
            path = %req.uri().path(),
            request_id = %request_id,
            user_id = tracing::field::Empty,
        )
    });

    let app = Router::new()
        .route("/healthz", get(health))
        .route(pages::STYLESHEET_PATH, get(pages::stylesheet))
        .nest(API_V1_PREFIX, api_routes)
        .merge(page_routes)
        .with_state(state.clone())
        .layer(trace)
        .layer(middleware::from_fn(add_security_headers))
        .layer(middleware::from_fn(add_request_id));

    // Optionally add CORS for dev if configured
    if let Some(origin) = &state.config.dev_cors_origin {
        let hv = header::HeaderValue::from_str(origin)
            .unwrap_or(header::HeaderValue::from_static("http://localhost:5173"));
        let cors = CorsLayer::new()
            .allow_origin(hv)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);
        app.layer(cors)
    } else {
        app
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn add_request_id(
    mut req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<AxumResponse, AppError> {
    let hdr = HeaderName::from_static("x-request-id");
    // Use provided x-request-id if present, else generate
    let rid = req
        .headers()
        .get(&hdr)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    req.extensions_mut().insert(ReqId(rid.clone()));
    let mut resp = next.run(req).await;
    if let Ok(hv) = HeaderValue::from_str(&rid) {
        resp.headers_mut().insert(hdr, hv);
    }
    Ok(resp)
}

/// Paths whose responses must never be cached.
fn is_private_path(path: &str) -> bool {
    path == "/healthz"
        || path == "/api"
        || path.starts_with("/api/")
        || aset_anak_shared::path::classify(path) != aset_anak_shared::path::PageAccess::Public
}

async fn add_security_headers(
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<AxumResponse, AppError> {
    let path = req.uri().path().to_string();
    let mut resp = next.run(req).await;

    let headers = resp.headers_mut();
    headers.insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("DENY"),
    );
    headers.insert(
        HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("same-origin"),
    );
    headers.insert(
        HeaderName::from_static("content-security-policy"),
        HeaderValue::from_static("default-src 'self'; form-action 'self'; frame-ancestors 'none'"),
    );
    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin"),
    );
    // HSTS is only honored on HTTPS; harmless otherwise
    headers.insert(
        HeaderName::from_static("strict-transport-security"),
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );

    if is_private_path(&path) {
        headers.insert(
            HeaderName::from_static("cache-control"),
            HeaderValue::from_static("no-store, no-cache, must-revalidate, private"),
        );
        headers.insert(
            HeaderName::from_static("pragma"),
            HeaderValue::from_static("no-cache"),
        );
    }

    Ok(resp)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized,
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl AppError {
    fn unauthorized() -> Self {
        Self::Unauthorized
    }
    fn internal<E: std::fmt::Display>(e: E) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(e) => AppError::BadRequest(e.to_string()),
            ServiceError::NotFound(m) => AppError::NotFound(m),
            ServiceError::Remote(remote) => match remote {
                RemoteError::InvalidCredentials => AppError::Unauthorized,
                RemoteError::EmailTaken => AppError::Conflict(remote.to_string()),
                RemoteError::RegistrationClosed => AppError::Forbidden(remote.to_string()),
                RemoteError::Storage(_) | RemoteError::Token(_) | RemoteError::Hash(_) => {
                    AppError::internal(remote)
                }
            },
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, msg, kind, detail) = match self {
            AppError::BadRequest(m) => (StatusCode::BAD_REQUEST, m, "bad_request", None),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized".into(),
                "unauthorized",
                None,
            ),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, m, "forbidden", None),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, m, "not_found", None),
            AppError::Conflict(m) => (StatusCode::CONFLICT, m, "conflict", None),
            // Do not leak internal error details to clients, but log them
            AppError::Internal(m) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".into(),
                "internal",
                Some(m),
            ),
        };
        if let Some(detail) = detail {
            tracing::error!(status = %status, kind = kind, message = %msg, detail = %detail, "request failed");
        } else {
            tracing::warn!(status = %status, kind = kind, message = %msg, "request rejected");
        }
        let body = axum::Json(ErrorBody { error: msg });
        (status, body).into_response()
    }
}
