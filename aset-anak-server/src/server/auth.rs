use aset_anak_shared::path;
use axum::http::{HeaderMap, Request, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use tracing::{Span, debug};

use super::{AppError, AppState};
use crate::service::Identity;

pub const SESSION_COOKIE: &str = "aset_anak_session";

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Value of the session cookie, if the request carries one.
pub fn cookie_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
        .filter(|v| !v.is_empty())
}

pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn clear_session_cookie(secure: bool) -> String {
    session_cookie("", 0, secure)
}

fn record_identity(identity: &Identity) {
    Span::current().record("user_id", tracing::field::display(&identity.user_id));
}

/// API guard: a valid bearer token or 401.
pub async fn require_bearer(
    axum::extract::State(state): axum::extract::State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers());
    let identity = state
        .sessions
        .current_identity(token)
        .await
        .ok_or_else(AppError::unauthorized)?;
    record_identity(&identity);
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Page guard: resolves the cookie session and redirects visitors who may
/// not see the requested page.
pub async fn page_gate(
    axum::extract::State(state): axum::extract::State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = cookie_token(req.headers()).map(str::to_string);
    let identity = state.sessions.current_identity(token.as_deref()).await;
    let requested = req.uri().path().to_string();
    if let Some(target) = path::redirect_for(&requested, identity.is_some()) {
        debug!(path = %requested, target, "gate: redirecting");
        return Redirect::to(target).into_response();
    }
    if let Some(identity) = identity {
        record_identity(&identity);
        req.extensions_mut().insert(identity);
    }
    next.run(req).await
}
