//! Page routes and the redirect rules of the session gate.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

pub const HOME_PAGE: &str = "/";
pub const LOGIN_PAGE: &str = "/login";
pub const REGISTER_PAGE: &str = "/register";
pub const DASHBOARD_PAGE: &str = "/dashboard";
pub const SETTINGS_PAGE: &str = "/settings";
pub const SIGN_OUT_ACTION: &str = "/auth/signout";

const PROTECTED_PREFIXES: [&str; 2] = [DASHBOARD_PAGE, SETTINGS_PAGE];
const AUTH_PAGES: [&str; 2] = [LOGIN_PAGE, REGISTER_PAGE];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageAccess {
    /// Reachable by anyone.
    Public,
    /// Requires an identity.
    Protected,
    /// Only for anonymous visitors (login, register).
    AnonymousOnly,
}

pub fn classify(path: &str) -> PageAccess {
    if PROTECTED_PREFIXES.iter().any(|p| under(path, p)) {
        PageAccess::Protected
    } else if AUTH_PAGES.iter().any(|p| under(path, p)) {
        PageAccess::AnonymousOnly
    } else {
        PageAccess::Public
    }
}

/// Where the gate sends a visitor, if anywhere.
pub fn redirect_for(path: &str, authenticated: bool) -> Option<&'static str> {
    match (classify(path), authenticated) {
        (PageAccess::Protected, false) => Some(LOGIN_PAGE),
        (PageAccess::AnonymousOnly, true) => Some(DASHBOARD_PAGE),
        _ => None,
    }
}

const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_');

fn enc(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

fn under(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

pub fn child_page(child_id: &str) -> String {
    format!("{}/{}", DASHBOARD_PAGE, enc(child_id))
}

/// Form target for editing an asset; `/delete` appended removes it.
pub fn asset_action(child_id: &str, asset_id: &str) -> String {
    format!("{}/assets/{}", child_page(child_id), enc(asset_id))
}

pub fn category_action(category_id: &str) -> String {
    format!("{}/categories/{}", SETTINGS_PAGE, enc(category_id))
}
