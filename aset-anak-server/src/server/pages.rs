//! Server-rendered pages. Every form posts, then redirects back with a
//! `?notice=` banner code.

use aset_anak_shared::domain::{
    AssetId, AssetView, CategoryId, CategoryKind, ChildId, ChildSummary, GoldPurity, Holding,
};
use aset_anak_shared::money::format_ringgit;
use aset_anak_shared::path::{self, DASHBOARD_PAGE, LOGIN_PAGE, REGISTER_PAGE, SETTINGS_PAGE};
use aset_anak_shared::totals::{GoldDisplay, compute_grand_total, derive_gold_display};
use aset_anak_shared::validate::{self, ValidationError};
use axum::{
    Form,
    extract::{Extension, Path, Query, State},
    http::{HeaderMap, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tinytemplate::TinyTemplate;
use tracing::{error, warn};

use super::auth::{clear_session_cookie, cookie_token, session_cookie};
use super::notice::{Notice, NoticeView};
use super::{AppError, AppState};
use crate::service::{
    AssetInput, AssetUpdate, ChildDirectory, GoldFields, Identity, ServiceError, SignedIn,
};

pub const STYLESHEET_PATH: &str = "/static/app.css";

const STYLESHEET: &str = include_str!("../../templates/app.css");

const TEMPLATES: [(&str, &str); 8] = [
    ("header", include_str!("../../templates/header.html")),
    ("footer", include_str!("../../templates/footer.html")),
    ("home", include_str!("../../templates/home.html")),
    ("login", include_str!("../../templates/login.html")),
    ("register", include_str!("../../templates/register.html")),
    ("dashboard", include_str!("../../templates/dashboard.html")),
    ("child", include_str!("../../templates/child.html")),
    ("settings", include_str!("../../templates/settings.html")),
];

thread_local! {
    // TinyTemplate is not Sync, so each worker thread registers its own copy once.
    static REGISTRY: Result<TinyTemplate<'static>, String> = build_registry();
}

fn build_registry() -> Result<TinyTemplate<'static>, String> {
    let mut tt = TinyTemplate::new();
    for (template_name, text) in TEMPLATES {
        tt.add_template(template_name, text)
            .map_err(|e| format!("template {template_name}: {e}"))?;
    }
    Ok(tt)
}

fn render<T: Serialize>(name: &str, ctx: &T) -> Result<Html<String>, AppError> {
    REGISTRY.with(|registry| {
        let tt = registry.as_ref().map_err(AppError::internal)?;
        tt.render(name, ctx)
            .map(Html)
            .map_err(|e| AppError::internal(format!("render {name}: {e}")))
    })
}

pub(super) async fn stylesheet() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], STYLESHEET)
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct NoticeQuery {
    #[serde(default)]
    notice: Option<String>,
}

impl NoticeQuery {
    fn view(&self) -> Option<NoticeView> {
        self.notice
            .as_deref()
            .and_then(Notice::from_code)
            .map(Notice::view)
    }
}

#[derive(Serialize)]
struct Layout {
    title: &'static str,
    signed_in: bool,
    notice: Option<NoticeView>,
}

impl Layout {
    fn new(title: &'static str, signed_in: bool, query: &NoticeQuery) -> Self {
        Self {
            title,
            signed_in,
            notice: query.view(),
        }
    }
}

#[derive(Serialize)]
struct SimplePage {
    layout: Layout,
}

fn back_to(path: &str, notice: Notice) -> Response {
    Redirect::to(&notice.redirect_url(path)).into_response()
}

/// Banner for a failed action; unexpected failures are logged here.
fn failure(err: &ServiceError, fallback: Notice) -> Notice {
    if matches!(err, ServiceError::Remote(_)) {
        error!(error = %err, "page action failed");
    } else {
        warn!(error = %err, "page action rejected");
    }
    Notice::for_error(err, fallback)
}

fn confirmed(confirm: Option<&str>) -> Result<(), ValidationError> {
    match confirm {
        Some("yes") => Ok(()),
        _ => Err(ValidationError::ConfirmationRequired),
    }
}

fn signed_in_redirect(state: &AppState, signed_in: &SignedIn, notice: Option<Notice>) -> Response {
    let max_age = state.config.token_ttl_days * 24 * 60 * 60;
    let cookie = session_cookie(&signed_in.token, max_age, state.config.secure_cookies);
    let target = match notice {
        Some(n) => n.redirect_url(DASHBOARD_PAGE),
        None => DASHBOARD_PAGE.to_string(),
    };
    ([(header::SET_COOKIE, cookie)], Redirect::to(&target)).into_response()
}

pub(super) async fn home(
    identity: Option<Extension<Identity>>,
    Query(q): Query<NoticeQuery>,
) -> Result<Html<String>, AppError> {
    render(
        "home",
        &SimplePage {
            layout: Layout::new("Utama", identity.is_some(), &q),
        },
    )
}

// Auth pages

#[derive(Debug, Deserialize)]
pub(super) struct LoginForm {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct RegisterForm {
    email: String,
    password: String,
    confirm_password: String,
}

pub(super) async fn login_page(Query(q): Query<NoticeQuery>) -> Result<Html<String>, AppError> {
    render(
        "login",
        &SimplePage {
            layout: Layout::new("Log Masuk", false, &q),
        },
    )
}

pub(super) async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    match state.sessions.sign_in(&form.email, &form.password).await {
        Ok(signed_in) => signed_in_redirect(&state, &signed_in, None),
        Err(e) => back_to(LOGIN_PAGE, failure(&e, Notice::LoginFailed)),
    }
}

pub(super) async fn register_page(Query(q): Query<NoticeQuery>) -> Result<Html<String>, AppError> {
    render(
        "register",
        &SimplePage {
            layout: Layout::new("Daftar Akaun", false, &q),
        },
    )
}

pub(super) async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Response {
    // Checked before anything reaches the gate
    if validate::password_confirmation(&form.password, &form.confirm_password).is_err() {
        return back_to(REGISTER_PAGE, Notice::PasswordMismatch);
    }
    match state.sessions.sign_up(&form.email, &form.password).await {
        Ok(signed_in) => signed_in_redirect(&state, &signed_in, Some(Notice::Registered)),
        Err(e) => back_to(REGISTER_PAGE, failure(&e, Notice::RegisterFailed)),
    }
}

pub(super) async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> Response {
    state.sessions.sign_out(cookie_token(&headers)).await;
    (
        [(
            header::SET_COOKIE,
            clear_session_cookie(state.config.secure_cookies),
        )],
        Redirect::to(LOGIN_PAGE),
    )
        .into_response()
}

// Dashboard

#[derive(Serialize)]
struct ChildCard {
    id: String,
    name: String,
    url: String,
    delete_url: String,
    assets_url: String,
    birthdate: Option<String>,
    age_label: Option<String>,
    total_label: String,
    asset_count: usize,
}

impl From<&ChildSummary> for ChildCard {
    fn from(s: &ChildSummary) -> Self {
        let url = path::child_page(s.child.id.as_str());
        ChildCard {
            id: s.child.id.to_string(),
            name: s.child.name.clone(),
            delete_url: format!("{}/delete", url),
            assets_url: format!("{}/assets", url),
            url,
            birthdate: s.child.birthdate.map(|d| d.format("%d/%m/%Y").to_string()),
            age_label: s.age.map(|a| a.to_string()),
            total_label: format_ringgit(s.totals.per_child_total),
            asset_count: s.totals.asset_count,
        }
    }
}

#[derive(Serialize)]
struct DashboardPage {
    layout: Layout,
    children: Vec<ChildCard>,
    has_children: bool,
    grand_total_label: String,
    today: String,
}

pub(super) async fn dashboard(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(mut q): Query<NoticeQuery>,
) -> Result<Html<String>, AppError> {
    let summaries = match state.children.list(&identity.user_id).await {
        Ok(s) => s,
        Err(e) => {
            q.notice = Some(failure(&e, Notice::LoadFailed).code().to_string());
            Vec::new()
        }
    };
    let children: Vec<ChildCard> = summaries.iter().map(ChildCard::from).collect();
    render(
        "dashboard",
        &DashboardPage {
            layout: Layout::new("Dashboard", true, &q),
            has_children: !children.is_empty(),
            children,
            grand_total_label: format_ringgit(compute_grand_total(&summaries)),
            today: state.children.today().format("%Y-%m-%d").to_string(),
        },
    )
}

#[derive(Debug, Deserialize)]
pub(super) struct ChildForm {
    name: String,
    #[serde(default)]
    birthdate: Option<String>,
}

pub(super) async fn create_child(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<ChildForm>,
) -> Response {
    match state
        .children
        .create(&identity.user_id, &form.name, form.birthdate.as_deref())
        .await
    {
        Ok(child) => back_to(&path::child_page(child.id.as_str()), Notice::ChildAdded),
        Err(e) => back_to(DASHBOARD_PAGE, failure(&e, Notice::ChildAddFailed)),
    }
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ConfirmForm {
    #[serde(default)]
    confirm: Option<String>,
}

pub(super) async fn delete_child(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(child_id): Path<String>,
    Form(form): Form<ConfirmForm>,
) -> Response {
    let child_url = path::child_page(&child_id);
    if let Err(e) = confirmed(form.confirm.as_deref()) {
        return back_to(&child_url, failure(&ServiceError::from(e), Notice::ChildDeleteFailed));
    }
    match state
        .children
        .delete(&identity.user_id, &ChildId::from(child_id))
        .await
    {
        Ok(_) => back_to(DASHBOARD_PAGE, Notice::ChildDeleted),
        Err(ServiceError::NotFound(_)) => back_to(DASHBOARD_PAGE, Notice::ChildNotFound),
        Err(e) => back_to(&child_url, failure(&e, Notice::ChildDeleteFailed)),
    }
}

// Child page

#[derive(Serialize)]
struct PurityOption {
    code: String,
    label: String,
    selected: bool,
}

fn purity_options(selected: Option<&GoldPurity>) -> Vec<PurityOption> {
    let selected = selected.cloned().unwrap_or_default();
    GoldPurity::KNOWN
        .iter()
        .map(|p| PurityOption {
            code: p.code().to_string(),
            label: p.label(),
            selected: *p == selected,
        })
        .collect()
}

#[derive(Serialize)]
struct AssetItem {
    id: String,
    category_label: String,
    amount_label: String,
    amount_plain: String,
    note: Option<String>,
    created_label: String,
    is_gold: bool,
    gold: Option<GoldDisplay>,
    weight_plain: Option<String>,
    purities: Vec<PurityOption>,
    edit_url: String,
    delete_url: String,
}

impl AssetItem {
    fn new(asset: &AssetView, children: &ChildDirectory) -> Self {
        let gold_meta = asset.holding.gold_metadata();
        let is_gold = matches!(asset.holding, Holding::Gold { .. });
        let edit_url = path::asset_action(asset.child_id.as_str(), asset.id.as_str());
        AssetItem {
            id: asset.id.to_string(),
            category_label: asset
                .category_name
                .clone()
                .unwrap_or_else(|| "Tanpa kategori".to_string()),
            amount_label: format_ringgit(asset.amount),
            amount_plain: asset.amount.to_string(),
            note: asset.note.clone(),
            created_label: children.local_date(asset.created_at),
            is_gold,
            gold: derive_gold_display(asset),
            weight_plain: gold_meta.and_then(|m| m.weight).map(|w| w.to_string()),
            purities: purity_options(gold_meta.and_then(|m| m.purity.as_ref())),
            delete_url: format!("{}/delete", edit_url),
            edit_url,
        }
    }
}

#[derive(Serialize)]
struct CategoryOption {
    id: String,
    name: String,
}

#[derive(Serialize)]
struct ChildPage {
    layout: Layout,
    child: ChildCard,
    assets: Vec<AssetItem>,
    has_assets: bool,
    categories: Vec<CategoryOption>,
    has_categories: bool,
    purities: Vec<PurityOption>,
}

pub(super) async fn child_page(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(child_id): Path<String>,
    Query(q): Query<NoticeQuery>,
) -> Result<Response, AppError> {
    let owner = &identity.user_id;
    let (summary, assets) = match state.children.detail(owner, &ChildId::from(child_id)).await {
        Ok(v) => v,
        Err(ServiceError::NotFound(_)) => {
            return Ok(back_to(DASHBOARD_PAGE, Notice::ChildNotFound));
        }
        Err(e) => {
            error!(error = %e, "child page: load failed");
            return Ok(back_to(DASHBOARD_PAGE, Notice::LoadFailed));
        }
    };
    let categories = match state.categories.list(owner).await {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "child page: categories failed");
            Vec::new()
        }
    };
    let card = ChildCard::from(&summary);
    let rows: Vec<AssetItem> = assets
        .iter()
        .map(|a| AssetItem::new(a, &state.children))
        .collect();
    let page = ChildPage {
        layout: Layout::new("Profil Anak", true, &q),
        has_assets: !rows.is_empty(),
        assets: rows,
        has_categories: !categories.is_empty(),
        categories: categories
            .into_iter()
            .map(|c| CategoryOption {
                id: c.id.to_string(),
                name: c.name,
            })
            .collect(),
        purities: purity_options(None),
        child: card,
    };
    Ok(render("child", &page)?.into_response())
}

#[derive(Debug, Deserialize)]
pub(super) struct AssetForm {
    #[serde(default)]
    category_id: String,
    amount: String,
    #[serde(default)]
    note: Option<String>,
    #[serde(default)]
    weight: Option<String>,
    #[serde(default)]
    purity: Option<String>,
}

impl AssetForm {
    fn gold(&self) -> Option<GoldFields> {
        if self.weight.is_none() && self.purity.is_none() {
            return None;
        }
        Some(GoldFields {
            weight: self.weight.clone(),
            purity: self.purity.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct AssetPath {
    child_id: String,
    asset_id: String,
}

pub(super) async fn create_asset(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(child_id): Path<String>,
    Form(form): Form<AssetForm>,
) -> Response {
    let owner = &identity.user_id;
    let child_url = path::child_page(&child_id);
    if let Err(e) = validate::parse_amount(&form.amount) {
        return back_to(&child_url, failure(&ServiceError::from(e), Notice::AssetAddFailed));
    }
    let category = match state
        .categories
        .get(owner, &CategoryId::from(form.category_id.as_str()))
        .await
    {
        Ok(c) => c,
        Err(e) => return back_to(&child_url, failure(&e, Notice::AssetAddFailed)),
    };
    let input = AssetInput {
        gold: form.gold(),
        amount: form.amount,
        note: form.note,
    };
    match state
        .assets
        .create_asset(owner, &ChildId::from(child_id), &category, input)
        .await
    {
        Ok(_) => back_to(&child_url, Notice::AssetAdded),
        Err(e) => back_to(&child_url, failure(&e, Notice::AssetAddFailed)),
    }
}

pub(super) async fn update_asset(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(p): Path<AssetPath>,
    Form(form): Form<AssetForm>,
) -> Response {
    let owner = &identity.user_id;
    let child_url = path::child_page(&p.child_id);
    let current = match state.assets.get(owner, &AssetId::from(p.asset_id)).await {
        Ok(a) if a.child_id.as_str() == p.child_id => a,
        Ok(_) => return back_to(&child_url, Notice::AssetUpdateFailed),
        Err(e) => return back_to(&child_url, failure(&e, Notice::AssetUpdateFailed)),
    };
    let update = AssetUpdate {
        gold: form.gold(),
        amount: form.amount,
        // The edit form always carries the note field; blank clears it.
        note: Some(form.note.unwrap_or_default()),
    };
    match state.assets.update_asset(owner, &current, update).await {
        Ok(_) => back_to(&child_url, Notice::AssetUpdated),
        Err(e) => back_to(&child_url, failure(&e, Notice::AssetUpdateFailed)),
    }
}

pub(super) async fn delete_asset(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(p): Path<AssetPath>,
    Form(form): Form<ConfirmForm>,
) -> Response {
    let owner = &identity.user_id;
    let child_url = path::child_page(&p.child_id);
    if let Err(e) = confirmed(form.confirm.as_deref()) {
        return back_to(&child_url, failure(&ServiceError::from(e), Notice::AssetDeleteFailed));
    }
    let asset_id = AssetId::from(p.asset_id);
    match state.assets.get(owner, &asset_id).await {
        Ok(a) if a.child_id.as_str() == p.child_id => {}
        Ok(_) => return back_to(&child_url, Notice::AssetDeleteFailed),
        Err(e) => return back_to(&child_url, failure(&e, Notice::AssetDeleteFailed)),
    }
    match state.assets.delete_asset(owner, &asset_id).await {
        Ok(()) => back_to(&child_url, Notice::AssetDeleted),
        Err(e) => back_to(&child_url, failure(&e, Notice::AssetDeleteFailed)),
    }
}

// Settings

#[derive(Serialize)]
struct CategoryItem {
    name: String,
    kind_label: &'static str,
    delete_url: String,
}

fn kind_label(kind: CategoryKind) -> &'static str {
    match kind {
        CategoryKind::Gold => "(berat dan jenis emas direkodkan)",
        CategoryKind::Cash => "(wang tunai)",
        CategoryKind::Generic => "",
    }
}

#[derive(Serialize)]
struct SettingsPage {
    layout: Layout,
    categories: Vec<CategoryItem>,
    has_categories: bool,
}

/// Serves both `/settings` and `/dashboard/settings`.
pub(super) async fn settings(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(mut q): Query<NoticeQuery>,
) -> Result<Html<String>, AppError> {
    let categories = match state.categories.list(&identity.user_id).await {
        Ok(c) => c,
        Err(e) => {
            q.notice = Some(failure(&e, Notice::LoadFailed).code().to_string());
            Vec::new()
        }
    };
    let items: Vec<CategoryItem> = categories
        .iter()
        .map(|c| CategoryItem {
            name: c.name.clone(),
            kind_label: kind_label(c.kind()),
            delete_url: format!("{}/delete", path::category_action(c.id.as_str())),
        })
        .collect();
    render(
        "settings",
        &SettingsPage {
            layout: Layout::new("Tetapan", true, &q),
            has_categories: !items.is_empty(),
            categories: items,
        },
    )
}

#[derive(Debug, Deserialize)]
pub(super) struct CategoryForm {
    name: String,
}

pub(super) async fn create_category(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<CategoryForm>,
) -> Response {
    match state.categories.create(&identity.user_id, &form.name).await {
        Ok(_) => back_to(SETTINGS_PAGE, Notice::CategoryAdded),
        Err(e) => back_to(SETTINGS_PAGE, failure(&e, Notice::CategoryAddFailed)),
    }
}

pub(super) async fn delete_category(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    Form(form): Form<ConfirmForm>,
) -> Response {
    if let Err(e) = confirmed(form.confirm.as_deref()) {
        return back_to(SETTINGS_PAGE, failure(&ServiceError::from(e), Notice::CategoryDeleteFailed));
    }
    match state
        .categories
        .delete(&identity.user_id, &CategoryId::from(id))
        .await
    {
        Ok(()) => back_to(SETTINGS_PAGE, Notice::CategoryDeleted),
        Err(e) => back_to(SETTINGS_PAGE, failure(&e, Notice::CategoryDeleteFailed)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(notice: Option<&str>) -> SimplePage {
        let q = NoticeQuery {
            notice: notice.map(str::to_string),
        };
        SimplePage {
            layout: Layout::new("Log Masuk", false, &q),
        }
    }

    #[test]
    fn registry_builds_every_template() {
        REGISTRY.with(|registry| assert!(registry.is_ok(), "{:?}", registry.as_ref().err()));
    }

    #[test]
    fn renders_repeatedly_from_one_registry() {
        let first = render("login", &page(Some("login-failed"))).unwrap();
        assert!(first.0.contains("Ralat semasa log masuk"));
        let second = render("login", &page(None)).unwrap();
        assert!(!second.0.contains("Ralat semasa log masuk"));
        assert!(second.0.contains("Aset Anak"));
        assert!(matches!(
            render("no-such-page", &page(None)),
            Err(AppError::Internal(_))
        ));
    }
}
