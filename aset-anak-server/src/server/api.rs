use aset_anak_shared::api::{
    self, AssetDto, AuthReq, AuthResp, CategoryDto, ChildDetailDto, ChildDto, CreateAssetReq,
    CreateCategoryReq, CreateChildReq, DashboardDto, DeleteChildResp, GoldInput, MeDto,
    UpdateAssetReq,
};
use aset_anak_shared::domain::{AssetId, CategoryId, ChildId};
use aset_anak_shared::validate;
use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
};

use super::{AppError, AppState};
use crate::service::{AssetInput, AssetUpdate, GoldFields, Identity, ServiceError, SignedIn};

impl From<&GoldInput> for GoldFields {
    fn from(g: &GoldInput) -> Self {
        GoldFields {
            weight: g.weight.as_ref().map(api::NumberInput::as_text),
            purity: g.purity.clone(),
        }
    }
}

fn auth_resp(signed_in: SignedIn) -> AuthResp {
    AuthResp {
        token: signed_in.token,
        user_id: signed_in.user.id.to_string(),
        email: signed_in.user.email,
    }
}

pub(super) async fn register(
    State(state): State<AppState>,
    Json(body): Json<AuthReq>,
) -> Result<(StatusCode, Json<AuthResp>), AppError> {
    let signed_in = state.sessions.sign_up(&body.email, &body.password).await?;
    Ok((StatusCode::CREATED, Json(auth_resp(signed_in))))
}

pub(super) async fn login(
    State(state): State<AppState>,
    Json(body): Json<AuthReq>,
) -> Result<Json<AuthResp>, AppError> {
    let signed_in = state.sessions.sign_in(&body.email, &body.password).await?;
    Ok(Json(auth_resp(signed_in)))
}

pub(super) async fn logout(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> StatusCode {
    state.sessions.end_session(&identity).await;
    StatusCode::NO_CONTENT
}

pub(super) async fn me(Extension(identity): Extension<Identity>) -> Json<MeDto> {
    Json(MeDto {
        user_id: identity.user_id.to_string(),
        email: identity.email,
    })
}

pub(super) async fn list_children(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<DashboardDto>, AppError> {
    let children = state.children.list(&identity.user_id).await?;
    Ok(Json(DashboardDto::from(children.as_slice())))
}

pub(super) async fn create_child(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<CreateChildReq>,
) -> Result<(StatusCode, Json<ChildDto>), AppError> {
    let child = state
        .children
        .create(&identity.user_id, &body.name, body.birthdate.as_deref())
        .await?;
    let summary = state.children.summarize(child, &[]);
    Ok((StatusCode::CREATED, Json(ChildDto::from(&summary))))
}

pub(super) async fn get_child(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<ChildDetailDto>, AppError> {
    let (summary, assets) = state
        .children
        .detail(&identity.user_id, &ChildId::from(id))
        .await?;
    Ok(Json(ChildDetailDto {
        child: ChildDto::from(&summary),
        assets: assets.iter().map(AssetDto::from).collect(),
    }))
}

pub(super) async fn delete_child(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<DeleteChildResp>, AppError> {
    let deleted_assets = state
        .children
        .delete(&identity.user_id, &ChildId::from(id))
        .await?;
    Ok(Json(DeleteChildResp { deleted_assets }))
}

pub(super) async fn list_assets(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<Vec<AssetDto>>, AppError> {
    let assets = state
        .assets
        .list_for_child(&identity.user_id, &ChildId::from(id))
        .await?;
    Ok(Json(assets.iter().map(AssetDto::from).collect()))
}

pub(super) async fn create_asset(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    Json(body): Json<CreateAssetReq>,
) -> Result<(StatusCode, Json<AssetDto>), AppError> {
    let owner = &identity.user_id;
    let amount = body.amount.as_text();
    // A bad amount is rejected before the category lookup
    validate::parse_amount(&amount).map_err(ServiceError::from)?;
    let category = state
        .categories
        .get(owner, &CategoryId::from(body.category_id))
        .await?;
    let input = AssetInput {
        amount,
        note: body.note,
        gold: body.metadata.as_ref().map(GoldFields::from),
    };
    let asset = state
        .assets
        .create_asset(owner, &ChildId::from(id), &category, input)
        .await?;
    Ok((StatusCode::CREATED, Json(AssetDto::from(&asset))))
}

pub(super) async fn update_asset(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    Json(body): Json<UpdateAssetReq>,
) -> Result<Json<AssetDto>, AppError> {
    let owner = &identity.user_id;
    let current = state.assets.get(owner, &AssetId::from(id)).await?;
    let update = AssetUpdate {
        amount: body.amount.as_text(),
        note: body.note,
        gold: body.metadata.as_ref().map(GoldFields::from),
    };
    let asset = state.assets.update_asset(owner, &current, update).await?;
    Ok(Json(AssetDto::from(&asset)))
}

pub(super) async fn delete_asset(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .assets
        .delete_asset(&identity.user_id, &AssetId::from(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn list_categories(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<CategoryDto>>, AppError> {
    let categories = state.categories.list(&identity.user_id).await?;
    Ok(Json(categories.iter().map(CategoryDto::from).collect()))
}

pub(super) async fn create_category(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<CreateCategoryReq>,
) -> Result<(StatusCode, Json<CategoryDto>), AppError> {
    let category = state
        .categories
        .create(&identity.user_id, &body.name)
        .await?;
    Ok((StatusCode::CREATED, Json(CategoryDto::from(&category))))
}

pub(super) async fn delete_category(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .categories
        .delete(&identity.user_id, &CategoryId::from(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
