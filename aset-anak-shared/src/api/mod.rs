use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::age::Age;
use crate::domain::{
    AssetView, Category, CategoryKind, ChildSummary, Holding,
};
use crate::money::format_ringgit;
use crate::totals::{GoldDisplay, compute_grand_total, derive_gold_display};

pub const API_V1_PREFIX: &str = "/api/v1";

pub fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A number that clients may send either as JSON number or as text
/// (e.g. `"1,250.00"`). Parsing and range checks happen server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberInput {
    Number(serde_json::Number),
    Text(String),
}

impl NumberInput {
    pub fn as_text(&self) -> String {
        match self {
            NumberInput::Number(n) => n.to_string(),
            NumberInput::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for NumberInput {
    fn from(value: &str) -> Self {
        NumberInput::Text(value.to_string())
    }
}

// Auth
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthReq {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResp {
    pub token: String,
    pub user_id: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeDto {
    pub user_id: String,
    pub email: String,
}

// Categories
#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryDto {
    pub id: String,
    pub name: String,
    pub kind: CategoryKind,
    pub created_at: String, // RFC3339 UTC
}

impl From<&Category> for CategoryDto {
    fn from(c: &Category) -> Self {
        CategoryDto {
            id: c.id.to_string(),
            name: c.name.clone(),
            kind: c.kind(),
            created_at: rfc3339(c.created_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCategoryReq {
    pub name: String,
}

// Children
#[derive(Debug, Serialize, Deserialize)]
pub struct ChildDto {
    pub id: String,
    pub name: String,
    pub birthdate: Option<NaiveDate>,
    pub age: Option<Age>,
    pub created_at: String,
    pub total: Decimal,
    pub total_label: String,
    pub asset_count: usize,
}

impl From<&ChildSummary> for ChildDto {
    fn from(s: &ChildSummary) -> Self {
        ChildDto {
            id: s.child.id.to_string(),
            name: s.child.name.clone(),
            birthdate: s.child.birthdate,
            age: s.age,
            created_at: rfc3339(s.child.created_at),
            total: s.totals.per_child_total,
            total_label: format_ringgit(s.totals.per_child_total),
            asset_count: s.totals.asset_count,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateChildReq {
    pub name: String,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub birthdate: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardDto {
    pub children: Vec<ChildDto>,
    pub grand_total: Decimal,
    pub grand_total_label: String,
}

impl From<&[ChildSummary]> for DashboardDto {
    fn from(children: &[ChildSummary]) -> Self {
        let grand_total = compute_grand_total(children);
        DashboardDto {
            children: children.iter().map(ChildDto::from).collect(),
            grand_total,
            grand_total_label: format_ringgit(grand_total),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChildDetailDto {
    pub child: ChildDto,
    pub assets: Vec<AssetDto>,
}

// Assets
#[derive(Debug, Serialize, Deserialize)]
pub struct AssetDto {
    pub id: String,
    pub child_id: String,
    pub category_id: String,
    /// `None` when the category was deleted after the asset was recorded.
    pub category_name: Option<String>,
    pub amount: Decimal,
    pub amount_label: String,
    pub note: Option<String>,
    pub holding: Holding,
    pub gold: Option<GoldDisplay>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<&AssetView> for AssetDto {
    fn from(a: &AssetView) -> Self {
        AssetDto {
            id: a.id.to_string(),
            child_id: a.child_id.to_string(),
            category_id: a.category_id.to_string(),
            category_name: a.category_name.clone(),
            amount: a.amount,
            amount_label: format_ringgit(a.amount),
            note: a.note.clone(),
            holding: a.holding.clone(),
            gold: derive_gold_display(a),
            created_at: rfc3339(a.created_at),
            updated_at: a.updated_at.map(rfc3339),
        }
    }
}

/// Gold fields as entered; `type` is the purity code.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoldInput {
    #[serde(default)]
    pub weight: Option<NumberInput>,
    #[serde(rename = "type", default)]
    pub purity: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateAssetReq {
    pub category_id: String,
    pub amount: NumberInput,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub metadata: Option<GoldInput>,
}

/// Omitted `note`/`metadata` are left unchanged; an empty note clears it.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateAssetReq {
    pub amount: NumberInput,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub metadata: Option<GoldInput>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteChildResp {
    pub deleted_assets: usize,
}
