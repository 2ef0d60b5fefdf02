use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::age::Age;
use crate::totals::AssetTotals;

/// Category name that marks gold holdings.
pub const GOLD_CATEGORY: &str = "Emas";
/// Category name that marks cash holdings.
pub const CASH_CATEGORY: &str = "Tunai";

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                $name(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                $name(value)
            }
        }

        impl FromStr for $name {
            type Err = std::convert::Infallible;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok($name(s.to_string()))
            }
        }
    };
}

string_id!(
    /// Identity issued at registration; owns children and categories.
    UserId
);
string_id!(ChildId);
string_id!(CategoryId);
string_id!(AssetId);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Child {
    pub id: ChildId,
    pub owner: UserId,
    pub name: String,
    pub birthdate: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub owner: UserId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn kind(&self) -> CategoryKind {
        CategoryKind::from_name(&self.name)
    }
}

/// What a category holds, decided from its name once per read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Cash,
    Gold,
    Generic,
}

impl CategoryKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            GOLD_CATEGORY => CategoryKind::Gold,
            CASH_CATEGORY => CategoryKind::Cash,
            _ => CategoryKind::Generic,
        }
    }

    pub fn is_gold(self) -> bool {
        self == CategoryKind::Gold
    }
}

/// Gold purity grade. Codes outside the table are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GoldPurity {
    #[default]
    Fine999,
    Grade916,
    Grade750,
    Grade585,
    Other(String),
}

impl GoldPurity {
    pub const KNOWN: [GoldPurity; 4] = [
        GoldPurity::Fine999,
        GoldPurity::Grade916,
        GoldPurity::Grade750,
        GoldPurity::Grade585,
    ];

    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "999" => GoldPurity::Fine999,
            "916" => GoldPurity::Grade916,
            "750" => GoldPurity::Grade750,
            "585" => GoldPurity::Grade585,
            other => GoldPurity::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            GoldPurity::Fine999 => "999",
            GoldPurity::Grade916 => "916",
            GoldPurity::Grade750 => "750",
            GoldPurity::Grade585 => "585",
            GoldPurity::Other(code) => code,
        }
    }

    /// Display label; unknown codes render as the raw code.
    pub fn label(&self) -> String {
        match self {
            GoldPurity::Fine999 => "Emas 999 (24K)".to_string(),
            GoldPurity::Grade916 => "Emas 916 (22K)".to_string(),
            GoldPurity::Grade750 => "Emas 750 (18K)".to_string(),
            GoldPurity::Grade585 => "Emas 585 (14K)".to_string(),
            GoldPurity::Other(code) => code.clone(),
        }
    }
}

impl From<String> for GoldPurity {
    fn from(value: String) -> Self {
        GoldPurity::from_code(&value)
    }
}

impl From<GoldPurity> for String {
    fn from(value: GoldPurity) -> Self {
        value.code().to_string()
    }
}

/// Structured sub-fields stored with gold assets.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GoldMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<Decimal>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub purity: Option<GoldPurity>,
}

/// Persisted asset row as the store sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub child_id: ChildId,
    pub category_id: CategoryId,
    pub amount: Decimal,
    pub note: Option<String>,
    pub metadata: Option<GoldMetadata>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Asset joined with its category. `category` is `None` for orphaned rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    pub asset: Asset,
    pub category: Option<Category>,
}

/// Typed view of what an asset holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Holding {
    Cash,
    Gold { metadata: Option<GoldMetadata> },
    Generic,
}

impl Holding {
    /// Metadata survives only for gold; everything else drops it.
    pub fn resolve(kind: Option<CategoryKind>, metadata: Option<GoldMetadata>) -> Self {
        match kind {
            Some(CategoryKind::Gold) => Holding::Gold { metadata },
            Some(CategoryKind::Cash) => Holding::Cash,
            Some(CategoryKind::Generic) | None => Holding::Generic,
        }
    }

    pub fn gold_metadata(&self) -> Option<&GoldMetadata> {
        match self {
            Holding::Gold { metadata } => metadata.as_ref(),
            _ => None,
        }
    }
}

/// An asset ready for aggregation and display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetView {
    pub id: AssetId,
    pub child_id: ChildId,
    pub category_id: CategoryId,
    pub category_name: Option<String>,
    pub amount: Decimal,
    pub note: Option<String>,
    pub holding: Holding,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<AssetRecord> for AssetView {
    fn from(record: AssetRecord) -> Self {
        let AssetRecord { asset, category } = record;
        let holding = Holding::resolve(category.as_ref().map(Category::kind), asset.metadata);
        AssetView {
            id: asset.id,
            child_id: asset.child_id,
            category_id: asset.category_id,
            category_name: category.map(|c| c.name),
            amount: asset.amount,
            note: asset.note,
            holding,
            created_at: asset.created_at,
            updated_at: asset.updated_at,
        }
    }
}

/// A child with the figures derived from its assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildSummary {
    pub child: Child,
    pub totals: AssetTotals,
    pub age: Option<Age>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(name: &str) -> Category {
        Category {
            id: "cat".into(),
            owner: "user".into(),
            name: name.to_string(),
            created_at: Utc::now(),
        }
    }

    fn asset_with_metadata() -> Asset {
        Asset {
            id: "a1".into(),
            child_id: "c1".into(),
            category_id: "cat".into(),
            amount: Decimal::new(12000, 2),
            note: None,
            metadata: Some(GoldMetadata {
                weight: Some(Decimal::new(2500, 3)),
                purity: Some(GoldPurity::Grade916),
            }),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn category_kind_matches_exact_names() {
        assert_eq!(CategoryKind::from_name("Emas"), CategoryKind::Gold);
        assert_eq!(CategoryKind::from_name("Tunai"), CategoryKind::Cash);
        assert_eq!(CategoryKind::from_name("emas"), CategoryKind::Generic);
        assert_eq!(CategoryKind::from_name("ASB"), CategoryKind::Generic);
    }

    #[test]
    fn metadata_is_dropped_outside_gold() {
        let view = AssetView::from(AssetRecord {
            asset: asset_with_metadata(),
            category: Some(category("ASB")),
        });
        assert_eq!(view.holding, Holding::Generic);
        assert_eq!(view.category_name.as_deref(), Some("ASB"));

        let gold = AssetView::from(AssetRecord {
            asset: asset_with_metadata(),
            category: Some(category("Emas")),
        });
        assert!(gold.holding.gold_metadata().is_some());
    }

    #[test]
    fn orphaned_asset_resolves_to_generic_without_name() {
        let view = AssetView::from(AssetRecord {
            asset: asset_with_metadata(),
            category: None,
        });
        assert_eq!(view.holding, Holding::Generic);
        assert!(view.category_name.is_none());
    }

    #[test]
    fn purity_serializes_as_code() {
        let meta = GoldMetadata {
            weight: Some(Decimal::new(1000, 3)),
            purity: Some(GoldPurity::Other("875".into())),
        };
        let text = serde_json::to_string(&meta).unwrap();
        assert!(text.contains("\"type\":\"875\""));
        let back: GoldMetadata = serde_json::from_str(r#"{"weight": 1.5, "type": "750"}"#).unwrap();
        assert_eq!(back.purity, Some(GoldPurity::Grade750));
        assert_eq!(back.weight, Some(Decimal::new(15, 1)));
    }
}
