use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{AssetView, ChildSummary};
use crate::money::format_weight;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AssetTotals {
    pub per_child_total: Decimal,
    pub asset_count: usize,
}

/// Sum of asset amounts; an empty slice totals zero.
pub fn compute_totals(assets: &[AssetView]) -> AssetTotals {
    AssetTotals {
        per_child_total: assets.iter().map(|a| a.amount).sum(),
        asset_count: assets.len(),
    }
}

/// Sum of every child's total.
pub fn compute_grand_total(children: &[ChildSummary]) -> Decimal {
    children.iter().map(|c| c.totals.per_child_total).sum()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldDisplay {
    pub weight_label: String,
    pub purity_label: String,
}

const MISSING: &str = "-";

/// Weight and purity labels for gold assets that carry metadata.
pub fn derive_gold_display(asset: &AssetView) -> Option<GoldDisplay> {
    let metadata = asset.holding.gold_metadata()?;
    Some(GoldDisplay {
        weight_label: metadata
            .weight
            .map(format_weight)
            .unwrap_or_else(|| MISSING.to_string()),
        purity_label: metadata
            .purity
            .as_ref()
            .map(|p| p.label())
            .unwrap_or_else(|| MISSING.to_string()),
    })
}
