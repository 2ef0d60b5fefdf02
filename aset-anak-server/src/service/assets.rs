use std::sync::Arc;

use aset_anak_shared::domain::{
    AssetId, AssetRecord, AssetView, Category, ChildId, GoldMetadata, GoldPurity, Holding, UserId,
};
use aset_anak_shared::validate::{self, ValidationError};
use tracing::info;

use super::ServiceError;
use crate::storage::{AssetPatch, NewAsset, Store};

/// Gold sub-fields exactly as entered. Blank strings count as missing.
#[derive(Debug, Clone, Default)]
pub struct GoldFields {
    pub weight: Option<String>,
    pub purity: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AssetInput {
    pub amount: String,
    pub note: Option<String>,
    pub gold: Option<GoldFields>,
}

/// `note: None` keeps the stored note, `Some("")` clears it. `gold: None`
/// keeps the stored metadata.
#[derive(Debug, Clone, Default)]
pub struct AssetUpdate {
    pub amount: String,
    pub note: Option<String>,
    pub gold: Option<GoldFields>,
}

#[derive(Clone)]
pub struct AssetAggregator {
    store: Arc<dyn Store>,
}

impl AssetAggregator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Newest first. Fails when the child is not the caller's.
    pub async fn list_for_child(
        &self,
        owner: &UserId,
        child_id: &ChildId,
    ) -> Result<Vec<AssetView>, ServiceError> {
        if self.store.get_child(owner, child_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!("child {}", child_id)));
        }
        let records = self.store.list_assets_for_child(owner, child_id).await?;
        Ok(records.into_iter().map(AssetView::from).collect())
    }

    pub async fn get(&self, owner: &UserId, id: &AssetId) -> Result<AssetView, ServiceError> {
        self.store
            .get_asset(owner, id)
            .await?
            .map(AssetView::from)
            .ok_or_else(|| ServiceError::NotFound(format!("asset {}", id)))
    }

    /// `category` must already be resolved for `owner`. Nothing is sent to
    /// the store unless the input validates.
    pub async fn create_asset(
        &self,
        owner: &UserId,
        child_id: &ChildId,
        category: &Category,
        input: AssetInput,
    ) -> Result<AssetView, ServiceError> {
        let amount = validate::parse_amount(&input.amount)?;
        let note = validate::note(input.note.as_deref());
        let metadata = if category.kind().is_gold() {
            let gold = input.gold.unwrap_or_default();
            Some(validate::gold_metadata(
                gold.weight.as_deref(),
                gold.purity.as_deref(),
            )?)
        } else {
            None
        };

        let asset = self
            .store
            .insert_asset(
                owner,
                NewAsset {
                    child_id: child_id.clone(),
                    category_id: category.id.clone(),
                    amount,
                    note,
                    metadata,
                },
            )
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("child {}", child_id)))?;
        info!(
            user_id = %owner,
            child_id = %child_id,
            asset_id = %asset.id,
            category = %category.name,
            amount = %asset.amount,
            "asset created"
        );
        Ok(AssetView::from(AssetRecord {
            asset,
            category: Some(category.clone()),
        }))
    }

    /// Applies `update` to `current`, which the caller loaded for `owner`.
    pub async fn update_asset(
        &self,
        owner: &UserId,
        current: &AssetView,
        update: AssetUpdate,
    ) -> Result<AssetView, ServiceError> {
        let amount = validate::parse_amount(&update.amount)?;
        let note = update.note.as_deref().map(|n| validate::note(Some(n)));
        let metadata = match &current.holding {
            Holding::Gold { metadata } => merge_gold(update.gold.as_ref(), metadata.as_ref())?,
            _ => None,
        };

        let asset = self
            .store
            .update_asset(
                owner,
                &current.id,
                AssetPatch {
                    amount,
                    note,
                    metadata,
                },
            )
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("asset {}", current.id)))?;
        info!(user_id = %owner, asset_id = %asset.id, amount = %asset.amount, "asset updated");

        let holding = match &current.holding {
            Holding::Gold { .. } => Holding::Gold {
                metadata: asset.metadata.clone(),
            },
            other => other.clone(),
        };
        Ok(AssetView {
            id: asset.id,
            child_id: asset.child_id,
            category_id: asset.category_id,
            category_name: current.category_name.clone(),
            amount: asset.amount,
            note: asset.note,
            holding,
            created_at: asset.created_at,
            updated_at: asset.updated_at,
        })
    }

    pub async fn delete_asset(&self, owner: &UserId, id: &AssetId) -> Result<(), ServiceError> {
        if !self.store.delete_asset(owner, id).await? {
            return Err(ServiceError::NotFound(format!("asset {}", id)));
        }
        info!(user_id = %owner, asset_id = %id, "asset deleted");
        Ok(())
    }
}

fn filled(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

/// Metadata to write for a gold asset, or `None` to keep the stored one.
/// Missing fields fall back to the stored values; a weight is required from
/// one side or the other.
fn merge_gold(
    fields: Option<&GoldFields>,
    existing: Option<&GoldMetadata>,
) -> Result<Option<GoldMetadata>, ValidationError> {
    let existing_weight = existing.and_then(|m| m.weight);
    let Some(fields) = fields else {
        return match existing_weight {
            Some(_) => Ok(None),
            None => Err(ValidationError::MissingGoldWeight),
        };
    };

    let purity = filled(fields.purity.as_ref())
        .map(GoldPurity::from_code)
        .or_else(|| existing.and_then(|m| m.purity.clone()))
        .unwrap_or_default();
    let weight = match filled(fields.weight.as_ref()) {
        Some(w) => validate::parse_weight(w)?,
        None => existing_weight.ok_or(ValidationError::MissingGoldWeight)?,
    };
    Ok(Some(GoldMetadata {
        weight: Some(weight),
        purity: Some(purity),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn fields(weight: Option<&str>, purity: Option<&str>) -> GoldFields {
        GoldFields {
            weight: weight.map(str::to_string),
            purity: purity.map(str::to_string),
        }
    }

    #[test]
    fn merge_keeps_existing_weight_when_blank() {
        let existing = GoldMetadata {
            weight: Some(Decimal::new(5000, 3)),
            purity: Some(GoldPurity::Grade916),
        };
        let merged = merge_gold(Some(&fields(Some(" "), None)), Some(&existing))
            .unwrap()
            .unwrap();
        assert_eq!(merged, existing);

        let merged = merge_gold(Some(&fields(Some("7.25"), Some("750"))), Some(&existing))
            .unwrap()
            .unwrap();
        assert_eq!(merged.weight, Some(Decimal::new(7250, 3)));
        assert_eq!(merged.purity, Some(GoldPurity::Grade750));

        assert_eq!(merge_gold(None, Some(&existing)), Ok(None));
    }

    #[test]
    fn merge_requires_a_weight_from_somewhere() {
        assert_eq!(
            merge_gold(Some(&fields(None, Some("916"))), None),
            Err(ValidationError::MissingGoldWeight)
        );
        assert_eq!(
            merge_gold(None, Some(&GoldMetadata::default())),
            Err(ValidationError::MissingGoldWeight)
        );
    }
}
