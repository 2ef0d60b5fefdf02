use std::collections::HashMap;
use std::sync::Arc;

use aset_anak_shared::age::age_from_birthdate;
use aset_anak_shared::domain::{AssetView, Child, ChildId, ChildSummary, UserId};
use aset_anak_shared::totals::compute_totals;
use aset_anak_shared::validate;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::info;

use super::ServiceError;
use crate::storage::{NewChild, Store};

#[derive(Clone)]
pub struct ChildDirectory {
    store: Arc<dyn Store>,
    timezone: Tz,
}

impl ChildDirectory {
    pub fn new(store: Arc<dyn Store>, timezone: Tz) -> Self {
        Self { store, timezone }
    }

    /// Calendar date "today" in the configured timezone; ages and birthdate
    /// checks use it.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }

    /// `dd/mm/yyyy` in the configured timezone.
    pub fn local_date(&self, ts: DateTime<Utc>) -> String {
        ts.with_timezone(&self.timezone).format("%d/%m/%Y").to_string()
    }

    pub fn summarize(&self, child: Child, assets: &[AssetView]) -> ChildSummary {
        let age = child
            .birthdate
            .and_then(|b| age_from_birthdate(b, self.today()));
        ChildSummary {
            totals: compute_totals(assets),
            age,
            child,
        }
    }

    /// Newest first, with totals. All assets come from a single store read.
    pub async fn list(&self, owner: &UserId) -> Result<Vec<ChildSummary>, ServiceError> {
        let children = self.store.list_children(owner).await?;
        let mut by_child: HashMap<ChildId, Vec<AssetView>> = HashMap::new();
        for record in self.store.list_assets_for_owner(owner).await? {
            let view = AssetView::from(record);
            by_child.entry(view.child_id.clone()).or_default().push(view);
        }
        Ok(children
            .into_iter()
            .map(|child| {
                let assets = by_child.remove(&child.id).unwrap_or_default();
                self.summarize(child, &assets)
            })
            .collect())
    }

    pub async fn get(&self, owner: &UserId, id: &ChildId) -> Result<Child, ServiceError> {
        self.store
            .get_child(owner, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("child {}", id)))
    }

    /// The child with its assets (newest first) and totals.
    pub async fn detail(
        &self,
        owner: &UserId,
        id: &ChildId,
    ) -> Result<(ChildSummary, Vec<AssetView>), ServiceError> {
        let child = self.get(owner, id).await?;
        let assets: Vec<AssetView> = self
            .store
            .list_assets_for_child(owner, id)
            .await?
            .into_iter()
            .map(AssetView::from)
            .collect();
        Ok((self.summarize(child, &assets), assets))
    }

    pub async fn create(
        &self,
        owner: &UserId,
        name: &str,
        birthdate: Option<&str>,
    ) -> Result<Child, ServiceError> {
        let name = validate::child_name(name)?;
        let birthdate = validate::birthdate(birthdate, self.today())?;
        let child = self
            .store
            .insert_child(owner, NewChild { name, birthdate })
            .await?;
        info!(user_id = %owner, child_id = %child.id, name = %child.name, "child created");
        Ok(child)
    }

    /// Removes the child together with its assets. Returns how many assets
    /// went with it.
    pub async fn delete(&self, owner: &UserId, id: &ChildId) -> Result<usize, ServiceError> {
        let removed = self
            .store
            .delete_child_cascade(owner, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("child {}", id)))?;
        info!(user_id = %owner, child_id = %id, removed_assets = removed, "child deleted");
        Ok(removed)
    }
}
