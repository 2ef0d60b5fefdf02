use std::str::FromStr;

use aset_anak_shared::domain::{Asset, Category, Child, GoldMetadata, User};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;

use super::StorageError;
use crate::storage::schema::{asset_categories, assets, children, sessions, users};

pub(crate) fn utc(ts: NaiveDateTime) -> DateTime<Utc> {
    DateTime::<Utc>::from_naive_utc_and_offset(ts, Utc)
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = users)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: NaiveDateTime,
}

impl UserRow {
    pub fn into_user(self) -> User {
        User {
            id: self.id.into(),
            email: self.email,
            created_at: utc(self.created_at),
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUserRow<'a> {
    pub id: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = sessions)]
pub struct NewSessionRow<'a> {
    pub jti: &'a str,
    pub user_id: &'a str,
    pub issued_at: NaiveDateTime,
    pub last_used_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Insertable)]
#[diesel(table_name = children)]
pub struct ChildRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub birthdate: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
}

impl From<ChildRow> for Child {
    fn from(row: ChildRow) -> Self {
        Child {
            id: row.id.into(),
            owner: row.user_id.into(),
            name: row.name,
            birthdate: row.birthdate,
            created_at: utc(row.created_at),
        }
    }
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Insertable)]
#[diesel(table_name = asset_categories)]
pub struct CategoryRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub created_at: NaiveDateTime,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id.into(),
            owner: row.user_id.into(),
            name: row.name,
            created_at: utc(row.created_at),
        }
    }
}

/// Amount is kept as decimal text, metadata as JSON text.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Insertable)]
#[diesel(table_name = assets)]
pub struct AssetRow {
    pub id: String,
    pub child_id: String,
    pub category_id: String,
    pub amount: String,
    pub note: Option<String>,
    pub metadata: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

impl AssetRow {
    pub fn from_asset(asset: &Asset) -> Result<Self, StorageError> {
        Ok(AssetRow {
            id: asset.id.to_string(),
            child_id: asset.child_id.to_string(),
            category_id: asset.category_id.to_string(),
            amount: asset.amount.to_string(),
            note: asset.note.clone(),
            metadata: encode_metadata(asset.metadata.as_ref())?,
            created_at: asset.created_at.naive_utc(),
            updated_at: asset.updated_at.map(|t| t.naive_utc()),
        })
    }

    pub fn into_asset(self) -> Result<Asset, StorageError> {
        let amount = Decimal::from_str(&self.amount).map_err(|e| {
            StorageError::Corrupt(format!("asset {} amount {:?}: {}", self.id, self.amount, e))
        })?;
        let metadata = match self.metadata.as_deref() {
            None => None,
            Some(text) => Some(serde_json::from_str::<GoldMetadata>(text).map_err(|e| {
                StorageError::Corrupt(format!("asset {} metadata: {}", self.id, e))
            })?),
        };
        Ok(Asset {
            id: self.id.into(),
            child_id: self.child_id.into(),
            category_id: self.category_id.into(),
            amount,
            note: self.note,
            metadata,
            created_at: utc(self.created_at),
            updated_at: self.updated_at.map(utc),
        })
    }
}

pub fn encode_metadata(metadata: Option<&GoldMetadata>) -> Result<Option<String>, StorageError> {
    metadata
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| StorageError::InvalidInput(format!("metadata: {}", e)))
}

/// `None` leaves a column untouched; `Some(None)` writes NULL.
#[derive(AsChangeset)]
#[diesel(table_name = assets)]
pub struct AssetChanges {
    pub amount: String,
    pub note: Option<Option<String>>,
    pub metadata: Option<Option<String>>,
    pub updated_at: NaiveDateTime,
}
