use aset_anak_shared::domain::{
    Asset, AssetId, AssetRecord, Category, CategoryId, Child, ChildId, User, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::DatabaseErrorKind;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, trace};

use super::models::{
    AssetChanges, AssetRow, CategoryRow, ChildRow, NewSessionRow, NewUserRow, UserRow,
    encode_metadata,
};
use super::{
    AssetPatch, NewAsset, NewChild, StorageError, Store, UserCredentials, new_id, schema,
};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<ConnectionManager<SqliteConnection>>,
}

impl SqliteStore {
    /// Opens (or creates) the database and applies pending migrations.
    pub async fn connect(path: &str) -> Result<Self, StorageError> {
        let manager = ConnectionManager::<SqliteConnection>::new(path.to_string());
        let pool = Pool::builder().max_size(8).build(manager)?;
        let store = SqliteStore { pool };
        let applied = store.run_migrations().await?;
        debug!(path, applied, "sqlite store ready");
        Ok(store)
    }

    /// Returns the number of migrations applied.
    pub async fn run_migrations(&self) -> Result<usize, StorageError> {
        self.with_conn(|conn| {
            let applied = conn
                .run_pending_migrations(MIGRATIONS)
                .map_err(|e| StorageError::Migration(e.to_string()))?;
            Ok(applied.len())
        })
        .await
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> Result<T, StorageError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<T, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            f(&mut conn)
        })
        .await?
    }
}

fn into_record((asset, category): (AssetRow, Option<CategoryRow>)) -> Result<AssetRecord, StorageError> {
    Ok(AssetRecord {
        asset: asset.into_asset()?,
        category: category.map(Category::from),
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StorageError> {
        use schema::users;
        let email = email.to_string();
        let hash = password_hash.to_string();
        self.with_conn(move |conn| {
            let id = new_id();
            let now = Utc::now();
            let new = NewUserRow {
                id: &id,
                email: &email,
                password_hash: &hash,
                created_at: now.naive_utc(),
            };
            match diesel::insert_into(users::table).values(&new).execute(conn) {
                Ok(_) => {}
                Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                    return Err(StorageError::Conflict(format!(
                        "email already registered: {}",
                        email
                    )));
                }
                Err(e) => return Err(e.into()),
            }
            Ok(User {
                id: id.into(),
                email,
                created_at: now,
            })
        })
        .await
    }

    async fn find_user_by_email(
        &self,
        email_: &str,
    ) -> Result<Option<UserCredentials>, StorageError> {
        use schema::users::dsl::*;
        let e = email_.to_string();
        self.with_conn(move |conn| {
            let row = users
                .filter(email.eq(&e))
                .select(UserRow::as_select())
                .first(conn)
                .optional()?;
            Ok(row.map(|r| {
                let hash = r.password_hash.clone();
                UserCredentials {
                    user: r.into_user(),
                    password_hash: hash,
                }
            }))
        })
        .await
    }

    async fn create_session(&self, jti_: &str, user: &UserId) -> Result<(), StorageError> {
        use schema::sessions;
        let j = jti_.to_string();
        let u = user.to_string();
        self.with_conn(move |conn| {
            let now = Utc::now().naive_utc();
            let new = NewSessionRow {
                jti: &j,
                user_id: &u,
                issued_at: now,
                last_used_at: now,
            };
            diesel::insert_into(sessions::table)
                .values(&new)
                .on_conflict_do_nothing()
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn touch_session_with_cutoff(
        &self,
        jti_: &str,
        user: &UserId,
        cutoff: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        use schema::sessions::dsl::*;
        let j = jti_.to_string();
        let u = user.to_string();
        self.with_conn(move |conn| {
            let now = Utc::now().naive_utc();
            let updated = diesel::update(
                sessions
                    .filter(jti.eq(&j))
                    .filter(user_id.eq(&u))
                    .filter(last_used_at.ge(cutoff.naive_utc())),
            )
            .set(last_used_at.eq(now))
            .execute(conn)?;
            Ok(updated > 0)
        })
        .await
    }

    async fn delete_session(&self, jti_: &str) -> Result<bool, StorageError> {
        use schema::sessions::dsl::*;
        let j = jti_.to_string();
        self.with_conn(move |conn| {
            let n = diesel::delete(sessions.filter(jti.eq(&j))).execute(conn)?;
            Ok(n > 0)
        })
        .await
    }

    async fn list_children(&self, owner: &UserId) -> Result<Vec<Child>, StorageError> {
        use schema::children::dsl::*;
        let o = owner.to_string();
        self.with_conn(move |conn| {
            let rows = children
                .filter(user_id.eq(&o))
                .order(created_at.desc())
                .select(ChildRow::as_select())
                .load(conn)?;
            Ok(rows.into_iter().map(Child::from).collect())
        })
        .await
    }

    async fn get_child(&self, owner: &UserId, id_: &ChildId) -> Result<Option<Child>, StorageError> {
        use schema::children::dsl::*;
        let o = owner.to_string();
        let c = id_.to_string();
        self.with_conn(move |conn| {
            let row = children
                .filter(id.eq(&c))
                .filter(user_id.eq(&o))
                .select(ChildRow::as_select())
                .first(conn)
                .optional()?;
            Ok(row.map(Child::from))
        })
        .await
    }

    async fn insert_child(&self, owner: &UserId, child: NewChild) -> Result<Child, StorageError> {
        use schema::children;
        let row = ChildRow {
            id: new_id(),
            user_id: owner.to_string(),
            name: child.name,
            birthdate: child.birthdate,
            created_at: Utc::now().naive_utc(),
        };
        self.with_conn(move |conn| {
            diesel::insert_into(children::table)
                .values(&row)
                .execute(conn)?;
            trace!(child_id = %row.id, "insert_child done");
            Ok(Child::from(row))
        })
        .await
    }

    async fn delete_child_cascade(
        &self,
        owner: &UserId,
        id_: &ChildId,
    ) -> Result<Option<usize>, StorageError> {
        use schema::{assets, children};
        let o = owner.to_string();
        let c = id_.to_string();
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| -> Result<Option<usize>, StorageError> {
                let found = children::table
                    .filter(children::id.eq(&c))
                    .filter(children::user_id.eq(&o))
                    .count()
                    .get_result::<i64>(conn)?;
                if found == 0 {
                    return Ok(None);
                }
                let removed =
                    diesel::delete(assets::table.filter(assets::child_id.eq(&c))).execute(conn)?;
                diesel::delete(children::table.filter(children::id.eq(&c))).execute(conn)?;
                Ok(Some(removed))
            })
        })
        .await
    }

    async fn list_categories(&self, owner: &UserId) -> Result<Vec<Category>, StorageError> {
        use schema::asset_categories::dsl::*;
        let o = owner.to_string();
        self.with_conn(move |conn| {
            let rows = asset_categories
                .filter(user_id.eq(&o))
                .order(created_at.asc())
                .select(CategoryRow::as_select())
                .load(conn)?;
            Ok(rows.into_iter().map(Category::from).collect())
        })
        .await
    }

    async fn get_category(
        &self,
        owner: &UserId,
        id_: &CategoryId,
    ) -> Result<Option<Category>, StorageError> {
        use schema::asset_categories::dsl::*;
        let o = owner.to_string();
        let c = id_.to_string();
        self.with_conn(move |conn| {
            let row = asset_categories
                .filter(id.eq(&c))
                .filter(user_id.eq(&o))
                .select(CategoryRow::as_select())
                .first(conn)
                .optional()?;
            Ok(row.map(Category::from))
        })
        .await
    }

    async fn insert_category(&self, owner: &UserId, name: &str) -> Result<Category, StorageError> {
        use schema::asset_categories;
        let row = CategoryRow {
            id: new_id(),
            user_id: owner.to_string(),
            name: name.to_string(),
            created_at: Utc::now().naive_utc(),
        };
        self.with_conn(move |conn| {
            diesel::insert_into(asset_categories::table)
                .values(&row)
                .execute(conn)?;
            Ok(Category::from(row))
        })
        .await
    }

    async fn delete_category(&self, owner: &UserId, id_: &CategoryId) -> Result<bool, StorageError> {
        use schema::asset_categories::dsl::*;
        let o = owner.to_string();
        let c = id_.to_string();
        self.with_conn(move |conn| {
            let n = diesel::delete(asset_categories.filter(id.eq(&c)).filter(user_id.eq(&o)))
                .execute(conn)?;
            Ok(n > 0)
        })
        .await
    }

    async fn list_assets_for_child(
        &self,
        owner: &UserId,
        child: &ChildId,
    ) -> Result<Vec<AssetRecord>, StorageError> {
        use schema::{asset_categories, assets, children};
        let o = owner.to_string();
        let c = child.to_string();
        self.with_conn(move |conn| {
            let rows = assets::table
                .inner_join(children::table)
                .left_join(asset_categories::table)
                .filter(children::user_id.eq(&o))
                .filter(assets::child_id.eq(&c))
                .order(assets::created_at.desc())
                .select((AssetRow::as_select(), Option::<CategoryRow>::as_select()))
                .load::<(AssetRow, Option<CategoryRow>)>(conn)?;
            rows.into_iter().map(into_record).collect()
        })
        .await
    }

    async fn list_assets_for_owner(&self, owner: &UserId) -> Result<Vec<AssetRecord>, StorageError> {
        use schema::{asset_categories, assets, children};
        let o = owner.to_string();
        self.with_conn(move |conn| {
            let rows = assets::table
                .inner_join(children::table)
                .left_join(asset_categories::table)
                .filter(children::user_id.eq(&o))
                .order(assets::created_at.desc())
                .select((AssetRow::as_select(), Option::<CategoryRow>::as_select()))
                .load::<(AssetRow, Option<CategoryRow>)>(conn)?;
            rows.into_iter().map(into_record).collect()
        })
        .await
    }

    async fn get_asset(
        &self,
        owner: &UserId,
        id_: &AssetId,
    ) -> Result<Option<AssetRecord>, StorageError> {
        use schema::{asset_categories, assets, children};
        let o = owner.to_string();
        let a = id_.to_string();
        self.with_conn(move |conn| {
            let row = assets::table
                .inner_join(children::table)
                .left_join(asset_categories::table)
                .filter(children::user_id.eq(&o))
                .filter(assets::id.eq(&a))
                .select((AssetRow::as_select(), Option::<CategoryRow>::as_select()))
                .first::<(AssetRow, Option<CategoryRow>)>(conn)
                .optional()?;
            row.map(into_record).transpose()
        })
        .await
    }

    async fn insert_asset(
        &self,
        owner: &UserId,
        asset: NewAsset,
    ) -> Result<Option<Asset>, StorageError> {
        use schema::{assets, children};
        let o = owner.to_string();
        let asset = Asset {
            id: new_id().into(),
            child_id: asset.child_id,
            category_id: asset.category_id,
            amount: asset.amount,
            note: asset.note,
            metadata: asset.metadata,
            created_at: Utc::now(),
            updated_at: None,
        };
        let row = AssetRow::from_asset(&asset)?;
        self.with_conn(move |conn| {
            let owned = children::table
                .filter(children::id.eq(&row.child_id))
                .filter(children::user_id.eq(&o))
                .count()
                .get_result::<i64>(conn)?;
            if owned == 0 {
                return Ok(None);
            }
            diesel::insert_into(assets::table)
                .values(&row)
                .execute(conn)?;
            Ok(Some(asset))
        })
        .await
    }

    async fn update_asset(
        &self,
        owner: &UserId,
        id_: &AssetId,
        patch: AssetPatch,
    ) -> Result<Option<Asset>, StorageError> {
        use schema::{assets, children};
        let o = owner.to_string();
        let a = id_.to_string();
        let changes = AssetChanges {
            amount: patch.amount.to_string(),
            note: patch.note,
            metadata: encode_metadata(patch.metadata.as_ref())?.map(Some),
            updated_at: Utc::now().naive_utc(),
        };
        self.with_conn(move |conn| {
            let owned_children = children::table
                .filter(children::user_id.eq(&o))
                .select(children::id);
            let row = diesel::update(
                assets::table
                    .filter(assets::id.eq(&a))
                    .filter(assets::child_id.eq_any(owned_children)),
            )
            .set(&changes)
            .returning(AssetRow::as_returning())
            .get_result::<AssetRow>(conn)
            .optional()?;
            row.map(AssetRow::into_asset).transpose()
        })
        .await
    }

    async fn delete_asset(&self, owner: &UserId, id_: &AssetId) -> Result<bool, StorageError> {
        use schema::{assets, children};
        let o = owner.to_string();
        let a = id_.to_string();
        self.with_conn(move |conn| {
            let owned_children = children::table
                .filter(children::user_id.eq(&o))
                .select(children::id);
            let n = diesel::delete(
                assets::table
                    .filter(assets::id.eq(&a))
                    .filter(assets::child_id.eq_any(owned_children)),
            )
            .execute(conn)?;
            Ok(n > 0)
        })
        .await
    }
}

fn configure_sqlite_conn(conn: &mut SqliteConnection) -> Result<(), diesel::result::Error> {
    // WAL for concurrent readers, plus a busy timeout for writers
    diesel::sql_query("PRAGMA journal_mode=WAL;").execute(conn)?;
    diesel::sql_query("PRAGMA synchronous=NORMAL;").execute(conn)?;
    diesel::sql_query("PRAGMA busy_timeout=5000;").execute(conn)?;
    Ok(())
}
