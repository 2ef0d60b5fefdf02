use std::sync::Arc;
use std::time::Duration as StdDuration;

use aset_anak_server::service::{
    AssetAggregator, AssetInput, AssetUpdate, CategoryRegistry, ChildDirectory, GoldFields,
    RemoteError, ServiceError, SessionGate, SessionPolicy,
};
use aset_anak_server::storage::{MemoryStore, SqliteStore, Store};
use aset_anak_shared::domain::{GoldPurity, Holding, UserId};
use aset_anak_shared::totals::{compute_grand_total, derive_gold_display};
use aset_anak_shared::validate::ValidationError;
use rust_decimal::Decimal;

struct Backend {
    name: &'static str,
    store: Arc<dyn Store>,
    _dir: Option<tempfile::TempDir>,
}

async fn backends() -> Vec<Backend> {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("services.db");
    let sqlite = SqliteStore::connect(db.to_str().unwrap()).await.expect("db");
    vec![
        Backend {
            name: "memory",
            store: Arc::new(MemoryStore::new()),
            _dir: None,
        },
        Backend {
            name: "sqlite",
            store: Arc::new(sqlite),
            _dir: Some(dir),
        },
    ]
}

struct Services {
    categories: CategoryRegistry,
    assets: AssetAggregator,
    children: ChildDirectory,
}

fn services(store: &Arc<dyn Store>) -> Services {
    Services {
        categories: CategoryRegistry::new(store.clone()),
        assets: AssetAggregator::new(store.clone()),
        children: ChildDirectory::new(store.clone(), chrono_tz::Asia::Kuala_Lumpur),
    }
}

async fn user(store: &Arc<dyn Store>, email: &str) -> UserId {
    store.create_user(email, "not-a-real-hash").await.unwrap().id
}

fn cash(amount: &str) -> AssetInput {
    AssetInput {
        amount: amount.to_string(),
        ..Default::default()
    }
}

async fn tick() {
    tokio::time::sleep(StdDuration::from_millis(5)).await;
}

#[tokio::test]
async fn gold_asset_without_weight_never_reaches_the_store() {
    let memory = Arc::new(MemoryStore::new());
    let store: Arc<dyn Store> = memory.clone();
    let svc = services(&store);
    let owner = user(&store, "ibu@example.com").await;
    let child = svc.children.create(&owner, "Ali", None).await.unwrap();
    let gold = svc.categories.create(&owner, "Emas").await.unwrap();

    let before = memory.requests();
    let err = svc
        .assets
        .create_asset(&owner, &child.id, &gold, cash("1500"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::MissingGoldWeight)
    ));

    let err = svc
        .assets
        .create_asset(&owner, &child.id, &gold, cash("-5"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::InvalidAmount(_))
    ));

    let err = svc.children.create(&owner, "   ", None).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::EmptyChildName)
    ));
    assert_eq!(memory.requests(), before);
}

#[tokio::test]
async fn assets_list_newest_first_and_totals_add_up() {
    for b in backends().await {
        let svc = services(&b.store);
        let owner = user(&b.store, "ibu@example.com").await;
        let ali = svc.children.create(&owner, "Ali", Some("2020-06-15")).await.unwrap();
        tick().await;
        let siti = svc.children.create(&owner, "Siti", None).await.unwrap();
        let asb = svc.categories.create(&owner, "ASB").await.unwrap();
        let tunai = svc.categories.create(&owner, "Tunai").await.unwrap();

        svc.assets
            .create_asset(&owner, &ali.id, &asb, cash("500.00"))
            .await
            .unwrap();
        tick().await;
        svc.assets
            .create_asset(&owner, &ali.id, &tunai, cash("1,234.50"))
            .await
            .unwrap();
        svc.assets
            .create_asset(&owner, &siti.id, &tunai, cash("10"))
            .await
            .unwrap();

        let listed = svc.assets.list_for_child(&owner, &ali.id).await.unwrap();
        assert_eq!(listed.len(), 2, "{}", b.name);
        assert_eq!(listed[0].amount, Decimal::new(123450, 2), "{}", b.name);
        assert_eq!(listed[0].holding, Holding::Cash);
        assert_eq!(listed[1].category_name.as_deref(), Some("ASB"));
        assert_eq!(listed[1].holding, Holding::Generic);

        let summaries = svc.children.list(&owner).await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].child.name, "Siti", "{}", b.name);
        assert_eq!(summaries[1].totals.per_child_total, Decimal::new(173450, 2));
        assert_eq!(summaries[1].totals.asset_count, 2);
        assert!(summaries[1].age.is_some());
        assert!(summaries[0].age.is_none());
        assert_eq!(compute_grand_total(&summaries), Decimal::new(174450, 2));

        let categories = svc.categories.list(&owner).await.unwrap();
        let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["ASB", "Tunai"], "{}", b.name);
    }
}

#[tokio::test]
async fn categories_are_trimmed_and_may_share_a_name() {
    for b in backends().await {
        let svc = services(&b.store);
        let owner = user(&b.store, "ibu@example.com").await;
        let first = svc.categories.create(&owner, "  ASB ").await.unwrap();
        assert_eq!(first.name, "ASB", "{}", b.name);
        tick().await;
        let second = svc.categories.create(&owner, "ASB").await.unwrap();
        assert_ne!(first.id, second.id);

        let listed = svc.categories.list(&owner).await.unwrap();
        let ids: Vec<_> = listed.iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, [first.id.clone(), second.id.clone()], "{}", b.name);
        assert!(listed.iter().all(|c| c.name == "ASB"));
    }
}

#[tokio::test]
async fn blank_category_names_never_reach_the_store() {
    let memory = Arc::new(MemoryStore::new());
    let store: Arc<dyn Store> = memory.clone();
    let svc = services(&store);
    let owner = user(&store, "ibu@example.com").await;

    let before = memory.requests();
    for name in ["", "   ", "\t\n"] {
        let err = svc.categories.create(&owner, name).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::EmptyCategoryName)
        ));
    }
    assert_eq!(memory.requests(), before);
    assert!(svc.categories.list(&owner).await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_a_category_orphans_its_assets() {
    for b in backends().await {
        let svc = services(&b.store);
        let owner = user(&b.store, "ibu@example.com").await;
        let ali = svc.children.create(&owner, "Ali", None).await.unwrap();
        let asb = svc.categories.create(&owner, "ASB").await.unwrap();
        svc.assets
            .create_asset(&owner, &ali.id, &asb, cash("500"))
            .await
            .unwrap();

        svc.categories.delete(&owner, &asb.id).await.unwrap();
        assert!(matches!(
            svc.categories.delete(&owner, &asb.id).await,
            Err(ServiceError::NotFound(_))
        ));

        let listed = svc.assets.list_for_child(&owner, &ali.id).await.unwrap();
        assert_eq!(listed.len(), 1, "{}", b.name);
        assert_eq!(listed[0].category_id, asb.id);
        assert!(listed[0].category_name.is_none());
        assert_eq!(listed[0].holding, Holding::Generic);
        let (summary, _) = svc.children.detail(&owner, &ali.id).await.unwrap();
        assert_eq!(summary.totals.per_child_total, Decimal::new(500, 0));
    }
}

#[tokio::test]
async fn deleting_a_child_removes_its_assets() {
    for b in backends().await {
        let svc = services(&b.store);
        let owner = user(&b.store, "ibu@example.com").await;
        let ali = svc.children.create(&owner, "Ali", None).await.unwrap();
        let siti = svc.children.create(&owner, "Siti", None).await.unwrap();
        let asb = svc.categories.create(&owner, "ASB").await.unwrap();
        for amount in ["1", "2"] {
            svc.assets
                .create_asset(&owner, &ali.id, &asb, cash(amount))
                .await
                .unwrap();
        }
        svc.assets
            .create_asset(&owner, &siti.id, &asb, cash("3"))
            .await
            .unwrap();

        assert_eq!(svc.children.delete(&owner, &ali.id).await.unwrap(), 2, "{}", b.name);
        assert!(matches!(
            svc.children.get(&owner, &ali.id).await,
            Err(ServiceError::NotFound(_))
        ));
        let remaining = b.store.list_assets_for_owner(&owner).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].asset.child_id, siti.id);
        assert!(matches!(
            svc.children.delete(&owner, &ali.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}

#[tokio::test]
async fn rows_of_another_user_are_not_found() {
    for b in backends().await {
        let svc = services(&b.store);
        let owner = user(&b.store, "ibu@example.com").await;
        let stranger = user(&b.store, "orang@example.com").await;
        let ali = svc.children.create(&owner, "Ali", None).await.unwrap();
        let asb = svc.categories.create(&owner, "ASB").await.unwrap();
        let asset = svc
            .assets
            .create_asset(&owner, &ali.id, &asb, cash("500"))
            .await
            .unwrap();

        assert!(svc.children.list(&stranger).await.unwrap().is_empty(), "{}", b.name);
        assert!(svc.categories.list(&stranger).await.unwrap().is_empty());
        assert!(matches!(
            svc.children.get(&stranger, &ali.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            svc.assets.list_for_child(&stranger, &ali.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            svc.assets.get(&stranger, &asset.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            svc.assets
                .create_asset(&stranger, &ali.id, &asb, cash("1"))
                .await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            svc.assets
                .update_asset(&stranger, &asset, AssetUpdate {
                    amount: "1".into(),
                    ..Default::default()
                })
                .await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            svc.assets.delete_asset(&stranger, &asset.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            svc.categories.delete(&stranger, &asb.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            svc.children.delete(&stranger, &ali.id).await,
            Err(ServiceError::NotFound(_))
        ));

        // Untouched for the owner
        let listed = svc.assets.list_for_child(&owner, &ali.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].amount, Decimal::new(500, 0));
    }
}

#[tokio::test]
async fn updates_keep_omitted_fields() {
    for b in backends().await {
        let svc = services(&b.store);
        let owner = user(&b.store, "ibu@example.com").await;
        let ali = svc.children.create(&owner, "Ali", None).await.unwrap();
        let emas = svc.categories.create(&owner, "Emas").await.unwrap();
        let created = svc
            .assets
            .create_asset(&owner, &ali.id, &emas, AssetInput {
                amount: "1200".into(),
                note: Some("  Rantai  ".into()),
                gold: Some(GoldFields {
                    weight: Some("2.5".into()),
                    purity: Some("916".into()),
                }),
            })
            .await
            .unwrap();
        assert_eq!(created.note.as_deref(), Some("Rantai"));
        assert!(created.updated_at.is_none());
        let display = derive_gold_display(&created).unwrap();
        assert_eq!(display.weight_label, "2.500 g");
        assert_eq!(display.purity_label, "Emas 916 (22K)");

        // Amount only: note and metadata stay
        let updated = svc
            .assets
            .update_asset(&owner, &created, AssetUpdate {
                amount: "1300".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(updated.amount, Decimal::new(1300, 0), "{}", b.name);
        assert_eq!(updated.note.as_deref(), Some("Rantai"));
        assert_eq!(updated.holding, created.holding);
        assert!(updated.updated_at.is_some());

        // Blank note clears; blank weight falls back to the stored one
        let updated = svc
            .assets
            .update_asset(&owner, &updated, AssetUpdate {
                amount: "1300".into(),
                note: Some(" ".into()),
                gold: Some(GoldFields {
                    weight: Some("".into()),
                    purity: Some("999".into()),
                }),
            })
            .await
            .unwrap();
        assert!(updated.note.is_none(), "{}", b.name);
        let meta = updated.holding.gold_metadata().unwrap();
        assert_eq!(meta.weight, Some(Decimal::new(2500, 3)));
        assert_eq!(meta.purity, Some(GoldPurity::Fine999));

        let reloaded = svc.assets.get(&owner, &created.id).await.unwrap();
        assert_eq!(reloaded.note, None);
        assert_eq!(reloaded.holding, updated.holding);

        let err = svc
            .assets
            .update_asset(&owner, &reloaded, AssetUpdate {
                amount: "abc".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::InvalidAmount(_))
        ));
    }
}

#[tokio::test]
async fn metadata_is_not_stored_for_other_categories() {
    for b in backends().await {
        let svc = services(&b.store);
        let owner = user(&b.store, "ibu@example.com").await;
        let ali = svc.children.create(&owner, "Ali", None).await.unwrap();
        let asb = svc.categories.create(&owner, "ASB").await.unwrap();
        let asset = svc
            .assets
            .create_asset(&owner, &ali.id, &asb, AssetInput {
                amount: "10".into(),
                note: None,
                gold: Some(GoldFields {
                    weight: Some("1".into()),
                    purity: None,
                }),
            })
            .await
            .unwrap();
        assert!(derive_gold_display(&asset).is_none());
        let stored = b.store.get_asset(&owner, &asset.id).await.unwrap().unwrap();
        assert!(stored.asset.metadata.is_none(), "{}", b.name);
    }
}

#[tokio::test]
async fn birthdates_in_the_future_are_rejected() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let svc = services(&store);
    let owner = user(&store, "ibu@example.com").await;
    let tomorrow = svc.children.today() + chrono::Duration::days(1);
    let err = svc
        .children
        .create(&owner, "Ali", Some(tomorrow.format("%Y-%m-%d").to_string().as_str()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::FutureBirthdate)
    ));
    let today = svc.children.today().format("%Y-%m-%d").to_string();
    let child = svc.children.create(&owner, "Ali", Some(today.as_str())).await.unwrap();
    let (summary, assets) = svc.children.detail(&owner, &child.id).await.unwrap();
    assert!(assets.is_empty());
    assert_eq!(summary.totals.per_child_total, Decimal::ZERO);
    let age = summary.age.unwrap();
    assert_eq!((age.years, age.months), (0, 0));
}

fn gate(store: &Arc<dyn Store>, policy: SessionPolicy) -> SessionGate {
    SessionGate::new(store.clone(), "test-secret", policy)
}

fn fast_policy() -> SessionPolicy {
    SessionPolicy {
        bcrypt_cost: 4,
        ..Default::default()
    }
}

#[tokio::test]
async fn sessions_sign_up_in_and_out() {
    for b in backends().await {
        let sessions = gate(&b.store, fast_policy());
        let signed_up = sessions
            .sign_up(" Ibu@Example.com ", "rahsia123")
            .await
            .unwrap();
        assert_eq!(signed_up.user.email, "ibu@example.com");
        let identity = sessions
            .current_identity(Some(&signed_up.token))
            .await
            .unwrap();
        assert_eq!(identity.user_id, signed_up.user.id, "{}", b.name);

        let err = sessions
            .sign_up("ibu@example.com", "lain-lain")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Remote(RemoteError::EmailTaken)));

        for (email, password) in [("ibu@example.com", "salah123"), ("tiada@example.com", "rahsia123")] {
            let err = sessions.sign_in(email, password).await.unwrap_err();
            assert!(matches!(
                err,
                ServiceError::Remote(RemoteError::InvalidCredentials)
            ));
        }

        let second = sessions.sign_in("IBU@example.com", "rahsia123").await.unwrap();
        sessions.sign_out(Some(&signed_up.token)).await;
        assert!(sessions.current_identity(Some(&signed_up.token)).await.is_none());
        assert!(sessions.current_identity(Some(&second.token)).await.is_some());

        assert!(sessions.current_identity(None).await.is_none());
        assert!(sessions.current_identity(Some("garbage")).await.is_none());
        let other_secret = SessionGate::new(b.store.clone(), "other-secret", fast_policy());
        let foreign = other_secret.sign_in("ibu@example.com", "rahsia123").await.unwrap();
        assert!(sessions.current_identity(Some(&foreign.token)).await.is_none());
    }
}

#[tokio::test]
async fn sign_up_validates_before_any_request() {
    let memory = Arc::new(MemoryStore::new());
    let store: Arc<dyn Store> = memory.clone();
    let sessions = gate(&store, fast_policy());
    let err = sessions.sign_up("bukan-emel", "rahsia123").await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(ValidationError::InvalidEmail)));
    let err = sessions.sign_up("ibu@example.com", "12345").await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::PasswordTooShort)
    ));
    assert_eq!(memory.requests(), 0);

    let closed = gate(
        &store,
        SessionPolicy {
            allow_registration: false,
            ..fast_policy()
        },
    );
    let err = closed.sign_up("ibu@example.com", "rahsia123").await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Remote(RemoteError::RegistrationClosed)
    ));
    assert_eq!(memory.requests(), 0);
}

#[tokio::test]
async fn idle_sessions_expire() {
    for b in backends().await {
        let sessions = gate(
            &b.store,
            SessionPolicy {
                idle: chrono::Duration::zero(),
                ..fast_policy()
            },
        );
        let signed_up = sessions.sign_up("ibu@example.com", "rahsia123").await.unwrap();
        tick().await;
        assert!(
            sessions.current_identity(Some(&signed_up.token)).await.is_none(),
            "{}",
            b.name
        );
    }
}
