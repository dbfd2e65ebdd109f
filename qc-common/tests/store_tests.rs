//! CRUD behaviour shared by every storage backend
//!
//! Each test runs against SQLite and the flat-file store. MySQL is covered
//! by mysql_store_tests.rs when a test server is available.

use qc_common::config::QcConfig;
use qc_common::lots::{self, LotAssignment};
use qc_common::session;
use qc_common::{Blend, Error, Store};
use tempfile::TempDir;

async fn sqlite_store() -> (TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let config = QcConfig::from_toml_str(&format!(
        "[database]\nuse_sqlite = true\nsqlite_path = {:?}\n",
        dir.path().join("qc_application.db")
    ))
    .unwrap();
    let store = Store::open(&config).await.unwrap();
    (dir, store)
}

async fn file_store() -> (TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let config = QcConfig::from_toml_str(&format!(
        "[database]\nuse_sqlite = false\nuse_external_db = false\n[files]\ndata_dir = {:?}\n",
        dir.path()
    ))
    .unwrap();
    let store = Store::open(&config).await.unwrap();
    (dir, store)
}

async fn all_stores() -> Vec<(TempDir, Store)> {
    vec![sqlite_store().await, file_store().await]
}

fn blend(code: &str, weight: f64) -> Blend {
    Blend {
        code: code.to_string(),
        product: format!("{} Tablets", code),
        tablets_amount: 240,
        kilos_to_produce: 96.25,
        tablet_size: "19mm capsule".to_string(),
        tablet_weight: weight,
    }
}

#[tokio::test]
async fn test_backends_are_selected_from_config() {
    let (_a, sqlite) = sqlite_store().await;
    let (_b, files) = file_store().await;
    assert_eq!(sqlite.describe(), "sqlite");
    assert_eq!(files.describe(), "flat files");
}

#[tokio::test]
async fn test_blend_insert_then_fetch_returns_same_fields() {
    for (_dir, store) in all_stores().await {
        let original = blend("MF-100", 1.35);
        store.insert_blend(&original).await.unwrap();

        let fetched = store.fetch_blend_info("MF-100").await.unwrap();
        assert_eq!(fetched, Some(original), "backend {}", store.describe());
        assert_eq!(store.fetch_blend_info("MF-404").await.unwrap(), None);
    }
}

#[tokio::test]
async fn test_blend_reinsert_updates_existing_row() {
    for (_dir, store) in all_stores().await {
        store.insert_blend(&blend("MF-100", 1.35)).await.unwrap();

        let mut revised = blend("MF-100", 1.40);
        revised.product = "Revised Formula".to_string();
        store.insert_blend(&revised).await.unwrap();

        assert_eq!(store.fetch_blend_info("MF-100").await.unwrap(), Some(revised));
        assert_eq!(store.fetch_valid_blends().await.unwrap(), vec!["MF-100".to_string()]);
    }
}

#[tokio::test]
async fn test_valid_blends_require_positive_weight() {
    for (_dir, store) in all_stores().await {
        store.insert_blend(&blend("C", 0.9)).await.unwrap();
        store.insert_blend(&blend("A", 0.0)).await.unwrap();
        store.insert_blend(&blend("B", -1.0)).await.unwrap();
        store.insert_blend(&blend("D", 2.5)).await.unwrap();

        assert_eq!(
            store.fetch_valid_blends().await.unwrap(),
            vec!["C".to_string(), "D".to_string()],
            "backend {}",
            store.describe()
        );
    }
}

#[tokio::test]
async fn test_next_lot_is_none_without_history_then_max_plus_one() {
    for (_dir, store) in all_stores().await {
        store.insert_blend(&blend("MF-100", 1.0)).await.unwrap();
        assert_eq!(store.find_next_lot("MF-100").await.unwrap(), None);
        assert_eq!(
            lots::lot_assignment(&store, "MF-100").await.unwrap(),
            LotAssignment::NeedsManualEntry
        );

        store.insert_lot_image("MF-100", 9, "img/9").await.unwrap();
        store.insert_lot_image("MF-100", 10, "img/10").await.unwrap();

        assert_eq!(store.find_next_lot("MF-100").await.unwrap(), Some(11));
        assert_eq!(lots::resolve_lot(&store, "MF-100", None).await.unwrap(), 11);
    }
}

#[tokio::test]
async fn test_highest_possible_lot_has_no_successor() {
    for (_dir, store) in all_stores().await {
        store.insert_blend(&blend("MF-100", 1.0)).await.unwrap();
        store.insert_lot_image("MF-100", i64::MAX, "img/max").await.unwrap();

        assert!(matches!(
            store.find_next_lot("MF-100").await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            lots::resolve_lot(&store, "MF-100", None).await,
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(
            store.fetch_lot_numbers_for_blend("MF-100").await.unwrap(),
            vec![i64::MAX]
        );
    }
}

#[tokio::test]
async fn test_latest_image_and_lot_listing() {
    for (_dir, store) in all_stores().await {
        store.insert_blend(&blend("MF-100", 1.0)).await.unwrap();
        store.insert_blend(&blend("MF-200", 1.0)).await.unwrap();
        store.insert_lot_image("MF-100", 3, "img/3").await.unwrap();
        store.insert_lot_image("MF-100", 12, "img/12").await.unwrap();
        store.insert_lot_image("MF-100", 7, "img/7").await.unwrap();
        store.insert_lot_image("MF-200", 50, "other/50").await.unwrap();

        let latest = store.fetch_image_info_for_blend("MF-100").await.unwrap().unwrap();
        assert_eq!(latest.lot_number, 12);
        assert_eq!(latest.image_path, "img/12");
        assert!(!latest.is_confirmed());

        assert_eq!(
            store.fetch_lot_numbers_for_blend("MF-100").await.unwrap(),
            vec![12, 7, 3],
            "backend {}",
            store.describe()
        );
        assert!(store.fetch_image_info_for_blend("MF-300").await.unwrap().is_none());
    }
}

#[tokio::test]
async fn test_lot_image_requires_known_blend() {
    for (_dir, store) in all_stores().await {
        let result = store.insert_lot_image("GHOST", 1, "img/1").await;
        assert!(matches!(result, Err(Error::NotFound(_))), "backend {}", store.describe());
    }
}

#[tokio::test]
async fn test_mark_confirmed_sets_only_target_lot() {
    for (_dir, store) in all_stores().await {
        store.insert_blend(&blend("MF-100", 1.0)).await.unwrap();
        store.insert_lot_image("MF-100", 1, "img/1").await.unwrap();
        store.insert_lot_image("MF-100", 2, "img/2").await.unwrap();

        store.mark_confirmed("JQD", "MF-100", 2).await.unwrap();

        let lot2 = store.fetch_lot_image("MF-100", 2).await.unwrap().unwrap();
        let lot1 = store.fetch_lot_image("MF-100", 1).await.unwrap().unwrap();
        assert_eq!(lot2.confirmed_by, "JQD");
        assert_eq!(lot1.confirmed_by, "");

        // Confirming again with the same initials is not an error
        store.mark_confirmed("JQD", "MF-100", 2).await.unwrap();

        let missing = store.mark_confirmed("JQD", "MF-100", 99).await;
        assert!(matches!(missing, Err(Error::NotFound(_))), "backend {}", store.describe());
    }
}

#[tokio::test]
async fn test_users_and_login() {
    for (_dir, store) in all_stores().await {
        store.add_user("Jane Q Doe", "4321").await.unwrap();
        store.add_user("Bob Ray", "1111").await.unwrap();
        store.add_user("Bob Ray", "2222").await.unwrap();

        assert_eq!(
            store.fetch_all_users().await.unwrap(),
            vec!["Bob Ray".to_string(), "Jane Q Doe".to_string()]
        );

        let session = session::login(&store, "Jane Q Doe", "4321").await.unwrap();
        assert_eq!(session.initials, "JQD");

        assert!(matches!(
            session::login(&store, "Jane Q Doe", "0000").await,
            Err(Error::AuthFailed)
        ));
        assert!(matches!(
            session::login(&store, "Bob Ray", "1111").await,
            Err(Error::AuthFailed)
        ));
        assert!(session::login(&store, "Bob Ray", "2222").await.is_ok());
    }
}

#[tokio::test]
async fn test_sqlite_data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = QcConfig::from_toml_str(&format!(
        "[database]\nsqlite_path = {:?}\n",
        dir.path().join("qc.db")
    ))
    .unwrap();

    let store = Store::open(&config).await.unwrap();
    store.insert_blend(&blend("MF-100", 1.0)).await.unwrap();
    store.insert_lot_image("MF-100", 4, "img/4").await.unwrap();
    store.close().await;

    let reopened = Store::open(&config).await.unwrap();
    assert_eq!(reopened.find_next_lot("MF-100").await.unwrap(), Some(5));
    reopened.close().await;
}
