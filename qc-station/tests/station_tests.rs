//! Station workflows end to end against SQLite storage

use axum::extract::Multipart;
use axum::routing::{get, post};
use axum::{Json, Router};
use qc_common::config::QcConfig;
use qc_common::images::{ImageRepository, ImageServerClient, LocalImageDir};
use qc_common::lots::LotAssignment;
use qc_common::{Blend, Error, Store};
use qc_station::Station;
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
    station: Station,
}

impl Fixture {
    fn photo(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }
}

async fn seeded_store(dir: &TempDir) -> Store {
    let config = QcConfig::from_toml_str(&format!(
        "[database]\nsqlite_path = {:?}\n",
        dir.path().join("qc_application.db")
    ))
    .unwrap();
    let store = Store::open(&config).await.unwrap();

    store.add_user("Jane Q Doe", "4321").await.unwrap();
    store.add_user("Sam Supervisor", "9999").await.unwrap();
    for (code, weight) in [("MF-100", 1.25), ("MF-200", 0.8), ("MF-300", 0.0)] {
        store
            .insert_blend(&Blend {
                code: code.to_string(),
                product: format!("{} Product", code),
                tablets_amount: 100,
                kilos_to_produce: 50.0,
                tablet_size: "12mm".to_string(),
                tablet_weight: weight,
            })
            .await
            .unwrap();
    }
    store
}

async fn local_fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir).await;
    let images = ImageRepository::Local(LocalImageDir::new(&dir.path().join("images")));
    Fixture {
        station: Station::new(store, images),
        dir,
    }
}

#[tokio::test]
async fn test_station_opens_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = QcConfig::from_toml_str(&format!(
        "[database]\nuse_sqlite = false\n[files]\ndata_dir = {:?}\n[images]\nlocal_dir = {:?}\n",
        dir.path().join("data"),
        dir.path().join("images")
    ))
    .unwrap();

    let station = Station::open(&config).await.unwrap();
    assert_eq!(station.store().describe(), "flat files");
    assert!(matches!(station.images(), ImageRepository::Local(_)));
    assert!(station.users().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_login_and_blend_listing() {
    let fx = local_fixture().await;

    assert_eq!(
        fx.station.users().await.unwrap(),
        vec!["Jane Q Doe".to_string(), "Sam Supervisor".to_string()]
    );
    assert!(matches!(
        fx.station.login("Jane Q Doe", "1111").await,
        Err(Error::AuthFailed)
    ));

    let session = fx.station.login("Jane Q Doe", "4321").await.unwrap();
    assert_eq!(session.initials, "JQD");

    assert_eq!(
        fx.station.valid_blends().await.unwrap(),
        vec!["MF-100".to_string(), "MF-200".to_string()]
    );
}

#[tokio::test]
async fn test_first_upload_needs_lot_then_numbers_follow() {
    let fx = local_fixture().await;
    let operator = fx.station.login("Jane Q Doe", "4321").await.unwrap();
    let photo = fx.photo("first.jpg", b"first piece");

    assert_eq!(
        fx.station.lot_assignment("MF-100").await.unwrap(),
        LotAssignment::NeedsManualEntry
    );
    let result = fx.station.upload_current_lot(&operator, "MF-100", &photo, None).await;
    assert!(matches!(result, Err(Error::LotNumberRequired(_))));

    let first = fx
        .station
        .upload_current_lot(&operator, "MF-100", &photo, Some(10450))
        .await
        .unwrap();
    assert_eq!(first.lot_number, 10450);
    assert!(!first.is_confirmed());
    assert!(PathBuf::from(&first.image_path).exists());

    let second = fx
        .station
        .upload_current_lot(&operator, "MF-100", &fx.photo("second.png", b"second"), None)
        .await
        .unwrap();
    assert_eq!(second.lot_number, 10451);

    // Going backwards is refused
    let stale = fx
        .station
        .upload_current_lot(&operator, "MF-100", &photo, Some(10400))
        .await;
    assert!(matches!(stale, Err(Error::InvalidInput(_))));

    let view = fx.station.select_blend("MF-100").await.unwrap();
    assert_eq!(view.lots, vec![10451, 10450]);
    assert_eq!(view.latest.unwrap().image_path, second.image_path);
}

#[tokio::test]
async fn test_last_possible_lot_number_is_refused() {
    let fx = local_fixture().await;
    let operator = fx.station.login("Jane Q Doe", "4321").await.unwrap();
    let photo = fx.photo("p.jpg", b"x");

    let result = fx
        .station
        .upload_current_lot(&operator, "MF-100", &photo, Some(i64::MAX))
        .await;
    assert!(matches!(result, Err(Error::InvalidInput(_))));

    // Nothing was recorded, so numbering is still open for the blend
    assert_eq!(
        fx.station.lot_assignment("MF-100").await.unwrap(),
        LotAssignment::NeedsManualEntry
    );
    let last = fx
        .station
        .upload_current_lot(&operator, "MF-100", &photo, Some(i64::MAX - 1))
        .await
        .unwrap();
    assert_eq!(last.lot_number, i64::MAX - 1);

    // The following number exists but has no successor of its own
    assert_eq!(
        fx.station.lot_assignment("MF-100").await.unwrap(),
        LotAssignment::Next(i64::MAX)
    );
    assert!(matches!(
        fx.station.upload_current_lot(&operator, "MF-100", &photo, None).await,
        Err(Error::InvalidInput(_))
    ));
    assert_eq!(fx.station.select_blend("MF-100").await.unwrap().lots, vec![i64::MAX - 1]);
}

#[tokio::test]
async fn test_supervisor_confirmation_records_initials() {
    let fx = local_fixture().await;
    let operator = fx.station.login("Jane Q Doe", "4321").await.unwrap();
    let supervisor = fx.station.login("Sam Supervisor", "9999").await.unwrap();

    let lot = fx
        .station
        .upload_current_lot(&operator, "MF-200", &fx.photo("p.jpg", b"x"), Some(1))
        .await
        .unwrap();
    let confirmed = fx
        .station
        .confirm_lot(&supervisor, "MF-200", lot.lot_number)
        .await
        .unwrap();
    assert_eq!(confirmed.confirmed_by, "SS");

    assert!(matches!(
        fx.station.confirm_lot(&supervisor, "MF-200", 2).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_upload_rejects_unselectable_and_unknown_blends() {
    let fx = local_fixture().await;
    let operator = fx.station.login("Jane Q Doe", "4321").await.unwrap();
    let photo = fx.photo("p.jpg", b"x");

    assert!(matches!(
        fx.station.upload_current_lot(&operator, "MF-300", &photo, Some(1)).await,
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        fx.station.upload_current_lot(&operator, "NOPE", &photo, Some(1)).await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(fx.station.select_blend("NOPE").await, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_lot_image_bytes_latest_and_specific() {
    let fx = local_fixture().await;
    let operator = fx.station.login("Jane Q Doe", "4321").await.unwrap();
    fx.station
        .upload_current_lot(&operator, "MF-100", &fx.photo("a.jpg", b"lot five"), Some(5))
        .await
        .unwrap();
    fx.station
        .upload_current_lot(&operator, "MF-100", &fx.photo("b.jpg", b"lot six"), None)
        .await
        .unwrap();

    assert_eq!(
        fx.station.lot_image_bytes("MF-100", None).await.unwrap(),
        (6, b"lot six".to_vec())
    );
    assert_eq!(
        fx.station.lot_image_bytes("MF-100", Some(5)).await.unwrap(),
        (5, b"lot five".to_vec())
    );
    assert!(matches!(
        fx.station.lot_image_bytes("MF-200", None).await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        fx.station.lot_image_bytes("MF-100", Some(99)).await,
        Err(Error::NotFound(_))
    ));
}

async fn upload_handler(mut multipart: Multipart) -> Json<serde_json::Value> {
    let mut blend = String::new();
    let mut lot = String::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let text = String::from_utf8_lossy(&field.bytes().await.unwrap()).to_string();
        match name.as_str() {
            "blend_id" => blend = text,
            "lot_number" => lot = text,
            _ => {}
        }
    }
    Json(json!({ "image_path": format!("/stored/{}/{}.jpg", blend, lot) }))
}

#[tokio::test]
async fn test_upload_through_image_server_records_returned_path() {
    let app = Router::new()
        .route("/upload", post(upload_handler))
        .route("/stored/:blend/:file", get(|| async { b"uploaded copy".to_vec() }))
        .route("/images/:blend/:lot", get(|| async { b"from server".to_vec() }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir).await;
    let client = ImageServerClient::new(&base, Duration::from_secs(5)).unwrap();
    let station = Station::new(store, ImageRepository::Server(client));
    let operator = station.login("Jane Q Doe", "4321").await.unwrap();

    let photo = dir.path().join("current.jpg");
    std::fs::write(&photo, b"current lot").unwrap();

    let uploaded = station
        .upload_current_lot(&operator, "MF-100", &photo, Some(3))
        .await
        .unwrap();
    assert_eq!(uploaded.image_path, "/stored/MF-100/3.jpg");

    let latest = station.select_blend("MF-100").await.unwrap().latest.unwrap();
    assert_eq!(latest.image_path, "/stored/MF-100/3.jpg");
    assert_eq!(latest.lot_number, 3);

    // The recorded server-relative path is fetched from the server
    assert_eq!(
        station.lot_image_bytes("MF-100", Some(3)).await.unwrap(),
        (3, b"uploaded copy".to_vec())
    );
    assert_eq!(
        station.lot_image_bytes("MF-100", None).await.unwrap(),
        (3, b"uploaded copy".to_vec())
    );

    // A lot with no record falls back to the server's URL convention
    assert_eq!(
        station.lot_image_bytes("MF-100", Some(2)).await.unwrap(),
        (2, b"from server".to_vec())
    );
}
