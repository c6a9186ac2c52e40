//! Integration tests against a real MongoDB server.
//!
//! Prerequisites:
//! - Docker must be available (a `mongo` container is started per test)
//!
//! Run with: `cargo test -- --ignored`

use std::io::Write;

use mongodb::bson::Bson;
use seeder::config::{SeedConfig, SeedMode};
use seeder::credentials::{AdminOutcome, AdminSeed, is_verifier_compatible};
use seeder::residents::ImportOutcome;
use seeder::seed::run_seed;
use seeder::store::{DocumentStore, MongoStore, RESIDENTS, USERS};
use testcontainers_modules::mongo::Mongo;
use testcontainers_modules::testcontainers::runners::AsyncRunner;

const SEED: &str = r#"[
  {"id": 1, "lot_id": "A1", "happix_accounts": [{"nom_borne": "B1"}]},
  {"lot_id": "A2"}
]"#;

#[tokio::test]
#[ignore] // Requires Docker
async fn test_seed_run_against_mongodb() {
    let container = Mongo::default().start().await.expect("Failed to start mongo");
    let port = container.get_host_port_ipv4(27017).await.unwrap();
    let uri = format!("mongodb://127.0.0.1:{port}/copro-connect");

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SEED.as_bytes()).unwrap();
    let config = SeedConfig {
        database_url: uri.clone(),
        residents_json: file.path().to_path_buf(),
        mode: SeedMode::default(),
        admin: AdminSeed::default(),
    };

    let store = MongoStore::connect(&uri).await.expect("Failed to connect");
    let report = run_seed(&store, &config).await.unwrap();
    assert_eq!(report.admin, Some(AdminOutcome::Created));
    assert_eq!(report.residents, Some(ImportOutcome::Imported(1)));

    let resident = store
        .find_one(RESIDENTS, "_id", &Bson::String("1".into()))
        .await
        .unwrap()
        .expect("resident should be stored under string id");
    assert_eq!(resident.get_str("lotId").unwrap(), "A1");
    let accounts = resident.get_array("happixAccounts").unwrap();
    let first = accounts[0].as_document().unwrap();
    assert_eq!(first.get_str("nomBorne").unwrap(), "B1");

    let admin = store
        .find_one(USERS, "username", &Bson::String("admin".into()))
        .await
        .unwrap()
        .unwrap();
    assert!(is_verifier_compatible(admin.get_str("password").unwrap()));
    assert!(admin.get_datetime("createdAt").is_ok());

    // Second run: both phases skip.
    let second = run_seed(&store, &config).await.unwrap();
    assert_eq!(second.admin, Some(AdminOutcome::AlreadyPresent));
    assert_eq!(second.residents, Some(ImportOutcome::AlreadyPresent(1)));
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_unique_username_index_rejects_duplicate_admin() {
    let container = Mongo::default().start().await.expect("Failed to start mongo");
    let port = container.get_host_port_ipv4(27017).await.unwrap();
    let store = MongoStore::connect(&format!("mongodb://127.0.0.1:{port}/copro-connect"))
        .await
        .unwrap();

    store.ensure_unique_index(USERS, "username").await.unwrap();
    // Declaring the same index twice is harmless.
    store.ensure_unique_index(USERS, "username").await.unwrap();

    store
        .insert_one(USERS, mongodb::bson::doc! { "username": "admin" })
        .await
        .unwrap();
    let err = store
        .insert_one(USERS, mongodb::bson::doc! { "username": "admin" })
        .await
        .unwrap_err();
    assert!(matches!(err, seeder::store::StoreError::DuplicateKey { .. }));

    let names = store.database().list_collection_names().await.unwrap();
    assert!(names.contains(&USERS.to_string()));
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_uri_without_database_rejected() {
    let container = Mongo::default().start().await.expect("Failed to start mongo");
    let port = container.get_host_port_ipv4(27017).await.unwrap();
    let result = MongoStore::connect(&format!("mongodb://127.0.0.1:{port}")).await;
    assert!(result.is_err());
}
