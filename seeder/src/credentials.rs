//! Bootstrap of the default administrator account.
//!
//! The application authenticates with Spring Security's
//! `BCryptPasswordEncoder`, which only accepts hashes matching its bcrypt
//! pattern. The hash written here therefore uses the `$2a$` version tag and a
//! cost of 10, the encoder's defaults.

use std::sync::OnceLock;

use bcrypt::Version;
use chrono::{DateTime as ChronoDateTime, Utc};
use mongodb::bson::{self, Bson, DateTime};
use regex::Regex;
use serde::Serialize;

use crate::SeedError;
use crate::store::{DocumentStore, StoreError, USERS};

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_DEFAULT_PASSWORD: &str = "admin123";
pub const ADMIN_NAME: &str = "Administrateur";
pub const ADMIN_EMAIL: &str = "admin@copro-connect.fr";
pub const ADMIN_ROLE: &str = "ADMIN";

/// bcrypt work factor expected by the verifier.
pub const BCRYPT_COST: u32 = 10;

/// Hash shape accepted by the verifier for the `$2a$` version.
const VERIFIER_PATTERN: &str = r"\A\$2a\$(\d\d)\$[./0-9A-Za-z]{53}\z";

static VERIFIER_REGEX: OnceLock<Regex> = OnceLock::new();

/// Identity of the bootstrap administrator. `Default` is the account the
/// application documents for first login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSeed {
    pub username: String,
    pub password: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl Default for AdminSeed {
    fn default() -> Self {
        Self {
            username: ADMIN_USERNAME.to_owned(),
            password: ADMIN_DEFAULT_PASSWORD.to_owned(),
            name: ADMIN_NAME.to_owned(),
            email: ADMIN_EMAIL.to_owned(),
            role: ADMIN_ROLE.to_owned(),
        }
    }
}

/// Document written to the `users` collection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAccount {
    pub username: String,
    pub password: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub mfa_enabled: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl AdminAccount {
    /// The account for `seed`, with `password_hash` already computed.
    pub fn bootstrap(seed: &AdminSeed, password_hash: String, now: ChronoDateTime<Utc>) -> Self {
        let now = DateTime::from_millis(now.timestamp_millis());
        Self {
            username: seed.username.clone(),
            password: password_hash,
            name: seed.name.clone(),
            email: seed.email.clone(),
            role: seed.role.clone(),
            mfa_enabled: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminOutcome {
    Created,
    AlreadyPresent,
    /// Another run inserted the account between our check and our write.
    LostRace,
}

impl std::fmt::Display for AdminOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdminOutcome::Created => write!(f, "Admin user created"),
            AdminOutcome::AlreadyPresent => write!(f, "Admin user already present"),
            AdminOutcome::LostRace => {
                write!(f, "Admin user created concurrently by another run")
            }
        }
    }
}

/// Hash a plaintext password as `$2a$10$...`.
pub fn hash_password(password: &str) -> Result<String, SeedError> {
    let parts = bcrypt::hash_with_result(password, BCRYPT_COST)?;
    Ok(parts.format_for_version(Version::TwoA))
}

/// Check `password` against a stored bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, SeedError> {
    Ok(bcrypt::verify(password, hash)?)
}

/// True when the verifier will classify `hash` as a `$2a$` bcrypt hash.
pub fn is_verifier_compatible(hash: &str) -> bool {
    VERIFIER_REGEX
        .get_or_init(|| Regex::new(VERIFIER_PATTERN).expect("verifier pattern is valid"))
        .captures(hash)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .is_some_and(|cost| (4..=31).contains(&cost))
}

/// Create the administrator described by `seed` unless a user with that
/// username exists.
///
/// Store errors propagate; a duplicate-key rejection on insert means another
/// run won the race and is reported as [`AdminOutcome::LostRace`].
pub async fn ensure_admin_user(
    store: &dyn DocumentStore,
    seed: &AdminSeed,
) -> Result<AdminOutcome, SeedError> {
    let username = Bson::String(seed.username.clone());
    if store.find_one(USERS, "username", &username).await?.is_some() {
        tracing::info!(username = %seed.username, "Admin user already present, skipping");
        return Ok(AdminOutcome::AlreadyPresent);
    }

    store.ensure_unique_index(USERS, "username").await?;

    let account = AdminAccount::bootstrap(seed, hash_password(&seed.password)?, Utc::now());
    match store.insert_one(USERS, bson::to_document(&account)?).await {
        Ok(()) => {
            tracing::info!(username = %seed.username, email = %seed.email, "Admin user created");
            Ok(AdminOutcome::Created)
        }
        Err(StoreError::DuplicateKey { .. }) => {
            tracing::warn!(
                username = %seed.username,
                "Admin user inserted concurrently by another run, skipping"
            );
            Ok(AdminOutcome::LostRace)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqlStore;
    use mongodb::bson::doc;

    async fn setup() -> SqlStore {
        SqlStore::connect("sqlite::memory:").await.unwrap()
    }

    // --- hash_password ---

    #[test]
    fn test_hash_uses_2a_prefix_and_cost_10() {
        let hash = hash_password("admin123").unwrap();
        assert!(hash.starts_with("$2a$10$"), "Expected $2a$10$ bcrypt hash, got: {hash}");
        assert_eq!(hash.len(), 60);
    }

    #[test]
    fn test_hash_unique_per_call() {
        let h1 = hash_password("same").unwrap();
        let h2 = hash_password("same").unwrap();
        assert_ne!(h1, h2, "Same password hashed twice should produce different hashes");
    }

    #[test]
    fn test_hash_verifies_correctly() {
        let hash = hash_password(ADMIN_DEFAULT_PASSWORD).unwrap();
        assert!(verify_password(ADMIN_DEFAULT_PASSWORD, &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    // --- is_verifier_compatible ---

    #[test]
    fn test_generated_hash_is_verifier_compatible() {
        let hash = hash_password("anything").unwrap();
        assert!(is_verifier_compatible(&hash));
    }

    #[test]
    fn test_2b_hash_not_verifier_compatible() {
        let hash = bcrypt::hash_with_result("pw", 4)
            .unwrap()
            .format_for_version(Version::TwoB);
        assert!(!is_verifier_compatible(&hash));
    }

    #[test]
    fn test_garbage_not_verifier_compatible() {
        assert!(!is_verifier_compatible("admin123"));
        assert!(!is_verifier_compatible("$argon2id$v=19$m=19456,t=2,p=1$abc$def"));
        assert!(!is_verifier_compatible("$2a$10$tooshort"));
    }

    // --- AdminAccount ---

    #[test]
    fn test_account_document_uses_storage_field_names() {
        let now = Utc::now();
        let account = AdminAccount::bootstrap(&AdminSeed::default(), "$2a$10$hash".into(), now);
        let document = bson::to_document(&account).unwrap();

        let keys: Vec<&String> = document.keys().collect();
        assert_eq!(
            keys,
            ["username", "password", "name", "email", "role", "mfaEnabled", "createdAt", "updatedAt"]
        );
        assert_eq!(document.get_str("role").unwrap(), "ADMIN");
        assert!(document.get_bool("mfaEnabled").unwrap());
        assert_eq!(
            document.get_datetime("createdAt").unwrap().timestamp_millis(),
            now.timestamp_millis()
        );
    }

    // --- ensure_admin_user ---

    #[tokio::test]
    async fn test_creates_admin_on_empty_store() {
        let store = setup().await;
        let outcome = ensure_admin_user(&store, &AdminSeed::default()).await.unwrap();
        assert_eq!(outcome, AdminOutcome::Created);

        let admin = store
            .find_one(USERS, "username", &Bson::String("admin".into()))
            .await
            .unwrap()
            .expect("admin should exist");
        assert_eq!(admin.get_str("name").unwrap(), ADMIN_NAME);
        assert_eq!(admin.get_str("email").unwrap(), ADMIN_EMAIL);
        assert_eq!(admin.get_str("role").unwrap(), ADMIN_ROLE);
        assert!(admin.get_bool("mfaEnabled").unwrap());
        assert!(admin.get_datetime("createdAt").is_ok());
        assert!(admin.get_datetime("updatedAt").is_ok());
    }

    #[tokio::test]
    async fn test_stored_hash_verifies_default_password() {
        let store = setup().await;
        ensure_admin_user(&store, &AdminSeed::default()).await.unwrap();

        let admin = store
            .find_one(USERS, "username", &Bson::String("admin".into()))
            .await
            .unwrap()
            .unwrap();
        let hash = admin.get_str("password").unwrap();
        assert_ne!(hash, ADMIN_DEFAULT_PASSWORD, "Plaintext must never be stored");
        assert!(is_verifier_compatible(hash));
        assert!(verify_password(ADMIN_DEFAULT_PASSWORD, hash).unwrap());
    }

    #[tokio::test]
    async fn test_second_run_skips() {
        let store = setup().await;
        let seed = AdminSeed::default();
        assert_eq!(ensure_admin_user(&store, &seed).await.unwrap(), AdminOutcome::Created);
        assert_eq!(ensure_admin_user(&store, &seed).await.unwrap(), AdminOutcome::AlreadyPresent);
        assert_eq!(store.count(USERS).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_existing_admin_not_overwritten() {
        let store = setup().await;
        store
            .insert_one(USERS, doc! { "username": "admin", "password": "keep-me" })
            .await
            .unwrap();

        let outcome = ensure_admin_user(&store, &AdminSeed::default()).await.unwrap();
        assert_eq!(outcome, AdminOutcome::AlreadyPresent);
        let admin = store
            .find_one(USERS, "username", &Bson::String("admin".into()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.get_str("password").unwrap(), "keep-me");
    }

    #[tokio::test]
    async fn test_custom_seed_identity_is_used() {
        let store = setup().await;
        let seed = AdminSeed {
            username: "syndic".into(),
            password: "s3cret-pw".into(),
            email: "syndic@copro-connect.fr".into(),
            ..AdminSeed::default()
        };
        assert_eq!(ensure_admin_user(&store, &seed).await.unwrap(), AdminOutcome::Created);

        let stored = store
            .find_one(USERS, "username", &Bson::String("syndic".into()))
            .await
            .unwrap()
            .expect("custom admin should exist");
        assert_eq!(stored.get_str("email").unwrap(), "syndic@copro-connect.fr");
        assert_eq!(stored.get_str("role").unwrap(), ADMIN_ROLE);
        assert!(verify_password("s3cret-pw", stored.get_str("password").unwrap()).unwrap());
        assert_eq!(ensure_admin_user(&store, &seed).await.unwrap(), AdminOutcome::AlreadyPresent);
    }

    #[tokio::test]
    async fn test_other_users_do_not_block_bootstrap() {
        let store = setup().await;
        store.insert_one(USERS, doc! { "username": "gestionnaire" }).await.unwrap();
        let outcome = ensure_admin_user(&store, &AdminSeed::default()).await.unwrap();
        assert_eq!(outcome, AdminOutcome::Created);
        assert_eq!(store.count(USERS).await.unwrap(), 2);
    }
}
