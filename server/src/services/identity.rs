//! Identity service
//!
//! Registers users, verifies credentials and orchestrates account deletion.
//! Passwords are stored as salted Argon2id hashes in PHC string format.

use crate::database::{Repository, User, UserId};
use crate::error::{AppError, Result};
use crate::services::NoteCatalog;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;
use std::sync::Arc;

/// Service for user accounts
#[derive(Clone)]
pub struct IdentityStore {
    repo: Repository,
    /// Verified against when the email is unknown, so both failure paths
    /// cost one hash verification
    dummy_hash: Arc<str>,
}

impl IdentityStore {
    pub fn new(repo: Repository) -> Result<Self> {
        let dummy_hash = hash_password("notehub-dummy-credential")?;

        Ok(Self {
            repo,
            dummy_hash: Arc::from(dummy_hash),
        })
    }

    /// Create an account. The email is trimmed and lower-cased before it is
    /// checked for uniqueness or stored.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User> {
        let name = name.trim();
        let email = normalize_email(email);

        if name.is_empty() {
            return Err(AppError::MissingField("name"));
        }
        if email.is_empty() {
            return Err(AppError::MissingField("email"));
        }
        if password.is_empty() {
            return Err(AppError::MissingField("password"));
        }

        if self.repo.find_user_by_email(&email).await?.is_some() {
            tracing::info!("Registration rejected, email already in use");
            return Err(AppError::DuplicateEmail);
        }

        let password = password.to_owned();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AppError::PasswordHash(e.to_string()))??;

        let user = self.repo.create_user(name, &email, &password_hash).await?;

        tracing::info!("Registered user: {}", user.id);

        Ok(user)
    }

    /// Check an email/password pair. Unknown email and wrong password fail
    /// identically.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email);
        let user = self.repo.find_user_by_email(&email).await?;

        let stored_hash = match &user {
            Some(user) => user.password_hash.clone(),
            None => self.dummy_hash.to_string(),
        };
        let password = password.to_owned();
        let verified = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
            .await
            .map_err(|e| AppError::PasswordHash(e.to_string()))?;

        match user {
            Some(user) if verified => {
                tracing::info!("User authenticated: {}", user.id);
                Ok(user)
            }
            _ => {
                tracing::warn!("Rejected login attempt");
                Err(AppError::InvalidCredentials)
            }
        }
    }

    pub async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        self.repo.get_user(id).await
    }

    /// Delete an account and everything it owns.
    ///
    /// Each owned note goes through `NoteCatalog::delete`, blob cleanup
    /// included, before the user row is removed. Returns `false` if the
    /// user did not exist.
    pub async fn delete_user(&self, id: UserId, catalog: &NoteCatalog) -> Result<bool> {
        tracing::info!("Deleting user: {}", id);

        for note in catalog.notes_owned_by(id).await? {
            match catalog.delete(note.id, id).await {
                // Already gone through a concurrent request
                Ok(()) | Err(AppError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        let deleted = self.repo.delete_user(id).await?;

        tracing::info!("User deleted: {} (existed: {})", id, deleted);

        Ok(deleted)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::PasswordHash(e.to_string()))
}

fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::error!("Stored password hash is malformed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CatalogRules;
    use crate::database::create_test_pool;
    use crate::storage::BlobStore;
    use tempfile::TempDir;

    async fn create_test_services() -> (IdentityStore, NoteCatalog, TempDir) {
        let repo = Repository::new(create_test_pool().await);

        let temp_dir = TempDir::new().unwrap();
        let blob_store = BlobStore::new(temp_dir.path().join("uploads"));
        blob_store.initialize().await.unwrap();

        let identity = IdentityStore::new(repo.clone()).unwrap();
        let catalog = NoteCatalog::new(repo, blob_store, Arc::new(CatalogRules::default()));

        (identity, catalog, temp_dir)
    }

    #[tokio::test]
    async fn test_register_and_authenticate() {
        let (identity, _, _temp) = create_test_services().await;

        let user = identity.register("Ada", "ada@x.com", "pw1").await.unwrap();
        assert_eq!(user.email, "ada@x.com");
        assert_ne!(user.password_hash, "pw1");
        assert!(user.password_hash.starts_with("$argon2"));

        let authed = identity.authenticate("ada@x.com", "pw1").await.unwrap();
        assert_eq!(authed.id, user.id);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let (identity, _, _temp) = create_test_services().await;

        identity.register("Ada", "ada@x.com", "pw1").await.unwrap();
        let err = identity.register("Bob", "ada@x.com", "pw2").await.unwrap_err();

        assert!(matches!(err, AppError::DuplicateEmail));
    }

    #[tokio::test]
    async fn test_email_is_case_normalized() {
        let (identity, _, _temp) = create_test_services().await;

        let user = identity.register("Ada", "  Ada@X.com ", "pw1").await.unwrap();
        assert_eq!(user.email, "ada@x.com");

        let err = identity.register("Bob", "ADA@x.COM", "pw2").await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail));

        assert!(identity.authenticate("ADA@X.COM", "pw1").await.is_ok());
    }

    #[tokio::test]
    async fn test_register_requires_all_fields() {
        let (identity, _, _temp) = create_test_services().await;

        assert!(matches!(
            identity.register(" ", "a@x.com", "pw").await,
            Err(AppError::MissingField("name"))
        ));
        assert!(matches!(
            identity.register("Ada", "", "pw").await,
            Err(AppError::MissingField("email"))
        ));
        assert!(matches!(
            identity.register("Ada", "a@x.com", "").await,
            Err(AppError::MissingField("password"))
        ));
    }

    #[tokio::test]
    async fn test_failed_logins_are_indistinguishable() {
        let (identity, _, _temp) = create_test_services().await;
        identity.register("Ada", "ada@x.com", "pw1").await.unwrap();

        let wrong_password = identity.authenticate("ada@x.com", "nope").await.unwrap_err();
        let unknown_email = identity.authenticate("bob@x.com", "pw1").await.unwrap_err();

        assert!(matches!(wrong_password, AppError::InvalidCredentials));
        assert!(matches!(unknown_email, AppError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn test_delete_user_cascades_to_notes_and_blobs() {
        let (identity, catalog, _temp) = create_test_services().await;
        let ada = identity.register("Ada", "ada@x.com", "pw1").await.unwrap();
        let bob = identity.register("Bob", "bob@x.com", "pw2").await.unwrap();

        let first = catalog
            .create(ada.id, "Lecture 1", None, "Mathematics", "slides.pdf", b"one")
            .await
            .unwrap();
        let second = catalog
            .create(ada.id, "Lecture 2", None, "Physics", "notes.txt", b"two")
            .await
            .unwrap();
        let kept = catalog
            .create(bob.id, "Bob's notes", None, "Other", "bob.txt", b"bob")
            .await
            .unwrap();

        assert!(identity.delete_user(ada.id, &catalog).await.unwrap());

        assert!(identity.get_user(ada.id).await.unwrap().is_none());
        for note in [&first, &second] {
            assert!(matches!(catalog.get(note.id).await, Err(AppError::NotFound(_))));
            assert!(!catalog.blob_store().exists(&note.stored_filename).await.unwrap());
        }
        assert!(catalog.get(kept.id).await.is_ok());
        assert!(matches!(
            identity.authenticate("ada@x.com", "pw1").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_delete_unknown_user() {
        let (identity, catalog, _temp) = create_test_services().await;

        assert!(!identity.delete_user(999, &catalog).await.unwrap());
    }
}
