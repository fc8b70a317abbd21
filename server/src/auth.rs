//! In-memory user directory
//!
//! Stands in for the external identity store: it answers "who owns this
//! email" and "is this password right". The request dispatcher resolves
//! identity here before calling the ranking engine or the session registry.

use crate::error::AuthError;
use chrono::Utc;
use log::info;
use rand::RngCore;
use sha2::{Digest, Sha256};
use shared::User;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredUser {
    user: User,
    salt: String,
    password_hash: String,
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn new_salt() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[derive(Default)]
pub struct UserDirectory {
    users: RwLock<HashMap<String, StoredUser>>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn find_by_email(&self, email: &str) -> Option<User> {
        let users = self.users.read().await;
        users.get(email).map(|stored| stored.user.clone())
    }

    pub async fn verify_password(&self, email: &str, password: &str) -> bool {
        let users = self.users.read().await;
        users
            .get(email)
            .map_or(false, |stored| hash_password(&stored.salt, password) == stored.password_hash)
    }

    /// Registers a new account with a generated id.
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        self.create_user_with_id(&Uuid::new_v4().to_string(), username, email, password)
            .await
    }

    /// Registers a new account under a caller-chosen id.
    pub async fn create_user_with_id(
        &self,
        id: &str,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let mut users = self.users.write().await;
        if users.contains_key(email) {
            return Err(AuthError::EmailTaken);
        }

        let user = User {
            id: id.to_string(),
            username: username.to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        let salt = new_salt();
        let password_hash = hash_password(&salt, password);

        users.insert(
            email.to_string(),
            StoredUser {
                user: user.clone(),
                salt,
                password_hash,
            },
        );
        info!("Registered user {} ({})", user.username, user.id);
        Ok(user)
    }

    /// Checks credentials and returns the account on success.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let users = self.users.read().await;
        let stored = users.get(email).ok_or(AuthError::UserNotFound)?;

        if hash_password(&stored.salt, password) != stored.password_hash {
            return Err(AuthError::InvalidPassword);
        }
        Ok(stored.user.clone())
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_find_user() {
        let directory = UserDirectory::new();
        let user = directory
            .create_user("NewPlayer", "new@snake.io", "pass")
            .await
            .unwrap();

        assert_eq!(user.username, "NewPlayer");
        assert_eq!(directory.find_by_email("new@snake.io").await, Some(user));
        assert_eq!(directory.find_by_email("ghost@snake.io").await, None);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let directory = UserDirectory::new();
        directory
            .create_user("DemoPlayer", "demo@snake.io", "demo")
            .await
            .unwrap();

        let err = directory
            .create_user("Imposter", "demo@snake.io", "other")
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::EmailTaken);
        assert_eq!(err.to_string(), "Email already registered");
        assert_eq!(directory.len().await, 1);
    }

    #[tokio::test]
    async fn test_login_reasons() {
        let directory = UserDirectory::new();
        directory
            .create_user_with_id("1", "DemoPlayer", "demo@snake.io", "demo")
            .await
            .unwrap();

        let user = directory.login("demo@snake.io", "demo").await.unwrap();
        assert_eq!(user.id, "1");

        assert_eq!(
            directory.login("demo@snake.io", "wrong").await,
            Err(AuthError::InvalidPassword)
        );
        assert_eq!(
            directory.login("nobody@snake.io", "demo").await,
            Err(AuthError::UserNotFound)
        );
        assert!(directory.verify_password("demo@snake.io", "demo").await);
        assert!(!directory.verify_password("demo@snake.io", "Demo").await);
    }

    #[test]
    fn test_same_password_gets_different_salts() {
        tokio_test::block_on(async {
            let directory = UserDirectory::new();
            directory.create_user("A", "a@snake.io", "same").await.unwrap();
            directory.create_user("B", "b@snake.io", "same").await.unwrap();

            let users = directory.users.read().await;
            assert_ne!(users["a@snake.io"].salt, users["b@snake.io"].salt);
            assert_ne!(
                users["a@snake.io"].password_hash,
                users["b@snake.io"].password_hash
            );
        });
    }

    #[test]
    fn test_password_hash_depends_on_salt() {
        assert_eq!(hash_password("aa", "pw"), hash_password("aa", "pw"));
        assert_ne!(hash_password("aa", "pw"), hash_password("bb", "pw"));
        assert_eq!(new_salt().len(), 32);
    }
}
