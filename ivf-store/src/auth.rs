//! Local account directory with salted PBKDF2 password hashes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::StoreError;

const SALT_LENGTH: usize = 16;
const HASH_LENGTH: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub email: String,
    password_hash: String,
    password_salt: String,
    password_iterations: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_login_at: Option<DateTime<Utc>>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Username {0} is already taken")]
    DuplicateUsername(String),
    #[error("Email {0} is already registered")]
    DuplicateEmail(String),
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("User {0} not found")]
    UserNotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Every account on this device plus the pointer to whoever is signed in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthDirectory {
    pub users: Vec<User>,
    pub current_user: Option<String>,
}

impl AuthDirectory {
    pub fn user(&self, user_id: &str) -> Option<&User> {
        self.users.iter().find(|user| user.id == user_id)
    }

    pub fn current(&self) -> Option<&User> {
        self.current_user.as_deref().and_then(|id| self.user(id))
    }

    /// Add an account. Usernames and emails are unique ignoring case.
    pub fn register(
        &mut self,
        username: &str,
        display_name: &str,
        email: &str,
        password: &str,
        iterations: u32,
        now: DateTime<Utc>,
    ) -> Result<User, AuthError> {
        let username = username.trim();
        let email = email.trim();
        if self
            .users
            .iter()
            .any(|user| user.username.eq_ignore_ascii_case(username))
        {
            return Err(AuthError::DuplicateUsername(username.to_string()));
        }
        if self
            .users
            .iter()
            .any(|user| user.email.eq_ignore_ascii_case(email))
        {
            return Err(AuthError::DuplicateEmail(email.to_string()));
        }

        let salt = generate_salt();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            display_name: display_name.trim().to_string(),
            email: email.to_string(),
            password_hash: hash_password(password, &salt, iterations),
            password_salt: STANDARD.encode(salt),
            password_iterations: iterations,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        };
        self.users.push(user.clone());
        Ok(user)
    }

    /// Check a username/password pair and stamp the login time.
    pub fn authenticate(
        &mut self,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<User, AuthError> {
        let user = self
            .users
            .iter_mut()
            .find(|user| user.username.eq_ignore_ascii_case(username.trim()))
            .ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(user, password) {
            return Err(AuthError::InvalidCredentials);
        }
        user.last_login_at = Some(now);
        Ok(user.clone())
    }

    pub fn remove(&mut self, user_id: &str) -> Result<User, AuthError> {
        let index = self
            .users
            .iter()
            .position(|user| user.id == user_id)
            .ok_or_else(|| AuthError::UserNotFound(user_id.to_string()))?;
        if self.current_user.as_deref() == Some(user_id) {
            self.current_user = None;
        }
        Ok(self.users.remove(index))
    }
}

fn generate_salt() -> [u8; SALT_LENGTH] {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LENGTH] {
    let mut hash = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut hash);
    hash
}

fn hash_password(password: &str, salt: &[u8], iterations: u32) -> String {
    STANDARD.encode(derive(password, salt, iterations))
}

fn verify_password(user: &User, password: &str) -> bool {
    let (Ok(salt), Ok(expected)) = (
        STANDARD.decode(&user.password_salt),
        STANDARD.decode(&user.password_hash),
    ) else {
        tracing::warn!(user_id = %user.id, "stored password hash is not valid base64");
        return false;
    };
    let actual = derive(password, &salt, user.password_iterations);
    actual.as_slice().ct_eq(expected.as_slice()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const FAST: u32 = 1_000;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0)
            .single()
            .expect("timestamp")
    }

    #[test]
    fn register_and_authenticate() {
        let mut directory = AuthDirectory::default();
        let user = directory
            .register("hope", "Hope", "hope@example.com", "s3cret!", FAST, now())
            .expect("register");
        assert_ne!(user.password_hash, "s3cret!");

        let logged_in = directory
            .authenticate("HOPE", "s3cret!", now())
            .expect("login");
        assert_eq!(logged_in.id, user.id);
        assert_eq!(logged_in.last_login_at, Some(now()));
    }

    #[test]
    fn wrong_password_is_rejected() {
        let mut directory = AuthDirectory::default();
        directory
            .register("hope", "Hope", "hope@example.com", "s3cret!", FAST, now())
            .expect("register");
        assert!(matches!(
            directory.authenticate("hope", "guess", now()),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            directory.authenticate("nobody", "s3cret!", now()),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn duplicates_are_rejected_ignoring_case() {
        let mut directory = AuthDirectory::default();
        directory
            .register("hope", "Hope", "hope@example.com", "pw", FAST, now())
            .expect("register");
        assert!(matches!(
            directory.register("Hope", "Other", "other@example.com", "pw", FAST, now()),
            Err(AuthError::DuplicateUsername(_))
        ));
        assert!(matches!(
            directory.register("other", "Other", "HOPE@example.com", "pw", FAST, now()),
            Err(AuthError::DuplicateEmail(_))
        ));
        assert_eq!(directory.users.len(), 1);
    }

    #[test]
    fn same_password_gets_different_salts() {
        let mut directory = AuthDirectory::default();
        let a = directory
            .register("a", "A", "a@example.com", "same", FAST, now())
            .expect("a");
        let b = directory
            .register("b", "B", "b@example.com", "same", FAST, now())
            .expect("b");
        assert_ne!(a.password_salt, b.password_salt);
        assert_ne!(a.password_hash, b.password_hash);
    }

    #[test]
    fn removing_current_user_clears_pointer() {
        let mut directory = AuthDirectory::default();
        let user = directory
            .register("hope", "Hope", "hope@example.com", "pw", FAST, now())
            .expect("register");
        directory.current_user = Some(user.id.clone());
        directory.remove(&user.id).expect("remove");
        assert!(directory.current().is_none());
        assert!(matches!(
            directory.remove(&user.id),
            Err(AuthError::UserNotFound(_))
        ));
    }
}
