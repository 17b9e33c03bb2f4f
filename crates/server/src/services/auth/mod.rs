//! Authentication service.
//!
//! Provides password signup and login.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use readieg_core::{Email, UserId};

use crate::db::{RepositoryError, Store};
use crate::models::user::User;

/// Minimum display name length, after trimming.
const MIN_NAME_LENGTH: usize = 2;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Authentication service.
///
/// Handles user registration, login and session user lookup.
pub struct AuthService<'a> {
    store: &'a dyn Store,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SignupRejected` if the name, email or password is
    /// invalid, or the email is already registered.
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<User, AuthError> {
        let name = name.trim();
        if name.chars().count() < MIN_NAME_LENGTH {
            return Err(AuthError::SignupRejected("name too short"));
        }

        let email = Email::parse(email).map_err(|_| AuthError::SignupRejected("invalid email"))?;

        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::SignupRejected("password too short"));
        }

        let password_hash = hash_password(password)?;

        self.store
            .create_user(name, &email, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::SignupRejected("email already registered"),
                other => AuthError::Repository(other),
            })
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Get the user a session refers to, if they still exist.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the lookup fails.
    pub async fn current_user(&self, user_id: UserId) -> Result<Option<User>, AuthError> {
        Ok(self.store.find_user_by_id(user_id).await?)
    }
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::{InMemoryStore, UserRepository};

    #[test]
    fn test_hash_is_argon2id_and_verifies() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("battery staple", &hash),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            verify_password("anything", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_signup_normalizes_and_stores_hash() {
        let store = InMemoryStore::new();
        let auth = AuthService::new(&store);

        let user = auth
            .signup("  Bilbo  ", " Bilbo@Shire.ME ", "precious")
            .await
            .unwrap();
        assert_eq!(user.name, "Bilbo");
        assert_eq!(user.email.as_str(), "bilbo@shire.me");

        let (_, hash) = store
            .find_user_by_email(&user.email)
            .await
            .unwrap()
            .unwrap();
        assert_ne!(hash, "precious");
    }

    #[tokio::test]
    async fn test_signup_validation_failures_are_all_rejections() {
        let store = InMemoryStore::new();
        let auth = AuthService::new(&store);

        for (name, email, password) in [
            (" B ", "b@example.com", "secret1"),
            ("Bob", "bob.example.com", "secret1"),
            ("Bob", "bob@example.com", "12345"),
        ] {
            let err = auth.signup(name, email, password).await.unwrap_err();
            assert!(matches!(err, AuthError::SignupRejected(_)), "{name} {email}");
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected_case_insensitively() {
        let store = InMemoryStore::new();
        let auth = AuthService::new(&store);

        auth.signup("Ada", "ada@example.com", "secret1").await.unwrap();
        let err = auth
            .signup("Ada Again", "ADA@Example.com", "secret2")
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::SignupRejected(_)));
        let (user, _) = store
            .find_user_by_email(&Email::parse("ada@example.com").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.name, "Ada");
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let store = InMemoryStore::new();
        let auth = AuthService::new(&store);
        auth.signup("Ada", "ada@example.com", "secret1").await.unwrap();

        let wrong_password = auth.login("ada@example.com", "nope").await.unwrap_err();
        let unknown_email = auth.login("eve@example.com", "secret1").await.unwrap_err();
        let malformed = auth.login("", "").await.unwrap_err();

        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_email, AuthError::InvalidCredentials));
        assert!(matches!(malformed, AuthError::InvalidCredentials));

        let user = auth.login("  ADA@example.com", "secret1").await.unwrap();
        assert_eq!(auth.current_user(user.id).await.unwrap(), Some(user));
        assert_eq!(auth.current_user(UserId::generate()).await.unwrap(), None);
    }
}
