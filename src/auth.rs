//! Password hashing and login flows
//!
//! Hashing and verification are pure functions; only `register`, `login` and
//! `change_password` touch a store, and only through the `ProjectStore` trait.

use crate::model::User;
use crate::storage::ProjectStore;
use crate::validate;
use crate::Result;
use sha2::{Digest, Sha256};

/// Hash a plaintext password.
///
/// Returns the hex-encoded SHA-256 digest (64 characters), the format
/// existing ProjetoX user records are stored in.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Check a plaintext password against a stored hash by re-hashing it
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    hash_password(password) == stored_hash
}

/// Result of a login attempt
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    Authenticated(User),
    UnknownUser,
    WrongPassword,
}

impl LoginOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, LoginOutcome::Authenticated(_))
    }
}

/// Create a login account. Fails with `UniqueConstraint` if the name is taken.
pub fn register(store: &dyn ProjectStore, name: &str, password: &str) -> Result<i64> {
    let name = name.trim();
    validate::validate_user_name(name)?;
    validate::validate_password(password)?;

    let id = store.create_user(name, &hash_password(password))?;
    tracing::info!(user = name, id, "registered user");
    Ok(id)
}

pub fn login(store: &dyn ProjectStore, name: &str, password: &str) -> Result<LoginOutcome> {
    let Some(user) = store.find_user(name.trim())? else {
        tracing::debug!(user = name, "login for unknown user");
        return Ok(LoginOutcome::UnknownUser);
    };

    if verify_password(password, &user.password_hash) {
        Ok(LoginOutcome::Authenticated(user))
    } else {
        tracing::warn!(user = %user.name, "login rejected: wrong password");
        Ok(LoginOutcome::WrongPassword)
    }
}

/// Replace a user's password after checking the current one.
///
/// Returns `false` if the user does not exist or `current` does not match.
pub fn change_password(
    store: &dyn ProjectStore,
    name: &str,
    current: &str,
    new_password: &str,
) -> Result<bool> {
    validate::validate_password(new_password)?;

    match login(store, name, current)? {
        LoginOutcome::Authenticated(user) => {
            store.update_password(&user.name, &hash_password(new_password))
        }
        LoginOutcome::UnknownUser | LoginOutcome::WrongPassword => Ok(false),
    }
}
