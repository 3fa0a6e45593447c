//! User accounts
//!
//! Registration and login over the store's user table. Passwords are kept
//! as BLAKE3 derived-key hashes, salted with the username.

use crate::storage::FileStore;
use thiserror::Error;

const PASSWORD_CONTEXT: &str = "jaxOS 2026-10-19 user password hash v1";

pub const MAX_USERNAME_CHARS: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("username must be 1-{MAX_USERNAME_CHARS} letters, digits, '-' or '_'")]
    InvalidUsername,

    #[error("password must not be empty")]
    EmptyPassword,

    #[error("user {0} already exists")]
    UserExists(String),

    #[error("user table unavailable")]
    Unavailable,
}

fn password_digest(username: &str, password: &str) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new_derive_key(PASSWORD_CONTEXT);
    hasher.update(username.as_bytes());
    hasher.update(&[0]);
    hasher.update(password.as_bytes());
    hasher.finalize()
}

/// Hex digest stored in the user table.
pub fn hash_password(username: &str, password: &str) -> String {
    password_digest(username, password).to_hex().to_string()
}

fn valid_username(username: &str) -> bool {
    let count = username.chars().count();
    (1..=MAX_USERNAME_CHARS).contains(&count)
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub fn register(store: &dyn FileStore, username: &str, password: &str) -> Result<(), AuthError> {
    if !valid_username(username) {
        return Err(AuthError::InvalidUsername);
    }
    if password.is_empty() {
        return Err(AuthError::EmptyPassword);
    }
    if store.password_hash(username).is_some() {
        return Err(AuthError::UserExists(username.to_string()));
    }

    if store.create_user(username, &hash_password(username, password)) {
        log::info!("Registered user {username}");
        Ok(())
    } else if store.password_hash(username).is_some() {
        Err(AuthError::UserExists(username.to_string()))
    } else {
        Err(AuthError::Unavailable)
    }
}

/// `true` when `password` matches the stored hash. Unknown users never match.
pub fn verify(store: &dyn FileStore, username: &str, password: &str) -> bool {
    let Some(stored) = store.password_hash(username) else {
        return false;
    };
    let Ok(stored) = blake3::Hash::from_hex(stored.trim()) else {
        log::warn!("Corrupt password hash for {username}");
        return false;
    };

    // blake3::Hash equality is constant-time.
    password_digest(username, password) == stored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_register_then_verify() {
        let store = MemoryStore::new();
        register(&store, "ada", "lovelace").unwrap();

        assert!(verify(&store, "ada", "lovelace"));
        assert!(!verify(&store, "ada", "Lovelace"));
        assert!(!verify(&store, "bob", "lovelace"));
        assert_eq!(store.user_count(), 1);
    }

    #[test]
    fn test_password_is_not_stored_in_clear() {
        let store = MemoryStore::new();
        register(&store, "ada", "lovelace").unwrap();

        let stored = store.password_hash("ada").unwrap();
        assert_eq!(stored.len(), 64);
        assert!(!stored.contains("lovelace"));
        assert_eq!(stored, hash_password("ada", "lovelace"));
        assert_ne!(stored, hash_password("bob", "lovelace"));
    }

    #[test]
    fn test_register_rejections() {
        let store = MemoryStore::new();
        register(&store, "ada", "x").unwrap();

        assert_eq!(
            register(&store, "ada", "y"),
            Err(AuthError::UserExists("ada".to_string()))
        );
        assert_eq!(register(&store, "", "y"), Err(AuthError::InvalidUsername));
        assert_eq!(register(&store, "a b", "y"), Err(AuthError::InvalidUsername));
        assert_eq!(
            register(&store, &"a".repeat(MAX_USERNAME_CHARS + 1), "y"),
            Err(AuthError::InvalidUsername)
        );
        assert_eq!(register(&store, "bob", ""), Err(AuthError::EmptyPassword));
        assert!(verify(&store, "ada", "x"));
    }

    #[test]
    fn test_corrupt_hash_never_matches() {
        let store = MemoryStore::new();
        assert!(store.create_user("eve", "not-a-hash"));
        assert!(!verify(&store, "eve", "not-a-hash"));
    }
}
