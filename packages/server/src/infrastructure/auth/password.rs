//! Room password hashing.

use argon2::{
    Argon2,
    password_hash::{
        Error as PasswordHashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        rand_core::OsRng,
    },
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    Hash(PasswordHashError),
}

/// Argon2id hashing of room passwords, stored in PHC string format.
#[derive(Default)]
pub struct RoomPasswordHasher {
    argon2: Argon2<'static>,
}

impl RoomPasswordHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(PasswordError::Hash)
    }

    /// Check `password` against a stored PHC hash. The digest comparison is
    /// constant-time; an unparsable hash never verifies.
    pub fn verify(&self, password: &str, stored_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            tracing::warn!("Stored room password hash is not a valid PHC string");
            return false;
        };
        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        // テスト項目: ハッシュ化したパスワードが正しいときだけ検証に成功する
        // given (前提条件):
        let hasher = RoomPasswordHasher::new();
        let hash = hasher.hash("secret123").unwrap();

        // when (操作):
        let correct = hasher.verify("secret123", &hash);
        let wrong = hasher.verify("wrong", &hash);

        // then (期待する結果):
        assert!(correct);
        assert!(!wrong);
        assert!(hash.starts_with("$argon2"));
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        // テスト項目: 同じパスワードでもソルトにより異なるハッシュになる
        // given (前提条件):
        let hasher = RoomPasswordHasher::new();

        // when (操作):
        let first = hasher.hash("secret123").unwrap();
        let second = hasher.hash("secret123").unwrap();

        // then (期待する結果):
        assert_ne!(first, second);
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        // テスト項目: 不正な形式のハッシュでは検証に失敗する
        // given (前提条件):
        let hasher = RoomPasswordHasher::new();

        // when (操作):
        let result = hasher.verify("secret123", "plaintext-not-a-hash");

        // then (期待する結果):
        assert!(!result);
    }
}
