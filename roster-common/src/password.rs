//! Password hashing for imported accounts
//!
//! Passwords arrive in plain text from roster spreadsheets and are never
//! stored as such. Each password is hashed as SHA-256 over `salt || password`
//! with a fresh random salt per write.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Stored form of a password
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash {
    /// 64 hex characters
    pub hash: String,
    /// 32 hex characters (16 random bytes)
    pub salt: String,
}

/// Hash a password with a newly generated salt
pub fn hash_password(password: &str) -> PasswordHash {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt: String = salt_bytes.iter().map(|b| format!("{:02x}", b)).collect();

    PasswordHash {
        hash: hash_with_salt(password, &salt),
        salt,
    }
}

/// Check a candidate password against a stored hash
pub fn verify_password(password: &str, stored: &PasswordHash) -> bool {
    hash_with_salt(password, &stored.salt) == stored.hash
}

fn hash_with_salt(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_has_expected_shape() {
        let stored = hash_password("s3cret");
        assert_eq!(stored.hash.len(), 64);
        assert_eq!(stored.salt.len(), 32);
    }

    #[test]
    fn test_verify_accepts_original_password() {
        let stored = hash_password("s3cret");
        assert!(verify_password("s3cret", &stored));
        assert!(!verify_password("S3cret", &stored));
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        let a = hash_password("same");
        let b = hash_password("same");
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.hash, b.hash);
    }
}
