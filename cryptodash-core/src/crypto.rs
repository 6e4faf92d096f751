//! Token hashing and constant-time verification.
//!
//! Session and CSRF tokens are 256-bit random values. Only the SHA-256 hash of
//! a session token is persisted, and lookups compare hashes with
//! [`subtle::ConstantTimeEq`] so a mismatch position is not observable through
//! timing.

use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Generate a 256-bit random token encoded as URL-safe base64 (43 characters).
///
/// Uses the thread-local CSPRNG, which is seeded from the operating system.
pub fn generate_secure_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, bytes)
}

/// Hex-encoded SHA-256 of a token.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hash `token` and compare it against `stored_hash` in constant time.
pub fn verify_token_hash(token: &str, stored_hash: &str) -> bool {
    let computed_hash = hash_token(token);
    constant_time_compare(computed_hash.as_bytes(), stored_hash.as_bytes())
}

/// Constant-time equality for byte slices. Slices of different length are unequal.
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_token() {
        let token = generate_secure_token();
        let hash = hash_token(&token);

        assert!(verify_token_hash(&token, &hash));
        assert!(!verify_token_hash("wrong_token", &hash));
    }

    #[test]
    fn test_generated_tokens_are_distinct() {
        let a = generate_secure_token();
        let b = generate_secure_token();
        assert_eq!(a.len(), 43);
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_produces_hex_string() {
        let hash = hash_token("test_token");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare(b"hello", b"hello"));
        assert!(!constant_time_compare(b"hello", b"world"));
        assert!(!constant_time_compare(b"short", b"longer_string"));
    }
}
