//! Prefixed random identifiers (`usr_…`) with 96 bits of entropy.

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use rand::RngCore;

/// Generate an ID of the form `{prefix}_{random}`.
pub fn generate_prefixed_id(prefix: &str) -> String {
    let mut bytes = [0u8; 12];
    rand::rng().fill_bytes(&mut bytes);

    format!("{prefix}_{}", BASE64_URL_SAFE_NO_PAD.encode(bytes))
}

/// Check that `id` carries `expected_prefix` and a non-empty random part.
pub fn validate_prefixed_id(id: &str, expected_prefix: &str) -> bool {
    id.strip_prefix(expected_prefix)
        .and_then(|rest| rest.strip_prefix('_'))
        .is_some_and(|random| {
            !random.is_empty()
                && random
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_prefixed_id() {
        let id = generate_prefixed_id("usr");
        assert!(id.starts_with("usr_"));
        // 12 bytes -> 16 base64 characters
        assert_eq!(id.len(), "usr_".len() + 16);
        assert!(validate_prefixed_id(&id, "usr"));
    }

    #[test]
    fn test_validate_prefixed_id() {
        assert!(!validate_prefixed_id("usr_", "usr"));
        assert!(!validate_prefixed_id("sess_abc", "usr"));
        assert!(!validate_prefixed_id("usr_a b", "usr"));
        assert!(validate_prefixed_id("usr_abc-DEF_1", "usr"));
    }
}
