//! Token and secret helpers

use rand::RngCore;
use subtle::ConstantTimeEq;

/// Bytes of randomness in a per-node token
const TOKEN_BYTES: usize = 32;

/// Bytes of randomness in a node secret
const SECRET_BYTES: usize = 32;

/// Generate a fresh opaque per-node access token (hex encoded)
pub fn generate_token() -> String {
    random_hex(TOKEN_BYTES)
}

/// Generate a fresh node secret (hex encoded)
pub fn generate_secret() -> String {
    random_hex(SECRET_BYTES)
}

/// Compare two secrets in constant time.
///
/// Empty values never match.
pub fn secrets_match(expected: &str, presented: &str) -> bool {
    if expected.is_empty() || presented.is_empty() {
        return false;
    }
    expected.as_bytes().ct_eq(presented.as_bytes()).into()
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), TOKEN_BYTES * 2);
        assert_ne!(a, b);
    }

    #[test]
    fn test_secrets_match() {
        assert!(secrets_match("s1", "s1"));
        assert!(!secrets_match("s1", "s2"));
        assert!(!secrets_match("s1", "s1 "));
        assert!(!secrets_match("", ""));
    }
}
