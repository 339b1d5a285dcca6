//! Password hashing and session token generation
//!
//! # Password hashes
//!
//! Hashes are salted, iterated SHA-256 encoded as
//! `sha256$<rounds>$<salt-hex>$<digest-hex>`. The round count travels with
//! the hash, so stored hashes stay verifiable if the default changes.
//!
//! # Tokens
//!
//! Session tokens are 128 random bits rendered as 32 lowercase hex characters.

use sha2::{Digest, Sha256};

const SCHEME: &str = "sha256";

/// Default iteration count for new hashes
pub const DEFAULT_HASH_ROUNDS: u32 = 10_000;

/// Password collaborator used by the login flow
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password for storage
    fn hash(&self, plaintext: &str) -> String;

    /// Check a plaintext password against a stored hash
    ///
    /// Malformed hashes never verify.
    fn verify(&self, plaintext: &str, hash: &str) -> bool;
}

/// Salted, iterated SHA-256 hasher
#[derive(Debug, Clone)]
pub struct Sha256PasswordHasher {
    rounds: u32,
}

impl Sha256PasswordHasher {
    pub fn new() -> Self {
        Self::with_rounds(DEFAULT_HASH_ROUNDS)
    }

    /// Create a hasher with a custom iteration count (minimum 1)
    pub fn with_rounds(rounds: u32) -> Self {
        Self {
            rounds: rounds.max(1),
        }
    }
}

impl Default for Sha256PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher for Sha256PasswordHasher {
    fn hash(&self, plaintext: &str) -> String {
        let salt = random_hex();
        let digest = stretch(&salt, plaintext, self.rounds);
        format!("{}${}${}${}", SCHEME, self.rounds, salt, digest)
    }

    fn verify(&self, plaintext: &str, hash: &str) -> bool {
        let mut parts = hash.split('$');
        let (Some(scheme), Some(rounds), Some(salt), Some(expected), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return false;
        };

        if scheme != SCHEME || !is_hex(salt) || !is_hex(expected) {
            return false;
        }
        let Ok(rounds) = rounds.parse::<u32>() else {
            return false;
        };
        if rounds == 0 {
            return false;
        }

        let digest = stretch(salt, plaintext, rounds);
        constant_time_eq(digest.as_bytes(), expected.as_bytes())
    }
}

/// Generate a fresh unguessable session token
pub fn generate_token() -> String {
    random_hex()
}

/// 128 random bits as 32 lowercase hex characters
fn random_hex() -> String {
    format!("{:032x}", rand::random::<u128>())
}

fn stretch(salt: &str, plaintext: &str, rounds: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(plaintext.as_bytes());
    let mut digest = hasher.finalize();

    for _ in 1..rounds {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(digest);
        digest = hasher.finalize();
    }

    format!("{:x}", digest)
}

fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
