// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Salted PBKDF2-HMAC-SHA256 password hashes.

use std::fmt;
use std::num::NonZeroU32;

use ring::{
    digest, pbkdf2,
    rand::{SecureRandom, SystemRandom},
};

static ALGORITHM: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;

const SALT_LEN: usize = 16;
const HASH_LEN: usize = digest::SHA256_OUTPUT_LEN;

#[cfg(not(test))]
const ROUNDS: NonZeroU32 = match NonZeroU32::new(100_000) {
    Some(rounds) => rounds,
    None => panic!("PBKDF2 rounds must be non-zero"),
};

#[cfg(test)]
const ROUNDS: NonZeroU32 = match NonZeroU32::new(1_000) {
    Some(rounds) => rounds,
    None => panic!("PBKDF2 rounds must be non-zero"),
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PasswordError {
    #[error("password must not be empty")]
    Empty,
    #[error("system random number generator failed")]
    Random,
}

/// Stored password hash. `Debug` never prints salt or hash bytes.
#[derive(Clone)]
pub struct PasswordHash {
    rounds: NonZeroU32,
    salt: [u8; SALT_LEN],
    hash: [u8; HASH_LEN],
}

impl PasswordHash {
    /// Hash `password` with a fresh random salt.
    pub fn new(password: &str) -> Result<Self, PasswordError> {
        if password.is_empty() {
            return Err(PasswordError::Empty);
        }
        let mut salt = [0u8; SALT_LEN];
        SystemRandom::new()
            .fill(&mut salt)
            .map_err(|_| PasswordError::Random)?;

        let mut hash = [0u8; HASH_LEN];
        pbkdf2::derive(ALGORITHM, ROUNDS, &salt, password.as_bytes(), &mut hash);
        Ok(Self {
            rounds: ROUNDS,
            salt,
            hash,
        })
    }

    /// Constant-time comparison against a candidate password.
    pub fn verify(&self, password: &str) -> bool {
        pbkdf2::verify(
            ALGORITHM,
            self.rounds,
            &self.salt,
            password.as_bytes(),
            &self.hash,
        )
        .is_ok()
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PasswordHash(pbkdf2-sha256, {} rounds)", self.rounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_password_verifies() {
        let hash = PasswordHash::new("correct horse").unwrap();
        assert!(hash.verify("correct horse"));
    }

    #[test]
    fn wrong_password_is_rejected() {
        let hash = PasswordHash::new("correct horse").unwrap();
        assert!(!hash.verify("correct horse "));
        assert!(!hash.verify(""));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = PasswordHash::new("hunter2").unwrap();
        let b = PasswordHash::new("hunter2").unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn empty_password_is_rejected() {
        assert_eq!(PasswordHash::new("").unwrap_err(), PasswordError::Empty);
    }

    #[test]
    fn debug_hides_hash_material() {
        let hash = PasswordHash::new("hunter2").unwrap();
        let debug = format!("{hash:?}");
        assert!(!debug.contains("hunter2"));
        assert_eq!(debug, "PasswordHash(pbkdf2-sha256, 1000 rounds)");
    }
}
