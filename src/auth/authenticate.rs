use argon2::{self, Config, ThreadMode, Variant, Version};
use lazy_static::lazy_static;
use rand::RngCore;
use rand_chacha::{rand_core::SeedableRng, ChaCha20Rng};
use tracing::debug;

use crate::{auth::SALT_LENGTH, Result};

#[cfg(not(test))]
lazy_static! {
    pub static ref CONFIG: Config<'static> = Config {
        variant: Variant::Argon2id,
        version: Version::Version13,
        mem_cost: 65536,
        time_cost: 3,
        lanes: 4,
        thread_mode: ThreadMode::Parallel,
        secret: &[],
        ad: &[],
        hash_length: 32,
    };
}

#[cfg(test)]
lazy_static! {
    pub static ref CONFIG: Config<'static> = Config {
        variant: Variant::Argon2id,
        version: Version::Version13,
        mem_cost: 100,
        time_cost: 1,
        lanes: 1,
        thread_mode: ThreadMode::Sequential,
        secret: &[],
        ad: &[],
        hash_length: 32,
    };
}

/// Hashes the password with a fresh random salt.
///
/// The encoded output carries the salt and parameters, so it's all that
/// needs storing.
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt = [0u8; SALT_LENGTH];
    ChaCha20Rng::from_entropy().fill_bytes(&mut salt);
    let hash = argon2::hash_encoded(password.as_bytes(), &salt, &CONFIG)?;
    debug!("password hashed");
    Ok(hash)
}

pub fn verify_password(password: &str, hashed_password: &str) -> Result<bool> {
    let matches = argon2::verify_encoded(hashed_password, password.as_bytes())?;
    Ok(matches)
}
