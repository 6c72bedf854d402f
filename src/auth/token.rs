use rand::RngCore;
use rand_chacha::{rand_core::SeedableRng, ChaCha20Rng};
use std::ops::Deref;

use crate::{auth::BEARER_TOKEN_BYTES, EmporiumError};

/// Hex encoded string of `len` bytes from a freshly seeded CSPRNG
pub(crate) fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    ChaCha20Rng::from_entropy().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Bearer tokens are opaque, long lived and stored verbatim on the user.
/// They carry no claims and no expiry, a token is valid until it's cleared.
pub fn generate_bearer_token() -> String {
    random_hex(BEARER_TOKEN_BYTES)
}

/// At the point where we have a `BearerToken` we aren't guaranteed that the
/// token belongs to anyone, only that the header followed the format
/// `Bearer {token}`.
///
/// The String contained within the unit struct is just the token, the
/// `Bearer ` prefix has been stripped from it (see `TryFrom` impl for details)
#[derive(Debug, Clone)]
pub struct BearerToken(String);

impl Deref for BearerToken {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<String> for BearerToken {
    type Error = EmporiumError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let mut iter = s.split_whitespace();
        if let Some(prefix) = iter.next() {
            if prefix != "Bearer" {
                return Err(EmporiumError::InvalidToken(
                    "Invalid token format, expected `Bearer {token}`".to_string(),
                ));
            }
        }
        if let Some(token) = iter.next() {
            return Ok(Self(token.to_owned()));
        }
        Err(EmporiumError::InvalidToken("No token was found".to_string()))
    }
}
