pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const SALT_LENGTH: usize = 16;

/// Random bytes behind a bearer token, hex encoded on the wire
pub const BEARER_TOKEN_BYTES: usize = 32;
pub const RESET_TOKEN_BYTES: usize = 32;
pub const RESET_TOKEN_DURATION_MINUTES: i64 = 10;
