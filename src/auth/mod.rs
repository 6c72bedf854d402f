mod authenticate;
mod authorize;
mod constants;
mod reset;
mod token;

pub use authenticate::{hash_password, verify_password};
pub use authorize::{authenticate, require_admin, AdminUser, AuthenticatedUser};
pub use constants::*;
pub use reset::{
    check_reset_token, hash_reset_token, issue_reset_token, request_password_reset,
    reset_password, reset_url, IssuedResetToken,
};
pub use token::{generate_bearer_token, BearerToken};
