/// Authentication module
///
/// Token issuance and parsing, password hashing, and the persisted
/// refresh-session registry.

mod access_token;
mod claims;
mod password;
mod refresh_token;
mod sessions;

pub use access_token::issue_access_token;
pub use access_token::parse_access_token;
pub use claims::AccessClaims;
pub use claims::RefreshClaims;
pub use password::hash_password;
pub use password::verify_password;
pub use refresh_token::issue_refresh_token;
pub use refresh_token::parse_refresh_token;
pub use refresh_token::IssuedRefreshToken;
pub use refresh_token::RefreshTokenIdentity;
pub use sessions::lookup_session;
pub use sessions::register_session;
pub use sessions::revoke_all_sessions;
pub use sessions::revoke_session;
pub use sessions::SessionRecord;
