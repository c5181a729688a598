/// Middleware module
///
/// Access-token authentication and request logging.

mod auth;
mod request_logging;

pub use auth::AuthMiddleware;
pub use auth::AuthenticatedUser;
pub use request_logging::RequestLogger;
