// Public API - what other modules can use
pub use handlers::{login, logout, refresh_access_token};
pub use manager::SessionTokenManager;
pub use middleware::jwt_auth;
pub use types::{AccessClaims, RefreshClaims, TokenPair};

// Internal modules
pub mod cookies;
mod handlers;
pub mod manager;
mod middleware;
pub mod token;
pub mod types;
