// Library crate for the user accounts service
// This file exposes the public API for the binary and integration tests

pub mod account;
pub mod channel;
pub mod config;
pub mod media;
pub mod response;
pub mod router;
pub mod session;
pub mod shared;

// Re-export commonly used types for easier access in tests
pub use account::{AccountModel, AccountRepository, InMemoryAccountRepository};
pub use channel::{InMemorySubscriptionRepository, SubscriptionRepository};
pub use config::{AppConfig, CookieSettings, TokenSettings};
pub use media::{LocalMediaUploader, MediaUploader};
pub use response::ApiResponse;
pub use router::build_router;
pub use session::{SessionTokenManager, TokenPair};
pub use shared::{AppError, AppState};
