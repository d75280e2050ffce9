// Public API - what other modules can use
pub use handlers::{
    change_password, current_user, register, update_account, update_avatar, update_cover_image,
};
pub use models::AccountModel;
pub use repository::{AccountRepository, InMemoryAccountRepository, PostgresAccountRepository};
pub use service::{AccountService, RegisterAccount};

// Internal modules
mod handlers;
pub mod models;
pub mod password;
pub mod repository;
pub mod service;
pub mod types;
