// Public API - what other modules can use
pub use handlers::{channel_profile, toggle_subscription};
pub use repository::{
    InMemorySubscriptionRepository, PostgresSubscriptionRepository, SubscriptionRepository,
};
pub use service::{ChannelProfile, ChannelService};

mod handlers;
pub mod repository;
pub mod service;
