use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;

use user_accounts::{
    account::{password, AccountModel, AccountRepository, InMemoryAccountRepository},
    build_router, AppState, CookieSettings, InMemorySubscriptionRepository, LocalMediaUploader,
    SessionTokenManager, TokenSettings,
};

pub const ACCESS_SECRET: &str = "integration-access-secret";
pub const REFRESH_SECRET: &str = "integration-refresh-secret";

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub app: Router,
    pub accounts: Arc<InMemoryAccountRepository>,
    pub session_manager: Arc<SessionTokenManager>,
    pub upload_dir: PathBuf,
    pub media_dir: PathBuf,
}

pub struct TestSetupBuilder {
    accounts: Vec<(String, String)>,
    token_settings: TokenSettings,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            accounts: vec![],
            token_settings: TokenSettings::new(ACCESS_SECRET, REFRESH_SECRET),
        }
    }

    /// Seeds an account whose password is `<username>-password`
    pub fn with_account(mut self, username: &str) -> Self {
        self.accounts
            .push((username.to_string(), format!("{username}-password")));
        self
    }

    pub fn with_alice_and_bob(self) -> Self {
        self.with_account("alice").with_account("bob")
    }

    pub fn with_token_settings(mut self, settings: TokenSettings) -> Self {
        self.token_settings = settings;
        self
    }

    pub async fn build(self) -> TestSetup {
        let run = uuid::Uuid::new_v4();
        let upload_dir = std::env::temp_dir().join(format!("user-accounts-it-staging-{run}"));
        let media_dir = std::env::temp_dir().join(format!("user-accounts-it-media-{run}"));

        let accounts = Arc::new(InMemoryAccountRepository::new());
        for (username, plain) in &self.accounts {
            let account = AccountModel::new(
                username,
                &format!("{username}@example.com"),
                &format!("{username} tester"),
                format!("http://media.test/{username}.png"),
                None,
                password::hash_password(plain).unwrap(),
            );
            accounts.create_account(&account).await.unwrap();
        }

        let state = AppState::new(
            accounts.clone(),
            Arc::new(InMemorySubscriptionRepository::new()),
            Arc::new(LocalMediaUploader::new(media_dir.clone(), "http://media.test")),
            self.token_settings,
            upload_dir.clone(),
            CookieSettings { secure: false },
        );
        let session_manager = state.session_manager.clone();

        TestSetup {
            app: build_router(state),
            accounts,
            session_manager,
            upload_dir,
            media_dir,
        }
    }
}

impl TestSetup {
    pub async fn account(&self, username: &str) -> AccountModel {
        self.accounts
            .find_by_username(username)
            .await
            .unwrap()
            .expect("seeded account")
    }
}
