use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{models::AccountModel, password, repository::AccountRepository};
use crate::media::{MediaUploader, StagedFile};
use crate::shared::AppError;

/// Input for registration, with any uploaded files already staged on disk
#[derive(Debug, Default)]
pub struct RegisterAccount {
    pub full_name: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub avatar: Option<StagedFile>,
    pub cover_image: Option<StagedFile>,
}

/// Service for account business logic outside the token lifecycle
pub struct AccountService {
    repository: Arc<dyn AccountRepository + Send + Sync>,
    uploader: Arc<dyn MediaUploader>,
}

/// Names every blank field, in order
fn missing_fields(fields: &[(&str, &str)]) -> Vec<String> {
    fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| format!("{name} is required"))
        .collect()
}

impl AccountService {
    pub fn new(
        repository: Arc<dyn AccountRepository + Send + Sync>,
        uploader: Arc<dyn MediaUploader>,
    ) -> Self {
        Self {
            repository,
            uploader,
        }
    }

    /// Registers a new account. Staged files are removed whatever the outcome.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: RegisterAccount) -> Result<AccountModel, AppError> {
        let staged: Vec<StagedFile> = request
            .avatar
            .iter()
            .chain(request.cover_image.iter())
            .cloned()
            .collect();

        let result = self.register_account(request).await;

        for file in &staged {
            file.discard().await;
        }

        match &result {
            Ok(account) => info!(account_id = %account.id, "Account registered"),
            Err(e) => warn!(error = %e, "Registration failed"),
        }
        result
    }

    async fn register_account(&self, request: RegisterAccount) -> Result<AccountModel, AppError> {
        let missing = missing_fields(&[
            ("fullName", request.full_name.as_str()),
            ("email", request.email.as_str()),
            ("username", request.username.as_str()),
            ("password", request.password.as_str()),
        ]);
        if !missing.is_empty() {
            return Err(AppError::validation_with("All fields are required", missing));
        }

        if self
            .identifier_taken(&request.username, &request.email)
            .await?
        {
            return Err(AppError::Conflict(
                "User with email or username already exists".to_string(),
            ));
        }

        let avatar = request
            .avatar
            .ok_or_else(|| AppError::validation("Avatar file is required"))?;
        let avatar_url = self
            .upload_staged(&avatar)
            .await
            .map_err(|_| AppError::validation("Avatar file is required"))?;

        let cover_image_url = match &request.cover_image {
            Some(file) => match self.upload_staged(file).await {
                Ok(url) => Some(url),
                Err(_) => {
                    self.remove_uploaded(&avatar_url).await;
                    return Err(AppError::validation("Error while uploading cover image"));
                }
            },
            None => None,
        };

        let stored = self
            .store_account(
                &request.username,
                &request.email,
                &request.full_name,
                request.password,
                avatar_url.clone(),
                cover_image_url.clone(),
            )
            .await;

        if stored.is_err() {
            for url in std::iter::once(&avatar_url).chain(cover_image_url.iter()) {
                self.remove_uploaded(url).await;
            }
        }
        stored
    }

    async fn store_account(
        &self,
        username: &str,
        email: &str,
        full_name: &str,
        password: String,
        avatar_url: String,
        cover_image_url: Option<String>,
    ) -> Result<AccountModel, AppError> {
        let password_hash = password::hash_password_blocking(password).await?;

        let account = AccountModel::new(
            username,
            email,
            full_name,
            avatar_url,
            cover_image_url,
            password_hash,
        );
        self.repository.create_account(&account).await?;

        Ok(account)
    }

    /// Usernames and emails share one namespace, so each is checked against both
    async fn identifier_taken(&self, username: &str, email: &str) -> Result<bool, AppError> {
        let direct = self
            .repository
            .find_by_username_or_email(username, email)
            .await?;
        if direct.is_some() {
            return Ok(true);
        }

        let crossed = self
            .repository
            .find_by_username_or_email(email, username)
            .await?;
        Ok(crossed.is_some())
    }

    /// Replaces the password after checking the current one
    #[instrument(skip(self, old_password, new_password))]
    pub async fn change_password(
        &self,
        account_id: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let missing = missing_fields(&[
            ("oldPassword", old_password),
            ("newPassword", new_password),
        ]);
        if !missing.is_empty() {
            return Err(AppError::validation_with("All fields are required", missing));
        }

        let account = self.load(account_id).await?;

        let matches = password::verify_password_blocking(
            old_password.to_string(),
            account.password_hash,
        )
        .await?;
        if !matches {
            warn!(account_id = %account_id, "Password change with wrong old password");
            return Err(AppError::validation("Invalid old password"));
        }

        let password_hash = password::hash_password_blocking(new_password.to_string()).await?;
        self.repository
            .set_password_hash(account_id, &password_hash)
            .await?;

        info!(account_id = %account_id, "Password changed");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn update_details(
        &self,
        account_id: &str,
        full_name: &str,
        email: &str,
    ) -> Result<AccountModel, AppError> {
        let missing = missing_fields(&[("fullName", full_name), ("email", email)]);
        if !missing.is_empty() {
            return Err(AppError::validation_with("All fields are required", missing));
        }

        // The new email must not be someone else's username either
        if let Some(owner) = self.repository.find_by_username(email).await? {
            if owner.id != account_id {
                return Err(AppError::Conflict(
                    "User with email or username already exists".to_string(),
                ));
            }
        }

        let account = self
            .repository
            .update_details(account_id, full_name, email)
            .await?;

        info!(account_id = %account_id, "Account details updated");
        Ok(account)
    }

    #[instrument(skip(self, file))]
    pub async fn update_avatar(
        &self,
        account_id: &str,
        file: Option<StagedFile>,
    ) -> Result<AccountModel, AppError> {
        let file = file.ok_or_else(|| AppError::validation("Avatar file is missing"))?;
        let url = self
            .upload_staged(&file)
            .await
            .map_err(|_| AppError::validation("Error while uploading avatar"))?;

        let result = self.repository.set_avatar(account_id, &url).await;
        if result.is_err() {
            self.remove_uploaded(&url).await;
        }
        let account = result?;

        info!(account_id = %account_id, "Avatar updated");
        Ok(account)
    }

    #[instrument(skip(self, file))]
    pub async fn update_cover_image(
        &self,
        account_id: &str,
        file: Option<StagedFile>,
    ) -> Result<AccountModel, AppError> {
        let file = file.ok_or_else(|| AppError::validation("Cover image file is missing"))?;
        let url = self
            .upload_staged(&file)
            .await
            .map_err(|_| AppError::validation("Error while uploading cover image"))?;

        let result = self.repository.set_cover_image(account_id, &url).await;
        if result.is_err() {
            self.remove_uploaded(&url).await;
        }
        let account = result?;

        info!(account_id = %account_id, "Cover image updated");
        Ok(account)
    }

    async fn load(&self, account_id: &str) -> Result<AccountModel, AppError> {
        self.repository
            .get_account(account_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Hands a staged file to the media host, then removes it locally
    async fn upload_staged(&self, file: &StagedFile) -> Result<String, AppError> {
        let result = self.uploader.upload(&file.path).await;
        file.discard().await;

        result.map(|media| media.url).map_err(|e| {
            warn!(error = %e, path = %file.path.display(), "Media upload failed");
            e
        })
    }

    /// Best-effort removal of media that ended up unreferenced
    async fn remove_uploaded(&self, url: &str) {
        if let Err(e) = self.uploader.remove(url).await {
            warn!(error = %e, url = %url, "Could not remove orphaned media");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::repository::InMemoryAccountRepository;
    use crate::media::LocalMediaUploader;
    use crate::media::UploadedMedia;
    use crate::shared::test_utils::{scratch_dir, FailingMediaUploader};
    use async_trait::async_trait;
    use rstest::rstest;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    /// Delegates to the in-memory store. Profile writes for `slow_name` are
    /// held until `release` is notified, and `blind_lookups` hides existing
    /// accounts from the pre-insert uniqueness check so the insert itself
    /// hits the conflict.
    #[derive(Default)]
    struct ScriptedRepository {
        inner: InMemoryAccountRepository,
        slow_name: Option<String>,
        release: tokio::sync::Notify,
        blind_lookups: bool,
    }

    #[async_trait]
    impl AccountRepository for ScriptedRepository {
        async fn create_account(&self, account: &AccountModel) -> Result<(), AppError> {
            self.inner.create_account(account).await
        }

        async fn get_account(&self, account_id: &str) -> Result<Option<AccountModel>, AppError> {
            self.inner.get_account(account_id).await
        }

        async fn find_by_username_or_email(
            &self,
            username: &str,
            email: &str,
        ) -> Result<Option<AccountModel>, AppError> {
            if self.blind_lookups {
                return Ok(None);
            }
            self.inner.find_by_username_or_email(username, email).await
        }

        async fn find_by_username(&self, username: &str) -> Result<Option<AccountModel>, AppError> {
            self.inner.find_by_username(username).await
        }

        async fn update_details(
            &self,
            account_id: &str,
            full_name: &str,
            email: &str,
        ) -> Result<AccountModel, AppError> {
            if self.slow_name.as_deref() == Some(full_name) {
                self.release.notified().await;
            }
            self.inner.update_details(account_id, full_name, email).await
        }

        async fn set_password_hash(
            &self,
            account_id: &str,
            password_hash: &str,
        ) -> Result<(), AppError> {
            self.inner.set_password_hash(account_id, password_hash).await
        }

        async fn set_avatar(&self, account_id: &str, url: &str) -> Result<AccountModel, AppError> {
            self.inner.set_avatar(account_id, url).await
        }

        async fn set_cover_image(
            &self,
            account_id: &str,
            url: &str,
        ) -> Result<AccountModel, AppError> {
            self.inner.set_cover_image(account_id, url).await
        }

        async fn set_refresh_token(
            &self,
            account_id: &str,
            token: Option<&str>,
        ) -> Result<bool, AppError> {
            self.inner.set_refresh_token(account_id, token).await
        }

        async fn replace_refresh_token(
            &self,
            account_id: &str,
            expected: &str,
            replacement: &str,
        ) -> Result<bool, AppError> {
            self.inner
                .replace_refresh_token(account_id, expected, replacement)
                .await
        }
    }

    /// Local media host that refuses `.jpg` files
    struct NoJpegUploader(LocalMediaUploader);

    #[async_trait]
    impl MediaUploader for NoJpegUploader {
        async fn upload(&self, local_path: &Path) -> Result<UploadedMedia, AppError> {
            if local_path.extension().and_then(|ext| ext.to_str()) == Some("jpg") {
                return Err(AppError::Internal("jpeg rejected".to_string()));
            }
            self.0.upload(local_path).await
        }

        async fn remove(&self, url: &str) -> Result<(), AppError> {
            self.0.remove(url).await
        }
    }

    async fn stored_media(root: &Path) -> usize {
        let Ok(mut entries) = tokio::fs::read_dir(root).await else {
            return 0;
        };
        let mut count = 0;
        while entries.next_entry().await.unwrap().is_some() {
            count += 1;
        }
        count
    }

    fn service_with(uploader: Arc<dyn MediaUploader>) -> (AccountService, Arc<InMemoryAccountRepository>) {
        let repo = Arc::new(InMemoryAccountRepository::new());
        (AccountService::new(repo.clone(), uploader), repo)
    }

    fn service() -> (AccountService, Arc<InMemoryAccountRepository>) {
        service_with(Arc::new(LocalMediaUploader::new(
            scratch_dir("media"),
            "http://media.test",
        )))
    }

    async fn staged(name: &str) -> StagedFile {
        StagedFile::write(&scratch_dir("staging"), Some(name.to_string()), None, b"bytes")
            .await
            .unwrap()
    }

    async fn alice_request() -> RegisterAccount {
        RegisterAccount {
            full_name: "Alice Liddell".to_string(),
            email: "alice@example.com".to_string(),
            username: "Alice".to_string(),
            password: "secret".to_string(),
            avatar: Some(staged("avatar.png").await),
            cover_image: None,
        }
    }

    #[tokio::test]
    async fn test_register_success() {
        let (service, repo) = service();
        let request = alice_request().await;
        let avatar_path = request.avatar.as_ref().unwrap().path.clone();

        let account = service.register(request).await.unwrap();

        assert_eq!(account.username, "alice");
        assert!(account.avatar.starts_with("http://media.test/"));
        assert!(account.cover_image.is_none());
        assert!(account.password_hash.starts_with("$argon2"));
        assert!(!avatar_path.exists());
        assert_eq!(repo.account_count().await, 1);
    }

    #[tokio::test]
    async fn test_register_with_cover_image() {
        let (service, _) = service();
        let mut request = alice_request().await;
        request.cover_image = Some(staged("cover.jpg").await);

        let account = service.register(request).await.unwrap();
        assert!(account.cover_image.unwrap().ends_with(".jpg"));
    }

    #[rstest]
    #[case("", "alice@example.com", "alice", "secret", "fullName is required")]
    #[case("Alice", "  ", "alice", "secret", "email is required")]
    #[case("Alice", "alice@example.com", "", "secret", "username is required")]
    #[case("Alice", "alice@example.com", "alice", "", "password is required")]
    #[tokio::test]
    async fn test_register_missing_field(
        #[case] full_name: &str,
        #[case] email: &str,
        #[case] username: &str,
        #[case] password: &str,
        #[case] expected: &str,
    ) {
        let (service, repo) = service();
        let avatar = staged("avatar.png").await;
        let avatar_path = avatar.path.clone();

        let result = service
            .register(RegisterAccount {
                full_name: full_name.to_string(),
                email: email.to_string(),
                username: username.to_string(),
                password: password.to_string(),
                avatar: Some(avatar),
                cover_image: None,
            })
            .await;

        assert_eq!(
            result,
            Err(AppError::validation_with(
                "All fields are required",
                vec![expected.to_string()]
            ))
        );
        assert!(!avatar_path.exists());
        assert_eq!(repo.account_count().await, 0);
    }

    #[tokio::test]
    async fn test_register_duplicate() {
        let (service, _) = service();
        service.register(alice_request().await).await.unwrap();

        let mut again = alice_request().await;
        again.username = "someone-else".to_string();
        let result = service.register(again).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_register_without_avatar() {
        let (service, _) = service();
        let mut request = alice_request().await;
        request.avatar = None;

        let result = service.register(request).await;
        assert_eq!(result, Err(AppError::validation("Avatar file is required")));
    }

    #[tokio::test]
    async fn test_register_upload_failure_leaves_no_account() {
        let (service, repo) = service_with(Arc::new(FailingMediaUploader));
        let request = alice_request().await;
        let avatar_path = request.avatar.as_ref().unwrap().path.clone();

        let result = service.register(request).await;

        assert_eq!(result, Err(AppError::validation("Avatar file is required")));
        assert!(!avatar_path.exists());
        assert_eq!(repo.account_count().await, 0);
    }

    #[tokio::test]
    async fn test_register_rejects_username_equal_to_existing_email() {
        let (service, repo) = service();
        service.register(alice_request().await).await.unwrap();

        let mut crossing = alice_request().await;
        crossing.username = "alice@example.com".to_string();
        crossing.email = "other@example.com".to_string();
        let result = service.register(crossing).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        let mut reverse = alice_request().await;
        reverse.username = "carol".to_string();
        reverse.email = "alice".to_string();
        let result = service.register(reverse).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        assert_eq!(repo.account_count().await, 1);
    }

    #[tokio::test]
    async fn test_register_cover_failure_removes_uploaded_avatar() {
        let media_root = scratch_dir("media");
        let uploader = NoJpegUploader(LocalMediaUploader::new(
            media_root.clone(),
            "http://media.test",
        ));
        let (service, repo) = service_with(Arc::new(uploader));

        let mut request = alice_request().await;
        request.cover_image = Some(staged("cover.jpg").await);
        let result = service.register(request).await;

        assert_eq!(
            result,
            Err(AppError::validation("Error while uploading cover image"))
        );
        assert_eq!(stored_media(&media_root).await, 0);
        assert_eq!(repo.account_count().await, 0);
    }

    #[tokio::test]
    async fn test_register_lost_insert_race_removes_uploaded_media() {
        let media_root: PathBuf = scratch_dir("media");
        let repo = Arc::new(ScriptedRepository {
            blind_lookups: true,
            ..Default::default()
        });
        let service = AccountService::new(
            repo.clone(),
            Arc::new(LocalMediaUploader::new(media_root.clone(), "http://media.test")),
        );
        service.register(alice_request().await).await.unwrap();
        assert_eq!(stored_media(&media_root).await, 1);

        let mut again = alice_request().await;
        again.cover_image = Some(staged("cover.png").await);
        let result = service.register(again).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(stored_media(&media_root).await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_profile_update_keeps_new_password() {
        let repo = Arc::new(ScriptedRepository {
            slow_name: Some("Slow".to_string()),
            ..Default::default()
        });
        let service = Arc::new(AccountService::new(
            repo.clone(),
            Arc::new(LocalMediaUploader::new(scratch_dir("media"), "http://media.test")),
        ));
        let account = service.register(alice_request().await).await.unwrap();

        let profile_update = {
            let service = service.clone();
            let account_id = account.id.clone();
            tokio::spawn(async move {
                service
                    .update_details(&account_id, "Slow", "alice@example.com")
                    .await
            })
        };
        // Let the profile update reach the store and stall there
        tokio::time::sleep(Duration::from_millis(50)).await;

        service
            .change_password(&account.id, "secret", "new-secret")
            .await
            .unwrap();
        repo.release.notify_one();
        profile_update.await.unwrap().unwrap();

        let stored = repo.get_account(&account.id).await.unwrap().unwrap();
        assert_eq!(stored.full_name, "Slow");
        assert!(password::verify_password("new-secret", &stored.password_hash).unwrap());
        assert!(!password::verify_password("secret", &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_change_password() {
        let (service, repo) = service();
        let account = service.register(alice_request().await).await.unwrap();

        let wrong = service
            .change_password(&account.id, "nope", "new-secret")
            .await;
        assert_eq!(wrong, Err(AppError::validation("Invalid old password")));

        service
            .change_password(&account.id, "secret", "new-secret")
            .await
            .unwrap();

        let stored = repo.get_account(&account.id).await.unwrap().unwrap();
        assert!(password::verify_password("new-secret", &stored.password_hash).unwrap());
        assert!(!password::verify_password("secret", &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_change_password_requires_both_fields() {
        let (service, _) = service();
        let account = service.register(alice_request().await).await.unwrap();

        let result = service.change_password(&account.id, "secret", " ").await;
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_update_details() {
        let (service, _) = service();
        let account = service.register(alice_request().await).await.unwrap();

        let updated = service
            .update_details(&account.id, "Alice L.", "New@Example.com")
            .await
            .unwrap();
        assert_eq!(updated.full_name, "Alice L.");
        assert_eq!(updated.email, "new@example.com");

        let missing = service.update_details(&account.id, "", "").await;
        assert_eq!(
            missing,
            Err(AppError::validation_with(
                "All fields are required",
                vec![
                    "fullName is required".to_string(),
                    "email is required".to_string()
                ]
            ))
        );
    }

    #[tokio::test]
    async fn test_update_details_email_taken() {
        let (service, _) = service();
        let alice = service.register(alice_request().await).await.unwrap();

        let mut bob = alice_request().await;
        bob.username = "bob".to_string();
        bob.email = "bob@example.com".to_string();
        service.register(bob).await.unwrap();

        let result = service
            .update_details(&alice.id, "Alice", "bob@example.com")
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        let result = service.update_details(&alice.id, "Alice", "bob").await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_avatar_and_cover() {
        let (service, _) = service();
        let account = service.register(alice_request().await).await.unwrap();

        let updated = service
            .update_avatar(&account.id, Some(staged("new.gif").await))
            .await
            .unwrap();
        assert_ne!(updated.avatar, account.avatar);
        assert!(updated.avatar.ends_with(".gif"));

        let updated = service
            .update_cover_image(&account.id, Some(staged("cover.png").await))
            .await
            .unwrap();
        assert!(updated.cover_image.is_some());

        let missing = service.update_avatar(&account.id, None).await;
        assert_eq!(missing, Err(AppError::validation("Avatar file is missing")));
    }

    #[tokio::test]
    async fn test_update_avatar_upload_failure() {
        let (service, repo) = service_with(Arc::new(FailingMediaUploader));
        let account = AccountModel::new(
            "alice",
            "alice@example.com",
            "Alice",
            "http://media/old.png".to_string(),
            None,
            "hash".to_string(),
        );
        repo.create_account(&account).await.unwrap();

        let result = service
            .update_avatar(&account.id, Some(staged("new.png").await))
            .await;
        assert_eq!(
            result,
            Err(AppError::validation("Error while uploading avatar"))
        );

        let stored = repo.get_account(&account.id).await.unwrap().unwrap();
        assert_eq!(stored.avatar, "http://media/old.png");
    }

    #[tokio::test]
    async fn test_update_avatar_for_missing_account_removes_upload() {
        let media_root = scratch_dir("media");
        let (service, _) = service_with(Arc::new(LocalMediaUploader::new(
            media_root.clone(),
            "http://media.test",
        )));

        let result = service
            .update_avatar("ghost", Some(staged("new.png").await))
            .await;

        assert_eq!(result, Err(AppError::NotFound("User not found".to_string())));
        assert_eq!(stored_media(&media_root).await, 0);
    }
}
