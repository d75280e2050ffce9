use axum::Router;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use user_accounts::{
    account::{AccountRepository, InMemoryAccountRepository, PostgresAccountRepository},
    build_router,
    channel::{
        InMemorySubscriptionRepository, PostgresSubscriptionRepository, SubscriptionRepository,
    },
    AppConfig, AppState, LocalMediaUploader,
};

type Repositories = (
    Arc<dyn AccountRepository + Send + Sync>,
    Arc<dyn SubscriptionRepository + Send + Sync>,
);

async fn build_repositories(
    database_url: Option<&str>,
) -> Result<Repositories, Box<dyn std::error::Error>> {
    match database_url {
        Some(url) => {
            let pool = sqlx::PgPool::connect(url).await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("Using PostgreSQL repositories");
            Ok((
                Arc::new(PostgresAccountRepository::new(pool.clone())),
                Arc::new(PostgresSubscriptionRepository::new(pool)),
            ))
        }
        None => {
            info!("DATABASE_URL not set, using in-memory repositories");
            Ok((
                Arc::new(InMemoryAccountRepository::new()),
                Arc::new(InMemorySubscriptionRepository::new()),
            ))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "user_accounts=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting user accounts server");

    let config = AppConfig::from_env()?;

    tokio::fs::create_dir_all(&config.media.upload_temp_dir).await?;
    tokio::fs::create_dir_all(&config.media.media_root).await?;

    let (account_repository, subscription_repository) =
        build_repositories(config.database_url.as_deref()).await?;
    let uploader = Arc::new(LocalMediaUploader::new(
        config.media.media_root.clone(),
        config.media.public_base_url.clone(),
    ));

    let app_state = AppState::new(
        account_repository,
        subscription_repository,
        uploader,
        config.tokens.clone(),
        config.media.upload_temp_dir.clone(),
        config.cookies.clone(),
    );

    let app: Router = build_router(app_state)
        .nest_service("/media", ServeDir::new(&config.media.media_root));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Server running on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
