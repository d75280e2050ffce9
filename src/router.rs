use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{account, channel, session, shared::AppState};

/// Builds the HTTP application. `main` adds the static media route on top.
pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/register", post(account::register))
        .route("/login", post(session::login))
        .route("/refresh-token", post(session::refresh_access_token));

    let protected = Router::new()
        .route("/logout", post(session::logout))
        .route("/change-password", post(account::change_password))
        .route("/current-user", get(account::current_user))
        .route("/update-account", patch(account::update_account))
        .route("/avatar", patch(account::update_avatar))
        .route("/cover-image", patch(account::update_cover_image))
        .route("/c/:username", get(channel::channel_profile))
        .route(
            "/c/:username/subscription",
            post(channel::toggle_subscription),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session::jwt_auth,
        ));

    Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api/v1/users", public.merge(protected))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
        .with_state(state)
}

fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
