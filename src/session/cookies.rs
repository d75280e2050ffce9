use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use super::types::TokenPair;
use crate::config::CookieSettings;

pub const ACCESS_COOKIE_NAME: &str = "accessToken";
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

fn token_cookie(name: &'static str, value: String, settings: &CookieSettings) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(settings.secure)
        .same_site(SameSite::Lax)
        .build()
}

/// Adds both token cookies to the jar
pub fn with_tokens(jar: CookieJar, tokens: &TokenPair, settings: &CookieSettings) -> CookieJar {
    jar.add(token_cookie(
        ACCESS_COOKIE_NAME,
        tokens.access_token.clone(),
        settings,
    ))
    .add(token_cookie(
        REFRESH_COOKIE_NAME,
        tokens.refresh_token.clone(),
        settings,
    ))
}

fn removal_cookie(name: &'static str, settings: &CookieSettings) -> Cookie<'static> {
    let mut cookie = token_cookie(name, String::new(), settings);
    cookie.make_removal();
    cookie
}

/// Expires both token cookies. Removal cookies are always sent, even when the
/// request authenticated with a bearer header and carried no cookies.
pub fn without_tokens(jar: CookieJar, settings: &CookieSettings) -> CookieJar {
    jar.add(removal_cookie(ACCESS_COOKIE_NAME, settings))
        .add(removal_cookie(REFRESH_COOKIE_NAME, settings))
}
