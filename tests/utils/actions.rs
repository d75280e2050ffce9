use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use tower::ServiceExt;

use user_accounts::{
    account::types::AccountResponse,
    response::{ApiResponse, ErrorBody},
    session::types::LoginResponse,
    TokenPair,
};

use super::setup::TestSetup;

pub const BOUNDARY: &str = "integration-boundary";

pub async fn read_json<T: DeserializeOwned>(response: Response) -> ApiResponse<T> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn read_error(response: Response) -> ErrorBody {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Value of the named cookie in the response's Set-Cookie headers
pub fn set_cookie_value(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|cookie| {
            cookie
                .split(';')
                .next()
                .and_then(|pair| pair.strip_prefix(&format!("{name}=")))
                .map(|value| value.to_string())
        })
}

fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (name, filename, data) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

impl TestSetup {
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> Response {
        self.send(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn login(&self, username: &str) -> LoginResponse {
        let response = self
            .post_json(
                "/api/v1/users/login",
                json!({ "username": username, "password": format!("{username}-password") }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        read_json::<LoginResponse>(response).await.data
    }

    pub async fn refresh(&self, refresh_token: &str) -> Response {
        self.post_json(
            "/api/v1/users/refresh-token",
            json!({ "refreshToken": refresh_token }),
        )
        .await
    }

    pub async fn refresh_ok(&self, refresh_token: &str) -> TokenPair {
        let response = self.refresh(refresh_token).await;
        assert_eq!(response.status(), StatusCode::OK);
        read_json::<TokenPair>(response).await.data
    }

    /// Sends an authorized request with the access token as a bearer header
    pub async fn authorized(
        &self,
        method: &str,
        uri: &str,
        access_token: &str,
        body: Option<serde_json::Value>,
    ) -> Response {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {access_token}"));
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        };
        self.send(request.unwrap()).await
    }

    pub async fn current_user(&self, access_token: &str) -> Response {
        self.authorized("GET", "/api/v1/users/current-user", access_token, None)
            .await
    }

    pub async fn register(
        &self,
        fields: &[(&str, &str)],
        files: &[(&str, &str, &[u8])],
    ) -> Response {
        self.send(
            Request::post("/api/v1/users/register")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(multipart_body(fields, files)))
                .unwrap(),
        )
        .await
    }

    pub async fn register_ok(&self, username: &str) -> AccountResponse {
        let email = format!("{username}@example.com");
        let response = self
            .register(
                &[
                    ("fullName", "New Person"),
                    ("email", email.as_str()),
                    ("username", username),
                    ("password", "fresh-password"),
                ],
                &[("avatar", "me.png", &b"avatar-bytes"[..])],
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        read_json::<AccountResponse>(response).await.data
    }
}
