//! Integration tests for Vendora.
//!
//! Tests drive the full router in-process with `tower::ServiceExt::oneshot`
//! against the in-memory store, so they need no database or network.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p vendora-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use vendora_core::Money;

use vendora_api::config::ApiConfig;
use vendora_api::db::Database;
use vendora_api::services::uploads::{ImageHost, ImageUpload, UploadError};
use vendora_api::state::AppState;

/// Signing secret used by every test app.
pub const TEST_JWT_SECRET: &str = "kV9#qL2$wX7!pR4@zT8&nB1*mC6^yH3%";

/// Configuration for an in-memory test app.
#[must_use]
pub fn test_config() -> ApiConfig {
    ApiConfig {
        database_url: SecretString::from("memory:"),
        host: [127, 0, 0, 1].into(),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        jwt_secret: SecretString::from(TEST_JWT_SECRET),
        token_ttl_hours: 1,
        rate_limit: false,
        cors_origins: Vec::new(),
        log_json: false,
        google: None,
        cloudinary: None,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// Parse a JSON money string.
///
/// # Panics
///
/// Panics if `value` is not a valid amount.
#[must_use]
pub fn money(value: &Value) -> Money {
    value
        .as_str()
        .and_then(|s| Money::parse(s).ok())
        .expect("money string")
}

/// Image host that stores nothing and returns a predictable URL.
#[derive(Debug, Default)]
pub struct FakeImageHost;

#[async_trait]
impl ImageHost for FakeImageHost {
    async fn upload(&self, image: ImageUpload) -> Result<String, UploadError> {
        Ok(format!("https://img.test/{}", image.file_name))
    }
}

/// A response with its body parsed as JSON (`Null` for empty bodies).
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// The `error` message of an error body.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.body.get("error").and_then(Value::as_str)
    }

    /// A string field of the body.
    #[must_use]
    pub fn str(&self, pointer: &str) -> Option<&str> {
        self.body.pointer(pointer).and_then(Value::as_str)
    }
}

/// A signed-in test user.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub user_id: String,
    pub token: String,
}

/// The API router over a set of stores.
pub struct TestApp {
    pub router: Router,
    pub db: Database,
}

impl TestApp {
    /// App over empty in-memory stores.
    #[must_use]
    pub fn new() -> Self {
        Self::with_db(Database::memory())
    }

    /// App over the given stores.
    #[must_use]
    pub fn with_db(db: Database) -> Self {
        let state = AppState::with_image_host(test_config(), db.clone(), Arc::new(FakeImageHost));
        Self {
            router: vendora_api::app(state),
            db,
        }
    }

    /// Send a request with an optional bearer token and JSON body.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body is not JSON.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("valid request");

        self.send(request).await
    }

    /// Send a prepared request.
    ///
    /// # Panics
    ///
    /// Panics if the body cannot be read or is not JSON.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::PATCH, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        self.request(Method::DELETE, uri, token, body).await
    }

    /// Register an account and sign in.
    ///
    /// # Panics
    ///
    /// Panics if registration or login fails.
    pub async fn sign_up(&self, name: &str, email: &str, role: &str) -> TestUser {
        let password = "correct-horse-battery";
        let response = self
            .post(
                "/api/auth/register",
                None,
                json!({ "name": name, "email": email, "password": password, "role": role }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);

        let response = self
            .post(
                "/api/auth/login",
                None,
                json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);

        TestUser {
            user_id: response.str("/user/id").expect("user id").to_string(),
            token: response.str("/token").expect("token").to_string(),
        }
    }

    /// Sign up a customer and return it with its customer id.
    ///
    /// # Panics
    ///
    /// Panics if any step fails.
    pub async fn customer(&self, name: &str, email: &str) -> (TestUser, String) {
        let user = self.sign_up(name, email, "customer").await;
        let me = self.get("/api/customers/me", Some(&user.token)).await;
        assert_eq!(me.status, StatusCode::OK, "{:?}", me.body);
        let id = me.str("/id").expect("customer id").to_string();
        (user, id)
    }

    /// Sign up a seller and return it with its seller id.
    ///
    /// # Panics
    ///
    /// Panics if any step fails.
    pub async fn seller(&self, name: &str, email: &str) -> (TestUser, String) {
        let user = self.sign_up(name, email, "seller").await;
        let me = self.get("/api/sellers/me", Some(&user.token)).await;
        assert_eq!(me.status, StatusCode::OK, "{:?}", me.body);
        let id = me.str("/id").expect("seller id").to_string();
        (user, id)
    }

    /// List a product as `seller` and return its id.
    ///
    /// # Panics
    ///
    /// Panics if creation fails.
    pub async fn product(&self, seller: &TestUser, name: &str, price: &str, quantity: u32) -> String {
        let response = self
            .post(
                "/api/products",
                Some(&seller.token),
                json!({
                    "name": name,
                    "description": format!("{name} in great shape"),
                    "brand": "Acme",
                    "price": price,
                    "quantity": quantity,
                    "condition": "like_new",
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.str("/id").expect("product id").to_string()
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}
