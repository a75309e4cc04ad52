#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use depot::config::{Config, SecurityConfig};
use depot::services::Notifier;
use depot::state::SharedState;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "password";

/// A credential delivery captured by [`RecordingNotifier`].
#[derive(Debug, Clone)]
pub struct Delivery {
    pub recipient: String,
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Default)]
pub struct RecordingNotifier {
    deliveries: Mutex<Vec<Delivery>>,
}

impl RecordingNotifier {
    pub fn last(&self) -> Option<Delivery> {
        self.deliveries.lock().unwrap().last().cloned()
    }

    pub fn count(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send_credentials(
        &self,
        recipient_name: &str,
        email: &str,
        username: &str,
        password: &str,
    ) -> anyhow::Result<()> {
        self.deliveries.lock().unwrap().push(Delivery {
            recipient: recipient_name.to_string(),
            email: email.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        });
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub notifier: Arc<RecordingNotifier>,
    db_path: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_path);
    }
}

pub fn test_config(db_path: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.database.url = format!("sqlite:{}?mode=rwc", db_path.display());
    config.server.secure_cookies = false;
    config.security = SecurityConfig {
        argon2_memory_cost_kib: 1024,
        argon2_time_cost: 1,
        argon2_parallelism: 1,
    };
    config
}

pub async fn spawn_app() -> TestApp {
    let db_path = std::env::temp_dir().join(format!("depot-test-{}.db", uuid::Uuid::new_v4()));
    let notifier = Arc::new(RecordingNotifier::default());

    let shared = SharedState::with_notifier(test_config(&db_path), notifier.clone())
        .await
        .expect("Failed to create shared state");
    let state = depot::api::create_app_state(Arc::new(shared), None);

    TestApp {
        router: depot::api::router(state),
        notifier,
        db_path,
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub set_cookies: Vec<String>,
    pub body: Value,
}

impl TestApp {
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let set_cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            set_cookies,
            body,
        }
    }

    /// Logs in and returns a `Cookie` header value carrying both credentials.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .send(
                "POST",
                "/auth/login",
                None,
                Some(json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {:?}", response.body);
        cookie_header(&response.set_cookies)
    }

    pub async fn admin(&self) -> String {
        self.login(ADMIN_USERNAME, ADMIN_PASSWORD).await
    }

    pub async fn get(&self, uri: &str, cookie: &str) -> TestResponse {
        self.send("GET", uri, Some(cookie), None).await
    }

    pub async fn post(&self, uri: &str, cookie: &str, body: Value) -> TestResponse {
        self.send("POST", uri, Some(cookie), Some(body)).await
    }

    pub async fn put(&self, uri: &str, cookie: &str, body: Value) -> TestResponse {
        self.send("PUT", uri, Some(cookie), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, cookie: &str) -> TestResponse {
        self.send("DELETE", uri, Some(cookie), None).await
    }

    /// Creates a row and returns its id.
    pub async fn create(&self, uri: &str, cookie: &str, body: Value) -> i64 {
        let response = self.post(uri, cookie, body).await;
        assert_eq!(
            response.status,
            StatusCode::CREATED,
            "create {uri} failed: {:?}",
            response.body
        );
        response.body["id"].as_i64().unwrap()
    }

    /// Creates a user with the given role and logs in as that user.
    pub async fn login_as_new_user(&self, admin: &str, username: &str, role: &str) -> String {
        self.create(
            "/api/users",
            admin,
            json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "role": role,
            }),
        )
        .await;
        let delivery = self.notifier.last().unwrap();
        assert_eq!(delivery.username, username);
        self.login(username, &delivery.password).await
    }
}

/// Joins the `name=value` parts of `Set-Cookie` headers into one `Cookie`
/// header value.
pub fn cookie_header(set_cookies: &[String]) -> String {
    set_cookies
        .iter()
        .filter_map(|c| c.split(';').next())
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("; ")
}
