//! Shared harness for the integration tests
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{request::Builder, Request, StatusCode},
    Router,
};
use chrono::Duration;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::{NamedTempFile, TempDir};
use tokio::sync::mpsc::UnboundedReceiver;
use tower::ServiceExt;

use rentmycam::auth::issue_token;
use rentmycam::config::Config;
use rentmycam::database::{self, init_db, AppState};
use rentmycam::dispatch::NotificationQueue;
use rentmycam::model::{CatalogItem, CatalogItemInput, Category};
use rentmycam::notify::Email;
use rentmycam::route::create_app;
use rentmycam::storage::{LocalDiskStorage, ObjectStorage};

pub const API_KEY: &str = "test-api-key";
pub const BOUNDARY: &str = "rentmycam-test-boundary";

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    /// Everything the handlers queued for delivery
    pub emails: UnboundedReceiver<Email>,
    pub uploads: TempDir,
    _db: NamedTempFile,
}

/// App backed by a temporary database and local-disk uploads
pub fn setup_test_app() -> TestApp {
    let uploads = TempDir::new().expect("Failed to create upload dir");
    let config = Config::for_tests(uploads.path().to_str().unwrap());
    let storage = Arc::new(LocalDiskStorage::new(uploads.path(), &config.public_base_url));
    setup_with_storage(config, storage, uploads)
}

pub fn setup_with_storage(config: Config, storage: Arc<dyn ObjectStorage>, uploads: TempDir) -> TestApp {
    let temp_db = NamedTempFile::new().expect("Failed to create temp file");
    let db = init_db(temp_db.path().to_str().unwrap()).expect("Failed to initialize test database");

    let (queue, emails) = NotificationQueue::unbounded();
    let state = AppState::new(db, config, storage, queue);

    TestApp {
        app: create_app(state.clone()),
        state,
        emails,
        uploads,
        _db: temp_db,
    }
}

impl TestApp {
    /// Sends a request and decodes the JSON body (`Null` when empty)
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read response body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("Failed to parse JSON")
        };
        (status, body)
    }

    pub fn admin_token(&self) -> String {
        let config = &self.state.config;
        issue_token(&config.admin_login_email, &config.jwt_secret, Duration::hours(1))
            .unwrap()
            .0
    }

    pub fn seed_item(&self, id: &str, category: Category, price: u64, offer: Option<u64>) -> CatalogItem {
        let item = CatalogItem::new(
            id.to_string(),
            category,
            CatalogItemInput {
                name: id.to_string(),
                price_per_day: price,
                offer_price: offer,
                ..Default::default()
            },
        );
        database::put_item(&self.state.db, &item).unwrap();
        item
    }

    /// Emails queued so far
    pub fn drain_emails(&mut self) -> Vec<Email> {
        let mut emails = Vec::new();
        while let Ok(email) = self.emails.try_recv() {
            emails.push(email);
        }
        emails
    }
}

/// Request builder with the API key already set
pub fn api(method: &str, uri: &str) -> Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-api-key", API_KEY)
}

/// Request builder with API key and admin bearer token
pub fn admin(method: &str, uri: &str, token: &str) -> Builder {
    api(method, uri).header("authorization", format!("Bearer {}", token))
}

pub fn json_body(value: &Value) -> Body {
    Body::from(value.to_string())
}

/// Hand-rolled multipart/form-data body
#[derive(Default)]
pub struct MultipartBody {
    bytes: Vec<u8>,
}

impl MultipartBody {
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.bytes.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, data: &[u8]) -> Self {
        self.bytes.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, name, file_name, content_type
            )
            .as_bytes(),
        );
        self.bytes.extend_from_slice(data);
        self.bytes.extend_from_slice(b"\r\n");
        self
    }

    pub fn into_request(mut self, uri: &str) -> Request<Body> {
        self.bytes
            .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        api("POST", uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(self.bytes))
            .unwrap()
    }
}

/// A valid checkout: 2 × fx3, 1 × tripod, three days
pub fn booking_form() -> MultipartBody {
    MultipartBody::default()
        .text("fullName", "Asha Rao")
        .text("email", "asha@example.com")
        .text("contact", "9876543210")
        .text("address", "12 MG Road, Pune")
        .text("emergencyContact", "9123456780")
        .text("rentalPeriod", "2025-01-10 to 2025-01-13 (3 days)")
        .text("cameras", "fx3")
        .text("cameras", "fx3")
        .text("accessories", "tripod")
        .text("totalAmount", "1")
}

pub fn with_documents(form: MultipartBody) -> MultipartBody {
    form.file("idProof", "aadhaar.png", "image/png", &[0x89, 0x50, 0x4e, 0x47])
        .file("userPhoto", "selfie.jpg", "image/jpeg", &[0xff, 0xd8, 0xff])
}

/// Seeds the catalog used by [`booking_form`]
pub fn seed_catalog(app: &TestApp) {
    app.seed_item("fx3", Category::Camera, 2000, None);
    app.seed_item("tripod", Category::Accessory, 300, Some(250));
}
