//! Storefront HTTP client
//!
//! Thin wrapper over `reqwest` that talks to the `/api` routes with the
//! shared API key and, once an admin has logged in, a bearer token. Every
//! request has a fixed 10 second timeout and is never retried.

use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::checkout::{BookingReceipt, BookingRequest};
use crate::middleware::API_KEY_HEADER;
use crate::model::{CatalogItem, PopulatedBooking};

/// Per-request timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const UNREACHABLE_MESSAGE: &str =
    "Unable to reach the server. Please check your connection and try again.";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request timed out after {}s", REQUEST_TIMEOUT.as_secs())]
    Timeout,

    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The server answered with a non-2xx status
    #[error("server returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("unexpected response body: {0}")]
    Decode(String),

    /// The request could not be built (bad URL, invalid MIME type, ...)
    #[error("invalid request: {0}")]
    Request(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else if err.is_builder() {
            ClientError::Request(err.to_string())
        } else {
            ClientError::Network(err)
        }
    }
}

impl ClientError {
    /// Text suitable for a notification
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Timeout | ClientError::Network(_) => UNREACHABLE_MESSAGE.to_string(),
            ClientError::Api { message, .. } => message.clone(),
            ClientError::Decode(_) | ClientError::Request(_) => {
                "Something went wrong. Please try again.".to_string()
            }
        }
    }
}

/// Admin user as returned by the login endpoint
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub email: String,
    pub role: String,
}

/// Successful login
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoginSession {
    pub token: String,
    /// Token expiry, unix seconds
    pub expires_at: i64,
    pub user: SessionUser,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct BookingList {
    bookings: Vec<PopulatedBooking>,
}

#[derive(Debug, Clone)]
pub struct StorefrontClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    token: Option<String>,
}

impl StorefrontClient {
    /// `base_url` is the API root, e.g. `https://rentmycam.com/api`
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            token: None,
        })
    }

    /// Sets or clears the admin bearer token sent with every request
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .header(API_KEY_HEADER, &self.api_key);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn execute<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ClientError> {
        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.message,
                Err(_) => status.canonical_reason().unwrap_or("Request failed").to_string(),
            };
            tracing::debug!(status = status.as_u16(), %message, "API request failed");
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<T>().await?)
    }

    pub async fn cameras(&self) -> Result<Vec<CatalogItem>, ClientError> {
        Self::execute(self.request(Method::GET, "/cameras")).await
    }

    pub async fn accessories(&self) -> Result<Vec<CatalogItem>, ClientError> {
        Self::execute(self.request(Method::GET, "/accessories")).await
    }

    pub async fn camera(&self, id: &str) -> Result<CatalogItem, ClientError> {
        Self::execute(self.request(Method::GET, &format!("/cameras/{}", id))).await
    }

    pub async fn accessory(&self, id: &str) -> Result<CatalogItem, ClientError> {
        Self::execute(self.request(Method::GET, &format!("/accessories/{}", id))).await
    }

    /// Submits a checkout as multipart form data
    pub async fn create_booking(&self, request: BookingRequest) -> Result<BookingReceipt, ClientError> {
        let form = request.into_multipart()?;
        Self::execute(self.request(Method::POST, "/bookings").multipart(form)).await
    }

    /// Logs the admin in; the caller decides whether to keep the token
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginSession, ClientError> {
        let body = json!({ "email": email, "password": password });
        Self::execute(self.request(Method::POST, "/auth/login").json(&body)).await
    }

    /// All bookings (needs a bearer token)
    pub async fn bookings(&self) -> Result<Vec<PopulatedBooking>, ClientError> {
        let list: BookingList = Self::execute(self.request(Method::GET, "/bookings")).await?;
        Ok(list.bookings)
    }
}
