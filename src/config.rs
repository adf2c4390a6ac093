//! Runtime configuration
//!
//! All settings are read once from the environment (after `.env` has been
//! loaded by `main`) into a strongly-typed [`Config`]. Handlers and
//! middleware receive it through the application state and never touch
//! `std::env` themselves.

use anyhow::{Context, Result};
use std::env;

/// Credentials for the unsigned Cloudinary upload API
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub upload_preset: String,
}

/// Service configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 8080)
    pub port: u16,

    /// Path to the redb database file (default: "data.db")
    pub database_url: String,

    /// Shared secret expected in the `x-api-key` header
    pub api_key: String,

    /// HS256 secret used to sign admin bearer tokens
    pub jwt_secret: String,

    /// Admin login email
    pub admin_login_email: String,

    /// Admin login password
    pub admin_password: String,

    /// Lifetime of an issued bearer token, in hours (default: 24)
    pub token_ttl_hours: i64,

    /// Origins allowed by the CORS layer
    pub cors_origins: Vec<String>,

    /// Brand name used in emails and WhatsApp messages
    pub brand_name: String,

    /// Recipient of the admin "new booking" email
    /// Optional - when unset the admin email is skipped
    pub admin_email: Option<String>,

    /// From address of outgoing emails
    pub email_sender: String,

    /// Brevo transactional email API key
    /// Optional - when unset emails are only logged
    pub brevo_api_key: Option<String>,

    /// Cloudinary settings
    /// Optional - when unset uploads are written to `upload_dir`
    pub cloudinary: Option<CloudinaryConfig>,

    /// Directory for locally stored uploads (default: "uploads")
    pub upload_dir: String,

    /// Public base URL used to build links to locally stored uploads
    pub public_base_url: String,

    /// Country code prefixed to customer numbers in wa.me links (default: "91")
    pub whatsapp_country_code: String,

    /// Business phone number shown to customers
    pub business_phone: String,
}

impl Config {
    /// Creates a Config by reading environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error when a required variable is missing or a numeric
    /// variable cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .context("Failed to parse PORT as a number")?;

        let token_ttl_hours = env::var("TOKEN_TTL_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .context("Failed to parse TOKEN_TTL_HOURS as a number")?;

        let cloudinary = match (
            optional("CLOUDINARY_CLOUD_NAME"),
            optional("CLOUDINARY_UPLOAD_PRESET"),
        ) {
            (Some(cloud_name), Some(upload_preset)) => Some(CloudinaryConfig {
                cloud_name,
                upload_preset,
            }),
            _ => None,
        };

        Ok(Self {
            port,
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "data.db".to_string()),
            api_key: env::var("API_KEY").context("API_KEY environment variable is required")?,
            jwt_secret: env::var("JWT_SECRET")
                .context("JWT_SECRET environment variable is required")?,
            admin_login_email: env::var("ADMIN_LOGIN_EMAIL")
                .context("ADMIN_LOGIN_EMAIL environment variable is required")?,
            admin_password: env::var("ADMIN_PASSWORD")
                .context("ADMIN_PASSWORD environment variable is required")?,
            token_ttl_hours,
            cors_origins: parse_origins(
                &env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".to_string()),
            ),
            brand_name: env::var("BRAND_NAME").unwrap_or_else(|_| "Rent My Cam".to_string()),
            admin_email: optional("ADMIN_EMAIL"),
            email_sender: env::var("EMAIL_SENDER")
                .unwrap_or_else(|_| "no-reply@rentmycam.com".to_string()),
            brevo_api_key: optional("BREVO_API_KEY"),
            cloudinary,
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}", port)),
            whatsapp_country_code: env::var("WHATSAPP_COUNTRY_CODE")
                .unwrap_or_else(|_| "91".to_string()),
            business_phone: env::var("BUSINESS_PHONE")
                .unwrap_or_else(|_| "+91 98765 43210".to_string()),
        })
    }

    /// Configuration with fixed secrets and local-only services, for tests
    pub fn for_tests(upload_dir: &str) -> Self {
        Self {
            port: 8080,
            database_url: "test.db".to_string(),
            api_key: "test-api-key".to_string(),
            jwt_secret: "test-jwt-secret".to_string(),
            admin_login_email: "admin@rentmycam.com".to_string(),
            admin_password: "admin123".to_string(),
            token_ttl_hours: 24,
            cors_origins: vec!["http://localhost:5173".to_string()],
            brand_name: "Rent My Cam".to_string(),
            admin_email: Some("owner@rentmycam.com".to_string()),
            email_sender: "no-reply@rentmycam.com".to_string(),
            brevo_api_key: None,
            cloudinary: None,
            upload_dir: upload_dir.to_string(),
            public_base_url: "http://localhost:8080".to_string(),
            whatsapp_country_code: "91".to_string(),
            business_phone: "+91 98765 43210".to_string(),
        }
    }
}

/// Reads an optional variable, treating an empty value as unset
fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/').to_string())
        .filter(|origin| !origin.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins_trims_and_drops_empty() {
        let origins = parse_origins(" https://rentmycam.com/ ,,http://localhost:5173");
        assert_eq!(
            origins,
            vec![
                "https://rentmycam.com".to_string(),
                "http://localhost:5173".to_string()
            ]
        );
    }

    #[test]
    fn test_config_from_env() {
        env::set_var("PORT", "9000");
        env::set_var("API_KEY", "k");
        env::set_var("JWT_SECRET", "s");
        env::set_var("ADMIN_LOGIN_EMAIL", "admin@example.com");
        env::set_var("ADMIN_PASSWORD", "pw");

        let config = Config::from_env().expect("Failed to load config");

        assert_eq!(config.port, 9000);
        assert_eq!(config.api_key, "k");
        assert_eq!(config.public_base_url, "http://localhost:9000");
        assert_eq!(config.token_ttl_hours, 24);

        env::remove_var("PORT");
        env::remove_var("API_KEY");
        env::remove_var("JWT_SECRET");
        env::remove_var("ADMIN_LOGIN_EMAIL");
        env::remove_var("ADMIN_PASSWORD");
    }
}
