//! Application configuration loaded from environment variables.
//!
//! Secrets (SMTP password) are injected as environment variables by the
//! deployment, so everything is read once at startup.

use std::env;
use std::time::Duration;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// GCP project ID (Firestore lives here)
    pub gcp_project_id: String,
    /// Firebase project used as ID token issuer/audience
    pub firebase_project_id: String,
    /// Cloud Storage bucket holding beats, covers and profile photos
    pub storage_bucket: String,
    /// Frontend URL (CORS)
    pub frontend_url: String,
    /// Public app URL used for links in emails
    pub app_url: String,
    /// Server port
    pub port: u16,
    /// Who may administer the catalog
    pub admins: AdminPolicy,
    /// Studio name shown in emails
    pub studio_name: String,
    /// Producer credited on migrated beats without metadata
    pub default_producer: String,
    /// Lifetime of resolved download URLs
    pub download_url_ttl: Duration,
    /// Outbound mail settings, if booking confirmations are enabled
    pub smtp: Option<SmtpConfig>,
}

/// SMTP relay settings for booking confirmations.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Full "From" header, e.g. `43ART Studio <noreply@43art-studio.com>`
    pub from: String,
}

/// Administrator allow-list.
///
/// Entries starting with `@` match any address in that domain; other entries
/// must match the whole address. Only verified token emails are checked
/// against it. A verified `admin: true` token claim also
/// grants administration (checked by the auth middleware).
#[derive(Debug, Clone, Default)]
pub struct AdminPolicy {
    emails: Vec<String>,
    domains: Vec<String>,
}

impl AdminPolicy {
    /// Parse a comma-separated list such as `owner@example.com,@studio.fr`.
    pub fn parse(raw: &str) -> Self {
        let mut policy = Self::default();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let entry = entry.to_ascii_lowercase();
            if entry.starts_with('@') {
                policy.domains.push(entry);
            } else {
                policy.emails.push(entry);
            }
        }
        policy
    }

    /// Whether this email address is on the allow-list.
    pub fn allows(&self, email: &str) -> bool {
        let email = email.trim().to_ascii_lowercase();
        if email.is_empty() {
            return false;
        }
        self.emails.iter().any(|e| *e == email)
            || self.domains.iter().any(|d| email.ends_with(d.as_str()))
    }
}

impl Config {
    /// Deterministic config for tests.
    pub fn test_default() -> Self {
        Self {
            gcp_project_id: "test-project".to_string(),
            firebase_project_id: "test-project".to_string(),
            storage_bucket: "test-bucket".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            app_url: "http://localhost:5173".to_string(),
            port: 8080,
            admins: AdminPolicy::parse("admin@example.com,@studio.test"),
            studio_name: "43ART Studio".to_string(),
            default_producer: "43 Art".to_string(),
            download_url_ttl: Duration::from_secs(3600),
            smtp: None,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let gcp_project_id =
            env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string());
        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());

        Ok(Self {
            firebase_project_id: env::var("FIREBASE_PROJECT_ID")
                .unwrap_or_else(|_| gcp_project_id.clone()),
            gcp_project_id,
            storage_bucket: env::var("STORAGE_BUCKET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("STORAGE_BUCKET"))?,
            app_url: env::var("APP_URL").unwrap_or_else(|_| frontend_url.clone()),
            frontend_url,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            admins: AdminPolicy::parse(&env::var("ADMIN_EMAILS").unwrap_or_default()),
            studio_name: env::var("STUDIO_NAME").unwrap_or_else(|_| "43ART Studio".to_string()),
            default_producer: env::var("DEFAULT_PRODUCER")
                .unwrap_or_else(|_| "43 Art".to_string()),
            download_url_ttl: Duration::from_secs(
                env::var("DOWNLOAD_URL_TTL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(3600),
            ),
            smtp: smtp_from_env()?,
        })
    }
}

/// SMTP is optional: absent `SMTP_SERVER` disables confirmation emails, but a
/// half-configured relay is an error.
fn smtp_from_env() -> Result<Option<SmtpConfig>, ConfigError> {
    let Ok(server) = env::var("SMTP_SERVER") else {
        return Ok(None);
    };

    Ok(Some(SmtpConfig {
        server: server.trim().to_string(),
        port: env::var("SMTP_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(587),
        username: env::var("SMTP_USERNAME").map_err(|_| ConfigError::Missing("SMTP_USERNAME"))?,
        password: env::var("SMTP_PASSWORD")
            .map(|v| v.trim().to_string())
            .map_err(|_| ConfigError::Missing("SMTP_PASSWORD"))?,
        from: env::var("MAIL_FROM").map_err(|_| ConfigError::Missing("MAIL_FROM"))?,
    }))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
