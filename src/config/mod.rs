//! Configuration management
//!
//! Values are layered: built-in defaults, then `config/callhub.toml` if it
//! exists, then `CALLHUB__*` environment variables (e.g.
//! `CALLHUB__PROVIDER__AUTH_TOKEN`). `DATABASE_URL` overrides the database url.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub provider: ProviderConfig,
    pub notifications: NotificationConfig,
    pub media: MediaConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
}

impl DatabaseConfig {
    /// The url with any password replaced by `****`
    pub fn masked_url(&self) -> String {
        let url = &self.url;
        let Some(at_pos) = url.find('@') else {
            return url.clone();
        };
        let Some(colon_pos) = url[..at_pos].rfind(':') else {
            return url.clone();
        };
        // Scheme separator, no password present
        if url[colon_pos..].starts_with("://") {
            return url.clone();
        }
        let mut masked = url.clone();
        masked.replace_range(colon_pos + 1..at_pos, "****");
        masked
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.masked_url())
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .finish_non_exhaustive()
    }
}

/// Media provider credentials
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    pub account_sid: String,
    pub auth_token: String,
    pub api_key_sid: String,
    pub api_key_secret: String,
    pub token_ttl_seconds: i64,
    pub request_timeout_seconds: u64,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("account_sid", &self.account_sid)
            .field("api_key_sid", &self.api_key_sid)
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub fcm_endpoint: String,
    /// Empty disables push delivery
    pub fcm_server_key: String,
}

impl std::fmt::Debug for NotificationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationConfig")
            .field("fcm_endpoint", &self.fcm_endpoint)
            .field("fcm_enabled", &!self.fcm_server_key.is_empty())
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Prefix for avatar storage keys
    pub avatar_base_url: String,
}

impl MediaConfig {
    /// Public URL for an avatar key, empty when there is none
    pub fn avatar_url(&self, key: Option<&str>) -> String {
        match key {
            Some(key) if !key.is_empty() => {
                format!("{}/{}", self.avatar_base_url.trim_end_matches('/'), key)
            }
            _ => String::new(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret for bearer tokens; required
    pub jwt_secret: String,
}

/// Shortest bearer secret accepted at startup
pub const MIN_JWT_SECRET_LEN: usize = 16;

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig").finish_non_exhaustive()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "postgres://postgres@localhost/callhub".to_string(),
                max_connections: 10,
                min_connections: 2,
                connect_timeout_seconds: 5,
                idle_timeout_seconds: 600,
            },
            provider: ProviderConfig {
                base_url: "https://video.twilio.com".to_string(),
                account_sid: String::new(),
                auth_token: String::new(),
                api_key_sid: String::new(),
                api_key_secret: String::new(),
                token_ttl_seconds: 3600,
                request_timeout_seconds: 10,
            },
            notifications: NotificationConfig {
                fcm_endpoint: "https://fcm.googleapis.com/fcm/send".to_string(),
                fcm_server_key: String::new(),
            },
            media: MediaConfig {
                avatar_base_url: "http://localhost:8080/avatars".to_string(),
            },
            auth: AuthConfig {
                jwt_secret: String::new(),
            },
        }
    }
}

impl Config {
    /// Load defaults, the optional config file and the environment
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config/callhub")
    }

    pub fn load_from(file_stem: &str) -> Result<Self, config::ConfigError> {
        let config = Self::assemble(file_stem)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service must not start with
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.auth.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(config::ConfigError::Message(format!(
                "auth.jwt_secret must be set to at least {} characters (CALLHUB__AUTH__JWT_SECRET)",
                MIN_JWT_SECRET_LEN
            )));
        }
        Ok(())
    }

    fn assemble(file_stem: &str) -> Result<Self, config::ConfigError> {
        let defaults = config::Config::try_from(&Config::default())?;

        let mut builder = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name(file_stem).required(false))
            .add_source(
                config::Environment::with_prefix("CALLHUB")
                    .prefix_separator("__")
                    .separator("__"),
            );

        if let Ok(url) = std::env::var("DATABASE_URL") {
            builder = builder.set_override("database.url", url)?;
        }

        builder.build()?.try_deserialize()
    }
}
