//! Application settings loaded via OrthoConfig.
//!
//! Values come from CLI flags, `VOICEPOST_*` environment variables and an
//! optional config file. Every field is optional; accessors supply defaults.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;
use zeroize::Zeroizing;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_RAZORPAY_API_BASE: &str = "https://api.razorpay.com/v1/";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_FREE_SIGNUP_CREDITS: u32 = 3;
const DEFAULT_STALE_GENERATION_MINUTES: u32 = 15;
const DEFAULT_SCHEDULED_BATCH_LIMIT: u32 = 10;

/// Errors raised while interpreting loaded settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl SettingsError {
    fn invalid(field: &'static str, message: impl fmt::Display) -> Self {
        Self::Invalid {
            field,
            message: message.to_string(),
        }
    }
}

/// Service configuration.
#[derive(Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "VOICEPOST")]
pub struct AppSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL. The in-memory store is used when absent.
    pub database_url: Option<String>,
    /// Razorpay key id, handed to checkout clients.
    pub razorpay_key_id: Option<String>,
    /// Razorpay key secret; signs payment results. Read from the
    /// environment or config file only, never from the command line.
    #[ortho_config(skip_cli)]
    pub razorpay_key_secret: Option<Zeroizing<String>>,
    pub razorpay_api_base: Option<String>,
    pub publish_webhook_url: Option<String>,
    pub generation_webhook_url: Option<String>,
    pub identity_api_base: Option<String>,
    pub identity_api_key: Option<String>,
    /// Bound applied to every outbound HTTP call.
    pub http_timeout_secs: Option<u64>,
    pub free_signup_credits: Option<u32>,
    pub stale_generation_minutes: Option<u32>,
    pub scheduled_batch_limit: Option<u32>,
    /// Shared secret expected in `x-cron-secret` on sweep endpoints.
    pub cron_secret: Option<String>,
}

impl fmt::Debug for AppSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redacted<T>(value: Option<&T>) -> &'static str {
            if value.is_some() { "**redacted**" } else { "<unset>" }
        }
        f.debug_struct("AppSettings")
            .field("bind_addr", &self.bind_addr)
            .field("database_url", &redacted(self.database_url.as_ref()))
            .field("razorpay_key_id", &self.razorpay_key_id)
            .field("razorpay_key_secret", &redacted(self.razorpay_key_secret.as_ref()))
            .field("razorpay_api_base", &self.razorpay_api_base)
            .field("publish_webhook_url", &self.publish_webhook_url)
            .field("generation_webhook_url", &self.generation_webhook_url)
            .field("identity_api_base", &self.identity_api_base)
            .field("identity_api_key", &redacted(self.identity_api_key.as_ref()))
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("free_signup_credits", &self.free_signup_credits)
            .field("stale_generation_minutes", &self.stale_generation_minutes)
            .field("scheduled_batch_limit", &self.scheduled_batch_limit)
            .field("cron_secret", &redacted(self.cron_secret.as_ref()))
            .finish()
    }
}

fn parse_url(field: &'static str, raw: &str) -> Result<Url, SettingsError> {
    Url::parse(raw).map_err(|err| SettingsError::invalid(field, err))
}

fn optional_url(field: &'static str, raw: Option<&String>) -> Result<Option<Url>, SettingsError> {
    raw.map(|value| parse_url(field, value)).transpose()
}

impl AppSettings {
    /// # Errors
    ///
    /// Returns an error when the configured address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        self.bind_addr
            .as_deref()
            .unwrap_or(DEFAULT_BIND_ADDR)
            .parse()
            .map_err(|err| SettingsError::invalid("bind_addr", err))
    }

    /// # Errors
    ///
    /// Returns an error when the configured base URL does not parse.
    pub fn razorpay_api_base(&self) -> Result<Url, SettingsError> {
        parse_url(
            "razorpay_api_base",
            self.razorpay_api_base
                .as_deref()
                .unwrap_or(DEFAULT_RAZORPAY_API_BASE),
        )
    }

    /// Both webhook endpoints, or `None` when either is unset.
    ///
    /// # Errors
    ///
    /// Returns an error when a configured URL does not parse.
    pub fn webhook_endpoints(&self) -> Result<Option<(Url, Url)>, SettingsError> {
        let generation = optional_url("generation_webhook_url", self.generation_webhook_url.as_ref())?;
        let publish = optional_url("publish_webhook_url", self.publish_webhook_url.as_ref())?;
        Ok(generation.zip(publish))
    }

    /// # Errors
    ///
    /// Returns an error when the configured base URL does not parse.
    pub fn identity_api_base(&self) -> Result<Option<Url>, SettingsError> {
        optional_url("identity_api_base", self.identity_api_base.as_ref())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS))
    }

    pub fn free_signup_credits(&self) -> u32 {
        self.free_signup_credits.unwrap_or(DEFAULT_FREE_SIGNUP_CREDITS)
    }

    pub fn stale_generation_after(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(
            self.stale_generation_minutes
                .unwrap_or(DEFAULT_STALE_GENERATION_MINUTES),
        ))
    }

    pub fn scheduled_batch_limit(&self) -> u32 {
        self.scheduled_batch_limit
            .unwrap_or(DEFAULT_SCHEDULED_BATCH_LIMIT)
    }
}
