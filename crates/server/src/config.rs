//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DISHDASH_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `DISHDASH_BASE_URL` - Public URL of the API (used for OAuth redirect URIs)
//! - `DISHDASH_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `DISHDASH_HOST` - Bind address (default: 127.0.0.1)
//! - `DISHDASH_PORT` - Listen port (default: 8080)
//! - `DISHDASH_CURRENCY` - ISO 4217 currency for all prices (default: USD)
//! - `DISHDASH_TAX_RATE` - Tax rate as a fraction (default: 0.08)
//! - `DISHDASH_UTC_OFFSET_MINUTES` - Offset of restaurant wall-clock time from UTC (default: 0)
//! - `DISHDASH_SLOT_INTERVAL_MINUTES` - Delivery slot length (default: 30)
//! - `DISHDASH_SLOT_LEAD_MINUTES` - Minimum preparation lead time (default: 45)
//! - `DISHDASH_SLOT_HORIZON` - Maximum slots offered per day (default: unlimited)
//! - `GOOGLE_CLIENT_ID` / `GOOGLE_CLIENT_SECRET` - Enables Google sign-in
//! - `FACEBOOK_CLIENT_ID` / `FACEBOOK_CLIENT_SECRET` - Enables Facebook sign-in
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.1)

use std::net::{IpAddr, SocketAddr};

use chrono::{FixedOffset, Offset, Utc};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use dishdash_core::CurrencyCode;
use dishdash_core::slots::SlotPolicy;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the API
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Pricing and scheduling rules
    pub ordering: OrderingConfig,
    /// Google sign-in, when configured
    pub google: Option<OAuthClientConfig>,
    /// Facebook sign-in, when configured
    pub facebook: Option<OAuthClientConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Fraction of error events sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Platform-wide ordering rules.
#[derive(Debug, Clone)]
pub struct OrderingConfig {
    pub currency: CurrencyCode,
    pub tax_rate: Decimal,
    /// Restaurant wall-clock offset from UTC.
    pub local_offset: FixedOffset,
    pub slots: SlotPolicy,
}

impl Default for OrderingConfig {
    fn default() -> Self {
        Self {
            currency: CurrencyCode::USD,
            tax_rate: Decimal::new(8, 2),
            local_offset: Utc.fix(),
            slots: SlotPolicy::default(),
        }
    }
}

/// OAuth 2.0 client credentials for an identity provider.
///
/// Implements `Debug` manually to redact the client secret.
#[derive(Clone)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: SecretString,
}

impl std::fmt::Debug for OAuthClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClientConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env is fine
        let _ = dotenvy::dotenv();

        let database_url = env::database_url("DISHDASH_DATABASE_URL")?;
        let host = env::parsed::<IpAddr>("DISHDASH_HOST", "127.0.0.1")?;
        let port = env::parsed::<u16>("DISHDASH_PORT", "8080")?;
        let base_url = env::required("DISHDASH_BASE_URL")?;
        url::Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidEnvVar("DISHDASH_BASE_URL".to_string(), e.to_string()))?;
        let session_secret = env::secret("DISHDASH_SESSION_SECRET")?;
        secrets::check_session_length("DISHDASH_SESSION_SECRET", session_secret.expose_secret())?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url: base_url.trim_end_matches('/').to_string(),
            session_secret,
            ordering: OrderingConfig::from_env()?,
            google: OAuthClientConfig::from_env("GOOGLE")?,
            facebook: OAuthClientConfig::from_env("FACEBOOK")?,
            sentry_dsn: env::optional("SENTRY_DSN"),
            sentry_environment: env::optional("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: env::parsed("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: env::parsed("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should be marked `Secure`.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl OrderingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let currency = env::or_default("DISHDASH_CURRENCY", "USD")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("DISHDASH_CURRENCY".to_string(), e))?;

        let tax_rate: Decimal = env::parsed("DISHDASH_TAX_RATE", "0.08")?;
        if tax_rate < Decimal::ZERO || tax_rate >= Decimal::ONE {
            return Err(ConfigError::InvalidEnvVar(
                "DISHDASH_TAX_RATE".to_string(),
                "must be a fraction in [0, 1)".to_string(),
            ));
        }

        let offset_minutes: i32 = env::parsed("DISHDASH_UTC_OFFSET_MINUTES", "0")?;
        let local_offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    "DISHDASH_UTC_OFFSET_MINUTES".to_string(),
                    "offset out of range".to_string(),
                )
            })?;

        let interval_minutes: u32 = env::parsed("DISHDASH_SLOT_INTERVAL_MINUTES", "30")?;
        if interval_minutes == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "DISHDASH_SLOT_INTERVAL_MINUTES".to_string(),
                "must be positive".to_string(),
            ));
        }
        let lead_time_minutes: u32 = env::parsed("DISHDASH_SLOT_LEAD_MINUTES", "45")?;
        let horizon_slots = env::optional("DISHDASH_SLOT_HORIZON")
            .map(|v| {
                v.parse::<usize>().map_err(|e| {
                    ConfigError::InvalidEnvVar("DISHDASH_SLOT_HORIZON".to_string(), e.to_string())
                })
            })
            .transpose()?;

        Ok(Self {
            currency,
            tax_rate,
            local_offset,
            slots: SlotPolicy {
                interval_minutes,
                lead_time_minutes,
                horizon_slots,
            },
        })
    }
}

impl OAuthClientConfig {
    /// Load `{PREFIX}_CLIENT_ID` / `{PREFIX}_CLIENT_SECRET`.
    ///
    /// The provider is disabled when neither is set; setting only one is an error.
    fn from_env(prefix: &str) -> Result<Option<Self>, ConfigError> {
        let id_key = format!("{prefix}_CLIENT_ID");
        let secret_key = format!("{prefix}_CLIENT_SECRET");

        match (env::optional(&id_key), env::optional(&secret_key)) {
            (None, None) => Ok(None),
            (Some(client_id), Some(_)) => Ok(Some(Self {
                client_id,
                client_secret: env::secret(&secret_key)?,
            })),
            (None, Some(_)) => Err(ConfigError::MissingEnvVar(id_key)),
            (Some(_), None) => Err(ConfigError::MissingEnvVar(secret_key)),
        }
    }
}

/// Database URL from `DISHDASH_DATABASE_URL`, falling back to `DATABASE_URL`.
///
/// Loads `.env` first. For tools that need the database but none of the
/// server settings.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if neither variable is set.
pub fn database_url_from_env() -> Result<SecretString, ConfigError> {
    let _ = dotenvy::dotenv();
    env::database_url("DISHDASH_DATABASE_URL")
}

/// Environment lookups shared by the config loaders.
mod env {
    use std::str::FromStr;

    use secrecy::SecretString;

    use super::{ConfigError, secrets};

    pub fn required(key: &str) -> Result<String, ConfigError> {
        optional(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Unset and empty are treated the same.
    pub fn optional(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }

    pub fn or_default(key: &str, default: &str) -> String {
        optional(key).unwrap_or_else(|| default.to_string())
    }

    pub fn parsed<T>(key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        or_default(key, default)
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// `primary`, else the generic `DATABASE_URL` that sqlx tooling reads.
    pub fn database_url(primary: &str) -> Result<SecretString, ConfigError> {
        optional(primary)
            .or_else(|| optional("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar(primary.to_string()))
    }

    /// A required secret that must pass [`secrets::check_strength`].
    pub fn secret(key: &str) -> Result<SecretString, ConfigError> {
        let value = required(key)?;
        secrets::check_strength(key, &value)?;
        Ok(SecretString::from(value))
    }
}

/// Rejects placeholder and low-entropy secrets before the server starts.
mod secrets {
    use std::collections::HashMap;

    use super::ConfigError;

    const MIN_SESSION_SECRET_LENGTH: usize = 32;
    const MIN_BITS_PER_CHAR: f64 = 3.3;

    /// Substrings that give away a copied `.env.example` value.
    const PLACEHOLDERS: &[&str] = &[
        "your-",
        "changeme",
        "replace",
        "placeholder",
        "example",
        "secret",
        "password",
        "xxx",
        "todo",
        "fixme",
        "insert",
        "enter-",
        "put-your",
        "add-your",
    ];

    fn insecure(key: &str, reason: String) -> ConfigError {
        ConfigError::InsecureSecret(key.to_string(), reason)
    }

    pub fn check_session_length(key: &str, value: &str) -> Result<(), ConfigError> {
        let len = value.chars().count();
        if len < MIN_SESSION_SECRET_LENGTH {
            return Err(insecure(
                key,
                format!("must be at least {MIN_SESSION_SECRET_LENGTH} characters (got {len})"),
            ));
        }
        Ok(())
    }

    pub fn check_strength(key: &str, value: &str) -> Result<(), ConfigError> {
        let lower = value.to_lowercase();
        if let Some(hit) = PLACEHOLDERS.iter().find(|p| lower.contains(*p)) {
            return Err(insecure(
                key,
                format!("appears to be a placeholder (contains '{hit}')"),
            ));
        }

        let bits = bits_per_char(value);
        if bits < MIN_BITS_PER_CHAR {
            return Err(insecure(
                key,
                format!(
                    "entropy too low ({bits:.2} bits/char, need >= {MIN_BITS_PER_CHAR:.1}); generate it randomly"
                ),
            ));
        }
        Ok(())
    }

    /// Shannon entropy of the character distribution.
    #[allow(clippy::cast_precision_loss)]
    pub fn bits_per_char(value: &str) -> f64 {
        let mut counts: HashMap<char, u32> = HashMap::new();
        let mut total = 0_u32;
        for c in value.chars() {
            *counts.entry(c).or_default() += 1;
            total += 1;
        }
        if total == 0 {
            return 0.0;
        }

        let total = f64::from(total);
        counts
            .values()
            .map(|&n| {
                let p = f64::from(n) / total;
                -p * p.log2()
            })
            .sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_per_char() {
        assert!(secrets::bits_per_char("").abs() < f64::EPSILON);
        assert!(secrets::bits_per_char("aaaaaaa").abs() < f64::EPSILON);
        assert!((secrets::bits_per_char("ab") - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_placeholder_secret_rejected() {
        let result = secrets::check_strength("GOOGLE_CLIENT_SECRET", "your-google-secret");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_repetitive_secret_rejected() {
        let result = secrets::check_strength("S", "abababababababababababababababab");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_random_secret_accepted() {
        assert!(secrets::check_strength("S", "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6").is_ok());
    }

    #[test]
    fn test_session_secret_length() {
        assert!(secrets::check_session_length("S", "short").is_err());
        assert!(secrets::check_session_length("S", &"k".repeat(32)).is_ok());
    }

    #[test]
    fn test_default_ordering_config() {
        let ordering = OrderingConfig::default();
        assert_eq!(ordering.tax_rate, Decimal::new(8, 2));
        assert_eq!(ordering.local_offset.local_minus_utc(), 0);
        assert_eq!(ordering.slots.interval_minutes, 30);
    }

    #[test]
    fn test_socket_addr_and_https() {
        let config = ServerConfig {
            database_url: SecretString::from("postgres://localhost/dishdash"),
            host: "127.0.0.1".parse().unwrap(),
            port: 8080,
            base_url: "https://api.dishdash.test".to_string(),
            session_secret: SecretString::from("x".repeat(32)),
            ordering: OrderingConfig::default(),
            google: None,
            facebook: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 8080);
        assert!(config.is_https());
    }

    #[test]
    fn test_oauth_config_debug_redacts_secret() {
        let config = OAuthClientConfig {
            client_id: "client-id-123".to_string(),
            client_secret: SecretString::from("very_private_value"),
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("client-id-123"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("very_private_value"));
    }
}
