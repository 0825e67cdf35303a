//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//!
//! ## Required when `COMMERCE_BACKEND=http`
//! - `COMMERCE_API_URL` - Commerce platform API root (e.g. `https://api.europe-west1.gcp.commercetools.com`)
//! - `COMMERCE_AUTH_URL` - OAuth server root
//! - `COMMERCE_PROJECT_KEY` - Project key
//! - `COMMERCE_CLIENT_ID` - API client id
//! - `COMMERCE_CLIENT_SECRET` - API client secret (high entropy)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` URL for the session store
//!   (sessions are kept in memory when unset)
//! - `STOREFRONT_DEFAULT_LOCALE` - Locale when `Accept-Language` is absent (default: en-US)
//! - `STOREFRONT_CURRENCIES` - Country to currency map (default: `DE:EUR,AT:EUR,US:USD,GB:GBP`)
//! - `COMMERCE_BACKEND` - `memory` or `http` (default: memory)
//! - `COMMERCE_SCOPES` - OAuth scopes to request
//! - `COMMERCE_CATALOG_FILE` - YAML catalog for the memory backend
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)
//! - `LOG_FORMAT` - `pretty` or `json` (default: pretty)

use std::collections::{BTreeMap, HashMap};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use basket_core::{CurrencyCode, Locale};

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
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

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// `PostgreSQL` URL for persistent sessions (contains password)
    pub database_url: Option<SecretString>,
    /// Locale used when the request does not name one
    pub default_locale: Locale,
    /// Which currency each shipping country is priced in
    pub markets: Markets,
    /// Commerce backend selection
    pub backend: BackendConfig,
    /// Emit JSON logs instead of human-readable ones
    pub log_json: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Which commerce backend implementation to run against.
#[derive(Debug, Clone)]
pub enum BackendConfig {
    /// Keep everything in process.
    Memory {
        /// YAML catalog; the built-in demo catalog is used when `None`.
        catalog_file: Option<PathBuf>,
    },
    /// Talk to the remote platform over HTTP.
    Http(CommerceApiConfig),
}

/// Remote commerce platform credentials.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct CommerceApiConfig {
    /// API root, without the project key
    pub api_url: Url,
    /// OAuth server root
    pub auth_url: Url,
    /// Project key, first path segment of every API call
    pub project_key: String,
    /// API client id
    pub client_id: String,
    /// API client secret
    pub client_secret: SecretString,
    /// Space separated scopes; the client's default scopes when `None`
    pub scopes: Option<String>,
}

impl std::fmt::Debug for CommerceApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommerceApiConfig")
            .field("api_url", &self.api_url.as_str())
            .field("auth_url", &self.auth_url.as_str())
            .field("project_key", &self.project_key)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        let database_url = get_optional_env("STOREFRONT_DATABASE_URL").map(SecretString::from);

        let default_locale = Locale::parse(&get_env_or_default(
            "STOREFRONT_DEFAULT_LOCALE",
            "en-US",
        ))
        .map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_DEFAULT_LOCALE".to_string(), e.to_string())
        })?;
        let markets = Markets::parse(
            &get_env_or_default("STOREFRONT_CURRENCIES", Markets::DEFAULT),
            &default_locale,
        )
        .map_err(|e| ConfigError::InvalidEnvVar("STOREFRONT_CURRENCIES".to_string(), e))?;

        let backend = BackendConfig::from_env()?;

        let log_json = match get_env_or_default("LOG_FORMAT", "pretty").as_str() {
            "pretty" => false,
            "json" => true,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "LOG_FORMAT".to_string(),
                    format!("expected 'pretty' or 'json', got '{other}'"),
                ));
            }
        };

        Ok(Self {
            host,
            port,
            base_url,
            database_url,
            default_locale,
            markets,
            backend,
            log_json,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: get_rate("SENTRY_SAMPLE_RATE", 1.0)?,
            sentry_traces_sample_rate: get_rate("SENTRY_TRACES_SAMPLE_RATE", 0.0)?,
        })
    }

    /// Configuration for tests and local tooling: memory backend, demo
    /// catalog, in-memory sessions.
    #[must_use]
    pub fn local(base_url: &str) -> Self {
        let default_locale = Locale::parse("en-US").unwrap_or_else(|_| unreachable!());
        let markets = Markets::parse(Markets::DEFAULT, &default_locale)
            .unwrap_or_else(|_| unreachable!("default markets parse"));
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: base_url.to_string(),
            database_url: None,
            default_locale,
            markets,
            backend: BackendConfig::Memory { catalog_file: None },
            log_json: false,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the storefront is served over https.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl BackendConfig {
    fn from_env() -> Result<Self, ConfigError> {
        match get_env_or_default("COMMERCE_BACKEND", "memory").as_str() {
            "memory" => Ok(Self::Memory {
                catalog_file: get_optional_env("COMMERCE_CATALOG_FILE").map(PathBuf::from),
            }),
            "http" => Ok(Self::Http(CommerceApiConfig::from_env()?)),
            other => Err(ConfigError::InvalidEnvVar(
                "COMMERCE_BACKEND".to_string(),
                format!("expected 'memory' or 'http', got '{other}'"),
            )),
        }
    }
}

impl CommerceApiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: get_url("COMMERCE_API_URL")?,
            auth_url: get_url("COMMERCE_AUTH_URL")?,
            project_key: get_required_env("COMMERCE_PROJECT_KEY")?,
            client_id: get_required_env("COMMERCE_CLIENT_ID")?,
            client_secret: get_validated_secret("COMMERCE_CLIENT_SECRET")?,
            scopes: get_optional_env("COMMERCE_SCOPES"),
        })
    }
}

// =============================================================================
// Markets
// =============================================================================

/// Country to currency mapping used to price carts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markets {
    currencies: BTreeMap<String, CurrencyCode>,
    default_country: String,
}

impl Markets {
    /// Default `STOREFRONT_CURRENCIES` value.
    pub const DEFAULT: &'static str = "DE:EUR,AT:EUR,US:USD,GB:GBP";

    /// Parse a `COUNTRY:CURRENCY,...` list.
    ///
    /// The default country is the default locale's region when it is listed,
    /// otherwise the first entry.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first malformed entry.
    pub fn parse(input: &str, default_locale: &Locale) -> Result<Self, String> {
        let mut currencies = BTreeMap::new();
        let mut first = None;

        for entry in input.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (country, currency) = entry
                .split_once(':')
                .ok_or_else(|| format!("expected COUNTRY:CURRENCY, got '{entry}'"))?;
            let country = country.trim().to_ascii_uppercase();
            if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(format!("invalid country code '{country}'"));
            }
            let currency = CurrencyCode::parse(currency).map_err(|e| e.to_string())?;
            first.get_or_insert_with(|| country.clone());
            currencies.insert(country, currency);
        }

        let first = first.ok_or_else(|| "at least one market is required".to_string())?;
        let default_country = default_locale
            .region()
            .filter(|region| currencies.contains_key(*region))
            .map_or(first, str::to_string);

        Ok(Self {
            currencies,
            default_country,
        })
    }

    /// Currency and country to price a cart for `locale`.
    ///
    /// Unknown or missing regions fall back to the default country.
    #[must_use]
    pub fn resolve(&self, locale: &Locale) -> (CurrencyCode, String) {
        let country = locale
            .region()
            .filter(|region| self.currencies.contains_key(*region))
            .unwrap_or(self.default_country.as_str());
        let currency = self
            .currencies
            .get(country)
            .copied()
            .unwrap_or_default();
        (currency, country.to_string())
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_url(key: &str) -> Result<Url, ConfigError> {
    let value = get_required_env(key)?;
    Url::parse(&value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a sample rate in `0.0..=1.0`.
fn get_rate(key: &str, default: f32) -> Result<f32, ConfigError> {
    let Some(value) = get_optional_env(key) else {
        return Ok(default);
    };
    let rate = value
        .parse::<f32>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !(0.0..=1.0).contains(&rate) {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be between 0.0 and 1.0 (got {rate})"),
        ));
    }
    Ok(rate)
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
