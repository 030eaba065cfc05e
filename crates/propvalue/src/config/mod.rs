use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::address::GuardPolicy;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub providers: ProvidersConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            providers: ProvidersConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

pub const PROVIDER_NAMES: [&str; 3] = ["paf", "geography", "geocoding"];

/// Credentials, endpoints, and guard limits for the outbound data providers.
///
/// API keys are read once at startup; a missing key leaves the provider in
/// the chain so it reports `RequestDenied` instead of silently vanishing.
#[derive(Clone)]
pub struct ProvidersConfig {
    pub paf_api_key: Option<String>,
    pub geocoding_api_key: Option<String>,
    pub paf_base_url: String,
    pub postcodes_base_url: String,
    pub geocoding_base_url: String,
    pub hpi_base_url: String,
    pub http_timeout: Duration,
    /// Chain order for the address resolver, lowercase provider names.
    pub order: Vec<String>,
    pub guard: GuardPolicy,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            paf_api_key: None,
            geocoding_api_key: None,
            paf_base_url: "https://api.getaddress.io".to_string(),
            postcodes_base_url: "https://api.postcodes.io".to_string(),
            geocoding_base_url: "https://maps.googleapis.com/maps/api".to_string(),
            hpi_base_url: "https://landregistry.data.gov.uk/data/ukhpi".to_string(),
            http_timeout: Duration::from_secs(10),
            order: PROVIDER_NAMES.iter().map(|name| name.to_string()).collect(),
            guard: GuardPolicy::default(),
        }
    }
}

// Keys stay out of Debug output so config dumps are safe to log.
impl fmt::Debug for ProvidersConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvidersConfig")
            .field("paf_api_key", &self.paf_api_key.as_ref().map(|_| "<redacted>"))
            .field(
                "geocoding_api_key",
                &self.geocoding_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("paf_base_url", &self.paf_base_url)
            .field("postcodes_base_url", &self.postcodes_base_url)
            .field("geocoding_base_url", &self.geocoding_base_url)
            .field("hpi_base_url", &self.hpi_base_url)
            .field("http_timeout", &self.http_timeout)
            .field("order", &self.order)
            .field("guard", &self.guard)
            .finish()
    }
}

impl ProvidersConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let order = match optional_var("ADDRESS_PROVIDERS") {
            Some(raw) => parse_provider_order(&raw)?,
            None => defaults.order,
        };

        Ok(Self {
            paf_api_key: optional_var("GETADDRESS_API_KEY"),
            geocoding_api_key: optional_var("GOOGLE_MAPS_API_KEY"),
            paf_base_url: base_url("PAF_BASE_URL", defaults.paf_base_url),
            postcodes_base_url: base_url("POSTCODES_BASE_URL", defaults.postcodes_base_url),
            geocoding_base_url: base_url("GEOCODING_BASE_URL", defaults.geocoding_base_url),
            hpi_base_url: base_url("HPI_BASE_URL", defaults.hpi_base_url),
            http_timeout: Duration::from_secs(numeric_var(
                "HTTP_TIMEOUT_SECS",
                defaults.http_timeout.as_secs(),
            )?),
            order,
            guard: GuardPolicy {
                requests_per_minute: numeric_var(
                    "PROVIDER_REQUESTS_PER_MINUTE",
                    defaults.guard.requests_per_minute,
                )?,
                failure_threshold: numeric_var(
                    "CIRCUIT_FAILURE_THRESHOLD",
                    defaults.guard.failure_threshold,
                )?,
                cooldown: Duration::from_secs(numeric_var(
                    "CIRCUIT_COOLDOWN_SECS",
                    defaults.guard.cooldown.as_secs(),
                )?),
            },
        })
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn base_url(key: &str, default: String) -> String {
    optional_var(key)
        .map(|value| value.trim_end_matches('/').to_string())
        .unwrap_or(default)
}

fn numeric_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match optional_var(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key, value: raw }),
        None => Ok(default),
    }
}

fn parse_provider_order(raw: &str) -> Result<Vec<String>, ConfigError> {
    let mut order: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|name| !name.is_empty()) {
        let name = name.to_ascii_lowercase();
        if !PROVIDER_NAMES.contains(&name.as_str()) {
            return Err(ConfigError::UnknownProvider { name });
        }
        if !order.contains(&name) {
            order.push(name);
        }
    }
    if order.is_empty() {
        return Err(ConfigError::EmptyProviderOrder);
    }
    Ok(order)
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str, value: String },
    UnknownProvider { name: String },
    EmptyProviderOrder,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be a non-negative integer, got '{value}'")
            }
            ConfigError::UnknownProvider { name } => write!(
                f,
                "ADDRESS_PROVIDERS contains unknown provider '{name}' (expected {})",
                PROVIDER_NAMES.join(", ")
            ),
            ConfigError::EmptyProviderOrder => {
                write!(f, "ADDRESS_PROVIDERS must name at least one provider")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
