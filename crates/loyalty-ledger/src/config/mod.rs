use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::access::AccessMode;

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
    pub points: PointsConfig,
    pub access_mode: AccessMode,
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

        let grams_per_point = match env::var("APP_GRAMS_PER_POINT") {
            Ok(raw) => Decimal::from_str(raw.trim())
                .ok()
                .filter(|rate| *rate > Decimal::ZERO)
                .ok_or(ConfigError::InvalidGramsPerPoint { value: raw })?,
            Err(_) => PointsConfig::default().grams_per_point,
        };

        let scan_page_size = match env::var("APP_SCAN_PAGE_SIZE") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|size| *size > 0)
                .ok_or(ConfigError::InvalidPageSize { value: raw })?,
            Err(_) => PointsConfig::default().scan_page_size,
        };

        let access_mode = match env::var("APP_ACCESS_MODE") {
            Ok(raw) => AccessMode::parse(&raw).ok_or(ConfigError::InvalidAccessMode { value: raw })?,
            Err(_) => AccessMode::Open,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                ansi: environment == AppEnvironment::Development,
            },
            points: PointsConfig {
                grams_per_point,
                scan_page_size,
            },
            access_mode,
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
    /// Colored output; only enabled for local development terminals.
    pub ansi: bool,
}

/// Point derivation and batch scan settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointsConfig {
    /// Grams of net weight that earn one point.
    pub grams_per_point: Decimal,
    /// Number of ledger rows fetched per page during batch scans.
    pub scan_page_size: usize,
}

impl Default for PointsConfig {
    fn default() -> Self {
        Self {
            grams_per_point: Decimal::TEN,
            scan_page_size: 256,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidGramsPerPoint { value: String },
    InvalidPageSize { value: String },
    InvalidAccessMode { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidGramsPerPoint { value } => write!(
                f,
                "APP_GRAMS_PER_POINT must be a positive decimal (got '{value}')"
            ),
            ConfigError::InvalidPageSize { value } => write!(
                f,
                "APP_SCAN_PAGE_SIZE must be a positive integer (got '{value}')"
            ),
            ConfigError::InvalidAccessMode { value } => write!(
                f,
                "APP_ACCESS_MODE must be 'open' or 'read-only' (got '{value}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidGramsPerPoint { .. }
            | ConfigError::InvalidPageSize { .. }
            | ConfigError::InvalidAccessMode { .. } => None,
        }
    }
}
