use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

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
    pub matching: MatchingConfig,
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
            matching: MatchingConfig::from_env()?,
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

pub const DEFAULT_MIN_RATING: u8 = 5;
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Scoring engine settings and data locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchingConfig {
    /// Rating threshold applied when a request leaves `min_rating` unset.
    pub min_rating: u8,
    pub page_size: usize,
    /// `0` sizes the scoring pool from the available cores.
    pub worker_threads: usize,
    pub registry_path: Option<PathBuf>,
    /// Directory holding `employees.csv`, `readings.csv` and `positions.csv`.
    pub data_dir: Option<PathBuf>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            min_rating: DEFAULT_MIN_RATING,
            page_size: DEFAULT_PAGE_SIZE,
            worker_threads: 0,
            registry_path: None,
            data_dir: None,
        }
    }
}

impl MatchingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let min_rating = match env::var("MATCH_MIN_RATING") {
            Ok(raw) => raw
                .trim()
                .parse::<u8>()
                .ok()
                .filter(|rating| (1..=5).contains(rating))
                .ok_or(ConfigError::InvalidMinRating(raw))?,
            Err(_) => DEFAULT_MIN_RATING,
        };

        let page_size = match env::var("MATCH_PAGE_SIZE") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|size| *size > 0)
                .ok_or(ConfigError::InvalidPageSize(raw))?,
            Err(_) => DEFAULT_PAGE_SIZE,
        };

        let worker_threads = match env::var("MATCH_WORKER_THREADS") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidWorkerThreads(raw))?,
            Err(_) => 0,
        };

        let registry_path = non_empty_path("MATCH_REGISTRY_PATH");
        let data_dir = non_empty_path("MATCH_DATA_DIR");

        Ok(Self {
            min_rating,
            page_size,
            worker_threads,
            registry_path,
            data_dir,
        })
    }
}

fn non_empty_path(key: &str) -> Option<PathBuf> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidMinRating(String),
    InvalidPageSize(String),
    InvalidWorkerThreads(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidMinRating(raw) => {
                write!(f, "MATCH_MIN_RATING must be between 1 and 5 (got '{raw}')")
            }
            ConfigError::InvalidPageSize(raw) => {
                write!(f, "MATCH_PAGE_SIZE must be a positive integer (got '{raw}')")
            }
            ConfigError::InvalidWorkerThreads(raw) => {
                write!(f, "MATCH_WORKER_THREADS must be a non-negative integer (got '{raw}')")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidMinRating(_)
            | ConfigError::InvalidPageSize(_)
            | ConfigError::InvalidWorkerThreads(_) => None,
        }
    }
}
