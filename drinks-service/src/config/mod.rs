use service_core::config as core_config;
use service_core::error::AppError;
use service_core::observability::LogFormat;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::KeySource;

#[derive(Debug, Clone)]
pub struct DrinksConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub log_format: LogFormat,
    pub otlp_endpoint: Option<String>,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub security: SecurityConfig,
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub run_migrations: bool,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwks_url: Option<String>,
    pub jwks_path: Option<PathBuf>,
    /// A JWKS document given directly, for pinned keys and local runs.
    pub jwks_json: Option<String>,
    pub audience: String,
    pub issuer: String,
    /// `0` disables background refresh.
    pub jwks_refresh_seconds: u64,
    pub leeway_seconds: u64,
}

impl AuthConfig {
    /// Precedence: URL, then file, then inline JSON.
    pub fn key_source(&self) -> Option<KeySource> {
        self.jwks_url
            .clone()
            .map(KeySource::Url)
            .or_else(|| self.jwks_path.clone().map(KeySource::File))
            .or_else(|| self.jwks_json.clone().map(KeySource::Inline))
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.jwks_refresh_seconds > 0).then(|| Duration::from_secs(self.jwks_refresh_seconds))
    }
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Answer 404 instead of an empty list when the catalog has no drinks.
    pub empty_is_not_found: bool,
}

impl DrinksConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = DrinksConfig {
            common: common_config,
            environment: environment.clone(),
            service_name: get_env("SERVICE_NAME", Some("drinks-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            log_format: get_env("LOG_FORMAT", Some("json"), is_prod)?
                .parse()
                .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
            otlp_endpoint: get_optional_env("OTLP_ENDPOINT"),
            storage: StorageConfig {
                backend: get_env("STORAGE_BACKEND", Some("postgres"), is_prod)?
                    .parse()
                    .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
                database_url: get_optional_env("DATABASE_URL"),
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", "10", is_prod)?,
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", "1", is_prod)?,
                run_migrations: parse_env("DATABASE_RUN_MIGRATIONS", "true", is_prod)?,
            },
            auth: AuthConfig {
                jwks_url: get_optional_env("AUTH_JWKS_URL"),
                jwks_path: get_optional_env("AUTH_JWKS_PATH").map(PathBuf::from),
                jwks_json: get_optional_env("AUTH_JWKS_JSON"),
                audience: get_env("AUTH_AUDIENCE", None, is_prod)?,
                issuer: get_env("AUTH_ISSUER", None, is_prod)?,
                jwks_refresh_seconds: parse_env("AUTH_JWKS_REFRESH_SECONDS", "3600", is_prod)?,
                leeway_seconds: parse_env("AUTH_LEEWAY_SECONDS", "0", is_prod)?,
            },
            security: SecurityConfig {
                allowed_origins: get_env(
                    "ALLOWED_ORIGINS",
                    Some("http://localhost:8100"),
                    is_prod,
                )?
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            },
            catalog: CatalogConfig {
                empty_is_not_found: parse_env("CATALOG_EMPTY_IS_NOT_FOUND", "true", is_prod)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.storage.backend == StorageBackend::Postgres {
            if self.storage.database_url.is_none() {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "DATABASE_URL is required when STORAGE_BACKEND=postgres"
                )));
            }
            if self.storage.min_connections > self.storage.max_connections {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "DATABASE_MIN_CONNECTIONS must not exceed DATABASE_MAX_CONNECTIONS"
                )));
            }
        }

        if self.auth.key_source().is_none() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "One of AUTH_JWKS_URL, AUTH_JWKS_PATH or AUTH_JWKS_JSON must be set"
            )));
        }

        if self.environment == Environment::Prod {
            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }

            if self.storage.backend == StorageBackend::Memory {
                tracing::warn!("In-memory storage selected in production; data will not persist");
            }
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

fn get_optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: &str, is_prod: bool) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, Some(default), is_prod)?
        .parse()
        .map_err(|e: T::Err| AppError::ConfigError(anyhow::anyhow!("Invalid {}: {}", key, e)))
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(format!("Invalid storage backend: {}", s)),
        }
    }
}
