//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{num::NonZeroU32, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

pub use cli::{
    CliArgs, Command, CreateArgs, GlobalOverrides, ListArgs, OwnerArg, TodoRef, UpdateArgs,
};

use crate::cache::{CacheBackend, CacheConfig};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "todo-cache";
const ENV_PREFIX: &str = "TODO_CACHE";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_DB_TIMEOUT_MS: u64 = 5_000;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
    /// Bound applied to every store call and to pool acquisition.
    pub timeout: Duration,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

/// Resolve configuration using the process arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    cache: RawCacheSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &GlobalOverrides) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(url) = overrides.redis_url.as_ref() {
            self.cache.redis_url = Some(url.clone());
        }
        if let Some(backend) = overrides.cache_backend.as_ref() {
            self.cache.backend = Some(backend.clone());
        }
        if let Some(seconds) = overrides.cache_ttl_seconds {
            self.cache.ttl_seconds = Some(seconds);
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            database,
            cache,
        } = raw;

        let logging = build_logging_settings(logging)?;
        let database = build_database_settings(database)?;
        let cache = build_cache_settings(cache)?;

        Ok(Self {
            logging,
            database,
            cache,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;

    let timeout_ms = database.timeout_ms.unwrap_or(DEFAULT_DB_TIMEOUT_MS);
    if timeout_ms == 0 {
        return Err(LoadError::invalid(
            "database.timeout_ms",
            "must be greater than zero",
        ));
    }

    Ok(DatabaseSettings {
        url: non_blank(database.url),
        max_connections,
        timeout: Duration::from_millis(timeout_ms),
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheConfig, LoadError> {
    let defaults = CacheConfig::default();

    let backend = match cache.backend.as_deref().map(str::trim) {
        None | Some("memory") => CacheBackend::Memory,
        Some("redis") => CacheBackend::Redis,
        Some(other) => {
            return Err(LoadError::invalid(
                "cache.backend",
                format!("unknown backend `{other}`, expected `memory` or `redis`"),
            ));
        }
    };

    let redis_url = non_blank(cache.redis_url);
    if backend == CacheBackend::Redis && redis_url.is_none() {
        return Err(LoadError::invalid(
            "cache.redis_url",
            "required when cache.backend is `redis`",
        ));
    }

    let ttl_seconds = cache.ttl_seconds.unwrap_or(defaults.ttl_seconds);
    if ttl_seconds == 0 {
        return Err(LoadError::invalid(
            "cache.ttl_seconds",
            "must be greater than zero",
        ));
    }

    let timeout_ms = cache.timeout_ms.unwrap_or(defaults.timeout_ms);
    if timeout_ms == 0 {
        return Err(LoadError::invalid(
            "cache.timeout_ms",
            "must be greater than zero",
        ));
    }

    Ok(CacheConfig {
        enabled: cache.enabled.unwrap_or(defaults.enabled),
        backend,
        redis_url,
        ttl_seconds,
        timeout_ms,
        memory_capacity: cache.memory_capacity.unwrap_or(defaults.memory_capacity),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    backend: Option<String>,
    redis_url: Option<String>,
    ttl_seconds: Option<u64>,
    timeout_ms: Option<u64>,
    memory_capacity: Option<usize>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}
