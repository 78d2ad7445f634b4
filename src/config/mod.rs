//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroU64},
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

mod cli;

pub use cli::{CliArgs, Command, DatabaseOverride, MigrateArgs, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "articles";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_CACHE_REDIS_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_CACHE_POOL_SIZE: u32 = 16;
const DEFAULT_CACHE_TIMEOUT_MS: u64 = 500;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
pub const DEFAULT_CACHE_KEY_PREFIX: &str = "articles";
const DEFAULT_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_TOKEN_ISSUER: &str = "articles-api";
const MIN_JWT_SECRET_LEN: usize = 16;
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 15 * 60;
const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u64 = 100;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub auth: AuthSettings,
    pub rate_limit: RateLimitSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Redis,
    Memory,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown cache backend `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub backend: CacheBackend,
    pub redis_url: String,
    pub pool_size: NonZeroU32,
    pub timeout: Duration,
    pub ttl: NonZeroU64,
    pub key_prefix: String,
}

#[derive(Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub issuer: String,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("issuer", &self.issuer)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    pub window_seconds: NonZeroU32,
    pub max_requests: NonZeroU32,
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

    builder = builder.add_source(Environment::with_prefix("ARTICLES").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Migrate(args)) => raw.apply_database_override(&args.database),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    cache: RawCacheSettings,
    auth: RawAuthSettings,
    rate_limit: RawRateLimitSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
        if let Some(backend) = overrides.cache_backend.as_ref() {
            self.cache.backend = Some(backend.clone());
        }
        if let Some(url) = overrides.cache_redis_url.as_ref() {
            self.cache.redis_url = Some(url.clone());
        }
        if let Some(ttl) = overrides.cache_ttl_seconds {
            self.cache.ttl_seconds = Some(ttl);
        }
        if let Some(secret) = overrides.auth_jwt_secret.as_ref() {
            self.auth.jwt_secret = Some(secret.clone());
        }
        if let Some(ttl) = overrides.auth_token_ttl_seconds {
            self.auth.token_ttl_seconds = Some(ttl);
        }
        if let Some(window) = overrides.rate_limit_window_seconds {
            self.rate_limit.window_seconds = Some(window);
        }
        if let Some(max) = overrides.rate_limit_max_requests {
            self.rate_limit.max_requests = Some(max);
        }
    }

    fn apply_database_override(&mut self, overrides: &DatabaseOverride) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            cache,
            auth,
            rate_limit,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            cache: build_cache_settings(cache)?,
            auth: build_auth_settings(auth)?,
            rate_limit: build_rate_limit_settings(rate_limit)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr =
        parse_socket_addr(&host, port).map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
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
    let url = database.url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let backend = match cache.backend {
        Some(value) => CacheBackend::from_str(&value)
            .map_err(|reason| LoadError::invalid("cache.backend", reason))?,
        None => CacheBackend::Redis,
    };

    let redis_url = cache
        .redis_url
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| DEFAULT_CACHE_REDIS_URL.to_string());
    if backend == CacheBackend::Redis && redis_url.is_empty() {
        return Err(LoadError::invalid(
            "cache.redis_url",
            "must not be empty when the redis backend is selected",
        ));
    }

    let pool_size = non_zero_u32(
        cache.pool_size.unwrap_or(DEFAULT_CACHE_POOL_SIZE).into(),
        "cache.pool_size",
    )?;

    let timeout_ms = cache.timeout_ms.unwrap_or(DEFAULT_CACHE_TIMEOUT_MS);
    if timeout_ms == 0 {
        return Err(LoadError::invalid(
            "cache.timeout_ms",
            "must be greater than zero",
        ));
    }

    let ttl = NonZeroU64::new(cache.ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECS))
        .ok_or_else(|| LoadError::invalid("cache.ttl_seconds", "must be greater than zero"))?;

    let key_prefix = cache
        .key_prefix
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| DEFAULT_CACHE_KEY_PREFIX.to_string());
    if key_prefix.is_empty() || key_prefix.contains(['*', '?', '[']) {
        return Err(LoadError::invalid(
            "cache.key_prefix",
            "must be non-empty and free of glob characters",
        ));
    }

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        backend,
        redis_url,
        pool_size,
        timeout: Duration::from_millis(timeout_ms),
        ttl,
        key_prefix,
    })
}

fn build_auth_settings(auth: RawAuthSettings) -> Result<AuthSettings, LoadError> {
    let jwt_secret = auth
        .jwt_secret
        .ok_or_else(|| LoadError::invalid("auth.jwt_secret", "must be configured"))?;
    if jwt_secret.len() < MIN_JWT_SECRET_LEN {
        return Err(LoadError::invalid(
            "auth.jwt_secret",
            format!("must be at least {MIN_JWT_SECRET_LEN} bytes"),
        ));
    }

    let ttl_secs = auth.token_ttl_seconds.unwrap_or(DEFAULT_TOKEN_TTL_SECS);
    if ttl_secs == 0 {
        return Err(LoadError::invalid(
            "auth.token_ttl_seconds",
            "must be greater than zero",
        ));
    }

    let issuer = auth
        .issuer
        .unwrap_or_else(|| DEFAULT_TOKEN_ISSUER.to_string());

    Ok(AuthSettings {
        jwt_secret,
        token_ttl: Duration::from_secs(ttl_secs),
        issuer,
    })
}

fn build_rate_limit_settings(
    rate_limit: RawRateLimitSettings,
) -> Result<RateLimitSettings, LoadError> {
    let window_seconds = non_zero_u32(
        rate_limit
            .window_seconds
            .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_SECS),
        "rate_limit.window_seconds",
    )?;
    let max_requests = non_zero_u32(
        rate_limit
            .max_requests
            .unwrap_or(DEFAULT_RATE_LIMIT_MAX_REQUESTS),
        "rate_limit.max_requests",
    )?;

    Ok(RateLimitSettings {
        window_seconds,
        max_requests,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
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
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    backend: Option<String>,
    redis_url: Option<String>,
    pool_size: Option<u32>,
    timeout_ms: Option<u64>,
    ttl_seconds: Option<u64>,
    key_prefix: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAuthSettings {
    jwt_secret: Option<String>,
    token_ttl_seconds: Option<u64>,
    issuer: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRateLimitSettings {
    window_seconds: Option<u64>,
    max_requests: Option<u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
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
