use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the articles binary.
#[derive(Debug, Parser)]
#[command(name = "articles", version, about = "Articles API server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "ARTICLES_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP API.
    Serve(Box<ServeArgs>),
    /// Apply pending database migrations and exit.
    #[command(name = "migrate")]
    Migrate(MigrateArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Toggle the read-through cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Override the cache backend (redis|memory).
    #[arg(long = "cache-backend", value_name = "BACKEND")]
    pub cache_backend: Option<String>,

    /// Override the Redis connection URL.
    #[arg(long = "cache-redis-url", value_name = "URL")]
    pub cache_redis_url: Option<String>,

    /// Override the cache entry TTL.
    #[arg(long = "cache-ttl-seconds", value_name = "SECONDS")]
    pub cache_ttl_seconds: Option<u64>,

    /// Override the secret used to sign access tokens.
    #[arg(long = "auth-jwt-secret", value_name = "SECRET")]
    pub auth_jwt_secret: Option<String>,

    /// Override the access token lifetime.
    #[arg(long = "auth-token-ttl-seconds", value_name = "SECONDS")]
    pub auth_token_ttl_seconds: Option<u64>,

    /// Override the rate limit window size.
    #[arg(long = "rate-limit-window-seconds", value_name = "SECONDS")]
    pub rate_limit_window_seconds: Option<u64>,

    /// Override the rate limit request ceiling.
    #[arg(long = "rate-limit-max-requests", value_name = "COUNT")]
    pub rate_limit_max_requests: Option<u64>,
}
