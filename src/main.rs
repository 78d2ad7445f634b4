use std::{future::IntoFuture, net::SocketAddr, process, sync::Arc, time::Duration};

use articles::{
    application::{
        articles::ArticleService,
        auth::{AuthService, TokenIssuer},
        error::AppError,
        repos::{ArticlesRepo, ArticlesWriteRepo, UsersRepo},
    },
    cache::{ArticleCache, CacheConfig, KeyValueCache, MemoryCache},
    config::{self, CacheBackend},
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiRateLimiter, ApiState},
        memory::InMemoryRepositories,
        redis::RedisCache,
        telemetry,
    },
};
use tokio::{signal, sync::Notify};
use tracing::{Dispatch, Level, debug, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))?;

    let pool = PostgresRepositories::connect(database_url, 1)
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;

    info!("Database migrations applied");
    Ok(())
}

struct Repositories {
    reader: Arc<dyn ArticlesRepo>,
    writer: Arc<dyn ArticlesWriteRepo>,
    users: Arc<dyn UsersRepo>,
    db: Option<Arc<PostgresRepositories>>,
}

async fn init_repositories(settings: &config::Settings) -> Result<Repositories, AppError> {
    let Some(database_url) = settings.database.url.as_ref() else {
        warn!("No database url configured; serving from the in-memory store");
        let memory = Arc::new(InMemoryRepositories::new());
        return Ok(Repositories {
            reader: memory.clone(),
            writer: memory.clone(),
            users: memory,
            db: None,
        });
    };

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;

    let db = Arc::new(PostgresRepositories::new(pool));
    Ok(Repositories {
        reader: db.clone(),
        writer: db.clone(),
        users: db.clone(),
        db: Some(db),
    })
}

struct CacheSetup {
    cache: Option<ArticleCache>,
    /// Set when entries live in this process and need periodic sweeping.
    memory: Option<Arc<MemoryCache>>,
}

/// Pick the configured store. An unreachable Redis degrades to the
/// in-process store instead of failing startup.
async fn init_cache(settings: &config::Settings) -> CacheSetup {
    if !settings.cache.enabled {
        info!("Article cache disabled");
        return CacheSetup {
            cache: None,
            memory: None,
        };
    }

    let (store, memory): (Arc<dyn KeyValueCache>, Option<Arc<MemoryCache>>) =
        match settings.cache.backend {
            CacheBackend::Memory => {
                let memory = Arc::new(MemoryCache::new());
                (memory.clone() as Arc<dyn KeyValueCache>, Some(memory))
            }
            CacheBackend::Redis => match RedisCache::connect(&settings.cache).await {
                Ok(redis) => (Arc::new(redis) as Arc<dyn KeyValueCache>, None),
                Err(err) => {
                    warn!(
                        error = %err,
                        "Failed to connect to Redis; falling back to the in-process cache"
                    );
                    let memory = Arc::new(MemoryCache::new());
                    (memory.clone() as Arc<dyn KeyValueCache>, Some(memory))
                }
            },
        };

    let config = CacheConfig::from(&settings.cache);
    info!(
        backend = store.backend(),
        ttl_secs = config.ttl.as_secs(),
        key_prefix = %config.key_prefix,
        "Article cache enabled"
    );
    CacheSetup {
        cache: Some(ArticleCache::new(store, &config)),
        memory,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let CacheSetup { cache, memory } = init_cache(&settings).await;

    let articles = ArticleService::new(repositories.reader, repositories.writer)
        .with_cache_opt(cache);
    let auth = AuthService::new(
        repositories.users,
        TokenIssuer::from_settings(&settings.auth),
    );

    let rate_limiter = Arc::new(ApiRateLimiter::new(
        Duration::from_secs(u64::from(settings.rate_limit.window_seconds.get())),
        settings.rate_limit.max_requests.get(),
    ));
    let purge_handle = {
        let limiter = rate_limiter.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(PURGE_INTERVAL);
            interval.tick().await;
            loop {
                interval.tick().await;
                limiter.purge_expired();
                if let Some(memory) = &memory {
                    let removed = memory.purge_expired();
                    if removed > 0 {
                        debug!(removed, "Swept expired cache entries");
                    }
                }
            }
        })
    };

    let state = ApiState {
        articles: Arc::new(articles),
        auth: Arc::new(auth),
        rate_limiter,
        db: repositories.db,
    };

    let result = serve_http(&settings, state).await;
    purge_handle.abort();
    result
}

async fn serve_http(settings: &config::Settings, state: ApiState) -> Result<(), AppError> {
    let router = http::build_router(state);
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "Listening");

    let drain = Arc::new(Notify::new());
    let server = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown({
        let drain = drain.clone();
        async move { drain.notified().await }
    });
    let mut server = tokio::spawn(server.into_future());

    tokio::select! {
        joined = &mut server => return flatten_server(joined),
        () = shutdown_signal() => {}
    }

    info!("Shutdown signal received; draining connections");
    drain.notify_one();

    match tokio::time::timeout(settings.server.graceful_shutdown, server).await {
        Ok(joined) => flatten_server(joined),
        Err(_) => {
            warn!(
                grace_secs = settings.server.graceful_shutdown.as_secs(),
                "Connections still open after the grace period; exiting"
            );
            Ok(())
        }
    }
}

fn flatten_server(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    joined
        .map_err(|err| AppError::unexpected(format!("server task failed: {err}")))?
        .map_err(|err| AppError::from(InfraError::from(err)))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
