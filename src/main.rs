use std::{future::IntoFuture, process, sync::Arc};

use roster::{
    application::{
        error::AppError,
        repos::{HealthRepo, UsersRepo, UsersWriteRepo},
        users::UserService,
    },
    cache::{CacheBackend, CacheConfig, InMemoryBackend, RedisBackend, ResultCache},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
    query::{QueryBinder, TemplateStore},
};
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

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
        config::Command::Templates(_) => run_templates(&settings),
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let templates = TemplateStore::load(&settings.queries.path).map_err(InfraError::from)?;
    let binder = QueryBinder::new(templates);
    info!(
        target = "roster::query",
        templates = binder.templates().len(),
        "Query binder ready"
    );

    let repositories = Arc::new(init_repositories(&settings, binder).await?);
    let cache = Arc::new(init_result_cache(&settings.cache).await?);

    let reader: Arc<dyn UsersRepo> = repositories.clone();
    let writer: Arc<dyn UsersWriteRepo> = repositories.clone();
    let health: Arc<dyn HealthRepo> = repositories;

    let http_state = HttpState {
        users: Arc::new(UserService::new(reader, writer, cache)),
        health,
    };

    serve_http(&settings, http_state).await
}

fn run_templates(settings: &config::Settings) -> Result<(), AppError> {
    let templates = TemplateStore::load(&settings.queries.path).map_err(InfraError::from)?;

    for name in templates.names() {
        println!("{name}");
    }
    info!(
        target = "roster::templates",
        path = %settings.queries.path.display(),
        count = templates.len(),
        "Listed query templates"
    );
    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
    binder: QueryBinder,
) -> Result<PostgresRepositories, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(PostgresRepositories::new(pool, binder))
}

async fn init_result_cache(settings: &config::CacheSettings) -> Result<ResultCache, AppError> {
    let cache_config = CacheConfig::from(settings);

    let backend: Arc<dyn CacheBackend> = match settings.redis_url.as_deref() {
        Some(url) => Arc::new(
            RedisBackend::connect(url, cache_config.operation_timeout())
                .await
                .map_err(|err| AppError::from(InfraError::cache(err.to_string())))?,
        ),
        None => {
            warn!(
                target = "roster::cache",
                "No Redis URL configured; using the in-process cache backend"
            );
            Arc::new(InMemoryBackend::new())
        }
    };

    Ok(ResultCache::new(backend, cache_config))
}

async fn serve_http(settings: &config::Settings, http_state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(http_state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "roster::http",
        addr = %settings.server.addr,
        "Listening for HTTP requests"
    );

    let shutdown = Arc::new(Notify::new());
    let signal = shutdown.clone();
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown(
        async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!(error = %err, "failed to listen for shutdown signal");
            }
            info!(target = "roster::http", "Shutdown signal received");
            signal.notify_one();
        },
    );

    let drain_limit = settings.server.graceful_shutdown;
    let server = server.into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = async {
            shutdown.notified().await;
            tokio::time::sleep(drain_limit).await;
        } => {
            warn!(
                target = "roster::http",
                timeout_secs = drain_limit.as_secs(),
                "Graceful shutdown timed out; dropping open connections"
            );
        }
    }

    Ok(())
}
