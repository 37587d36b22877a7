use std::{future::IntoFuture, process, sync::Arc};

use clap::Parser;
use inkwire::{
    application::{
        catalog::CatalogService,
        content::{ContentResolver, KnownKindsResolver},
        error::AppError,
        integrations::IntegrationService,
        publish::{HandlerRegistry, PublishService},
        repos::{
            DefinitionsRepo, IntegrationsRepo, PublishAttemptStore, PublishLogsRepo,
            PublishTargetsRepo,
        },
        targets::PublishTargetService,
    },
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        handlers,
        http::{self, ApiState, HealthState, api::models::PublishAttemptView},
        telemetry,
    },
};
use tokio::sync::watch;
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
    let cli_args = config::CliArgs::parse();
    let settings = config::load(&cli_args)
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
        config::Command::Publish(args) => run_publish(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let services = build_services(repositories.clone(), &settings)?;

    let api_state = ApiState {
        catalog: services.catalog,
        integrations: services.integrations,
        targets: services.targets,
    };
    let health = HealthState {
        db: Some(repositories.as_ref().clone()),
    };

    serve_http(&settings, http::build_router(api_state, health)).await
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    init_repositories(&settings).await?;
    info!(target = "inkwire::migrate", "migrations applied");
    Ok(())
}

async fn run_publish(
    settings: config::Settings,
    args: config::PublishArgs,
) -> Result<(), AppError> {
    let pool = connect_pool(&settings).await?;
    let repositories = Arc::new(PostgresRepositories::new(pool));
    let services = build_services(repositories, &settings)?;

    let report = services
        .publisher
        .attempt_publish(args.target_id, args.content)
        .await?;

    let view = PublishAttemptView::from(report);
    let rendered = serde_json::to_string_pretty(&view)
        .map_err(|err| AppError::unexpected(format!("failed to render report: {err}")))?;
    println!("{rendered}");
    Ok(())
}

struct Services {
    catalog: Arc<CatalogService>,
    integrations: Arc<IntegrationService>,
    targets: Arc<PublishTargetService>,
    publisher: Arc<PublishService>,
}

fn build_services(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<Services, AppError> {
    let definitions_repo: Arc<dyn DefinitionsRepo> = repositories.clone();
    let integrations_repo: Arc<dyn IntegrationsRepo> = repositories.clone();
    let targets_repo: Arc<dyn PublishTargetsRepo> = repositories.clone();
    let logs_repo: Arc<dyn PublishLogsRepo> = repositories.clone();
    let attempt_store: Arc<dyn PublishAttemptStore> = repositories;

    let locators = handlers::builtin_locators(&settings.publish).map_err(AppError::from)?;
    let registry = Arc::new(HandlerRegistry::new(definitions_repo.clone(), locators));
    let publisher = Arc::new(PublishService::new(
        targets_repo.clone(),
        integrations_repo.clone(),
        attempt_store,
        registry,
        settings.publish.handler_timeout,
    ));

    let resolver: Arc<dyn ContentResolver> = Arc::new(KnownKindsResolver::new(
        settings.content.known_kinds.iter().cloned(),
    ));

    Ok(Services {
        catalog: Arc::new(CatalogService::new(definitions_repo.clone())),
        integrations: Arc::new(IntegrationService::new(
            definitions_repo,
            integrations_repo.clone(),
        )),
        targets: Arc::new(PublishTargetService::new(
            integrations_repo,
            targets_repo,
            logs_repo,
            resolver,
            publisher.clone(),
        )),
        publisher,
    })
}

async fn connect_pool(settings: &config::Settings) -> Result<sqlx::PgPool, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let pool = connect_pool(settings).await?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn serve_http(settings: &config::Settings, router: axum::Router) -> Result<(), AppError> {
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "inkwire::serve",
        addr = %settings.server.addr,
        "http server listening"
    );

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            return result.map_err(|err| AppError::unexpected(format!("server error: {err}")));
        }
        _ = tokio::signal::ctrl_c() => {
            info!(target = "inkwire::serve", "shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    }

    match tokio::time::timeout(settings.server.graceful_shutdown, server).await {
        Ok(result) => result.map_err(|err| AppError::unexpected(format!("server error: {err}"))),
        Err(_) => {
            warn!(
                target = "inkwire::serve",
                grace_seconds = settings.server.graceful_shutdown.as_secs(),
                "in-flight requests did not drain before the grace period elapsed"
            );
            Ok(())
        }
    }
}
