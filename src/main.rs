//! Attune server binary.
//!
//! Wires configuration, storage, locks and the HTTP surface, then runs the
//! API and the timeout sweeper until SIGINT or SIGTERM.

use std::error::Error;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use attune::adapters::auth::{JwksConfig, JwksSessionValidator};
use attune::adapters::events::InMemoryEventBus;
use attune::adapters::http::{
    app_router, ApiHandlers, ParticipantHandlers, ReviewHandlers, RouterSettings, SessionHandlers,
    SweepTrigger,
};
use attune::adapters::locks::{InProcessKeyedLock, RedisKeyedLock};
use attune::adapters::memory::{
    InMemoryParticipantDirectory, InMemoryReviewRepository, InMemorySessionRepository,
};
use attune::adapters::postgres::{
    PostgresParticipantDirectory, PostgresReviewRepository, PostgresSessionRepository,
};
use attune::adapters::sweeper::{TimeoutSweeper, TimeoutSweeperConfig};
use attune::adapters::video::HmacTokenIssuer;
use attune::application::handlers::participant::{InitProfileHandler, SetAvailabilityHandler};
use attune::application::handlers::review::{
    ListPractitionerReviewsHandler, SubmitReviewHandler,
};
use attune::application::handlers::session::{
    ApplySessionActionHandler, GetSessionHandler, IssueJoinTokenHandler, ListMySessionsHandler,
    ListPractitionerSessionsHandler, SessionCoordinator, StartSessionHandler,
    SweepTimeoutsHandler,
};
use attune::config::{AppConfig, DatabaseConfig, RedisConfig, SessionsConfig};
use attune::ports::{KeyedLock, ParticipantDirectory, ReviewRepository, SessionRepository};

type BoxError = Box<dyn Error + Send + Sync>;

struct Stores {
    sessions: Arc<dyn SessionRepository>,
    directory: Arc<dyn ParticipantDirectory>,
    reviews: Arc<dyn ReviewRepository>,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    info!(
        environment = ?config.server.environment,
        "Starting attune"
    );

    let stores = match &config.database {
        Some(database) => postgres_stores(database).await?,
        None => {
            warn!("No database configured, using in-memory storage");
            memory_stores()
        }
    };
    let locks = build_locks(config.redis.as_ref(), &config.sessions).await?;

    let bus = Arc::new(InMemoryEventBus::new());
    tokio::spawn(log_events(bus.subscribe()));

    let policy = config.sessions.policy();
    let coordinator = Arc::new(SessionCoordinator::new(
        stores.sessions.clone(),
        stores.directory.clone(),
        locks.clone(),
        bus.clone(),
    ));

    let issuer = Arc::new(HmacTokenIssuer::new(
        config.video.app_id.clone(),
        config.video.app_certificate.clone(),
        config.video.token_ttl_secs,
    ));
    let validator = Arc::new(JwksSessionValidator::new(
        JwksConfig::new(config.auth.issuer.clone(), config.auth.audience.clone())
            .with_cache_ttl(config.auth.jwks_cache_ttl()),
    ));

    let sweep_handler = Arc::new(SweepTimeoutsHandler::new(coordinator.clone(), policy));

    let handlers = ApiHandlers {
        sessions: SessionHandlers::new(
            Arc::new(StartSessionHandler::new(coordinator.clone(), policy)),
            Arc::new(ApplySessionActionHandler::new(coordinator.clone())),
            Arc::new(GetSessionHandler::new(coordinator.clone(), policy)),
            Arc::new(ListMySessionsHandler::new(coordinator.clone())),
            Arc::new(ListPractitionerSessionsHandler::new(coordinator.clone(), policy)),
            Arc::new(IssueJoinTokenHandler::new(coordinator.clone(), issuer, policy)),
        ),
        reviews: ReviewHandlers::new(
            Arc::new(SubmitReviewHandler::new(
                stores.sessions.clone(),
                stores.reviews.clone(),
                stores.directory.clone(),
                locks,
                bus,
            )),
            Arc::new(ListPractitionerReviewsHandler::new(stores.reviews)),
        ),
        participants: ParticipantHandlers::new(
            Arc::new(InitProfileHandler::new(coordinator.clone())),
            Arc::new(SetAvailabilityHandler::new(coordinator)),
        ),
        sweep: SweepTrigger::new(
            sweep_handler.clone(),
            config.sessions.sweep_trigger_token.clone(),
        ),
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = TimeoutSweeper::new(
        sweep_handler,
        TimeoutSweeperConfig::default().with_interval(config.sessions.sweep_interval()),
    );
    let sweeper_task = tokio::spawn(async move { sweeper.run(shutdown_rx).await });

    let settings = RouterSettings {
        request_timeout: config.server.request_timeout(),
        cors_origins: config.server.cors_origins_list(),
    };
    let app = app_router(handlers, validator, &settings);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if shutdown_tx.send(true).is_err() {
        warn!("Sweeper stopped before shutdown");
    }
    if let Err(err) = sweeper_task.await {
        warn!(error = %err, "Sweeper task failed");
    }

    info!("Shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if config.is_production() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn postgres_stores(database: &DatabaseConfig) -> Result<Stores, BoxError> {
    let pool = PgPoolOptions::new()
        .min_connections(database.min_connections)
        .max_connections(database.max_connections)
        .acquire_timeout(database.acquire_timeout())
        .idle_timeout(Some(database.idle_timeout()))
        .max_lifetime(Some(database.max_lifetime()))
        .connect(&database.url)
        .await?;
    info!("Connected to database");

    if database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Migrations applied");
    }

    Ok(Stores {
        sessions: Arc::new(PostgresSessionRepository::new(pool.clone())),
        directory: Arc::new(PostgresParticipantDirectory::new(pool.clone())),
        reviews: Arc::new(PostgresReviewRepository::new(pool)),
    })
}

fn memory_stores() -> Stores {
    Stores {
        sessions: Arc::new(InMemorySessionRepository::new()),
        directory: Arc::new(InMemoryParticipantDirectory::new()),
        reviews: Arc::new(InMemoryReviewRepository::new()),
    }
}

async fn build_locks(
    redis_config: Option<&RedisConfig>,
    sessions: &SessionsConfig,
) -> Result<Arc<dyn KeyedLock>, BoxError> {
    let Some(redis_config) = redis_config else {
        return Ok(Arc::new(InProcessKeyedLock::new(sessions.lock_wait())));
    };

    let client = redis::Client::open(redis_config.url.as_str())?;
    let conn = tokio::time::timeout(
        redis_config.timeout(),
        client.get_multiplexed_async_connection(),
    )
    .await??;
    info!("Connected to Redis for locks");

    Ok(Arc::new(
        RedisKeyedLock::new(conn, sessions.lock_ttl(), sessions.lock_wait())
            .with_prefix(redis_config.key_prefix.clone()),
    ))
}

/// Logs every published domain event until the bus goes away.
async fn log_events(mut events: broadcast::Receiver<attune::domain::foundation::EventEnvelope>) {
    loop {
        match events.recv().await {
            Ok(event) => debug!(
                event_type = %event.event_type,
                aggregate_id = %event.aggregate_id,
                event_id = %event.event_id,
                "Domain event"
            ),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Event log fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
