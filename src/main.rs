use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use axum::{Router, routing::get};
use clap::Parser;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

mod cache;
mod client;
mod config;
mod db;
mod jobs;
mod middleware;
mod models;
mod observability;
mod omnichannel;
mod routes;
mod sanitizer;
mod services;
#[cfg(test)]
mod tests;

#[derive(Parser, Debug)]
#[command(name = "roomkeeper")]
#[command(about = "Tracks omnichannel rooms and resolves them once they age out", long_about = None)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file
    #[arg(short, long, global = true, default_value = "roomkeeper.toml")]
    config: PathBuf,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Start the HTTP server and the room resolver worker (default)
    Serve,
    /// Run only the room resolver worker
    Worker,
    /// Run the room resolver
    Resolve {
        /// Run a single tick and exit
        #[arg(long)]
        once: bool,
    },
    /// Run database migrations and exit
    Migrate,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::AppConfig>,
    pub db: Option<Arc<db::DbPool>>,
    pub cache: Option<Arc<dyn cache::Cache>>,
    pub rooms: services::RoomService,
    pub resolver: Arc<jobs::RoomResolver>,
    pub sanitizer: Arc<sanitizer::Sanitizer>,
    /// Tracks background tasks so shutdown can wait for them.
    pub task_tracker: TaskTracker,
}

impl AppState {
    pub async fn new(config: config::AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        if config.database.is_none() {
            return Err("a [database] section is required to track rooms".into());
        }

        let sanitizer = Arc::new(sanitizer::Sanitizer::new(
            sanitizer::SanitizerConfig::from_redaction_config(&config.sanitizer),
        ));

        let db = Arc::new(db::DbPool::from_config(&config.database).await?);
        if config.database.run_migrations() {
            db.run_migrations().await?;
        }

        let cache = cache::from_config(&config.cache).await?;

        let omnichannel: Arc<dyn omnichannel::Omnichannel> = Arc::new(
            omnichannel::QiscusOmnichannel::from_config(&config.omnichannel, sanitizer.clone())?,
        );

        let repo = db.rooms();
        let listing = cache::RoomListing::new(
            repo.clone(),
            cache.clone(),
            config.room_resolver.listing_cache_ttl(),
        );

        let rooms = services::RoomService::new(repo.clone(), omnichannel.clone(), listing.clone());
        let resolver = Arc::new(
            jobs::RoomResolver::new(listing, repo, omnichannel, &config.room_resolver)
                .with_sanitizer(sanitizer.clone()),
        );

        Ok(Self {
            config: Arc::new(config),
            db: Some(db),
            cache,
            rooms,
            resolver,
            sanitizer,
            task_tracker: TaskTracker::new(),
        })
    }
}

pub fn build_app(config: &config::AppConfig, state: AppState) -> Router {
    let mut app = Router::new()
        .route("/", get(|| async { "OK" }))
        .route("/health", get(routes::health::health_check))
        .route("/health/live", get(routes::health::liveness))
        .route("/health/ready", get(routes::health::readiness))
        .nest("/wh", routes::get_webhook_routes());

    match routes::get_room_routes(&config.server) {
        Some(room_routes) => app = app.nest("/api/v1", room_routes),
        None => tracing::warn!("server.secret_key is not set, room API is disabled"),
    }

    app = app.layer(axum::middleware::from_fn(middleware::request_id_middleware));

    // Layers are applied in reverse order, so CORS runs before request IDs.
    if let Some(cors_layer) = config.server.cors.clone().into_layer() {
        app = app.layer(cors_layer);
    }

    app.layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(config.server.body_limit_bytes))
        .with_state(state)
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match args.command {
        None | Some(Command::Serve) => run_server(&args.config).await,
        Some(Command::Worker) | Some(Command::Resolve { once: false }) => {
            run_worker(&args.config).await
        }
        Some(Command::Resolve { once: true }) => run_resolve_once(&args.config).await,
        Some(Command::Migrate) => run_migrate(&args.config).await,
    }
}

/// Load the config file and initialize logging, exiting on failure.
fn load_config(path: &Path) -> config::AppConfig {
    let config = match config::AppConfig::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", path.display(), e);
            std::process::exit(1);
        }
    };

    if let Err(e) = observability::init_tracing(&config.observability) {
        eprintln!("Failed to initialize tracing: {e}");
        std::process::exit(1);
    }

    config
}

async fn init_state(config: &config::AppConfig) -> AppState {
    match AppState::new(config.clone()).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize application state");
            std::process::exit(1);
        }
    }
}

async fn run_server(config_path: &Path) {
    let config = load_config(config_path);

    if let Err(e) = config.server.validate_for_serving() {
        tracing::error!(error = %e, "Invalid server configuration");
        std::process::exit(1);
    }

    tracing::info!(config_file = %config_path.display(), "Starting roomkeeper");

    let state = init_state(&config).await;
    let cancel = CancellationToken::new();

    state.task_tracker.spawn(jobs::start_room_resolver_worker(
        state.resolver.clone(),
        config.room_resolver.clone(),
        cancel.clone(),
    ));

    let task_tracker = state.task_tracker.clone();
    let db = state.db.clone();
    let app = build_app(&config, state);

    let bind_addr = SocketAddr::new(config.server.host, config.server.port);
    let listener = match tokio::net::TcpListener::bind(bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(address = %bind_addr, error = %e, "Failed to bind");
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on http://{}", bind_addr);

    let shutdown = {
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            cancel.cancel();
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
    {
        tracing::error!(error = %e, "Server error");
        cancel.cancel();
    }

    drain_tasks(task_tracker, config.server.shutdown_timeout_secs).await;
    if let Some(db) = db {
        db.close().await;
    }
    tracing::info!("Shutdown complete");
}

/// Run the resolver worker without the HTTP server.
async fn run_worker(config_path: &Path) {
    let config = load_config(config_path);
    let state = init_state(&config).await;
    let cancel = CancellationToken::new();

    state.task_tracker.spawn(jobs::start_room_resolver_worker(
        state.resolver.clone(),
        config.room_resolver.clone(),
        cancel.clone(),
    ));

    shutdown_signal().await;
    cancel.cancel();

    drain_tasks(state.task_tracker.clone(), config.server.shutdown_timeout_secs).await;
    if let Some(db) = &state.db {
        db.close().await;
    }
}

async fn run_resolve_once(config_path: &Path) {
    let config = load_config(config_path);
    let state = init_state(&config).await;

    let outcome = state.resolver.run_tick().await;
    if let Some(db) = &state.db {
        db.close().await;
    }

    match outcome {
        Ok(result) => tracing::info!(
            scanned = result.rooms_scanned,
            resolved = result.rooms_resolved,
            deleted = result.rooms_deleted,
            resolve_failures = result.resolve_failures,
            delete_failures = result.delete_failures,
            invalidation_failures = result.invalidation_failures,
            young_skipped = result.young_rooms_skipped,
            stopped_early = result.stopped_early,
            duration_ms = result.duration_ms,
            "Room resolver tick complete"
        ),
        Err(e) => {
            tracing::error!(error = %e, "Room resolver tick failed");
            std::process::exit(1);
        }
    }
}

async fn run_migrate(config_path: &Path) {
    let config = load_config(config_path);

    if config.database.is_none() {
        eprintln!("Error: no [database] section configured");
        std::process::exit(1);
    }

    let db = match db::DbPool::from_config(&config.database).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to database");
            std::process::exit(1);
        }
    };

    let result = db.run_migrations().await;
    db.close().await;

    if let Err(e) = result {
        tracing::error!(error = %e, "Migrations failed");
        std::process::exit(1);
    }
    tracing::info!("Migrations complete");
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Stop accepting background tasks and wait for the running ones.
async fn drain_tasks(task_tracker: TaskTracker, timeout_secs: u64) {
    task_tracker.close();

    match tokio::time::timeout(Duration::from_secs(timeout_secs), task_tracker.wait()).await {
        Ok(()) => tracing::info!("All background tasks completed"),
        Err(_) => {
            tracing::warn!("Timeout waiting for background tasks, some may not have completed")
        }
    }
}
