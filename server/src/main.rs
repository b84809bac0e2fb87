//! Grove Server - HTTP service for versioned snippet trees.
//!
//! The version graph lives in memory behind a read/write lock. Every accepted
//! edit is journaled to PostgreSQL as a change set, and the in-memory state is
//! rebuilt from the latest snapshot plus the journal on startup.

mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod journal;
mod routes;

use crate::config::Config;
use crate::db::Pool;
use crate::journal::{Graph, JournaledStore};
use axum::Router;
use grove_engine::{MemoryStore, VersionGraph};
use std::sync::atomic::{AtomicBool, AtomicI64};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub graph: Arc<RwLock<Graph>>,
    /// `None` when running without a database
    pub pool: Option<Pool>,
    pub config: Arc<Config>,
    /// Sequence of the last journaled change set
    pub journal_seq: Arc<AtomicI64>,
    /// Sequence covered by the last saved snapshot
    pub snapshot_seq: Arc<AtomicI64>,
    /// Set when memory may disagree with the journal; writes wait for a rebuild
    pub writes_suspended: Arc<AtomicBool>,
}

impl AppState {
    /// State backed by an existing graph.
    pub fn new(graph: Graph, pool: Option<Pool>, config: Config, seq: i64) -> Self {
        Self {
            graph: Arc::new(RwLock::new(graph)),
            pool,
            config: Arc::new(config),
            journal_seq: Arc::new(AtomicI64::new(seq)),
            snapshot_seq: Arc::new(AtomicI64::new(seq)),
            writes_suspended: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Non-persistent state with an empty store.
    pub fn in_memory(config: Config) -> Self {
        let graph = VersionGraph::new(JournaledStore::new(MemoryStore::new()));
        Self::new(graph, None, config, 0)
    }
}

/// Build the router with all routes and layers.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "grove_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Starting Grove Server on {}:{}", config.host, config.port);

    let state = match config.database_url.clone() {
        Some(url) => {
            let pool = db::create_pool(&url).await?;

            tracing::info!("Running database migrations...");
            db::run_migrations(&pool).await?;

            let (graph, seq) = journal::restore(&pool).await?;
            tracing::info!(
                projects = graph.store().inner().project_count(),
                versions = graph.store().inner().version_count(),
                seq,
                "State restored"
            );
            AppState::new(graph, Some(pool), config.clone(), seq)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, state will not survive a restart");
            AppState::in_memory(config.clone())
        }
    };

    let app = app(state);

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
