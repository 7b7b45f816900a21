use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

use crate::admin::{spawn_sync_loop, AdminService, HttpUserDirectory, UserDirectory};
use crate::controller::LeaderboardController;
use crate::db;
use crate::effects::{AnimationSequencer, SequencerConfig, Stage, StageTone};
use crate::feed::{RealtimeFeed, StoreSource, StoreWatchFeed, SupabaseRealtimeClientConfig};
use crate::render::Viewport;
use crate::store::{InMemoryPlayerStore, PlayerStore, SeaOrmPlayerStore};
use crate::tokio_tools::spawn_named_task;

use super::routes::{LeaderboardServer, ServerContext};
use super::stream::BroadcastStage;

const LOG_TARGET: &str = "server::bootstrap";

#[derive(Debug, Clone)]
pub struct UsersApiConfig {
    pub endpoint: Url,
    pub api_key: String,
    pub interval: Duration,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// In-memory store when absent.
    pub database_url: Option<String>,
    pub realtime: Option<SupabaseRealtimeClientConfig>,
    pub users: Option<UsersApiConfig>,
    pub viewport: Viewport,
}

async fn open_store(database_url: Option<&str>) -> Result<Arc<dyn PlayerStore>> {
    match database_url {
        Some(url) => {
            let connection = db::connect(url).await?;
            db::ensure_schema(&connection).await?;
            Ok(Arc::new(SeaOrmPlayerStore::new(connection)))
        }
        None => {
            warn!(
                target = LOG_TARGET,
                "DATABASE_URL not set; players are kept in memory only"
            );
            Ok(Arc::new(InMemoryPlayerStore::new()))
        }
    }
}

pub async fn run_server(config: ServerConfig) -> Result<()> {
    let store = open_store(config.database_url.as_deref()).await?;
    let stop = CancellationToken::new();

    let stage = Arc::new(BroadcastStage::new(config.viewport));
    let sequencer = AnimationSequencer::new(
        Arc::clone(&stage) as Arc<dyn Stage>,
        Arc::new(StageTone::new(Arc::clone(&stage))),
        SequencerConfig {
            viewport: config.viewport,
            ..SequencerConfig::default()
        },
    );
    let controller = LeaderboardController::new(Arc::clone(&stage) as Arc<dyn Stage>, sequencer);

    // realtime sees every writer of the table, the store watch only this process
    let (feed, updates) = match config.realtime.clone() {
        Some(realtime) => {
            let source = Arc::new(StoreSource::new(Arc::clone(&store)));
            RealtimeFeed::new(realtime, source).spawn(stop.child_token())
        }
        None => StoreWatchFeed::new(Arc::clone(&store)).spawn(stop.child_token()),
    };
    let controller_task = spawn_named_task(
        "leaderboard-controller",
        controller.run(updates, stop.child_token()),
    );

    let directory: Option<Arc<dyn UserDirectory>> = match &config.users {
        Some(users) => Some(Arc::new(
            HttpUserDirectory::new(users.endpoint.clone(), users.api_key.clone())
                .context("failed to build users API client")?,
        )),
        None => None,
    };
    let sync_task = match (&config.users, &directory) {
        (Some(users), Some(directory)) => Some(spawn_sync_loop(
            Arc::clone(&store),
            Arc::clone(directory),
            users.interval,
            stop.child_token(),
        )),
        _ => None,
    };

    let context = ServerContext {
        admin: AdminService::new(Arc::clone(&store)),
        stage,
        directory,
    };
    let router = LeaderboardServer::new(context).into_router();

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    let local_addr = listener.local_addr()?;
    info!(
        target = LOG_TARGET,
        %local_addr,
        persistent = config.database_url.is_some(),
        realtime = config.realtime.is_some(),
        user_sync = sync_task.is_some(),
        "leaderboard server listening"
    );

    let served = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(stop.clone()))
        .await
        .context("server exited with error");

    stop.cancel();
    for task in [Some(feed), Some(controller_task), sync_task].into_iter().flatten() {
        if let Err(err) = task.await {
            warn!(target = LOG_TARGET, error = %err, "background task ended abnormally");
        }
    }
    info!(target = LOG_TARGET, "leaderboard server stopped");

    served
}

async fn shutdown_signal(stop: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                warn!(
                    target = LOG_TARGET,
                    error = %err,
                    "failed to install ctrl-c handler"
                );
            }
        }
        _ = stop.cancelled() => {}
    }
    info!(target = LOG_TARGET, "shutdown signal received");
}
