use std::sync::Arc;

use axum::extract::Path;
use axum::middleware;
use axum::routing::{delete, get, post};
use axum::{Extension, Json, Router};
use tower_http::cors::CorsLayer;

use crate::admin::{sync_players, AdminError, AdminService, UserDirectory};
use crate::render::BoardView;
use crate::standings::RankedList;

use super::dto::{AddPlayerRequest, HealthResponse, ScoreDeltaRequest, SyncResponse};
use super::error::ApiError;
use super::logging::log_requests;
use super::stream::{stream_events, BroadcastStage};

#[derive(Clone)]
pub struct ServerContext {
    pub admin: AdminService,
    pub stage: Arc<BroadcastStage>,
    pub directory: Option<Arc<dyn UserDirectory>>,
}

pub struct LeaderboardServer {
    router: Router,
}

impl LeaderboardServer {
    pub fn new(context: ServerContext) -> Self {
        let router = Router::new()
            .route("/healthz", get(healthz))
            .route("/api/leaderboard", get(get_leaderboard))
            .route("/api/leaderboard/board", get(get_board))
            .route("/api/leaderboard/events", get(stream_events))
            .route("/api/admin/players", post(add_player))
            .route("/api/admin/players/:name", delete(remove_player))
            .route("/api/admin/players/:name/score", post(adjust_score))
            .route("/api/admin/sync", post(sync_now))
            .layer(Extension(Arc::new(context)))
            .layer(middleware::from_fn(log_requests))
            .layer(CorsLayer::permissive());

        Self { router }
    }

    pub fn into_router(self) -> Router {
        self.router
    }
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn get_leaderboard(
    Extension(ctx): Extension<Arc<ServerContext>>,
) -> Result<Json<RankedList>, ApiError> {
    Ok(Json(ctx.admin.standings().await?))
}

async fn get_board(
    Extension(ctx): Extension<Arc<ServerContext>>,
) -> Result<Json<BoardView>, ApiError> {
    let players = ctx.admin.standings().await?;
    Ok(Json(BoardView::from_players(&players)))
}

async fn add_player(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Json(request): Json<AddPlayerRequest>,
) -> Result<Json<RankedList>, ApiError> {
    Ok(Json(ctx.admin.add_player(&request.name).await?))
}

async fn adjust_score(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(name): Path<String>,
    Json(request): Json<ScoreDeltaRequest>,
) -> Result<Json<RankedList>, ApiError> {
    Ok(Json(ctx.admin.adjust_score(&name, &request.raw()).await?))
}

async fn remove_player(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(name): Path<String>,
) -> Result<Json<RankedList>, ApiError> {
    Ok(Json(ctx.admin.remove_player(&name).await?))
}

async fn sync_now(
    Extension(ctx): Extension<Arc<ServerContext>>,
) -> Result<Json<SyncResponse>, ApiError> {
    let directory = ctx
        .directory
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("user sync is not configured".into()))?;

    let store = ctx.admin.store();
    let report = sync_players(store.as_ref(), directory.as_ref())
        .await
        .map_err(AdminError::from)?;
    let players = ctx.admin.standings().await?;
    Ok(Json(SyncResponse { report, players }))
}
