//! JSON-over-HTTP adapter for presentation layers.

use crate::ai::Difficulty;
use crate::chess::{Move, Side};
use crate::error::GameError;
use crate::service::GameService;
use crate::session::{SessionId, SessionSnapshot};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use prometheus::{Encoder, Registry, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

/// Shared state behind every route.
#[derive(Clone)]
pub struct AppState {
    /// The engine.
    pub service: GameService,
    /// Registry the engine's metrics are registered with.
    pub registry: Registry,
}

/// Request for opening a room or creating a paired game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    /// Player taking White.
    pub white: String,
    /// Player taking Black; the room stays open when absent.
    #[serde(default)]
    pub black: Option<String>,
}

/// Request for a game against the computer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAiGameRequest {
    /// The human player.
    pub player_id: String,
    /// Side the human plays.
    #[serde(default = "default_side")]
    pub side: Side,
    /// Computer strength; the configured default when absent.
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

fn default_side() -> Side {
    Side::White
}

/// Request naming the acting player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerRequest {
    /// Player id.
    pub player_id: String,
}

/// Request for making a move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MakeMoveRequest {
    /// Player id.
    pub player_id: String,
    /// Move in coordinate notation, e.g. `e2e4` or `e7e8q`.
    #[serde(rename = "move")]
    pub mv: Move,
}

/// Response for room creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedResponse {
    /// New room id.
    pub session_id: SessionId,
}

/// Response for a join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinResponse {
    /// Seat assigned to the joining player.
    pub side: Side,
}

/// Error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
}

/// Failure of a route, rendered as an HTTP response.
#[derive(Debug)]
pub enum ApiError {
    /// The engine rejected the request.
    Game(GameError),
    /// The request could not be processed.
    Internal(String),
}

impl From<GameError> for ApiError {
    fn from(err: GameError) -> Self {
        ApiError::Game(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = match self {
            ApiError::Game(err) => err,
            ApiError::Internal(message) => {
                error!(%message, "Internal error");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody { error: message }),
                )
                    .into_response();
            }
        };
        let status = match &err {
            GameError::NotFound(_) => StatusCode::NOT_FOUND,
            GameError::NotYourTurn
            | GameError::GameFinished
            | GameError::NotStarted
            | GameError::RoomFull
            | GameError::NoDrawOffer
            | GameError::NoLegalMoves => StatusCode::CONFLICT,
            GameError::IllegalMove(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GameError::NotAParticipant(_) => StatusCode::FORBIDDEN,
            GameError::RegistryFull(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        debug!(%status, error = %err, "Request rejected");
        (
            status,
            Json(ErrorBody {
                error: err.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Builds the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/rooms", post(create_room))
        .route("/rooms/ai", post(create_ai_game))
        .route("/rooms/{id}", get(get_room).delete(delete_room))
        .route("/rooms/{id}/join", post(join_room))
        .route("/rooms/{id}/moves", post(make_move))
        .route("/rooms/{id}/resign", post(resign))
        .route("/rooms/{id}/draw/offer", post(offer_draw))
        .route("/rooms/{id}/draw/accept", post(accept_draw))
        .route("/rooms/{id}/draw/decline", post(decline_draw))
        .with_state(Arc::new(state))
}

// Move handling may run a search; keep it off the async workers.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, GameError> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(e) => Err(ApiError::Internal(format!("blocking task failed: {e}"))),
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    let mut buffer = Vec::new();
    match TextEncoder::new().encode(&state.registry.gather(), &mut buffer) {
        Ok(()) => (StatusCode::OK, buffer).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[instrument(skip(state))]
async fn create_room(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRoomRequest>,
) -> ApiResult<CreatedResponse> {
    let session_id = match req.black {
        Some(black) => state.service.create_game(&req.white, &black)?,
        None => state.service.open_room(&req.white)?,
    };
    Ok(Json(CreatedResponse { session_id }))
}

#[instrument(skip(state))]
async fn create_ai_game(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateAiGameRequest>,
) -> ApiResult<CreatedResponse> {
    let service = state.service.clone();
    let difficulty = req
        .difficulty
        .unwrap_or(*service.config().ai().difficulty());
    let session_id =
        blocking(move || service.create_ai_game(&req.player_id, req.side, difficulty)).await?;
    Ok(Json(CreatedResponse { session_id }))
}

async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<SessionSnapshot> {
    Ok(Json(state.service.snapshot(&id)?))
}

#[instrument(skip(state))]
async fn delete_room(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_room(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn join_room(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<PlayerRequest>,
) -> ApiResult<JoinResponse> {
    let side = state.service.join_room(&id, &req.player_id)?;
    Ok(Json(JoinResponse { side }))
}

#[instrument(skip(state))]
async fn make_move(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<MakeMoveRequest>,
) -> ApiResult<SessionSnapshot> {
    let service = state.service.clone();
    let snapshot = blocking(move || service.submit_move(&id, &req.player_id, req.mv)).await?;
    Ok(Json(snapshot))
}

#[instrument(skip(state))]
async fn resign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<PlayerRequest>,
) -> ApiResult<SessionSnapshot> {
    Ok(Json(state.service.resign(&id, &req.player_id)?))
}

#[instrument(skip(state))]
async fn offer_draw(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<PlayerRequest>,
) -> ApiResult<SessionSnapshot> {
    Ok(Json(state.service.offer_draw(&id, &req.player_id)?))
}

#[instrument(skip(state))]
async fn accept_draw(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<PlayerRequest>,
) -> ApiResult<SessionSnapshot> {
    Ok(Json(state.service.accept_draw(&id, &req.player_id)?))
}

#[instrument(skip(state))]
async fn decline_draw(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<PlayerRequest>,
) -> ApiResult<SessionSnapshot> {
    Ok(Json(state.service.decline_draw(&id, &req.player_id)?))
}
