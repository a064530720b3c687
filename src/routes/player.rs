use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dao::models::EventId,
    dto::{
        player::{
            AiAnswerRequest, AiAnswerResponse, AiCategoryItem, AiQuestionRequest, AiQuestionView,
            AnswerRequest, AnswerResponse, CheckVoteResponse, MinigameCompleteRequest,
            MinigameCompleteResponse, PhotoSubmitted, RegisterPlayerRequest, RegisteredPlayer,
            ScanRequest, ScanResponse, SubmitPhotoRequest, VoteRequest, VoteResponse,
        },
        state::{GameStateView, LeaderboardEntry, PhotoView},
    },
    error::AppError,
    services::{ai_quiz_service, game_service, host_service, photo_service, player_service},
    state::SharedState,
};

/// Unauthenticated endpoints used by player phones and public displays.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/player/register", post(register))
        .route("/api/player/scan_qr", post(scan_qr))
        .route("/api/player/answer", post(answer))
        .route("/api/player/minigame/complete", post(complete_minigame))
        .route("/api/player/photo", post(submit_photo))
        .route("/api/photos/{event_id}", get(list_photos))
        .route("/api/photo/{photo_id}/vote", post(vote_photo))
        .route("/api/photo/{photo_id}/check_vote", get(check_vote))
        .route(
            "/api/player/ai-quiz/categories/{event_id}",
            get(ai_categories),
        )
        .route("/api/player/ai-quiz/question", post(ai_question))
        .route("/api/player/ai-quiz/answer", post(ai_answer))
        .route("/api/qrcodes/{event_id}", get(qr_codes))
        .route("/api/state/{event_id}", get(game_state))
        .route("/api/leaderboard/{event_id}", get(leaderboard))
}

/// Join an event under a display name.
#[utoipa::path(
    post,
    path = "/api/player/register",
    tag = "player",
    request_body = RegisterPlayerRequest,
    responses(
        (status = 201, description = "Player registered", body = RegisteredPlayer),
        (status = 404, description = "Event does not exist")
    )
)]
pub async fn register(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<RegisterPlayerRequest>>,
) -> Result<(StatusCode, Json<RegisteredPlayer>), AppError> {
    let player = player_service::register(&state, payload.event_id, &payload.name)
        .await
        .map_err(AppError::for_player)?;
    Ok((StatusCode::CREATED, Json(player)))
}

/// Redeem a scanned QR code.
///
/// A color scanned again before its cooldown elapsed yields `status = "wait"` with HTTP 429.
#[utoipa::path(
    post,
    path = "/api/player/scan_qr",
    tag = "player",
    request_body = ScanRequest,
    responses(
        (status = 200, description = "Scan outcome", body = ScanResponse),
        (status = 429, description = "Cooldown still running", body = ScanResponse),
        (status = 403, description = "Game is not running"),
        (status = 404, description = "Unknown code or stale player"),
        (status = 409, description = "Code already claimed")
    )
)]
pub async fn scan_qr(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<ScanRequest>>,
) -> Result<(StatusCode, Json<ScanResponse>), AppError> {
    let response = player_service::scan(
        &state,
        payload.event_id,
        payload.player_id,
        &payload.qr_code,
    )
    .await
    .map_err(AppError::for_player)?;
    let status = if response.is_wait() {
        StatusCode::TOO_MANY_REQUESTS
    } else {
        StatusCode::OK
    };
    Ok((status, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/player/answer",
    tag = "player",
    request_body = AnswerRequest,
    responses(
        (status = 200, description = "Answer graded", body = AnswerResponse),
        (status = 409, description = "Question already answered")
    )
)]
/// Answer a curated question served by a quiz code.
pub async fn answer(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<AnswerRequest>>,
) -> Result<Json<AnswerResponse>, AppError> {
    player_service::answer(
        &state,
        payload.event_id,
        payload.player_id,
        payload.question_id,
        &payload.answer,
    )
    .await
    .map(Json)
    .map_err(AppError::for_player)
}

#[utoipa::path(
    post,
    path = "/api/player/minigame/complete",
    tag = "player",
    request_body = MinigameCompleteRequest,
    responses((status = 200, description = "Progress recorded", body = MinigameCompleteResponse))
)]
/// Add the points of a finished minigame session.
pub async fn complete_minigame(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<MinigameCompleteRequest>>,
) -> Result<Json<MinigameCompleteResponse>, AppError> {
    player_service::complete_minigame(
        &state,
        payload.event_id,
        payload.player_id,
        payload.game,
        payload.score,
    )
    .await
    .map(Json)
    .map_err(AppError::for_player)
}

/// Attach a photo already stored by the upload proxy.
#[utoipa::path(
    post,
    path = "/api/player/photo",
    tag = "player",
    request_body = SubmitPhotoRequest,
    responses((status = 201, description = "Photo submitted", body = PhotoSubmitted))
)]
pub async fn submit_photo(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<SubmitPhotoRequest>>,
) -> Result<(StatusCode, Json<PhotoSubmitted>), AppError> {
    let photo_id = photo_service::submit(
        &state,
        payload.event_id,
        payload.player_id,
        &payload.image_url,
    )
    .await
    .map_err(AppError::for_player)?;
    Ok((StatusCode::CREATED, Json(PhotoSubmitted { photo_id })))
}

#[utoipa::path(
    get,
    path = "/api/photos/{event_id}",
    tag = "player",
    params(("event_id" = u32, Path, description = "Event of the gallery")),
    responses((status = 200, description = "Gallery by votes", body = [PhotoView]))
)]
/// Photo gallery of an event.
pub async fn list_photos(
    State(state): State<SharedState>,
    Path(event_id): Path<EventId>,
) -> Result<Json<Vec<PhotoView>>, AppError> {
    photo_service::list(&state, event_id)
        .await
        .map(Json)
        .map_err(AppError::for_player)
}

/// Vote for a photo, or withdraw an existing vote.
#[utoipa::path(
    post,
    path = "/api/photo/{photo_id}/vote",
    tag = "player",
    params(("photo_id" = Uuid, Path, description = "Photo to vote for")),
    request_body = VoteRequest,
    responses((status = 200, description = "Vote toggled", body = VoteResponse))
)]
pub async fn vote_photo(
    State(state): State<SharedState>,
    Path(photo_id): Path<Uuid>,
    Json(payload): Json<VoteRequest>,
) -> Result<Json<VoteResponse>, AppError> {
    photo_service::toggle_vote(&state, payload.event_id, photo_id, payload.player_id)
        .await
        .map(Json)
        .map_err(AppError::for_player)
}

#[utoipa::path(
    get,
    path = "/api/photo/{photo_id}/check_vote",
    tag = "player",
    params(("photo_id" = Uuid, Path, description = "Photo to check"), VoteRequest),
    responses((status = 200, description = "Whether the player voted", body = CheckVoteResponse))
)]
/// Whether a player already voted for a photo.
pub async fn check_vote(
    State(state): State<SharedState>,
    Path(photo_id): Path<Uuid>,
    Query(query): Query<VoteRequest>,
) -> Result<Json<CheckVoteResponse>, AppError> {
    photo_service::check_vote(&state, query.event_id, photo_id, query.player_id)
        .await
        .map(Json)
        .map_err(AppError::for_player)
}

#[utoipa::path(
    get,
    path = "/api/player/ai-quiz/categories/{event_id}",
    tag = "player",
    params(("event_id" = u32, Path, description = "Event of the player")),
    responses((status = 200, description = "Active categories", body = [AiCategoryItem]))
)]
/// Active AI categories a player of the event can pick.
pub async fn ai_categories(
    State(state): State<SharedState>,
    Path(event_id): Path<EventId>,
) -> Result<Json<Vec<AiCategoryItem>>, AppError> {
    ai_quiz_service::player_categories(&state, event_id)
        .await
        .map(Json)
        .map_err(AppError::for_player)
}

/// Draw an unanswered question of a category.
#[utoipa::path(
    post,
    path = "/api/player/ai-quiz/question",
    tag = "player",
    request_body = AiQuestionRequest,
    responses(
        (status = 200, description = "Question to answer", body = AiQuestionView),
        (status = 404, description = "Category exhausted (`all_answered`) or unknown")
    )
)]
pub async fn ai_question(
    State(state): State<SharedState>,
    Json(payload): Json<AiQuestionRequest>,
) -> Result<Json<AiQuestionView>, AppError> {
    ai_quiz_service::next_question(
        &state,
        payload.event_id,
        payload.player_id,
        payload.category_id,
    )
    .await
    .map(Json)
    .map_err(AppError::for_player)
}

#[utoipa::path(
    post,
    path = "/api/player/ai-quiz/answer",
    tag = "player",
    request_body = AiAnswerRequest,
    responses(
        (status = 200, description = "Answer graded", body = AiAnswerResponse),
        (status = 409, description = "Question already answered")
    )
)]
/// Answer an AI quiz question.
pub async fn ai_answer(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<AiAnswerRequest>>,
) -> Result<Json<AiAnswerResponse>, AppError> {
    ai_quiz_service::answer(
        &state,
        payload.event_id,
        payload.player_id,
        payload.question_id,
        &payload.answer,
    )
    .await
    .map(Json)
    .map_err(AppError::for_player)
}

#[utoipa::path(
    get,
    path = "/api/qrcodes/{event_id}",
    tag = "player",
    params(("event_id" = u32, Path, description = "Event of the codes")),
    responses((status = 200, description = "Code identifiers", body = [String]))
)]
/// Code identifiers of an event, for printing.
pub async fn qr_codes(
    State(state): State<SharedState>,
    Path(event_id): Path<EventId>,
) -> Result<Json<Vec<String>>, AppError> {
    host_service::qr_code_identifiers(&state, event_id)
        .await
        .map(Json)
        .map_err(AppError::for_player)
}

#[utoipa::path(
    get,
    path = "/api/state/{event_id}",
    tag = "player",
    params(("event_id" = u32, Path, description = "Event to inspect")),
    responses((status = 200, description = "Game snapshot", body = GameStateView))
)]
/// Game snapshot for clients that cannot hold a stream open.
pub async fn game_state(
    State(state): State<SharedState>,
    Path(event_id): Path<EventId>,
) -> Result<Json<GameStateView>, AppError> {
    game_service::game_state(&state, event_id)
        .await
        .map(Json)
        .map_err(AppError::for_player)
}

#[utoipa::path(
    get,
    path = "/api/leaderboard/{event_id}",
    tag = "player",
    params(("event_id" = u32, Path, description = "Event to rank")),
    responses((status = 200, description = "Players by score", body = [LeaderboardEntry]))
)]
/// Current ranking of an event.
pub async fn leaderboard(
    State(state): State<SharedState>,
    Path(event_id): Path<EventId>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    game_service::leaderboard_of(&state, event_id)
        .await
        .map(Json)
        .map_err(AppError::for_player)
}
