use axum::{
    Extension, Json, Router,
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post, put},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        common::ActionResponse,
        host::{
            AdjustTimeRequest, AiDifficultyRequest, AiToggleResponse, BonusRequest,
            CreateAiCategoryRequest, GenerateQrCodesRequest, HostAiCategoriesResponse,
            HostAiCategoryView, HostMessageRequest, LanguageRequest, MinigameStatusResponse,
            MinigameToggleRequest, MinigameToggleResponse, PlayerView, QrCodeCounts,
            QrCodeListing, QuestionInput, QuestionView, RevealLettersRequest, RevealModeRequest,
            SetPasswordRequest, SpeedRequest, SpeedResponse, StartGameRequest, StopGameRequest,
        },
        state::{GameStateView, PasswordStateView},
    },
    error::AppError,
    services::{
        ai_quiz_service,
        auth_service::{self, HostContext},
        game_service, host_service, password_service,
    },
    state::SharedState,
};

/// Host panel endpoints, scoped to the event resolved from the caller's credentials.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/api/host/state", get(game_state))
        .route("/api/host/start_game", post(start_game))
        .route("/api/host/pause_game", post(pause_game))
        .route("/api/host/resume_game", post(resume_game))
        .route("/api/host/stop_game", post(stop_game))
        .route("/api/host/speed", post(set_speed))
        .route("/api/host/speed/reset", post(reset_speed))
        .route("/api/host/bonus", post(set_bonus))
        .route("/api/host/language", post(set_language))
        .route("/api/host/adjust_time", post(adjust_time))
        .route("/api/host/send_message", post(send_message))
        .route("/api/host/players", get(list_players))
        .route("/api/host/player/{player_id}/warn", post(warn_player))
        .route("/api/host/player/{player_id}", delete(delete_player))
        .route("/api/host/minigames/status", get(minigame_status))
        .route("/api/host/minigames/toggle", post(toggle_minigame))
        .route("/api/host/questions", get(list_questions).post(create_question))
        .route(
            "/api/host/question/{question_id}",
            put(update_question).delete(delete_question),
        )
        .route("/api/host/qrcodes", get(list_qr_codes))
        .route("/api/host/qrcodes/counts", get(qr_code_counts))
        .route("/api/host/qrcodes/generate", post(generate_qr_codes))
        .route("/api/host/password/set", post(set_password))
        .route("/api/host/password/mode", post(set_reveal_mode))
        .route("/api/host/password/reveal_manual", post(reveal_letters))
        .route("/api/host/password/hide_all", post(hide_letters))
        .route("/api/host/password/state", get(password_state))
        .route("/api/host/ai-quiz/categories", get(ai_categories))
        .route("/api/host/ai-quiz/category", post(create_ai_category))
        .route("/api/host/ai-quiz/category/{category_id}", delete(delete_ai_category))
        .route(
            "/api/host/ai-quiz/category/{category_id}/toggle",
            post(toggle_ai_category),
        )
        .route(
            "/api/host/ai-quiz/category/{category_id}/difficulty",
            put(set_ai_difficulty),
        )
        .route_layer(middleware::from_fn_with_state(state, require_host))
}

fn done(message: &str) -> Json<ActionResponse> {
    Json(ActionResponse::new(message))
}

/// Current game snapshot of the host's event.
#[utoipa::path(
    get,
    path = "/api/host/state",
    tag = "host",
    responses((status = 200, description = "Game snapshot", body = GameStateView))
)]
pub async fn game_state(
    State(state): State<SharedState>,
    Extension(host): Extension<HostContext>,
) -> Result<Json<GameStateView>, AppError> {
    Ok(Json(game_service::game_state(&state, host.event_id).await?))
}

/// Start a new round; every player of the previous round is removed.
#[utoipa::path(
    post,
    path = "/api/host/start_game",
    tag = "host",
    request_body = StartGameRequest,
    responses((status = 200, description = "Round started", body = GameStateView))
)]
pub async fn start_game(
    State(state): State<SharedState>,
    Extension(host): Extension<HostContext>,
    Valid(Json(payload)): Valid<Json<StartGameRequest>>,
) -> Result<Json<GameStateView>, AppError> {
    Ok(Json(
        game_service::start_game(&state, host.event_id, payload.minutes).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/host/pause_game",
    tag = "host",
    responses(
        (status = 200, description = "Clock paused", body = GameStateView),
        (status = 409, description = "Clock is not running")
    )
)]
/// Freeze the clock.
pub async fn pause_game(
    State(state): State<SharedState>,
    Extension(host): Extension<HostContext>,
) -> Result<Json<GameStateView>, AppError> {
    Ok(Json(game_service::pause_game(&state, host.event_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/host/resume_game",
    tag = "host",
    responses(
        (status = 200, description = "Clock resumed", body = GameStateView),
        (status = 409, description = "Clock is not paused")
    )
)]
/// Continue a paused clock.
pub async fn resume_game(
    State(state): State<SharedState>,
    Extension(host): Extension<HostContext>,
) -> Result<Json<GameStateView>, AppError> {
    Ok(Json(game_service::resume_game(&state, host.event_id).await?))
}

/// Stop the round; requires the event password.
#[utoipa::path(
    post,
    path = "/api/host/stop_game",
    tag = "host",
    request_body = StopGameRequest,
    responses(
        (status = 200, description = "Round stopped", body = GameStateView),
        (status = 403, description = "Wrong password")
    )
)]
pub async fn stop_game(
    State(state): State<SharedState>,
    Extension(host): Extension<HostContext>,
    Json(payload): Json<StopGameRequest>,
) -> Result<Json<GameStateView>, AppError> {
    Ok(Json(
        game_service::stop_game(&state, host.event_id, &payload.password).await?,
    ))
}

/// Change the clock speed; sending the current speed again resets it to 1.
#[utoipa::path(
    post,
    path = "/api/host/speed",
    tag = "host",
    request_body = SpeedRequest,
    responses((status = 200, description = "Speed applied", body = SpeedResponse))
)]
pub async fn set_speed(
    State(state): State<SharedState>,
    Extension(host): Extension<HostContext>,
    Valid(Json(payload)): Valid<Json<SpeedRequest>>,
) -> Result<Json<SpeedResponse>, AppError> {
    let speed = game_service::set_speed(&state, host.event_id, payload.speed).await?;
    Ok(Json(SpeedResponse { speed }))
}

#[utoipa::path(
    post,
    path = "/api/host/speed/reset",
    tag = "host",
    responses((status = 200, description = "Normal speed restored", body = SpeedResponse))
)]
/// Return the clock to normal speed.
pub async fn reset_speed(
    State(state): State<SharedState>,
    Extension(host): Extension<HostContext>,
) -> Result<Json<SpeedResponse>, AppError> {
    let speed = game_service::reset_speed(&state, host.event_id).await?;
    Ok(Json(SpeedResponse { speed }))
}

/// Multiply quiz and minigame rewards.
#[utoipa::path(
    post,
    path = "/api/host/bonus",
    tag = "host",
    request_body = BonusRequest,
    responses((status = 200, description = "Bonus applied", body = ActionResponse))
)]
pub async fn set_bonus(
    State(state): State<SharedState>,
    Extension(host): Extension<HostContext>,
    Valid(Json(payload)): Valid<Json<BonusRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    let multiplier = game_service::set_bonus(&state, host.event_id, payload.multiplier).await?;
    Ok(done(&format!("bonus multiplier set to x{multiplier}")))
}

#[utoipa::path(
    post,
    path = "/api/host/language",
    tag = "host",
    request_body = LanguageRequest,
    responses((status = 200, description = "Languages applied", body = GameStateView))
)]
/// Set the interface languages of players and host.
pub async fn set_language(
    State(state): State<SharedState>,
    Extension(host): Extension<HostContext>,
    Valid(Json(payload)): Valid<Json<LanguageRequest>>,
) -> Result<Json<GameStateView>, AppError> {
    Ok(Json(
        game_service::set_languages(
            &state,
            host.event_id,
            payload.language_player,
            payload.language_host,
        )
        .await?,
    ))
}

/// Replace the remaining time; requires the event password.
#[utoipa::path(
    post,
    path = "/api/host/adjust_time",
    tag = "host",
    request_body = AdjustTimeRequest,
    responses(
        (status = 200, description = "Time adjusted", body = GameStateView),
        (status = 403, description = "Wrong password")
    )
)]
pub async fn adjust_time(
    State(state): State<SharedState>,
    Extension(host): Extension<HostContext>,
    Valid(Json(payload)): Valid<Json<AdjustTimeRequest>>,
) -> Result<Json<GameStateView>, AppError> {
    Ok(Json(
        game_service::adjust_duration(&state, host.event_id, payload.minutes, &payload.password)
            .await?,
    ))
}

/// Show an announcement on every screen of the event.
#[utoipa::path(
    post,
    path = "/api/host/send_message",
    tag = "host",
    request_body = HostMessageRequest,
    responses((status = 200, description = "Message sent", body = ActionResponse))
)]
pub async fn send_message(
    State(state): State<SharedState>,
    Extension(host): Extension<HostContext>,
    Valid(Json(payload)): Valid<Json<HostMessageRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    host_service::send_message(&state, host.event_id, &payload.message).await?;
    Ok(done("message sent"))
}

#[utoipa::path(
    get,
    path = "/api/host/players",
    tag = "host",
    responses((status = 200, description = "Players by score", body = [PlayerView]))
)]
/// List players ordered by score.
pub async fn list_players(
    State(state): State<SharedState>,
    Extension(host): Extension<HostContext>,
) -> Result<Json<Vec<PlayerView>>, AppError> {
    Ok(Json(host_service::list_players(&state, host.event_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/host/player/{player_id}/warn",
    tag = "host",
    params(("player_id" = Uuid, Path, description = "Player to warn")),
    responses((status = 200, description = "Warning recorded", body = PlayerView))
)]
/// Give a player one more warning.
pub async fn warn_player(
    State(state): State<SharedState>,
    Extension(host): Extension<HostContext>,
    Path(player_id): Path<Uuid>,
) -> Result<Json<PlayerView>, AppError> {
    Ok(Json(
        host_service::warn_player(&state, host.event_id, player_id).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/host/player/{player_id}",
    tag = "host",
    params(("player_id" = Uuid, Path, description = "Player to remove")),
    responses((status = 204, description = "Player removed"))
)]
/// Remove a player and release their codes.
pub async fn delete_player(
    State(state): State<SharedState>,
    Extension(host): Extension<HostContext>,
    Path(player_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    host_service::delete_player(&state, host.event_id, player_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/host/minigames/status",
    tag = "host",
    responses((status = 200, description = "Enabled tracks", body = MinigameStatusResponse))
)]
/// Which minigame tracks green codes may offer.
pub async fn minigame_status(
    State(state): State<SharedState>,
    Extension(host): Extension<HostContext>,
) -> Result<Json<MinigameStatusResponse>, AppError> {
    Ok(Json(
        host_service::minigame_status(&state, host.event_id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/host/minigames/toggle",
    tag = "host",
    request_body = MinigameToggleRequest,
    responses((status = 200, description = "Track toggled", body = MinigameToggleResponse))
)]
/// Enable or disable one minigame track.
pub async fn toggle_minigame(
    State(state): State<SharedState>,
    Extension(host): Extension<HostContext>,
    Json(payload): Json<MinigameToggleRequest>,
) -> Result<Json<MinigameToggleResponse>, AppError> {
    Ok(Json(
        host_service::toggle_minigame(&state, host.event_id, payload.game_type).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/host/questions",
    tag = "host",
    responses((status = 200, description = "Curated questions", body = [QuestionView]))
)]
/// List curated questions with their counters.
pub async fn list_questions(
    State(state): State<SharedState>,
    Extension(host): Extension<HostContext>,
) -> Result<Json<Vec<QuestionView>>, AppError> {
    Ok(Json(
        host_service::list_questions(&state, host.event_id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/host/questions",
    tag = "host",
    request_body = QuestionInput,
    responses((status = 201, description = "Question created", body = QuestionView))
)]
/// Add a curated question.
pub async fn create_question(
    State(state): State<SharedState>,
    Extension(host): Extension<HostContext>,
    Valid(Json(payload)): Valid<Json<QuestionInput>>,
) -> Result<(StatusCode, Json<QuestionView>), AppError> {
    let view = host_service::create_question(&state, host.event_id, payload).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[utoipa::path(
    put,
    path = "/api/host/question/{question_id}",
    tag = "host",
    params(("question_id" = Uuid, Path, description = "Question to edit")),
    request_body = QuestionInput,
    responses((status = 200, description = "Question updated", body = QuestionView))
)]
/// Replace a curated question's content.
pub async fn update_question(
    State(state): State<SharedState>,
    Extension(host): Extension<HostContext>,
    Path(question_id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<QuestionInput>>,
) -> Result<Json<QuestionView>, AppError> {
    Ok(Json(
        host_service::update_question(&state, host.event_id, question_id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/host/question/{question_id}",
    tag = "host",
    params(("question_id" = Uuid, Path, description = "Question to delete")),
    responses((status = 204, description = "Question deleted"))
)]
/// Delete a curated question.
pub async fn delete_question(
    State(state): State<SharedState>,
    Extension(host): Extension<HostContext>,
    Path(question_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    host_service::delete_question(&state, host.event_id, question_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Every code with its claimant; superhosts only.
#[utoipa::path(
    get,
    path = "/api/host/qrcodes",
    tag = "host",
    responses(
        (status = 200, description = "Codes and counts", body = QrCodeListing),
        (status = 403, description = "Not a superhost")
    )
)]
pub async fn list_qr_codes(
    State(state): State<SharedState>,
    Extension(host): Extension<HostContext>,
) -> Result<Json<QrCodeListing>, AppError> {
    Ok(Json(host_service::list_qr_codes(&state, &host).await?))
}

#[utoipa::path(
    get,
    path = "/api/host/qrcodes/counts",
    tag = "host",
    responses((status = 200, description = "Codes per color", body = QrCodeCounts))
)]
/// Number of codes per color; superhosts only.
pub async fn qr_code_counts(
    State(state): State<SharedState>,
    Extension(host): Extension<HostContext>,
) -> Result<Json<QrCodeCounts>, AppError> {
    let listing = host_service::list_qr_codes(&state, &host).await?;
    Ok(Json(listing.counts))
}

/// Replace the event's codes; superhosts only and never during a game.
#[utoipa::path(
    post,
    path = "/api/host/qrcodes/generate",
    tag = "host",
    request_body = GenerateQrCodesRequest,
    responses(
        (status = 200, description = "Codes regenerated", body = QrCodeListing),
        (status = 403, description = "Not a superhost or game active")
    )
)]
pub async fn generate_qr_codes(
    State(state): State<SharedState>,
    Extension(host): Extension<HostContext>,
    Valid(Json(payload)): Valid<Json<GenerateQrCodesRequest>>,
) -> Result<Json<QrCodeListing>, AppError> {
    Ok(Json(
        host_service::generate_own_qr_codes(&state, &host, &payload).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/host/password/set",
    tag = "host",
    request_body = SetPasswordRequest,
    responses(
        (status = 200, description = "Password replaced", body = PasswordStateView),
        (status = 409, description = "Game is active")
    )
)]
/// Replace the secret phrase before a round.
pub async fn set_password(
    State(state): State<SharedState>,
    Extension(host): Extension<HostContext>,
    Valid(Json(payload)): Valid<Json<SetPasswordRequest>>,
) -> Result<Json<PasswordStateView>, AppError> {
    Ok(Json(
        password_service::set_password(&state, host.event_id, &payload.password).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/host/password/mode",
    tag = "host",
    request_body = RevealModeRequest,
    responses((status = 200, description = "Mode applied", body = PasswordStateView))
)]
/// Choose between automatic and manual letter reveals.
pub async fn set_reveal_mode(
    State(state): State<SharedState>,
    Extension(host): Extension<HostContext>,
    Json(payload): Json<RevealModeRequest>,
) -> Result<Json<PasswordStateView>, AppError> {
    Ok(Json(
        password_service::set_mode(&state, host.event_id, payload.mode).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/host/password/reveal_manual",
    tag = "host",
    request_body = RevealLettersRequest,
    responses((status = 200, description = "Letters revealed", body = PasswordStateView))
)]
/// Reveal chosen letters of the secret.
pub async fn reveal_letters(
    State(state): State<SharedState>,
    Extension(host): Extension<HostContext>,
    Valid(Json(payload)): Valid<Json<RevealLettersRequest>>,
) -> Result<Json<PasswordStateView>, AppError> {
    Ok(Json(
        password_service::reveal_manual(&state, host.event_id, &payload.indices).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/host/password/hide_all",
    tag = "host",
    responses((status = 200, description = "Letters hidden", body = PasswordStateView))
)]
/// Hide every revealed letter.
pub async fn hide_letters(
    State(state): State<SharedState>,
    Extension(host): Extension<HostContext>,
) -> Result<Json<PasswordStateView>, AppError> {
    Ok(Json(
        password_service::hide_all(&state, host.event_id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/host/password/state",
    tag = "host",
    responses((status = 200, description = "Secret and revealed letters", body = PasswordStateView))
)]
/// Secret, revealed positions and the player-visible rendering.
pub async fn password_state(
    State(state): State<SharedState>,
    Extension(host): Extension<HostContext>,
) -> Result<Json<PasswordStateView>, AppError> {
    Ok(Json(
        password_service::password_state(&state, host.event_id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/host/ai-quiz/categories",
    tag = "host",
    responses((status = 200, description = "Default and own categories", body = HostAiCategoriesResponse))
)]
/// AI categories visible to the event with their question counts.
pub async fn ai_categories(
    State(state): State<SharedState>,
    Extension(host): Extension<HostContext>,
) -> Json<HostAiCategoriesResponse> {
    Json(ai_quiz_service::host_categories(&state, host.event_id).await)
}

/// Create a custom AI category, optionally generating its questions.
#[utoipa::path(
    post,
    path = "/api/host/ai-quiz/category",
    tag = "host",
    request_body = CreateAiCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = HostAiCategoryView),
        (status = 409, description = "Name already used by this event"),
        (status = 502, description = "Question generator failed")
    )
)]
pub async fn create_ai_category(
    State(state): State<SharedState>,
    Extension(host): Extension<HostContext>,
    Valid(Json(payload)): Valid<Json<CreateAiCategoryRequest>>,
) -> Result<(StatusCode, Json<HostAiCategoryView>), AppError> {
    let view = ai_quiz_service::add_category(
        &state,
        host.event_id,
        &payload.name,
        payload.difficulty,
        payload.generate_questions,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[utoipa::path(
    delete,
    path = "/api/host/ai-quiz/category/{category_id}",
    tag = "host",
    params(("category_id" = Uuid, Path, description = "Custom category to delete")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 403, description = "Not a custom category of this event")
    )
)]
/// Delete one of the event's custom categories.
pub async fn delete_ai_category(
    State(state): State<SharedState>,
    Extension(host): Extension<HostContext>,
    Path(category_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ai_quiz_service::delete_category(&state, host.event_id, category_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/host/ai-quiz/category/{category_id}/toggle",
    tag = "host",
    params(("category_id" = Uuid, Path, description = "Category to toggle")),
    responses((status = 200, description = "Active flag flipped", body = AiToggleResponse))
)]
/// Activate or deactivate an AI category.
pub async fn toggle_ai_category(
    State(state): State<SharedState>,
    Extension(host): Extension<HostContext>,
    Path(category_id): Path<Uuid>,
) -> Result<Json<AiToggleResponse>, AppError> {
    Ok(Json(
        ai_quiz_service::toggle_category(&state, host.event_id, category_id).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/host/ai-quiz/category/{category_id}/difficulty",
    tag = "host",
    params(("category_id" = Uuid, Path, description = "Category to change")),
    request_body = AiDifficultyRequest,
    responses((status = 200, description = "Difficulty applied", body = ActionResponse))
)]
/// Set the difficulty label of an AI category.
pub async fn set_ai_difficulty(
    State(state): State<SharedState>,
    Extension(host): Extension<HostContext>,
    Path(category_id): Path<Uuid>,
    Json(payload): Json<AiDifficultyRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    ai_quiz_service::set_difficulty(&state, host.event_id, category_id, payload.difficulty)
        .await?;
    Ok(done("difficulty updated"))
}

/// Resolve the host (or impersonating administrator) and expose it to handlers.
async fn require_host(
    State(state): State<SharedState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let host = auth_service::require_host(&state, req.headers()).await?;
    req.extensions_mut().insert(host);
    Ok(next.run(req).await)
}
