use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for qr-hunt-back.
#[openapi(
    info(title = "qr-hunt-back", description = "Game-state engine of a QR scavenger hunt"),
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::event_stream,
        crate::routes::websocket::ws_handler,
        crate::routes::player::register,
        crate::routes::player::scan_qr,
        crate::routes::player::answer,
        crate::routes::player::complete_minigame,
        crate::routes::player::submit_photo,
        crate::routes::player::list_photos,
        crate::routes::player::vote_photo,
        crate::routes::player::check_vote,
        crate::routes::player::ai_categories,
        crate::routes::player::ai_question,
        crate::routes::player::ai_answer,
        crate::routes::player::qr_codes,
        crate::routes::player::game_state,
        crate::routes::player::leaderboard,
        crate::routes::host::game_state,
        crate::routes::host::start_game,
        crate::routes::host::pause_game,
        crate::routes::host::resume_game,
        crate::routes::host::stop_game,
        crate::routes::host::set_speed,
        crate::routes::host::reset_speed,
        crate::routes::host::set_bonus,
        crate::routes::host::set_language,
        crate::routes::host::adjust_time,
        crate::routes::host::send_message,
        crate::routes::host::list_players,
        crate::routes::host::warn_player,
        crate::routes::host::delete_player,
        crate::routes::host::minigame_status,
        crate::routes::host::toggle_minigame,
        crate::routes::host::list_questions,
        crate::routes::host::create_question,
        crate::routes::host::update_question,
        crate::routes::host::delete_question,
        crate::routes::host::list_qr_codes,
        crate::routes::host::qr_code_counts,
        crate::routes::host::generate_qr_codes,
        crate::routes::host::set_password,
        crate::routes::host::set_reveal_mode,
        crate::routes::host::reveal_letters,
        crate::routes::host::hide_letters,
        crate::routes::host::password_state,
        crate::routes::host::ai_categories,
        crate::routes::host::create_ai_category,
        crate::routes::host::delete_ai_category,
        crate::routes::host::toggle_ai_category,
        crate::routes::host::set_ai_difficulty,
        crate::routes::admin::list_events,
        crate::routes::admin::create_event,
        crate::routes::admin::update_event,
        crate::routes::admin::delete_event,
        crate::routes::admin::set_logo,
        crate::routes::admin::delete_logo,
        crate::routes::admin::reset_event,
        crate::routes::admin::generate_qr_codes,
        crate::routes::admin::load_questions,
        crate::routes::admin::list_categories,
        crate::routes::admin::list_category_questions,
        crate::routes::admin::update_question,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::ws::ClientMessage,
            crate::dto::sse::TimerTickEvent,
            crate::dto::sse::PasswordUpdateEvent,
            crate::dto::sse::GameOverEvent,
            crate::dto::sse::HostMessageEvent,
            crate::dto::sse::PhotoVoteUpdateEvent,
            crate::dto::state::GameStateView,
            crate::dto::state::LeaderboardEntry,
            crate::dto::state::PhotoView,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "realtime", description = "Per-event SSE and WebSocket streams"),
        (name = "player", description = "Unauthenticated player and display endpoints"),
        (name = "host", description = "Host panel; send `X-Host-Login` and `X-Host-Password`, or `X-Admin-Token` with `X-Event-Id`"),
        (name = "admin", description = "Administrator endpoints; send `X-Admin-Token`"),
    )
)]
pub struct ApiDoc;
