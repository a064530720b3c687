use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dao::models::EventId,
    dto::{
        admin::{
            AdminAiQuestionView, AdminQrCodesRequest, EventSummary, SeedQuestionsResponse,
            SetLogoRequest, UpdateAiQuestionRequest, UpdateEventRequest,
        },
        host::{HostAiCategoryView, QrCodeListing},
    },
    error::AppError,
    services::{admin_service, auth_service, host_service},
    state::SharedState,
};

/// Administrator endpoints: event definitions, resets, QR codes and the shared AI catalog.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/api/admin/events", get(list_events).post(create_event))
        .route(
            "/api/admin/event/{event_id}",
            put(update_event).delete(delete_event),
        )
        .route("/api/admin/event/{event_id}/upload_logo", post(set_logo))
        .route("/api/admin/event/{event_id}/delete_logo", post(delete_logo))
        .route("/api/admin/event/{event_id}/reset", post(reset_event))
        .route("/api/admin/qrcodes/generate", post(generate_qr_codes))
        .route("/api/admin/ai-quiz/load-questions", post(load_questions))
        .route("/api/admin/ai-quiz/categories", get(list_categories))
        .route(
            "/api/admin/ai-quiz/questions/{category_id}",
            get(list_category_questions),
        )
        .route("/api/admin/ai-quiz/question/{question_id}", put(update_question))
        .route_layer(middleware::from_fn_with_state(state, require_admin))
}

/// List every event with its credentials and status.
#[utoipa::path(
    get,
    path = "/api/admin/events",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Administrator token")),
    responses((status = 200, description = "Known events", body = [EventSummary]))
)]
pub async fn list_events(
    State(state): State<SharedState>,
) -> Result<Json<Vec<EventSummary>>, AppError> {
    Ok(Json(admin_service::list_events(&state).await?))
}

/// Create an event with default credentials.
#[utoipa::path(
    post,
    path = "/api/admin/events",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Administrator token")),
    responses((status = 201, description = "Event created", body = EventSummary))
)]
pub async fn create_event(
    State(state): State<SharedState>,
) -> Result<(StatusCode, Json<EventSummary>), AppError> {
    let summary = admin_service::create_event(&state).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// Update an event definition.
#[utoipa::path(
    put,
    path = "/api/admin/event/{event_id}",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Administrator token"),
    ("event_id" = u32, Path, description = "Event to update")),
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Event updated", body = EventSummary),
        (status = 409, description = "Login already used by another event")
    )
)]
pub async fn update_event(
    State(state): State<SharedState>,
    Path(event_id): Path<EventId>,
    Valid(Json(payload)): Valid<Json<UpdateEventRequest>>,
) -> Result<Json<EventSummary>, AppError> {
    Ok(Json(
        admin_service::update_event(&state, event_id, payload).await?,
    ))
}

/// Delete an event and its files; event 1 is protected.
#[utoipa::path(
    delete,
    path = "/api/admin/event/{event_id}",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Administrator token"),
    ("event_id" = u32, Path, description = "Event to delete")),
    responses(
        (status = 204, description = "Event deleted"),
        (status = 403, description = "Event 1 cannot be deleted")
    )
)]
pub async fn delete_event(
    State(state): State<SharedState>,
    Path(event_id): Path<EventId>,
) -> Result<StatusCode, AppError> {
    admin_service::delete_event(&state, event_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Attach an uploaded logo to the event.
#[utoipa::path(
    post,
    path = "/api/admin/event/{event_id}/upload_logo",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Administrator token"),
    ("event_id" = u32, Path, description = "Event receiving the logo")),
    request_body = SetLogoRequest,
    responses((status = 200, description = "Logo set", body = EventSummary))
)]
pub async fn set_logo(
    State(state): State<SharedState>,
    Path(event_id): Path<EventId>,
    Valid(Json(payload)): Valid<Json<SetLogoRequest>>,
) -> Result<Json<EventSummary>, AppError> {
    Ok(Json(
        admin_service::set_logo(&state, event_id, &payload.logo_url).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/admin/event/{event_id}/delete_logo",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Administrator token"),
    ("event_id" = u32, Path, description = "Event losing its logo")),
    responses((status = 200, description = "Logo removed", body = EventSummary))
)]
/// Remove the event logo and its file.
pub async fn delete_logo(
    State(state): State<SharedState>,
    Path(event_id): Path<EventId>,
) -> Result<Json<EventSummary>, AppError> {
    Ok(Json(admin_service::delete_logo(&state, event_id).await?))
}

/// Wipe players, questions, codes, photos and the game state of an event.
#[utoipa::path(
    post,
    path = "/api/admin/event/{event_id}/reset",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Administrator token"),
    ("event_id" = u32, Path, description = "Event to reset")),
    responses((status = 200, description = "Event reset", body = EventSummary))
)]
pub async fn reset_event(
    State(state): State<SharedState>,
    Path(event_id): Path<EventId>,
) -> Result<Json<EventSummary>, AppError> {
    Ok(Json(admin_service::reset_event(&state, event_id).await?))
}

/// Regenerate the QR codes of any event.
#[utoipa::path(
    post,
    path = "/api/admin/qrcodes/generate",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Administrator token")),
    request_body = AdminQrCodesRequest,
    responses(
        (status = 200, description = "Codes regenerated", body = QrCodeListing),
        (status = 403, description = "Game is active")
    )
)]
pub async fn generate_qr_codes(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<AdminQrCodesRequest>>,
) -> Result<Json<QrCodeListing>, AppError> {
    Ok(Json(
        host_service::generate_qr_codes(&state, payload.event_id, &payload.counts).await?,
    ))
}

/// Fill empty default categories from the configured seed questions.
#[utoipa::path(
    post,
    path = "/api/admin/ai-quiz/load-questions",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Administrator token")),
    responses((status = 200, description = "Questions loaded", body = SeedQuestionsResponse))
)]
pub async fn load_questions(
    State(state): State<SharedState>,
) -> Result<Json<SeedQuestionsResponse>, AppError> {
    Ok(Json(admin_service::load_seed_questions(&state).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/ai-quiz/categories",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Administrator token")),
    responses((status = 200, description = "Default categories", body = [HostAiCategoryView]))
)]
/// List the shared default AI categories.
pub async fn list_categories(State(state): State<SharedState>) -> Json<Vec<HostAiCategoryView>> {
    Json(admin_service::default_categories(&state).await)
}

#[utoipa::path(
    get,
    path = "/api/admin/ai-quiz/questions/{category_id}",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Administrator token"),
    ("category_id" = Uuid, Path, description = "Category to inspect")),
    responses((status = 200, description = "Questions with counters", body = [AdminAiQuestionView]))
)]
/// List the questions of an AI category.
pub async fn list_category_questions(
    State(state): State<SharedState>,
    Path(category_id): Path<Uuid>,
) -> Result<Json<Vec<AdminAiQuestionView>>, AppError> {
    Ok(Json(
        admin_service::category_questions(&state, category_id).await?,
    ))
}

/// Edit an AI question.
#[utoipa::path(
    put,
    path = "/api/admin/ai-quiz/question/{question_id}",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Administrator token"),
    ("question_id" = Uuid, Path, description = "Question to edit")),
    request_body = UpdateAiQuestionRequest,
    responses((status = 200, description = "Question updated", body = AdminAiQuestionView))
)]
pub async fn update_question(
    State(state): State<SharedState>,
    Path(question_id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<UpdateAiQuestionRequest>>,
) -> Result<Json<AdminAiQuestionView>, AppError> {
    Ok(Json(
        admin_service::update_ai_question(&state, question_id, payload.into()).await?,
    ))
}

async fn require_admin(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    auth_service::require_admin(&state, req.headers()).await?;
    Ok(next.run(req).await)
}
