/// Administrator operations on events and the shared AI catalog.
pub mod admin_service;
/// AI quiz categories and questions for players and hosts.
pub mod ai_quiz_service;
/// Caller identification from request headers.
pub mod auth_service;
/// Realtime payload assembly and stream subscription.
pub mod broadcast;
/// OpenAPI documentation generation.
pub mod documentation;
/// Uploaded logo and photo files.
pub mod file_storage;
/// Round lifecycle and clock controls.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Host panel operations on players, questions, minigames and QR codes.
pub mod host_service;
/// Secret phrase management.
pub mod password_service;
/// Photo challenge submissions and voting.
pub mod photo_service;
/// Player registration and code redemption.
pub mod player_service;
/// External quiz question generation.
pub mod question_generator;
/// Server-Sent Events transport.
pub mod sse_service;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;
/// Background clock of running events.
pub mod ticker;
/// WebSocket connection and message handling service.
pub mod websocket_service;
