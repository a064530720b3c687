use serde::Serialize;
use serde_json::{Value, json};
use utoipa::ToSchema;
use uuid::Uuid;

/// Names of the events pushed to subscribed clients.
pub mod names {
    pub const GAME_STATE_UPDATE: &str = "game_state_update";
    pub const LEADERBOARD_UPDATE: &str = "leaderboard_update";
    pub const PASSWORD_UPDATE: &str = "password_update";
    pub const TIMER_TICK: &str = "timer_tick";
    pub const GAME_OVER: &str = "game_over";
    pub const HOST_MESSAGE: &str = "host_message";
    pub const PHOTOS_UPDATE: &str = "photos_update";
    pub const PHOTO_VOTE_UPDATE: &str = "photo_vote_update";
}

#[derive(Clone, Debug)]
/// Dispatched payload carried across the per-event channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }

    /// WebSocket text frame `{"event": name, "data": payload}`.
    pub fn to_frame(&self) -> serde_json::Result<String> {
        let data: Value = serde_json::from_str(&self.data)?;
        serde_json::to_string(&json!({
            "event": self.event,
            "data": data,
        }))
    }
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
/// Broadcast once per tick while an event's clock runs.
pub struct TimerTickEvent {
    pub time_left: f64,
    pub time_elapsed: f64,
    pub time_elapsed_with_pauses: f64,
}

#[derive(Debug, Serialize, ToSchema)]
/// Masked password as shown on display screens.
pub struct PasswordUpdateEvent {
    pub password: String,
}

#[derive(Debug, Default, Serialize, ToSchema)]
/// Broadcast when the clock reaches zero.
pub struct GameOverEvent {}

#[derive(Debug, Serialize, ToSchema)]
/// Host announcement shown on display screens.
pub struct HostMessageEvent {
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast after a vote was added or withdrawn.
pub struct PhotoVoteUpdateEvent {
    pub photo_id: Uuid,
    pub votes: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_embeds_payload_as_json() {
        let event = ServerEvent::json(
            Some(names::HOST_MESSAGE.to_owned()),
            &HostMessageEvent {
                message: "Hello".into(),
            },
        )
        .unwrap();
        let frame: Value = serde_json::from_str(&event.to_frame().unwrap()).unwrap();
        assert_eq!(frame["event"], "host_message");
        assert_eq!(frame["data"]["message"], "Hello");
    }
}
