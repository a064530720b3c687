use serde::Deserialize;
use utoipa::ToSchema;

use crate::dao::models::EventId;

#[derive(Debug, Deserialize, ToSchema)]
/// Messages accepted from WebSocket clients.
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Subscribe to an event's updates; a later join switches event.
    #[serde(rename = "join")]
    Join { event_id: EventId },
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    pub fn join_event(&self) -> Option<EventId> {
        match self {
            Self::Join { event_id } => Some(*event_id),
            Self::Unknown => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_and_unknown_messages_parse() {
        let join: ClientMessage = serde_json::from_str(r#"{"type":"join","event_id":3}"#).unwrap();
        assert_eq!(join.join_event(), Some(3));
        let other: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(other.join_event(), None);
    }
}
