use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Lifecycle of one event's game session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    /// The event never started a game.
    #[default]
    Waiting,
    /// The clock is ticking.
    Running,
    /// The clock is frozen; remaining time is held in a snapshot.
    Paused,
    /// The host stopped the game or the clock ran out.
    Stopped,
}

/// Events that can be applied to the phase machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// Host starts a fresh round; valid from every phase.
    Start,
    /// Host freezes the clock.
    Pause,
    /// Host unfreezes the clock.
    Resume,
    /// Host ends the round.
    Stop,
    /// The clock reached zero.
    Expire,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the machine was in when the event was received.
    pub from: GamePhase,
    /// The rejected event.
    pub event: GameEvent,
}

impl GamePhase {
    /// Compute the phase reached by applying `event`, without mutating `self`.
    pub fn next(self, event: GameEvent) -> Result<GamePhase, InvalidTransition> {
        use GameEvent as E;
        use GamePhase as P;

        let next = match (self, event) {
            (_, E::Start) => P::Running,
            (P::Running, E::Pause) => P::Paused,
            (P::Paused, E::Resume) => P::Running,
            (P::Running | P::Paused, E::Stop) => P::Stopped,
            (P::Running, E::Expire) => P::Stopped,
            (from, event) => return Err(InvalidTransition { from, event }),
        };
        Ok(next)
    }

    /// Running or paused: players may scan and answer.
    pub fn is_active(self) -> bool {
        matches!(self, GamePhase::Running | GamePhase::Paused)
    }

    /// Rebuild the phase from the durable flags.
    pub fn from_flags(game_active: bool, timer_running: bool, ever_started: bool) -> Self {
        match (game_active, timer_running) {
            (true, true) => GamePhase::Running,
            (true, false) => GamePhase::Paused,
            (false, _) if ever_started => GamePhase::Stopped,
            (false, _) => GamePhase::Waiting,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(phase: GamePhase, event: GameEvent) -> GamePhase {
        phase
            .next(event)
            .unwrap_or_else(|err| panic!("unexpected error: {err}"))
    }

    #[test]
    fn full_round_walks_through_every_phase() {
        let mut phase = GamePhase::default();
        assert_eq!(phase, GamePhase::Waiting);

        phase = apply(phase, GameEvent::Start);
        assert_eq!(phase, GamePhase::Running);

        phase = apply(phase, GameEvent::Pause);
        assert_eq!(phase, GamePhase::Paused);

        phase = apply(phase, GameEvent::Resume);
        assert_eq!(phase, GamePhase::Running);

        phase = apply(phase, GameEvent::Expire);
        assert_eq!(phase, GamePhase::Stopped);
    }

    #[test]
    fn start_is_accepted_from_every_phase() {
        for phase in [
            GamePhase::Waiting,
            GamePhase::Running,
            GamePhase::Paused,
            GamePhase::Stopped,
        ] {
            assert_eq!(apply(phase, GameEvent::Start), GamePhase::Running);
        }
    }

    #[test]
    fn pause_requires_running() {
        let err = GamePhase::Paused.next(GameEvent::Pause).unwrap_err();
        assert_eq!(err.from, GamePhase::Paused);
        assert_eq!(err.event, GameEvent::Pause);
        assert!(GamePhase::Waiting.next(GameEvent::Pause).is_err());
    }

    #[test]
    fn resume_requires_paused() {
        assert!(GamePhase::Running.next(GameEvent::Resume).is_err());
        assert!(GamePhase::Stopped.next(GameEvent::Resume).is_err());
    }

    #[test]
    fn paused_clock_never_expires() {
        assert!(GamePhase::Paused.next(GameEvent::Expire).is_err());
    }

    #[test]
    fn stop_requires_an_active_game() {
        assert_eq!(apply(GamePhase::Paused, GameEvent::Stop), GamePhase::Stopped);
        assert!(GamePhase::Waiting.next(GameEvent::Stop).is_err());
        assert!(GamePhase::Stopped.next(GameEvent::Stop).is_err());
    }

    #[test]
    fn flags_round_trip_to_phase() {
        assert_eq!(GamePhase::from_flags(true, true, true), GamePhase::Running);
        assert_eq!(GamePhase::from_flags(true, false, true), GamePhase::Paused);
        assert_eq!(GamePhase::from_flags(false, false, true), GamePhase::Stopped);
        assert_eq!(GamePhase::from_flags(false, false, false), GamePhase::Waiting);
    }

    #[test]
    fn only_running_and_paused_are_active() {
        assert!(GamePhase::Running.is_active());
        assert!(!GamePhase::Waiting.is_active());
        assert!(!GamePhase::Stopped.is_active());
        assert!(GamePhase::Paused.is_active());
    }
}
