//! Authoritative game clock of an event.
//!
//! All arithmetic is done in seconds (`f64`) against wall-clock markers. The
//! remaining time captured when pausing is the only source used on resume, so
//! pause/resume cycles never drift.

use thiserror::Error;
use time::{Duration, OffsetDateTime};

use crate::state::state_machine::{GameEvent, GamePhase, InvalidTransition};

/// Error raised by clock operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimerError {
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    #[error("duration must be at least 1 minute (got {0})")]
    InvalidDuration(u32),
    #[error("speed must be at least 1 (got {0})")]
    InvalidSpeed(u32),
    #[error("game is not active")]
    NotActive,
}

/// Time values derived from the clock at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimerReadings {
    pub time_left: f64,
    pub time_elapsed: f64,
    pub time_elapsed_with_pauses: f64,
}

/// Result of advancing the clock by one background tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// The clock is not running; nothing changed.
    Idle,
    /// Time moved forward and some remains.
    Ticked(TimerReadings),
    /// Time ran out and the phase moved to stopped.
    Expired,
}

/// Timer markers of one event.
#[derive(Debug, Clone, PartialEq)]
pub struct GameClock {
    pub phase: GamePhase,
    pub started_at: Option<OffsetDateTime>,
    pub ends_at: Option<OffsetDateTime>,
    pub pause_started_at: Option<OffsetDateTime>,
    pub total_paused: f64,
    pub time_left_on_pause: f64,
    pub initial_duration: u32,
    pub speed: u32,
}

impl Default for GameClock {
    fn default() -> Self {
        Self {
            phase: GamePhase::Waiting,
            started_at: None,
            ends_at: None,
            pause_started_at: None,
            total_paused: 0.0,
            time_left_on_pause: 0.0,
            initial_duration: 0,
            speed: 1,
        }
    }
}

fn seconds_between(later: OffsetDateTime, earlier: OffsetDateTime) -> f64 {
    (later - earlier).as_seconds_f64()
}

fn shift(at: OffsetDateTime, seconds: f64) -> OffsetDateTime {
    at + Duration::seconds_f64(seconds)
}

impl GameClock {
    /// Begin a fresh round lasting `minutes`.
    pub fn start(&mut self, now: OffsetDateTime, minutes: u32) -> Result<(), TimerError> {
        if minutes < 1 {
            return Err(TimerError::InvalidDuration(minutes));
        }
        let phase = self.phase.next(GameEvent::Start)?;
        let duration = minutes * 60;
        *self = Self {
            phase,
            started_at: Some(now),
            ends_at: Some(shift(now, f64::from(duration))),
            pause_started_at: None,
            total_paused: 0.0,
            time_left_on_pause: 0.0,
            initial_duration: duration,
            speed: 1,
        };
        Ok(())
    }

    /// Freeze the clock and snapshot the remaining time.
    pub fn pause(&mut self, now: OffsetDateTime) -> Result<(), TimerError> {
        self.phase = self.phase.next(GameEvent::Pause)?;
        self.pause_started_at = Some(now);
        self.time_left_on_pause = self
            .ends_at
            .map(|end| seconds_between(end, now).max(0.0))
            .unwrap_or(0.0);
        Ok(())
    }

    /// Unfreeze the clock using the remaining time captured by [`GameClock::pause`].
    pub fn resume(&mut self, now: OffsetDateTime) -> Result<(), TimerError> {
        self.phase = self.phase.next(GameEvent::Resume)?;
        if let Some(pause_started_at) = self.pause_started_at.take() {
            self.total_paused += seconds_between(now, pause_started_at).max(0.0);
        }
        self.ends_at = Some(shift(now, self.time_left_on_pause));
        Ok(())
    }

    /// Store a new speed multiplier. Requesting the speed already in effect resets it to 1.
    ///
    /// Returns the speed now in effect.
    pub fn set_speed(&mut self, speed: u32) -> Result<u32, TimerError> {
        if speed < 1 {
            return Err(TimerError::InvalidSpeed(speed));
        }
        self.speed = if speed == self.speed { 1 } else { speed };
        Ok(self.speed)
    }

    /// Explicitly return to real-time speed.
    pub fn reset_speed(&mut self) {
        self.speed = 1;
    }

    /// Replace the remaining time of an active game by `minutes`.
    pub fn adjust_duration(&mut self, now: OffsetDateTime, minutes: u32) -> Result<(), TimerError> {
        if minutes < 1 {
            return Err(TimerError::InvalidDuration(minutes));
        }
        if !self.phase.is_active() {
            return Err(TimerError::NotActive);
        }
        let duration = minutes * 60;
        if self.phase == GamePhase::Paused {
            self.time_left_on_pause = f64::from(duration);
        }
        // While paused this is a placeholder; resume recomputes it from the snapshot.
        self.ends_at = Some(shift(now, f64::from(duration)));
        self.initial_duration = duration;
        Ok(())
    }

    /// End the round on host request.
    pub fn stop(&mut self, now: OffsetDateTime) -> Result<(), TimerError> {
        let was_paused = self.phase == GamePhase::Paused;
        self.phase = self.phase.next(GameEvent::Stop)?;
        if was_paused {
            if let Some(pause_started_at) = self.pause_started_at.take() {
                self.total_paused += seconds_between(now, pause_started_at).max(0.0);
            }
        }
        Ok(())
    }

    /// Advance a running clock after `real_elapsed` wall-clock seconds.
    ///
    /// With a speed above 1 the end marker is pulled towards `now` by the extra
    /// game time, so the countdown runs faster than real time.
    pub fn advance(&mut self, now: OffsetDateTime, real_elapsed: f64) -> TickOutcome {
        if self.phase != GamePhase::Running {
            return TickOutcome::Idle;
        }
        let Some(ends_at) = self.ends_at else {
            return TickOutcome::Idle;
        };

        let game_elapsed = real_elapsed * f64::from(self.speed);
        let ends_at = shift(ends_at, -(game_elapsed - real_elapsed));
        self.ends_at = Some(ends_at);

        if seconds_between(ends_at, now) <= 0.0 {
            // Running always accepts Expire.
            self.phase = GamePhase::Stopped;
            return TickOutcome::Expired;
        }
        TickOutcome::Ticked(self.readings(now))
    }

    /// Seconds left on the clock; zero when no game is active.
    pub fn time_left(&self, now: OffsetDateTime) -> f64 {
        match self.phase {
            GamePhase::Running => self
                .ends_at
                .map(|end| seconds_between(end, now).max(0.0))
                .unwrap_or(0.0),
            GamePhase::Paused => self.time_left_on_pause.max(0.0),
            GamePhase::Waiting | GamePhase::Stopped => 0.0,
        }
    }

    /// Seconds since start, including pauses.
    pub fn time_elapsed_with_pauses(&self, now: OffsetDateTime) -> f64 {
        self.started_at
            .map(|start| seconds_between(now, start))
            .unwrap_or(0.0)
    }

    /// Seconds since start, excluding completed pauses and the pause in progress.
    pub fn time_elapsed(&self, now: OffsetDateTime) -> f64 {
        if self.started_at.is_none() {
            return 0.0;
        }
        let current_pause = match (self.phase, self.pause_started_at) {
            (GamePhase::Paused, Some(since)) => seconds_between(now, since),
            _ => 0.0,
        };
        self.time_elapsed_with_pauses(now) - self.total_paused - current_pause
    }

    /// All derived time values at `now`.
    pub fn readings(&self, now: OffsetDateTime) -> TimerReadings {
        TimerReadings {
            time_left: self.time_left(now),
            time_elapsed: self.time_elapsed(now),
            time_elapsed_with_pauses: self.time_elapsed_with_pauses(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const T0: OffsetDateTime = datetime!(2025-06-01 18:00 UTC);

    fn at(seconds: f64) -> OffsetDateTime {
        shift(T0, seconds)
    }

    fn started(minutes: u32) -> GameClock {
        let mut clock = GameClock::default();
        clock.start(T0, minutes).unwrap();
        clock
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn start_sets_fresh_markers() {
        let clock = started(30);
        assert_eq!(clock.phase, GamePhase::Running);
        assert_eq!(clock.initial_duration, 1800);
        assert_eq!(clock.speed, 1);
        assert_close(clock.time_left(T0), 1800.0);
    }

    #[test]
    fn start_rejects_zero_minutes() {
        let mut clock = GameClock::default();
        assert_eq!(clock.start(T0, 0), Err(TimerError::InvalidDuration(0)));
        assert_eq!(clock.phase, GamePhase::Waiting);
    }

    #[test]
    fn paused_time_is_excluded_from_net_elapsed() {
        let mut clock = started(30);
        clock.pause(at(10.0)).unwrap();
        clock.resume(at(15.0)).unwrap();

        let readings = clock.readings(at(20.0));
        assert_close(readings.time_elapsed, 15.0);
        assert_close(readings.time_elapsed_with_pauses, 20.0);
        assert_close(readings.time_left, 1800.0 - 15.0);
    }

    #[test]
    fn elapsed_during_a_pause_excludes_the_current_pause() {
        let mut clock = started(30);
        clock.pause(at(10.0)).unwrap();
        assert_close(clock.time_elapsed(at(14.0)), 10.0);
        assert_close(clock.time_left(at(14.0)), 1790.0);
    }

    #[test]
    fn zero_length_pause_keeps_remaining_time() {
        let mut clock = started(30);
        let before = clock.time_left(at(42.0));
        clock.pause(at(42.0)).unwrap();
        clock.resume(at(42.0)).unwrap();
        assert_close(clock.time_left(at(42.0)), before);
    }

    #[test]
    fn double_speed_consumes_two_seconds_per_tick() {
        let mut clock = started(30);
        assert_eq!(clock.set_speed(2), Ok(2));
        for second in 1..=10 {
            let outcome = clock.advance(at(f64::from(second)), 1.0);
            assert!(matches!(outcome, TickOutcome::Ticked(_)));
        }
        assert_close(clock.time_left(at(10.0)), 1780.0);
    }

    #[test]
    fn requesting_the_current_speed_resets_to_one() {
        let mut clock = started(30);
        assert_eq!(clock.set_speed(3), Ok(3));
        assert_eq!(clock.set_speed(3), Ok(1));
        assert_eq!(clock.set_speed(0), Err(TimerError::InvalidSpeed(0)));
        clock.set_speed(5).unwrap();
        clock.reset_speed();
        assert_eq!(clock.speed, 1);
    }

    #[test]
    fn speed_set_while_paused_applies_after_resume() {
        let mut clock = started(30);
        clock.pause(at(10.0)).unwrap();
        clock.set_speed(2).unwrap();
        assert_eq!(clock.advance(at(11.0), 1.0), TickOutcome::Idle);
        assert_close(clock.time_left(at(11.0)), 1790.0);

        clock.resume(at(20.0)).unwrap();
        clock.advance(at(21.0), 1.0);
        assert_close(clock.time_left(at(21.0)), 1788.0);
    }

    #[test]
    fn clock_expires_and_stops() {
        let mut clock = started(1);
        let outcome = clock.advance(at(60.0), 1.0);
        assert_eq!(outcome, TickOutcome::Expired);
        assert_eq!(clock.phase, GamePhase::Stopped);
        assert_close(clock.time_left(at(61.0)), 0.0);
    }

    #[test]
    fn adjust_while_running_moves_the_end() {
        let mut clock = started(30);
        clock.adjust_duration(at(100.0), 5).unwrap();
        assert_close(clock.time_left(at(100.0)), 300.0);
        assert_eq!(clock.initial_duration, 300);
    }

    #[test]
    fn adjust_while_paused_replaces_the_snapshot() {
        let mut clock = started(30);
        clock.pause(at(100.0)).unwrap();
        clock.adjust_duration(at(110.0), 2).unwrap();
        assert_close(clock.time_left(at(500.0)), 120.0);
        clock.resume(at(600.0)).unwrap();
        assert_close(clock.time_left(at(600.0)), 120.0);
    }

    #[test]
    fn adjust_requires_an_active_game() {
        let mut clock = GameClock::default();
        assert_eq!(clock.adjust_duration(T0, 10), Err(TimerError::NotActive));
        let mut clock = started(30);
        assert_eq!(
            clock.adjust_duration(T0, 0),
            Err(TimerError::InvalidDuration(0))
        );
    }

    #[test]
    fn stop_freezes_reported_time_left() {
        let mut clock = started(30);
        clock.stop(at(30.0)).unwrap();
        assert_eq!(clock.phase, GamePhase::Stopped);
        assert_close(clock.time_left(at(31.0)), 0.0);
        assert!(clock.stop(at(32.0)).is_err());
    }
}
