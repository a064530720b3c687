//! Background clock driving every running event once per tick.

use std::collections::HashMap;

use futures::future::join_all;
use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval},
};
use tracing::{debug, info, warn};

use crate::{
    dao::models::EventId,
    dto::sse::{TimerTickEvent, names},
    error::ServiceError,
    services::broadcast,
    state::{SharedState, timer::TickOutcome},
};

/// Spawn the ticker unless one already runs in this process.
pub fn spawn(state: SharedState) -> Option<JoinHandle<()>> {
    if !state.claim_ticker() {
        debug!("ticker already running");
        return None;
    }
    Some(tokio::spawn(run(state)))
}

async fn run(state: SharedState) {
    let mut ticker = interval(state.config().tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_ticks = HashMap::new();
    info!(interval = ?state.config().tick_interval, "ticker started");
    loop {
        ticker.tick().await;
        tick_all(&state, &mut last_ticks).await;
    }
}

/// Advance every running event concurrently.
///
/// `last_ticks` holds the instant each event was last advanced with success;
/// a failed tick keeps the older instant so the next pass catches up. Events
/// that stopped running are dropped from it.
pub async fn tick_all(state: &SharedState, last_ticks: &mut HashMap<EventId, Instant>) {
    let running = state.running_event_ids().await;
    last_ticks.retain(|id, _| running.contains(id));

    let now = Instant::now();
    let jobs = running.into_iter().map(|event_id| {
        let real_elapsed = last_ticks
            .get(&event_id)
            .map(|previous| now.duration_since(*previous).as_secs_f64())
            .unwrap_or(1.0);
        async move { (event_id, tick_event(state, event_id, real_elapsed).await) }
    });

    for (event_id, result) in join_all(jobs).await {
        match result {
            Ok(TickOutcome::Expired) => {
                last_ticks.remove(&event_id);
                info!(event_id, "round time is up");
            }
            Ok(_) => {
                last_ticks.insert(event_id, now);
            }
            Err(ServiceError::Degraded) => debug!(event_id, "tick skipped in degraded mode"),
            Err(err) => warn!(event_id, error = %err, "tick failed"),
        }
    }
}

async fn tick_event(
    state: &SharedState,
    event_id: EventId,
    real_elapsed: f64,
) -> Result<TickOutcome, ServiceError> {
    state
        .with_event_mut(event_id, |event, ctx| {
            let speed = event.game.clock.speed;
            let outcome = event.game.clock.advance(ctx.now, real_elapsed);
            match outcome {
                TickOutcome::Idle => ctx.skip_persist(),
                TickOutcome::Ticked(readings) => {
                    if speed == 1 {
                        ctx.skip_persist();
                    }
                    ctx.publish(
                        names::TIMER_TICK,
                        &TimerTickEvent {
                            time_left: readings.time_left,
                            time_elapsed: readings.time_elapsed,
                            time_elapsed_with_pauses: readings.time_elapsed_with_pauses,
                        },
                    );
                }
                TickOutcome::Expired => {
                    broadcast::queue_game_state(event, ctx);
                    broadcast::queue_game_over(ctx);
                }
            }
            Ok(outcome)
        })
        .await
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;
    use crate::{
        services::game_service,
        state::{state_machine::GamePhase, tests::test_state},
    };

    #[tokio::test]
    async fn running_events_broadcast_a_tick() {
        let (state, _) = test_state().await;
        game_service::start_game(&state, 1, Some(5)).await.unwrap();
        let mut receiver = state.hub().subscribe(1);
        let mut last_ticks = HashMap::new();

        tick_all(&state, &mut last_ticks).await;

        let message = receiver.recv().await.unwrap();
        assert_eq!(message.event.as_deref(), Some(names::TIMER_TICK));
        assert!(last_ticks.contains_key(&1));
    }

    #[tokio::test]
    async fn expired_clock_stops_the_game_and_announces_it() {
        let (state, _) = test_state().await;
        game_service::start_game(&state, 1, Some(1)).await.unwrap();
        state
            .with_event_mut(1, |event, ctx| {
                event.game.clock.ends_at = Some(ctx.now - Duration::seconds(1));
                Ok(())
            })
            .await
            .unwrap();
        let mut receiver = state.hub().subscribe(1);
        let mut last_ticks = HashMap::new();

        tick_all(&state, &mut last_ticks).await;

        let first = receiver.recv().await.unwrap();
        assert_eq!(first.event.as_deref(), Some(names::GAME_STATE_UPDATE));
        let second = receiver.recv().await.unwrap();
        assert_eq!(second.event.as_deref(), Some(names::GAME_OVER));
        let phase = state.read_event(1, |e| e.game.phase()).await.unwrap();
        assert_eq!(phase, GamePhase::Stopped);
        assert!(last_ticks.is_empty());
    }

    #[tokio::test]
    async fn one_failing_event_does_not_block_the_others() {
        let (state, store) = test_state().await;
        state.create_event().await.unwrap();
        game_service::start_game(&state, 1, Some(5)).await.unwrap();
        game_service::start_game(&state, 2, Some(5)).await.unwrap();
        game_service::set_speed(&state, 2, 4).await.unwrap();
        let mut first = state.hub().subscribe(1);
        store.set_fail_writes(true);

        let mut last_ticks = HashMap::new();
        tick_all(&state, &mut last_ticks).await;

        // Event 1 runs at normal speed and needs no write.
        let message = first.recv().await.unwrap();
        assert_eq!(message.event.as_deref(), Some(names::TIMER_TICK));
    }

    #[tokio::test]
    async fn failed_fast_tick_is_caught_up_on_the_next_pass() {
        let (state, store) = test_state().await;
        game_service::start_game(&state, 1, Some(5)).await.unwrap();
        game_service::set_speed(&state, 1, 4).await.unwrap();
        let previous = Instant::now() - std::time::Duration::from_secs(2);
        let mut last_ticks = HashMap::from([(1, previous)]);

        store.set_fail_writes(true);
        tick_all(&state, &mut last_ticks).await;
        assert_eq!(last_ticks.get(&1), Some(&previous));

        store.set_fail_writes(false);
        tick_all(&state, &mut last_ticks).await;
        assert!(last_ticks[&1] > previous);
    }

    #[tokio::test]
    async fn ticker_is_spawned_once() {
        let (state, _) = test_state().await;
        let handle = spawn(state.clone()).unwrap();
        assert!(spawn(state).is_none());
        handle.abort();
    }
}
