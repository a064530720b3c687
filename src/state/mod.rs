//! In-memory game state: one aggregate per event, the AI catalog and the fan-out hub.

pub mod catalog;
pub mod event;
mod hub;
pub mod password;
pub mod redemption;
pub mod state_machine;
pub mod timer;

use std::{
    future::Future,
    sync::{
        Arc, Mutex as StdMutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use dashmap::DashMap;
use rand::{SeedableRng, rngs::StdRng};
use serde::Serialize;
use time::OffsetDateTime;
use tokio::{
    sync::{Mutex, RwLock, watch},
    time::timeout,
};
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    dao::{
        game_store::GameStore,
        models::{AiCatalogEntity, EventEntity, EventId, EventRecordEntity},
    },
    dto::sse::ServerEvent,
    error::ServiceError,
    services::{file_storage::FileStorage, question_generator::QuestionGenerator},
    state::{catalog::AiCatalog, event::EventRuntime, state_machine::GamePhase},
};

pub use self::hub::EventHub;

pub type SharedState = Arc<AppState>;
/// Longest time a storage commit may take before the mutation is abandoned.
pub const DEFAULT_COMMIT_TIMEOUT: Duration = Duration::from_secs(5);
const HUB_CAPACITY: usize = 64;

type EventSlot = Arc<Mutex<EventRuntime>>;

/// Side effects requested by a mutation; published only once the draft is committed.
pub struct MutationContext<'a> {
    /// Instant shared by every computation of the mutation.
    pub now: OffsetDateTime,
    pub rng: &'a mut StdRng,
    outbox: Vec<ServerEvent>,
    persist: bool,
}

impl MutationContext<'_> {
    /// Declare that the mutation left nothing durable behind; the storage write is skipped.
    pub fn skip_persist(&mut self) {
        self.persist = false;
    }

    /// Queue a broadcast, logging instead of failing when the payload cannot be serialised.
    pub fn publish<T: Serialize>(&mut self, name: &str, payload: &T) {
        match ServerEvent::json(Some(name.to_owned()), payload) {
            Ok(event) => self.outbox.push(event),
            Err(err) => warn!(event = name, error = %err, "failed to serialise broadcast"),
        }
    }
}

/// Central application state: live event aggregates, storage handle and fan-out hub.
pub struct AppState {
    config: AppConfig,
    game_store: RwLock<Option<Arc<dyn GameStore>>>,
    events: DashMap<EventId, EventSlot>,
    catalog: Mutex<AiCatalog>,
    hub: EventHub,
    rng: StdMutex<StdRng>,
    generator: Arc<dyn QuestionGenerator>,
    files: FileStorage,
    degraded: watch::Sender<bool>,
    /// Serialises event creation so identifiers stay unique.
    registry_gate: Mutex<()>,
    hydrated: AtomicBool,
    ticker_started: AtomicBool,
    commit_timeout: Option<Duration>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig, generator: Arc<dyn QuestionGenerator>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let files = FileStorage::new(config.upload_dir.clone());
        Arc::new(Self {
            config,
            game_store: RwLock::new(None),
            events: DashMap::new(),
            catalog: Mutex::new(AiCatalog::default()),
            hub: EventHub::new(HUB_CAPACITY),
            rng: StdMutex::new(rng),
            generator,
            files,
            degraded: degraded_tx,
            registry_gate: Mutex::new(()),
            hydrated: AtomicBool::new(false),
            ticker_started: AtomicBool::new(false),
            commit_timeout: Some(DEFAULT_COMMIT_TIMEOUT),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn hub(&self) -> &EventHub {
        &self.hub
    }

    pub fn generator(&self) -> &dyn QuestionGenerator {
        self.generator.as_ref()
    }

    pub fn files(&self) -> &FileStorage {
        &self.files
    }

    /// Obtain a handle to the current game store, if one is installed.
    pub async fn game_store(&self) -> Option<Arc<dyn GameStore>> {
        let guard = self.game_store.read().await;
        guard.as_ref().cloned()
    }

    /// Install a new game store implementation and leave degraded mode.
    pub async fn install_game_store(&self, store: Arc<dyn GameStore>) {
        {
            let mut guard = self.game_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current game store and enter degraded mode.
    pub async fn clear_game_store(&self) {
        {
            let mut guard = self.game_store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub(crate) async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    async fn writable_store(&self) -> Result<Arc<dyn GameStore>, ServiceError> {
        if self.is_degraded().await {
            return Err(ServiceError::Degraded);
        }
        self.game_store().await.ok_or(ServiceError::Degraded)
    }

    /// Run a storage call under the commit timeout.
    async fn commit<F, T>(&self, work: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, crate::dao::storage::StorageError>>,
    {
        match self.commit_timeout {
            Some(limit) => timeout(limit, work)
                .await
                .map_err(|_| ServiceError::Timeout)?
                .map_err(Into::into),
            None => work.await.map_err(Into::into),
        }
    }

    /// Load every stored event and the AI catalog into memory, once per process.
    ///
    /// Seeds the default AI categories and creates event `1` when storage is empty.
    pub async fn hydrate(&self) -> Result<(), ServiceError> {
        if self.hydrated.load(Ordering::SeqCst) {
            return Ok(());
        }
        let store = self.writable_store().await?;
        let _gate = self.registry_gate.lock().await;
        if self.hydrated.load(Ordering::SeqCst) {
            return Ok(());
        }

        let stored = self.commit(store.list_events()).await?;
        for entity in stored {
            let runtime = EventRuntime::from(entity);
            self.events
                .insert(runtime.id(), Arc::new(Mutex::new(runtime)));
        }

        let mut catalog = self
            .commit(store.load_catalog())
            .await?
            .map(AiCatalog::from)
            .unwrap_or_default();
        let seeded = catalog.seed_defaults(&self.config.ai_categories);
        let loaded = catalog.load_seed(&self.config.ai_seed);
        if seeded > 0 || loaded > 0 {
            self.commit(store.save_catalog(AiCatalogEntity::from(&catalog)))
                .await?;
        }
        *self.catalog.lock().await = catalog;

        if self.events.is_empty() {
            let runtime = EventRuntime::new(default_record(1), &self.config.rules);
            self.commit(store.save_event(EventEntity::from(&runtime)))
                .await?;
            self.events.insert(1, Arc::new(Mutex::new(runtime)));
        }

        self.hydrated.store(true, Ordering::SeqCst);
        info!(
            events = self.events.len(),
            seeded_categories = seeded,
            seeded_questions = loaded,
            "loaded state from storage"
        );
        Ok(())
    }

    /// Identifiers of every known event, ascending.
    pub fn event_ids(&self) -> Vec<EventId> {
        let mut ids: Vec<EventId> = self.events.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn event_exists(&self, event_id: EventId) -> bool {
        self.events.contains_key(&event_id)
    }

    fn slot(&self, event_id: EventId) -> Result<EventSlot, ServiceError> {
        self.events
            .get(&event_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| missing_event(event_id))
    }

    fn is_registered(&self, event_id: EventId, slot: &EventSlot) -> bool {
        self.events
            .get(&event_id)
            .is_some_and(|entry| Arc::ptr_eq(entry.value(), slot))
    }

    /// Run a read-only projection against the live aggregate of `event_id`.
    pub async fn read_event<T>(
        &self,
        event_id: EventId,
        read: impl FnOnce(&EventRuntime) -> T,
    ) -> Result<T, ServiceError> {
        let slot = self.slot(event_id)?;
        let guard = slot.lock().await;
        Ok(read(&guard))
    }

    /// Mutate `event_id` atomically.
    ///
    /// The closure works on a draft; the draft replaces the live aggregate only
    /// after the store accepted it, and queued broadcasts are published after
    /// that, still under the event lock.
    pub async fn with_event_mut<T>(
        &self,
        event_id: EventId,
        mutate: impl FnOnce(&mut EventRuntime, &mut MutationContext<'_>) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let slot = self.slot(event_id)?;
        let store = self.writable_store().await?;
        let mut live = slot.lock().await;
        // The event may have been deleted while this call waited for the lock.
        if !self.is_registered(event_id, &slot) {
            return Err(missing_event(event_id));
        }
        let mut draft = live.clone();

        let (value, outbox, persist) = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            let mut ctx = MutationContext {
                now: OffsetDateTime::now_utc(),
                rng: &mut rng,
                outbox: Vec::new(),
                persist: true,
            };
            let value = mutate(&mut draft, &mut ctx)?;
            (value, ctx.outbox, ctx.persist)
        };

        if persist {
            self.commit(store.save_event(EventEntity::from(&draft)))
                .await?;
        }
        *live = draft;

        for event in outbox {
            self.hub.publish(event_id, event);
        }
        Ok(value)
    }

    /// Create a new event with the next free identifier.
    pub async fn create_event(&self) -> Result<EventRuntime, ServiceError> {
        let store = self.writable_store().await?;
        let _gate = self.registry_gate.lock().await;
        let id = self.event_ids().last().copied().unwrap_or(0) + 1;
        let runtime = EventRuntime::new(default_record(id), &self.config.rules);
        self.commit(store.save_event(EventEntity::from(&runtime)))
            .await?;
        self.events
            .insert(id, Arc::new(Mutex::new(runtime.clone())));
        info!(event_id = id, "event created");
        Ok(runtime)
    }

    /// Delete an event and return its last state.
    pub async fn remove_event(&self, event_id: EventId) -> Result<EventRuntime, ServiceError> {
        let store = self.writable_store().await?;
        let _gate = self.registry_gate.lock().await;
        let slot = self.slot(event_id)?;
        let live = slot.lock().await;
        self.commit(store.delete_event(event_id)).await?;
        self.events.remove(&event_id);
        self.hub.remove(event_id);
        info!(event_id, "event deleted");
        let snapshot = live.clone();
        drop(live);

        let removed = self
            .with_catalog_mut(|catalog, _| Ok(catalog.remove_event(event_id)))
            .await;
        if let Err(err) = removed {
            warn!(event_id, error = %err, "failed to drop custom categories of deleted event");
        }
        Ok(snapshot)
    }

    /// Run a read-only projection against the AI catalog.
    pub async fn read_catalog<T>(&self, read: impl FnOnce(&AiCatalog) -> T) -> T {
        let guard = self.catalog.lock().await;
        read(&guard)
    }

    /// Mutate the AI catalog atomically, following the same draft-then-commit rule as events.
    pub async fn with_catalog_mut<T>(
        &self,
        mutate: impl FnOnce(&mut AiCatalog, &mut StdRng) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let store = self.writable_store().await?;
        let mut live = self.catalog.lock().await;
        let mut draft = live.clone();
        let value = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            mutate(&mut draft, &mut rng)?
        };
        self.commit(store.save_catalog(AiCatalogEntity::from(&draft)))
            .await?;
        *live = draft;
        Ok(value)
    }

    /// Mark the background ticker as started; returns `false` if it already was.
    pub(crate) fn claim_ticker(&self) -> bool {
        !self.ticker_started.swap(true, Ordering::SeqCst)
    }

    /// Identifiers of the events whose clock is currently running.
    pub async fn running_event_ids(&self) -> Vec<EventId> {
        let mut running = Vec::new();
        for id in self.event_ids() {
            let Ok(slot) = self.slot(id) else { continue };
            if slot.lock().await.game.phase() == GamePhase::Running {
                running.push(id);
            }
        }
        running
    }
}

fn missing_event(event_id: EventId) -> ServiceError {
    ServiceError::NotFound(format!("event {event_id} does not exist"))
}

/// Definition of a freshly created event.
pub fn default_record(id: EventId) -> EventRecordEntity {
    EventRecordEntity {
        id,
        name: format!("Event #{id}"),
        login: format!("host{id}"),
        password: format!("password{id}"),
        event_date: None,
        notes: String::new(),
        logo: None,
        superhost: false,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        dao::game_store::memory::MemoryGameStore,
        dto::sse::names,
        services::question_generator::tests::StaticGenerator,
    };

    /// Hydrated state backed by an in-memory store and a fixed seed.
    pub(crate) async fn test_state() -> (SharedState, MemoryGameStore) {
        test_state_with(Arc::new(StaticGenerator::default())).await
    }

    pub(crate) async fn test_state_with(
        generator: Arc<dyn QuestionGenerator>,
    ) -> (SharedState, MemoryGameStore) {
        let config = AppConfig {
            rng_seed: Some(7),
            admin_token: Some("admin-secret".into()),
            upload_dir: std::env::temp_dir().join("qr-hunt-back-tests"),
            ..AppConfig::default()
        };
        let state = AppState::new(config, generator);
        let store = MemoryGameStore::new();
        state.install_game_store(Arc::new(store.clone())).await;
        state.hydrate().await.unwrap();
        (state, store)
    }

    #[tokio::test]
    async fn hydrate_creates_the_first_event_and_default_categories() {
        let (state, store) = test_state().await;
        assert_eq!(state.event_ids(), vec![1]);
        assert!(store.stored_event(1).is_some());
        let defaults = state.read_catalog(|c| c.default_categories().len()).await;
        assert_eq!(defaults, 10);
    }

    #[tokio::test]
    async fn failed_commit_leaves_live_state_and_subscribers_untouched() {
        let (state, store) = test_state().await;
        let mut receiver = state.hub().subscribe(1);
        store.set_fail_writes(true);

        let result = state
            .with_event_mut(1, |event, ctx| {
                event.record.name = "Renamed".into();
                ctx.publish(names::HOST_MESSAGE, &"hi");
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(ServiceError::Unavailable(_))));
        let name = state.read_event(1, |e| e.record.name.clone()).await.unwrap();
        assert_eq!(name, "Event #1");
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn committed_mutation_is_stored_then_published() {
        let (state, store) = test_state().await;
        let mut receiver = state.hub().subscribe(1);

        state
            .with_event_mut(1, |event, ctx| {
                event.record.notes = "stage B".into();
                ctx.publish(names::HOST_MESSAGE, &"hi");
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(store.stored_event(1).unwrap().event.notes, "stage B");
        let message = receiver.recv().await.unwrap();
        assert_eq!(message.event.as_deref(), Some(names::HOST_MESSAGE));
    }

    #[tokio::test]
    async fn degraded_mode_rejects_mutations() {
        let (state, _store) = test_state().await;
        state.clear_game_store().await;
        let result = state.with_event_mut(1, |_, _| Ok(())).await;
        assert!(matches!(result, Err(ServiceError::Degraded)));
    }

    #[tokio::test]
    async fn events_get_sequential_identifiers() {
        let (state, _store) = test_state().await;
        let second = state.create_event().await.unwrap();
        assert_eq!(second.id(), 2);
        assert_eq!(second.record.login, "host2");
        state.remove_event(2).await.unwrap();
        assert_eq!(state.event_ids(), vec![1]);
    }

    #[tokio::test]
    async fn mutation_waiting_on_a_deleted_event_writes_nothing() {
        let (state, store) = test_state().await;
        state.create_event().await.unwrap();
        let slot = state.slot(2).unwrap();
        let held = slot.lock().await;

        let remover = tokio::spawn({
            let state = state.clone();
            async move { state.remove_event(2).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        let writer = tokio::spawn({
            let state = state.clone();
            async move {
                state
                    .with_event_mut(2, |event, ctx| {
                        event.record.notes = "late write".into();
                        ctx.publish(names::HOST_MESSAGE, &"late");
                        Ok(())
                    })
                    .await
            }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(held);

        remover.await.unwrap().unwrap();
        let late = writer.await.unwrap();
        assert!(matches!(late, Err(ServiceError::NotFound(_))));
        assert_eq!(state.event_ids(), vec![1]);
        assert!(store.stored_event(2).is_none());
    }
}
