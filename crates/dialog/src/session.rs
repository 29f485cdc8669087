//! In-memory session store keyed by session id.
//!
//! Each session's memory sits behind its own lock, so turns for different
//! sessions run concurrently while turns within one session are serialized.

use crate::engine::{DialogEngine, TurnOutcome};
use chrono::{DateTime, Utc};
use slotwise_core::{DialogMemory, EngineError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

type SessionSlot = Arc<Mutex<DialogMemory>>;

pub struct SessionStore {
    engine: Arc<DialogEngine>,
    sessions: Mutex<HashMap<String, SessionSlot>>,
    max_idle_secs: u64,
}

impl SessionStore {
    pub fn new(engine: Arc<DialogEngine>) -> Self {
        let max_idle_secs = engine.config().session.max_idle_secs;
        Self {
            engine,
            sessions: Mutex::new(HashMap::new()),
            max_idle_secs,
        }
    }

    pub fn engine(&self) -> &DialogEngine {
        &self.engine
    }

    /// Run a turn for `session_id`, creating the session on first use.
    pub async fn process(&self, session_id: &str, utterance: &str) -> Result<TurnOutcome, EngineError> {
        loop {
            let slot = self.slot_or_create(session_id).await;
            let mut memory = slot.lock().await;
            // The entry may have been evicted or reset while we waited.
            if self.is_current(session_id, &slot).await {
                return self.engine.process_turn(utterance, &mut memory);
            }
            tracing::debug!("Session {session_id} was dropped before the turn started; retrying");
        }
    }

    pub async fn record_response(&self, session_id: &str, response: &str) -> Result<bool, EngineError> {
        let slot = self.slot(session_id).await?;
        let mut memory = slot.lock().await;
        Ok(self.engine.record_response(&mut memory, response))
    }

    /// Drop a session. Returns whether it existed.
    pub async fn reset(&self, session_id: &str) -> bool {
        let removed = self.sessions.lock().await.remove(session_id).is_some();
        if removed {
            tracing::debug!("Session {session_id} reset");
        }
        removed
    }

    /// Remove sessions idle for longer than the configured limit. A limit of
    /// zero disables eviction. Sessions mid-turn are left alone.
    pub async fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        if self.max_idle_secs == 0 {
            return 0;
        }
        let limit = i64::try_from(self.max_idle_secs).unwrap_or(i64::MAX);

        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, slot| match slot.try_lock() {
            Ok(memory) => (now - memory.last_active).num_seconds() <= limit,
            Err(_) => true,
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!("Evicted {evicted} idle session(s)");
        }
        evicted
    }

    /// Serialize a session's memory to JSON.
    pub async fn snapshot(&self, session_id: &str) -> slotwise_core::Result<String> {
        let slot = self.slot(session_id).await?;
        let memory = slot.lock().await;
        memory.to_snapshot()
    }

    /// Replace (or create) a session from a JSON snapshot. A malformed
    /// snapshot leaves any existing session untouched.
    pub async fn restore(&self, session_id: &str, json: &str) -> Result<(), EngineError> {
        let memory = DialogMemory::from_snapshot(json)?;
        self.sessions
            .lock()
            .await
            .insert(session_id.to_string(), Arc::new(Mutex::new(memory)));
        tracing::debug!("Session {session_id} restored");
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    async fn slot(&self, session_id: &str) -> Result<SessionSlot, EngineError> {
        self.sessions
            .lock()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownSession(session_id.to_string()))
    }

    async fn is_current(&self, session_id: &str, slot: &SessionSlot) -> bool {
        self.sessions
            .lock()
            .await
            .get(session_id)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
    }

    async fn slot_or_create(&self, session_id: &str) -> SessionSlot {
        self.sessions
            .lock()
            .await
            .entry(session_id.to_string())
            .or_insert_with(|| {
                tracing::debug!("Session {session_id} created");
                Arc::new(Mutex::new(DialogMemory::new()))
            })
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use slotwise_config::{EngineConfig, ScenarioGraph, SlotTable};

    fn store(max_idle_secs: u64) -> SessionStore {
        let mut config = EngineConfig::default();
        config.session.max_idle_secs = max_idle_secs;
        let engine = DialogEngine::new(config, ScenarioGraph::builtin(), SlotTable::builtin());
        SessionStore::new(Arc::new(engine))
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = store(0);
        store.process("a", "我被辞退了").await.unwrap();
        store.process("b", "我想离婚").await.unwrap();
        assert_eq!(store.len().await, 2);

        let a = DialogMemory::from_snapshot(&store.snapshot("a").await.unwrap()).unwrap();
        let b = DialogMemory::from_snapshot(&store.snapshot("b").await.unwrap()).unwrap();
        assert_eq!(a.slot(slotwise_core::SlotKey::LegalDomain), Some("labor"));
        assert_eq!(b.slot(slotwise_core::SlotKey::LegalDomain), Some("marriage"));
    }

    #[tokio::test]
    async fn unknown_session_is_reported() {
        let store = store(0);
        let err = store.record_response("ghost", "hi").await.unwrap_err();
        assert!(matches!(err, EngineError::UnknownSession(id) if id == "ghost"));
        let err = store.snapshot("ghost").await.unwrap_err();
        assert!(matches!(
            err,
            slotwise_core::Error::Engine(EngineError::UnknownSession(_))
        ));
        assert!(!store.reset("ghost").await);
    }

    #[tokio::test]
    async fn idle_sessions_are_evicted() {
        let store = store(60);
        store.process("a", "你好").await.unwrap();
        assert_eq!(store.evict_idle(Utc::now()).await, 0);
        assert_eq!(store.evict_idle(Utc::now() + Duration::seconds(120)).await, 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn zero_limit_never_evicts() {
        let store = store(0);
        store.process("a", "你好").await.unwrap();
        assert_eq!(store.evict_idle(Utc::now() + Duration::days(30)).await, 0);
    }

    #[tokio::test]
    async fn turn_waiting_on_a_dropped_session_lands_in_the_live_one() {
        let store = Arc::new(store(60));
        store.process("a", "你好").await.unwrap();

        // Hold the session as a running turn would.
        let stale = store.slot("a").await.unwrap();
        let guard = stale.lock().await;

        let task = tokio::spawn({
            let store = store.clone();
            async move { store.process("a", "我被辞退了").await }
        });
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }

        // The entry goes away while the queued turn still holds the old handle.
        store.sessions.lock().await.remove("a");
        drop(guard);

        let outcome = task.await.unwrap().unwrap();
        assert!(outcome.directive.is_ask());
        let memory = DialogMemory::from_snapshot(&store.snapshot("a").await.unwrap()).unwrap();
        assert_eq!(memory.domain_slot(), Some(slotwise_core::LegalDomain::Labor));
        assert_eq!(memory.turn_count, 1);
    }

    #[tokio::test]
    async fn busy_session_survives_eviction() {
        let store = store(60);
        store.process("a", "你好").await.unwrap();
        let slot = store.slot("a").await.unwrap();
        let _turn = slot.lock().await;
        assert_eq!(store.evict_idle(Utc::now() + Duration::seconds(120)).await, 0);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn malformed_restore_keeps_existing_session() {
        let store = store(0);
        store.process("a", "我被辞退了").await.unwrap();
        let err = store.restore("a", "{not json").await.unwrap_err();
        assert!(matches!(err, EngineError::MalformedSnapshot(_)));
        let memory = DialogMemory::from_snapshot(&store.snapshot("a").await.unwrap()).unwrap();
        assert_eq!(memory.turn_count, 1);
    }
}
