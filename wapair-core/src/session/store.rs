//! In-memory session registry
//!
//! SessionStore holds one record per gateway session id. Reads are open to
//! anyone; writes are crate-private so that only the lifecycle manager can
//! mutate sessions.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use super::state::{Session, SessionId};
use crate::error::StoreError;
use crate::poller::PollHandle;

/// A session plus the resources the manager keeps for it
pub(crate) struct SessionRecord {
    pub(crate) session: Session,
    /// Active poll loop, at most one
    poll: Option<PollHandle>,
    /// Serializes manager operations on this session
    op_lock: Arc<Mutex<()>>,
    /// Insertion order, breaks `created_at` ties
    seq: u64,
}

impl SessionRecord {
    pub(crate) fn op_lock(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.op_lock)
    }

    /// Attach the session's only poll loop
    pub(crate) fn attach_poll(&mut self, handle: PollHandle) {
        debug_assert!(self.poll.is_none(), "session already has a poll loop");
        self.session.set_polling(true);
        self.poll = Some(handle);
    }

    pub(crate) fn take_poll(&mut self) -> Option<PollHandle> {
        self.session.set_polling(false);
        self.poll.take()
    }

    pub(crate) fn poll_generation(&self) -> Option<u64> {
        self.poll.as_ref().map(PollHandle::generation)
    }
}

#[derive(Default)]
struct Inner {
    records: HashMap<SessionId, SessionRecord>,
    next_seq: u64,
}

/// Registry of sessions keyed by id
#[derive(Default)]
pub struct SessionStore {
    inner: RwLock<Inner>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new session
    pub(crate) async fn insert(&self, session: Session) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let id = session.id();
        if inner.records.contains_key(&id) {
            return Err(StoreError::DuplicateId(id));
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.records.insert(
            id,
            SessionRecord {
                session,
                poll: None,
                op_lock: Arc::new(Mutex::new(())),
                seq,
            },
        );
        Ok(())
    }

    /// Apply `f` to a record under the write lock
    pub(crate) async fn update<F, R>(&self, id: SessionId, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut SessionRecord) -> R,
    {
        let mut inner = self.inner.write().await;
        let record = inner
            .records
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;
        Ok(f(record))
    }

    /// Remove a record, returning it if it existed
    pub(crate) async fn remove(&self, id: SessionId) -> Option<SessionRecord> {
        self.inner.write().await.records.remove(&id)
    }

    /// Get a snapshot of one session
    pub async fn get(&self, id: SessionId) -> Option<Session> {
        self.inner
            .read()
            .await
            .records
            .get(&id)
            .map(|record| record.session.clone())
    }

    /// Operation lock of a session, if it exists
    pub(crate) async fn op_lock(&self, id: SessionId) -> Option<Arc<Mutex<()>>> {
        self.inner
            .read()
            .await
            .records
            .get(&id)
            .map(SessionRecord::op_lock)
    }

    /// Snapshot of all sessions, oldest first
    pub async fn list(&self) -> SessionList {
        let inner = self.inner.read().await;
        let mut records: Vec<&SessionRecord> = inner.records.values().collect();
        records.sort_by_key(|record| (record.session.created_at(), record.seq));
        SessionList(records.into_iter().map(|r| r.session.clone()).collect())
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.records.is_empty()
    }

    /// Take every attached poll handle, used on shutdown
    pub(crate) async fn drain_polls(&self) -> Vec<(SessionId, PollHandle)> {
        let mut inner = self.inner.write().await;
        inner
            .records
            .iter_mut()
            .filter_map(|(id, record)| record.take_poll().map(|handle| (*id, handle)))
            .collect()
    }
}

/// Ordered snapshot returned by [`SessionStore::list`]
///
/// Iterating does not consume the snapshot, so it can be walked any number
/// of times.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionList(Vec<Session>);

impl SessionList {
    pub fn iter(&self) -> std::slice::Iter<'_, Session> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.0.iter().any(|session| session.id() == id)
    }

    pub fn ids(&self) -> Vec<SessionId> {
        self.0.iter().map(Session::id).collect()
    }
}

impl IntoIterator for SessionList {
    type Item = Session;
    type IntoIter = std::vec::IntoIter<Session>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a SessionList {
    type Item = &'a Session;
    type IntoIter = std::slice::Iter<'a, Session>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionState;

    fn session(id: u64) -> Session {
        Session::new(SessionId::new(id), format!("conn-{id}"), "http://h1")
    }

    // ==================== Insert Tests ====================

    #[tokio::test]
    async fn insert_then_get_returns_snapshot() {
        let store = SessionStore::new();
        store.insert(session(7)).await.unwrap();

        let found = store.get(SessionId::new(7)).await.unwrap();
        assert_eq!(found.name(), "conn-7");
        assert_eq!(found.state(), &SessionState::Created);
    }

    #[tokio::test]
    async fn insert_duplicate_id_fails() {
        let store = SessionStore::new();
        store.insert(session(7)).await.unwrap();

        let result = store.insert(session(7)).await;

        assert_eq!(result, Err(StoreError::DuplicateId(SessionId::new(7))));
        assert_eq!(store.len().await, 1);
    }

    // ==================== Update Tests ====================

    #[tokio::test]
    async fn update_applies_mutator() {
        let store = SessionStore::new();
        store.insert(session(7)).await.unwrap();

        store
            .update(SessionId::new(7), |record| {
                record.session.transition(SessionState::PairingRequested)
            })
            .await
            .unwrap()
            .unwrap();

        let found = store.get(SessionId::new(7)).await.unwrap();
        assert_eq!(found.state(), &SessionState::PairingRequested);
    }

    #[tokio::test]
    async fn update_missing_returns_not_found() {
        let store = SessionStore::new();

        let result = store.update(SessionId::new(1), |_| ()).await;

        assert_eq!(result, Err(StoreError::NotFound(SessionId::new(1))));
    }

    // ==================== Remove Tests ====================

    #[tokio::test]
    async fn remove_returns_record_once() {
        let store = SessionStore::new();
        store.insert(session(7)).await.unwrap();

        assert!(store.remove(SessionId::new(7)).await.is_some());
        assert!(store.remove(SessionId::new(7)).await.is_none());
        assert!(store.is_empty().await);
    }

    // ==================== List Tests ====================

    #[tokio::test]
    async fn list_orders_by_creation() {
        let store = SessionStore::new();
        for id in [30, 10, 20] {
            store.insert(session(id)).await.unwrap();
        }

        let list = store.list().await;

        let ids: Vec<u64> = list.ids().into_iter().map(SessionId::get).collect();
        assert_eq!(ids, vec![30, 10, 20]);
    }

    #[tokio::test]
    async fn list_can_be_iterated_repeatedly() {
        let store = SessionStore::new();
        store.insert(session(1)).await.unwrap();
        store.insert(session(2)).await.unwrap();

        let list = store.list().await;

        assert_eq!(list.iter().count(), 2);
        assert_eq!(list.iter().count(), 2);
        assert!(list.contains(SessionId::new(2)));
    }

    #[tokio::test]
    async fn list_is_a_snapshot() {
        let store = SessionStore::new();
        store.insert(session(1)).await.unwrap();

        let list = store.list().await;
        store.remove(SessionId::new(1)).await;

        assert_eq!(list.len(), 1);
        assert!(store.list().await.is_empty());
    }

    // ==================== Concurrency Tests ====================

    #[tokio::test]
    async fn concurrent_inserts_are_safe() {
        let store = Arc::new(SessionStore::new());
        let mut handles = vec![];

        for id in 0..10 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move { store.insert(session(id)).await }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.len().await, 10);
    }
}
