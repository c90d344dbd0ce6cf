//! Session lifecycle management
//!
//! LifecycleManager is the single writer of the session store. It creates
//! sessions, requests their pairing artifacts, supervises one poll loop per
//! session and applies the loops' terminal observations.
//!
//! # Ordering
//!
//! Every operation on a session runs under that session's operation lock.
//! Poll loops never take the lock: they report through an unbounded channel
//! drained by an observer task, so a manager call can always await a loop's
//! stop while holding the lock. Pairing is the only operation that spawns a
//! loop and it runs once per session. A loop's stop is awaited before the
//! session leaves its non-terminal state or is removed, and reports from a
//! loop generation that is no longer attached are discarded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::PollConfig;
use crate::error::{LifecycleError, StoreError};
use crate::gateway::GatewayClient;
use crate::notifications::{LifecycleEvent, NotificationSink, StatusRecorder, TracingNotifier};
use crate::poller::{LoopReport, Observation, PollLoop};
use crate::session::{
    FailureReason, PairingArtifact, Session, SessionId, SessionList, SessionState, SessionStore,
};

/// Builder for [`LifecycleManager`]
pub struct LifecycleManagerBuilder {
    gateway: Arc<dyn GatewayClient>,
    sink: Option<Arc<dyn NotificationSink>>,
    recorder: Option<Arc<dyn StatusRecorder>>,
    poll_config: PollConfig,
}

impl LifecycleManagerBuilder {
    /// Sink receiving lifecycle events (logs them by default)
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Recorder invoked when a session becomes authenticated
    #[must_use]
    pub fn recorder(mut self, recorder: Arc<dyn StatusRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Poll interval, error limit and success token
    #[must_use]
    pub fn poll_config(mut self, config: PollConfig) -> Self {
        self.poll_config = config;
        self
    }

    /// Build the manager and start its observer task
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build(self) -> LifecycleManager {
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(Inner {
            store: SessionStore::new(),
            gateway: self.gateway,
            sink: self.sink.unwrap_or_else(|| Arc::new(TracingNotifier)),
            recorder: self.recorder,
            poll_config: self.poll_config,
            reports: reports_tx,
            shutdown: CancellationToken::new(),
            next_generation: AtomicU64::new(1),
        });

        tokio::spawn(observe(Arc::downgrade(&inner), reports_rx));

        LifecycleManager { inner }
    }
}

/// Orchestrates session creation, pairing, polling and teardown
#[derive(Clone)]
pub struct LifecycleManager {
    inner: Arc<Inner>,
}

struct Inner {
    store: SessionStore,
    gateway: Arc<dyn GatewayClient>,
    sink: Arc<dyn NotificationSink>,
    recorder: Option<Arc<dyn StatusRecorder>>,
    poll_config: PollConfig,
    reports: mpsc::UnboundedSender<LoopReport>,
    /// Parent of every poll loop token
    shutdown: CancellationToken,
    next_generation: AtomicU64,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl LifecycleManager {
    pub fn builder(gateway: Arc<dyn GatewayClient>) -> LifecycleManagerBuilder {
        LifecycleManagerBuilder {
            gateway,
            sink: None,
            recorder: None,
            poll_config: PollConfig::default(),
        }
    }

    /// Create a session on `gateway_endpoint`
    ///
    /// The store is left untouched when the gateway call fails.
    pub async fn create_session(
        &self,
        name: &str,
        gateway_endpoint: &str,
    ) -> Result<SessionId, LifecycleError> {
        if self.inner.shutdown.is_cancelled() {
            return Err(LifecycleError::ShutDown);
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(LifecycleError::Validation(
                "connection name must not be empty".to_string(),
            ));
        }
        validate_endpoint(gateway_endpoint)?;

        let created = self
            .inner
            .gateway
            .create_instance(gateway_endpoint, name)
            .await
            .map_err(|e| {
                warn!(gateway = gateway_endpoint, error = %e, "Failed to create instance");
                LifecycleError::from(e)
            })?;

        let id = created.id;
        self.inner
            .store
            .insert(Session::new(id, name, gateway_endpoint))
            .await?;

        info!(
            session_id = %id,
            gateway = gateway_endpoint,
            status = %created.status,
            "Session created"
        );
        self.inner
            .sink
            .notify(LifecycleEvent::Created {
                id,
                gateway_endpoint: gateway_endpoint.to_string(),
            })
            .await;

        Ok(id)
    }

    /// Fetch the pairing artifact of a `Created` session and start polling
    ///
    /// Fails with `ShutDown` once [`shutdown`](Self::shutdown) has run. A
    /// shutdown that lands while the artifact is being fetched marks the
    /// session failed.
    pub async fn begin_pairing(&self, id: SessionId) -> Result<PairingArtifact, LifecycleError> {
        let inner = &self.inner;
        let lock = inner
            .store
            .op_lock(id)
            .await
            .ok_or(LifecycleError::NotFound(id))?;
        let guard = lock.lock().await;
        if inner.shutdown.is_cancelled() {
            return Err(LifecycleError::ShutDown);
        }

        let endpoint = inner
            .store
            .update(id, |record| {
                let state = record.session.state();
                if *state != SessionState::Created {
                    return Err(LifecycleError::InvalidState {
                        expected: SessionState::Created.name().to_string(),
                        actual: state.name().to_string(),
                    });
                }
                record.session.transition(SessionState::PairingRequested)?;
                Ok(record.session.gateway_endpoint().to_string())
            })
            .await??;

        let artifact = match inner.gateway.request_pairing(&endpoint, id).await {
            Ok(artifact) => artifact,
            Err(e) => {
                let reason = FailureReason::PairingUnavailable(e.to_string());
                inner
                    .store
                    .update(id, |record| {
                        record.session.transition(SessionState::Failed {
                            reason: reason.clone(),
                        })
                    })
                    .await??;
                drop(guard);

                warn!(session_id = %id, error = %e, "Pairing failed");
                inner.sink.notify(LifecycleEvent::Failed { id, reason }).await;
                return Err(LifecycleError::PairingUnavailable(e.to_string()));
            }
        };

        inner
            .store
            .update(id, |record| {
                record.session.transition(SessionState::AwaitingScan)?;
                record.session.set_pairing_artifact(artifact.clone());
                Ok::<_, LifecycleError>(())
            })
            .await??;

        inner.start_polling(id, endpoint).await?;

        // Shutdown may have drained the store before this loop was attached
        if inner.shutdown.is_cancelled() {
            let reason =
                FailureReason::PairingUnavailable("lifecycle manager shut down".to_string());
            let handle = inner
                .store
                .update(id, |record| {
                    record.session.transition(SessionState::Failed {
                        reason: reason.clone(),
                    })?;
                    Ok::<_, LifecycleError>(record.take_poll())
                })
                .await??;
            if let Some(handle) = handle {
                handle.stop().await;
            }
            drop(guard);

            warn!(session_id = %id, "Pairing interrupted by shutdown");
            inner.sink.notify(LifecycleEvent::Failed { id, reason }).await;
            return Err(LifecycleError::ShutDown);
        }
        drop(guard);

        info!(session_id = %id, "Awaiting scan");
        inner.sink.notify(LifecycleEvent::AwaitingScan { id }).await;
        Ok(artifact)
    }

    /// Create a session and immediately begin pairing it
    pub async fn connect(
        &self,
        name: &str,
        gateway_endpoint: &str,
    ) -> Result<(SessionId, PairingArtifact), LifecycleError> {
        let id = self.create_session(name, gateway_endpoint).await?;
        let artifact = self.begin_pairing(id).await?;
        Ok((id, artifact))
    }

    /// Cancel a session that has not reached a terminal state
    ///
    /// Stops the poll loop, waits for it to exit, then removes the session.
    /// Cancelling an unknown id is a no-op.
    pub async fn cancel(&self, id: SessionId) -> Result<(), LifecycleError> {
        let inner = &self.inner;
        let Some(lock) = inner.store.op_lock(id).await else {
            debug!(session_id = %id, "Cancel for unknown session ignored");
            return Ok(());
        };
        let guard = lock.lock().await;

        let poll = match inner
            .store
            .update(id, |record| {
                let state = record.session.state();
                if state.is_terminal() {
                    return Err(LifecycleError::InvalidState {
                        expected: "a non-terminal state".to_string(),
                        actual: state.name().to_string(),
                    });
                }
                record.session.transition(SessionState::Cancelled)?;
                Ok(record.take_poll())
            })
            .await
        {
            Ok(result) => result?,
            // Removed while we waited for the lock
            Err(StoreError::NotFound(_)) => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        if let Some(handle) = poll {
            handle.stop().await;
        }
        inner.store.remove(id).await;
        drop(guard);

        info!(session_id = %id, "Session cancelled");
        inner.sink.notify(LifecycleEvent::Cancelled { id }).await;
        Ok(())
    }

    /// Remove a session that ended in `Failed`
    pub async fn dismiss_failed(&self, id: SessionId) -> Result<(), LifecycleError> {
        self.inner
            .remove_terminal(id, "Failed", |state| {
                matches!(state, SessionState::Failed { .. })
            })
            .await
    }

    /// Remove a session that reached `Authenticated`
    pub async fn remove_authenticated(&self, id: SessionId) -> Result<(), LifecycleError> {
        self.inner
            .remove_terminal(id, "Authenticated", |state| {
                *state == SessionState::Authenticated
            })
            .await
    }

    /// Snapshot of one session
    pub async fn session(&self, id: SessionId) -> Option<Session> {
        self.inner.store.get(id).await
    }

    /// Snapshot of all sessions, oldest first
    pub async fn list(&self) -> SessionList {
        self.inner.store.list().await
    }

    /// Number of sessions with an attached poll loop
    pub async fn active_loops(&self) -> usize {
        self.list().await.iter().filter(|s| s.is_polling()).count()
    }

    /// Stop every poll loop and wait for each to exit
    ///
    /// Polling cannot be restarted afterwards; sessions stay in the store.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        for (id, handle) in self.inner.store.drain_polls().await {
            debug!(session_id = %id, "Stopping poll loop for shutdown");
            handle.stop().await;
        }
        info!("Lifecycle manager shut down");
    }
}

impl Inner {
    /// Spawn and attach a poll loop; the caller holds the session lock
    async fn start_polling(&self, id: SessionId, endpoint: String) -> Result<(), LifecycleError> {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let token = self.shutdown.child_token();
        let handle = PollLoop::new(
            id,
            endpoint,
            Arc::clone(&self.gateway),
            self.poll_config.clone(),
            token.clone(),
        )
        .spawn(generation, self.reports.clone());

        match self.store.update(id, |record| record.attach_poll(handle)).await {
            Ok(()) => {
                debug!(session_id = %id, generation, "Poll loop attached");
                Ok(())
            }
            Err(e) => {
                token.cancel();
                Err(e.into())
            }
        }
    }

    /// Apply a terminal observation reported by a stopped poll loop
    pub(crate) async fn handle_loop_observation(&self, report: LoopReport) {
        let LoopReport {
            id,
            generation,
            observation,
        } = report;

        let Some(lock) = self.store.op_lock(id).await else {
            debug!(session_id = %id, generation, "Observation for removed session discarded");
            return;
        };
        let guard = lock.lock().await;

        let applied = self
            .store
            .update(id, |record| {
                if record.poll_generation() != Some(generation) {
                    return None;
                }
                let next = match &observation {
                    Observation::Authenticated => SessionState::Authenticated,
                    Observation::Failed(reason) => SessionState::Failed {
                        reason: reason.clone(),
                    },
                };
                if let Err(e) = record.session.transition(next) {
                    warn!(session_id = %id, error = %e, "Observation rejected by state machine");
                    return None;
                }
                Some((
                    record.take_poll(),
                    record.session.gateway_endpoint().to_string(),
                ))
            })
            .await;

        let Ok(Some((handle, endpoint))) = applied else {
            debug!(session_id = %id, generation, "Stale observation discarded");
            return;
        };
        if let Some(handle) = handle {
            handle.stop().await;
        }
        drop(guard);

        match observation {
            Observation::Authenticated => {
                info!(session_id = %id, "Session authenticated");
                self.sink
                    .notify(LifecycleEvent::Authenticated {
                        id,
                        status: self.poll_config.success_token.clone(),
                        gateway_endpoint: endpoint.clone(),
                    })
                    .await;

                if let Some(recorder) = &self.recorder {
                    let recorded = recorder
                        .record_open(id, &endpoint, &self.poll_config.success_token)
                        .await;
                    let event = match recorded {
                        Ok(()) => LifecycleEvent::Recorded { id },
                        Err(e) => {
                            warn!(session_id = %id, error = %e, "Failed to record open session");
                            LifecycleEvent::RecordFailed {
                                id,
                                error: e.to_string(),
                            }
                        }
                    };
                    self.sink.notify(event).await;
                }
            }
            Observation::Failed(reason) => {
                warn!(session_id = %id, reason = %reason, "Session failed");
                self.sink.notify(LifecycleEvent::Failed { id, reason }).await;
            }
        }
    }

    async fn remove_terminal(
        &self,
        id: SessionId,
        expected: &str,
        matches_state: impl Fn(&SessionState) -> bool,
    ) -> Result<(), LifecycleError> {
        let lock = self
            .store
            .op_lock(id)
            .await
            .ok_or(LifecycleError::NotFound(id))?;
        let guard = lock.lock().await;

        let session = self
            .store
            .get(id)
            .await
            .ok_or(LifecycleError::NotFound(id))?;
        if !matches_state(session.state()) {
            return Err(LifecycleError::InvalidState {
                expected: expected.to_string(),
                actual: session.state().name().to_string(),
            });
        }

        let mut record = self
            .store
            .remove(id)
            .await
            .ok_or(LifecycleError::NotFound(id))?;
        if let Some(handle) = record.take_poll() {
            handle.stop().await;
        }
        drop(guard);

        info!(session_id = %id, "Session removed");
        self.sink.notify(LifecycleEvent::Removed { id }).await;
        Ok(())
    }
}

/// Drain loop reports, applying each on its own task
///
/// Holds only a weak reference so dropping the manager ends the task.
async fn observe(inner: Weak<Inner>, mut reports: mpsc::UnboundedReceiver<LoopReport>) {
    while let Some(report) = reports.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        tokio::spawn(async move {
            inner.handle_loop_observation(report).await;
        });
    }
    debug!("Observation channel closed");
}

fn validate_endpoint(endpoint: &str) -> Result<(), LifecycleError> {
    if endpoint.trim().is_empty() {
        return Err(LifecycleError::Validation(
            "a gateway endpoint must be selected".to_string(),
        ));
    }

    let url = Url::parse(endpoint).map_err(|e| {
        LifecycleError::Validation(format!("invalid gateway endpoint '{endpoint}': {e}"))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(LifecycleError::Validation(format!(
            "gateway endpoint must use http or https, got '{}'",
            url.scheme()
        )));
    }
    Ok(())
}
