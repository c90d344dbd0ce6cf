//! Per-session gateway state polling
//!
//! A [`PollLoop`] queries the gateway on a fixed interval until the session
//! is authenticated, the error streak runs out, or the loop is cancelled. It
//! never touches the session store: its single terminal observation is sent
//! to the lifecycle manager as a [`LoopReport`].

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::PollConfig;
use crate::gateway::GatewayClient;
use crate::session::{FailureReason, SessionId};

/// Counts consecutive poll failures against a limit
#[derive(Debug)]
pub struct ErrorStreak {
    consecutive: u32,
    limit: u32,
}

impl ErrorStreak {
    /// A limit of zero is treated as one
    pub fn new(limit: u32) -> Self {
        Self {
            consecutive: 0,
            limit: limit.max(1),
        }
    }

    /// Record a failure; returns `true` once the limit is reached
    pub fn record_failure(&mut self) -> bool {
        self.consecutive = self.consecutive.saturating_add(1);
        self.is_exhausted()
    }

    /// Reset after a successful poll
    pub fn reset(&mut self) {
        self.consecutive = 0;
    }

    pub fn is_exhausted(&self) -> bool {
        self.consecutive >= self.limit
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }
}

/// Terminal outcome of a poll loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    Authenticated,
    Failed(FailureReason),
}

/// Observation tagged with the loop that produced it
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LoopReport {
    pub(crate) id: SessionId,
    pub(crate) generation: u64,
    pub(crate) observation: Observation,
}

/// Polling task for one session
pub struct PollLoop {
    id: SessionId,
    endpoint: String,
    gateway: Arc<dyn GatewayClient>,
    config: PollConfig,
    token: CancellationToken,
}

impl PollLoop {
    pub fn new(
        id: SessionId,
        endpoint: impl Into<String>,
        gateway: Arc<dyn GatewayClient>,
        config: PollConfig,
        token: CancellationToken,
    ) -> Self {
        Self {
            id,
            endpoint: endpoint.into(),
            gateway,
            config,
            token,
        }
    }

    /// Poll until a terminal outcome
    ///
    /// Returns `None` when cancelled. Cancellation is checked while waiting
    /// for the next tick and before each poll; an in-flight poll is allowed
    /// to complete.
    pub async fn run(&self) -> Option<Observation> {
        let mut streak = ErrorStreak::new(self.config.max_consecutive_errors);

        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => return None,
                _ = tokio::time::sleep(self.config.interval()) => {}
            }

            if self.token.is_cancelled() {
                return None;
            }

            match self.gateway.poll_state(&self.endpoint, self.id).await {
                Ok(state) if state == self.config.success_token => {
                    info!(session_id = %self.id, "Gateway reports session open");
                    return Some(Observation::Authenticated);
                }
                Ok(state) => {
                    streak.reset();
                    debug!(session_id = %self.id, state = %state, "Waiting for scan");
                }
                Err(e) => {
                    let exhausted = streak.record_failure();
                    warn!(
                        session_id = %self.id,
                        failures = streak.consecutive(),
                        error = %e,
                        "Poll failed"
                    );
                    if exhausted {
                        return Some(Observation::Failed(FailureReason::PollError(e.to_string())));
                    }
                }
            }
        }
    }

    /// Run on a new task, reporting the terminal observation on `reports`
    pub(crate) fn spawn(
        self,
        generation: u64,
        reports: mpsc::UnboundedSender<LoopReport>,
    ) -> PollHandle {
        let token = self.token.clone();

        let task = tokio::spawn(async move {
            let id = self.id;
            debug!(session_id = %id, generation, "Poll loop started");

            match self.run().await {
                // Ticking has stopped; report unless cancelled meanwhile
                Some(observation) if !self.token.is_cancelled() => {
                    let report = LoopReport {
                        id,
                        generation,
                        observation,
                    };
                    if reports.send(report).is_err() {
                        warn!(session_id = %id, "Observation channel closed, dropping report");
                    }
                }
                Some(_) | None => {
                    debug!(session_id = %id, generation, "Poll loop cancelled");
                }
            }
        });

        PollHandle {
            generation,
            token,
            task,
        }
    }
}

/// Ownership token for a running poll loop
#[derive(Debug)]
pub struct PollHandle {
    generation: u64,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Cancel the loop and wait until its task has exited
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.task.await
            && e.is_panic()
        {
            error!(generation = self.generation, "Poll loop panicked: {}", e);
        }
    }
}
