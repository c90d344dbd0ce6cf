//! Scripted gateway for tests and demos
//!
//! MockGateway returns queued results in order. When a queue is empty it
//! falls back to a benign default: sequential instance ids, a fixed artifact
//! and the `"connecting"` state.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::traits::{CreatedInstance, GatewayClient};
use crate::error::GatewayError;
use crate::session::{PairingArtifact, SessionId};

/// Artifact returned when no pairing result is queued
pub const MOCK_ARTIFACT: &str = "AAA";

/// Mock implementation of GatewayClient
pub struct MockGateway {
    creates: Mutex<VecDeque<Result<CreatedInstance, GatewayError>>>,
    pairings: Mutex<VecDeque<Result<PairingArtifact, GatewayError>>>,
    polls: Mutex<VecDeque<Result<String, GatewayError>>>,
    poll_delay: Mutex<Duration>,
    pairing_delay: Mutex<Duration>,
    next_id: AtomicU64,
    pairing_calls: AtomicUsize,
    poll_calls: AtomicUsize,
    polls_in_flight: AtomicUsize,
    max_polls_in_flight: AtomicUsize,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            creates: Mutex::new(VecDeque::new()),
            pairings: Mutex::new(VecDeque::new()),
            polls: Mutex::new(VecDeque::new()),
            poll_delay: Mutex::new(Duration::ZERO),
            pairing_delay: Mutex::new(Duration::ZERO),
            next_id: AtomicU64::new(1),
            pairing_calls: AtomicUsize::new(0),
            poll_calls: AtomicUsize::new(0),
            polls_in_flight: AtomicUsize::new(0),
            max_polls_in_flight: AtomicUsize::new(0),
        }
    }

    /// Queue the result of the next `create_instance`
    pub fn queue_create(&self, result: Result<CreatedInstance, GatewayError>) {
        self.creates.lock().unwrap().push_back(result);
    }

    /// Queue a successful create with a specific id
    pub fn queue_instance(&self, id: u64, status: &str) {
        self.queue_create(Ok(CreatedInstance {
            id: SessionId::new(id),
            status: status.to_string(),
        }));
    }

    /// Queue the result of the next `request_pairing`
    pub fn queue_pairing(&self, result: Result<PairingArtifact, GatewayError>) {
        self.pairings.lock().unwrap().push_back(result);
    }

    /// Queue the result of the next `poll_state`
    pub fn queue_poll(&self, result: Result<String, GatewayError>) {
        self.polls.lock().unwrap().push_back(result);
    }

    /// Queue several successful poll states in order
    pub fn queue_poll_states(&self, states: &[&str]) {
        for state in states {
            self.queue_poll(Ok((*state).to_string()));
        }
    }

    /// Queue `count` poll failures
    pub fn queue_poll_errors(&self, count: usize) {
        for attempt in 1..=count {
            self.queue_poll(Err(GatewayError::Poll(format!(
                "connection reset (attempt {attempt})"
            ))));
        }
    }

    /// Delay every `poll_state` call, simulating a slow network
    pub fn set_poll_delay(&self, delay: Duration) {
        *self.poll_delay.lock().unwrap() = delay;
    }

    /// Delay every `request_pairing` call
    pub fn set_pairing_delay(&self, delay: Duration) {
        *self.pairing_delay.lock().unwrap() = delay;
    }

    /// Number of `request_pairing` calls started so far
    pub fn pairing_calls(&self) -> usize {
        self.pairing_calls.load(Ordering::SeqCst)
    }

    /// Number of `poll_state` calls started so far
    pub fn poll_calls(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }

    /// Highest number of `poll_state` calls that ran at the same time
    pub fn max_polls_in_flight(&self) -> usize {
        self.max_polls_in_flight.load(Ordering::SeqCst)
    }

    /// Number of queued poll results not consumed yet
    pub fn queued_polls(&self) -> usize {
        self.polls.lock().unwrap().len()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GatewayClient for MockGateway {
    async fn create_instance(
        &self,
        _endpoint: &str,
        name: &str,
    ) -> Result<CreatedInstance, GatewayError> {
        if name.trim().is_empty() {
            return Err(GatewayError::InvalidRequest(
                "instance name must not be empty".to_string(),
            ));
        }

        let scripted = self.creates.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(CreatedInstance {
                id: SessionId::new(self.next_id.fetch_add(1, Ordering::SeqCst)),
                status: "created".to_string(),
            })
        })
    }

    async fn request_pairing(
        &self,
        _endpoint: &str,
        _id: SessionId,
    ) -> Result<PairingArtifact, GatewayError> {
        self.pairing_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.pairing_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.pairings.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(PairingArtifact::new(MOCK_ARTIFACT)))
    }

    async fn poll_state(&self, _endpoint: &str, _id: SessionId) -> Result<String, GatewayError> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.polls_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_polls_in_flight
            .fetch_max(in_flight, Ordering::SeqCst);

        let delay = *self.poll_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.polls.lock().unwrap().pop_front();
        self.polls_in_flight.fetch_sub(1, Ordering::SeqCst);
        scripted.unwrap_or_else(|| Ok("connecting".to_string()))
    }
}
