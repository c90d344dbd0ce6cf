//! wapair-core: Core library for pairing WhatsApp gateway sessions
//!
//! This crate drives a gateway session from creation to authentication:
//!
//! - **Gateway access** - [`GatewayClient`] trait with [`HttpGateway`] and [`MockGateway`]
//! - **Session registry** - [`Session`] and [`SessionStore`] for session metadata and state
//! - **Polling** - [`poller::PollLoop`], one cancellable state poller per session
//! - **Lifecycle** - [`LifecycleManager`] orchestrating pairing, polling and teardown
//! - **Notifications** - [`NotificationSink`] and [`StatusRecorder`] for lifecycle events
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use wapair_core::{HttpGateway, LifecycleManager, WapairConfig};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = WapairConfig::default();
//!     let gateway = Arc::new(HttpGateway::new(&config.gateway)?);
//!     let manager = LifecycleManager::builder(gateway)
//!         .poll_config(config.polling.clone())
//!         .build();
//!
//!     let (id, artifact) = manager.connect("shop1", "http://localhost:3020").await?;
//!     println!("Scan the QR code for connection {id}: {} bytes", artifact.as_str().len());
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                LifecycleManager                  │
//! │  ┌──────────────┐   reports   ┌───────────────┐  │
//! │  │ SessionStore │ ◄────────── │ PollLoop × N  │  │
//! │  └──────────────┘  (observer) └───────┬───────┘  │
//! │          │                            │          │
//! │          ▼                            ▼          │
//! │  NotificationSink             GatewayClient      │
//! └──────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod notifications;
pub mod poller;
pub mod session;

// Re-export key types for convenience
pub use config::{GatewayConfig, GatewayPaths, PollConfig, RecordConfig, WapairConfig};
pub use error::{ConfigError, GatewayError, LifecycleError, RecordError, StoreError};
pub use gateway::{CreatedInstance, GatewayClient, HttpGateway, MockGateway};
pub use lifecycle::{LifecycleManager, LifecycleManagerBuilder};
pub use notifications::{
    BroadcastNotifier, HttpStatusRecorder, LifecycleEvent, NotificationSink, StatusRecorder,
    TracingNotifier,
};
pub use poller::{ErrorStreak, Observation, PollHandle, PollLoop};
pub use session::{
    FailureReason, PairingArtifact, Session, SessionId, SessionList, SessionState, SessionStore,
};
