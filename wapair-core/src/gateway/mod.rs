//! Gateway access
//!
//! [`GatewayClient`] abstracts the three gateway calls; [`HttpGateway`] talks
//! to a real gateway and [`MockGateway`] replays scripted results.

pub mod client;
pub mod mock;
pub mod traits;
pub mod types;

pub use client::HttpGateway;
pub use mock::MockGateway;
pub use traits::{CreatedInstance, GatewayClient};
