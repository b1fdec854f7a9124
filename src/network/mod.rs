//! Network module: cluster transport for phase messages.
//!
//! Delivery is best-effort and fire-and-forget: unreachable peers are logged
//! and skipped, never surfaced to the consensus core. The quorum thresholds
//! already tolerate up to f silent peers, so the transport makes no delivery
//! or retry promises beyond per-peer reconnection.

pub mod cluster;
pub mod listener;
pub mod message;

pub use cluster::ClusterNet;
pub use listener::start_listener;
pub use message::{HelloMsg, WireMessage};
