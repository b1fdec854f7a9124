//! Client-facing HTTP API: vote intake and chain inspection.

pub mod server;

pub use server::{serve, ApiContext};
