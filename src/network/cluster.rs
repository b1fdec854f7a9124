//! ClusterNet: outbound side of the peer transport.
//!
//! One writer task per peer owns the TCP connection, reconnecting with
//! exponential backoff. `send_all` fans a message out to every peer's queue
//! and never blocks; a full queue or a dead peer costs only a warning.

use bytes::Bytes;
use dashmap::DashMap;
use futures::SinkExt;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::{debug, info, warn};

use crate::consensus::{NodeId, PhaseBroadcaster, PhaseMessage};
use crate::network::message::{HelloMsg, WireMessage};
use crate::utils::metrics::{counters, METRICS};

/// Per-peer outbound queue capacity.
const PEER_QUEUE_CAP: usize = 1024;

const INITIAL_BACKOFF_MS: u64 = 200;
const MAX_BACKOFF_MS: u64 = 10_000;

pub struct ClusterNet {
    self_id: NodeId,
    peers: DashMap<NodeId, mpsc::Sender<WireMessage>>,
}

impl ClusterNet {
    /// Spawn a writer task per peer. `peer_table` maps node id to address
    /// and must not contain self.
    pub fn spawn(self_id: NodeId, peer_table: &HashMap<NodeId, String>, hello: HelloMsg) -> Arc<Self> {
        let net = Arc::new(Self {
            self_id,
            peers: DashMap::new(),
        });
        for (&peer_id, addr) in peer_table {
            let (tx, rx) = mpsc::channel(PEER_QUEUE_CAP);
            net.peers.insert(peer_id, tx);
            tokio::spawn(peer_writer(
                self_id,
                peer_id,
                addr.clone(),
                rx,
                hello.clone(),
            ));
        }
        net
    }

    /// Queue `msg` for every peer, best-effort.
    pub fn send_all(&self, msg: WireMessage) {
        for entry in self.peers.iter() {
            if entry.value().try_send(msg.clone()).is_err() {
                warn!(
                    "node {}: dropping message for peer {} (queue full or writer gone)",
                    self.self_id,
                    entry.key(),
                );
                METRICS.inc(counters::BROADCAST_FAILURES);
            }
        }
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }
}

impl PhaseBroadcaster for ClusterNet {
    fn broadcast(&self, msg: PhaseMessage) {
        self.send_all(WireMessage::Consensus(msg));
    }
}

/// Owns the connection to one peer for the life of the node. Messages queued
/// while the peer is unreachable are delivered after reconnect; messages that
/// fail mid-write are dropped (quorum math absorbs the loss).
async fn peer_writer(
    self_id: NodeId,
    peer_id: NodeId,
    addr: String,
    mut rx: mpsc::Receiver<WireMessage>,
    hello: HelloMsg,
) {
    let mut backoff = INITIAL_BACKOFF_MS;
    loop {
        match TcpStream::connect(&addr).await {
            Ok(stream) => {
                let mut framed = Framed::new(stream, LengthDelimitedCodec::new());
                if write_frame(&mut framed, &WireMessage::Hello(hello.clone()))
                    .await
                    .is_err()
                {
                    warn!("node {}: handshake write to peer {} failed", self_id, peer_id);
                } else {
                    info!("node {}: connected to peer {} at {}", self_id, peer_id, addr);
                    backoff = INITIAL_BACKOFF_MS;
                    loop {
                        match rx.recv().await {
                            Some(msg) => {
                                if write_frame(&mut framed, &msg).await.is_err() {
                                    warn!(
                                        "node {}: write to peer {} failed, reconnecting",
                                        self_id, peer_id,
                                    );
                                    METRICS.inc(counters::BROADCAST_FAILURES);
                                    break;
                                }
                            }
                            // node shut down, queue closed
                            None => return,
                        }
                    }
                }
            }
            Err(e) => {
                debug!(
                    "node {}: connect to peer {} at {} failed: {}",
                    self_id, peer_id, addr, e,
                );
            }
        }
        sleep(Duration::from_millis(backoff)).await;
        backoff = (backoff * 2).min(MAX_BACKOFF_MS);
    }
}

async fn write_frame<M: Serialize>(
    framed: &mut Framed<TcpStream, LengthDelimitedCodec>,
    msg: &M,
) -> anyhow::Result<()> {
    let bin = bincode::serialize(msg)?;
    framed.send(Bytes::from(bin)).await?;
    Ok(())
}
