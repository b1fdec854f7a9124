//! Wire-level tests: phase messages across real TCP connections.

use bytes::Bytes;
use futures::SinkExt;
use std::collections::HashMap;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use ballotchain::consensus::{PhaseBroadcaster, PhaseMessage};
use ballotchain::crypto::NodeKeypair;
use ballotchain::network::{start_listener, ClusterNet, HelloMsg, WireMessage};

#[tokio::test]
async fn phase_messages_cross_the_wire() {
    let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel();
    let addr = start_listener("127.0.0.1:0", inbound_tx).await.unwrap();

    let keypair = NodeKeypair::generate();
    let hello = HelloMsg::signed(&keypair, 1);
    let peers: HashMap<_, _> = [(0, addr.to_string())].into_iter().collect();
    let net = ClusterNet::spawn(1, &peers, hello);

    let msg = PhaseMessage::Prepare {
        view: 0,
        block_hash: "ab".repeat(32),
        sender: 1,
    };
    net.broadcast(msg.clone());

    let received = timeout(Duration::from_secs(5), inbound_rx.recv())
        .await
        .expect("message should arrive")
        .expect("channel open");
    assert_eq!(received, msg);
}

#[tokio::test]
async fn connections_without_a_valid_hello_are_dropped() {
    let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel();
    let addr = start_listener("127.0.0.1:0", inbound_tx).await.unwrap();

    // skip the handshake and send a consensus frame directly
    let stream = TcpStream::connect(addr).await.unwrap();
    let mut framed = Framed::new(stream, LengthDelimitedCodec::new());
    let msg = WireMessage::Consensus(PhaseMessage::Commit {
        view: 0,
        block_hash: "cd".repeat(32),
        sender: 2,
    });
    framed
        .send(Bytes::from(bincode::serialize(&msg).unwrap()))
        .await
        .unwrap();

    let received = timeout(Duration::from_millis(300), inbound_rx.recv()).await;
    assert!(received.is_err(), "unauthenticated frame must not be dispatched");
}

#[tokio::test]
async fn broadcast_to_unreachable_peers_is_swallowed() {
    let keypair = NodeKeypair::generate();
    let hello = HelloMsg::signed(&keypair, 0);
    // nobody listens here; delivery simply never happens
    let peers: HashMap<_, _> = [(1, "127.0.0.1:1".to_string())].into_iter().collect();
    let net = ClusterNet::spawn(0, &peers, hello);

    net.broadcast(PhaseMessage::Prepare {
        view: 0,
        block_hash: "ef".repeat(32),
        sender: 0,
    });
    // nothing to assert beyond "no panic, no error surfaced"
    tokio::time::sleep(Duration::from_millis(50)).await;
}
