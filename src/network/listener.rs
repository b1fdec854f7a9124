//! Inbound side of the peer transport.
//!
//! Accepts peer connections, checks the signed `Hello` frame, then forwards
//! every consensus frame to the node dispatcher. Malformed frames or a
//! failed handshake cost the connection, nothing more.

use anyhow::Result;
use futures::StreamExt;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::{info, warn};

use crate::consensus::PhaseMessage;
use crate::network::message::WireMessage;

/// Where the listener delivers inbound phase messages.
pub type InboundSender = mpsc::UnboundedSender<PhaseMessage>;

/// Bind `addr` and accept peer connections until the process exits.
/// Returns the bound address once the listener socket is up.
pub async fn start_listener(addr: &str, inbound_tx: InboundSender) -> Result<SocketAddr> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!("listening for cluster peers on {}", local_addr);
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    let inbound = inbound_tx.clone();
                    tokio::spawn(async move {
                        if let Err(e) = serve_peer(stream, inbound).await {
                            warn!("peer connection {} closed: {}", peer_addr, e);
                        }
                    });
                }
                Err(e) => {
                    warn!("accept failed: {}", e);
                }
            }
        }
    });
    Ok(local_addr)
}

async fn serve_peer(stream: TcpStream, inbound: InboundSender) -> Result<()> {
    let mut framed = Framed::new(stream, LengthDelimitedCodec::new());

    // first frame must be a verifiable Hello
    let first = framed
        .next()
        .await
        .ok_or_else(|| anyhow::anyhow!("closed before handshake"))??;
    match bincode::deserialize::<WireMessage>(&first)? {
        WireMessage::Hello(hello) => {
            hello.verify()?;
            info!(
                "peer {} identified (key {}...)",
                hello.node_id,
                &hello.public_key[..8.min(hello.public_key.len())],
            );
        }
        _ => anyhow::bail!("expected Hello as first frame"),
    }

    while let Some(frame) = framed.next().await {
        let frame = frame?;
        match bincode::deserialize::<WireMessage>(&frame) {
            Ok(WireMessage::Consensus(msg)) => {
                if inbound.send(msg).is_err() {
                    // dispatcher gone, node is shutting down
                    return Ok(());
                }
            }
            Ok(WireMessage::Hello(_)) => {
                warn!("ignoring repeated Hello frame");
            }
            Err(e) => {
                warn!("undecodable frame from peer: {}", e);
            }
        }
    }
    Ok(())
}
