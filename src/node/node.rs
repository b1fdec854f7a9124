//! Node wiring: ledger, consensus engine, transport, intake, API.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info};

use crate::consensus::{ConsensusEngine, PhaseMessage};
use crate::crypto::NodeKeypair;
use crate::ledger::Ledger;
use crate::network::{start_listener, ClusterNet, HelloMsg};
use crate::node::config::NodeConfig;
use crate::node::service_handle::ServiceHandle;
use crate::rpc::ApiContext;
use crate::voting::VotePool;

pub struct Node {
    cfg: NodeConfig,
}

impl Node {
    pub fn new(cfg: NodeConfig) -> Self {
        Self { cfg }
    }

    /// Start every subsystem and return a handle for graceful shutdown.
    pub async fn start(self) -> Result<ServiceHandle> {
        let cfg = self.cfg;
        let (mut svc, mut shutdown_rx) = ServiceHandle::new();

        let keypair = NodeKeypair::load_or_generate(cfg.key_file())?;
        info!(
            "node {} starting (primary: {}, cluster size {}, f = {}, identity {})",
            cfg.node_id,
            cfg.primary,
            cfg.cluster_size(),
            cfg.fault_bound(),
            &keypair.public_hex()[..8],
        );

        let mut ledger = Ledger::new();
        ledger.initialize();
        let ledger = Arc::new(Mutex::new(ledger));

        // outbound transport: one writer task per peer
        let hello = HelloMsg::signed(&keypair, cfg.node_id);
        let net = ClusterNet::spawn(cfg.node_id, &cfg.peer_table(), hello);

        let engine = Arc::new(ConsensusEngine::new(
            cfg.node_id,
            cfg.cluster_size(),
            ledger.clone(),
            net,
        ));

        // inbound transport feeding the dispatcher
        let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel::<PhaseMessage>();
        start_listener(&cfg.listen_addr, inbound_tx)
            .await
            .context("binding cluster listener")?;

        // dispatcher: the single entry point into the consensus engine for
        // peer messages
        {
            let engine = engine.clone();
            let node_id = cfg.node_id;
            svc.attach(tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = shutdown_rx.changed() => {
                            info!("node {}: dispatcher shutting down", node_id);
                            return;
                        }
                        msg = inbound_rx.recv() => {
                            match msg {
                                Some(msg) => {
                                    let status = engine.handle_message(msg).await;
                                    debug!("node {}: handler status {:?}", node_id, status);
                                }
                                None => return,
                            }
                        }
                    }
                }
            }));
        }

        // client-facing HTTP API
        {
            let ctx = Arc::new(ApiContext {
                node_id: cfg.node_id,
                is_primary: cfg.primary,
                engine,
                ledger,
                pool: Arc::new(VotePool::new(cfg.batch_size, cfg.pool_capacity)),
            });
            let rpc_addr = cfg.rpc_addr.parse().context("parsing rpc_addr")?;
            svc.attach(tokio::spawn(async move {
                if let Err(e) = crate::rpc::serve(rpc_addr, ctx).await {
                    error!("API server failed: {}", e);
                }
            }));
        }

        Ok(svc)
    }
}
