use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::crypto::NodeKeypair;
use crate::node::config::NodeConfig;
use crate::node::node::Node;
use crate::utils::init_logging;

#[derive(Parser)]
#[clap(name = "ballotchain", version, about = "BFT-replicated vote ledger node")]
pub struct Cli {
    #[clap(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand)]
pub enum Cmd {
    /// Run a node
    Run {
        /// Path to the node's TOML configuration
        #[clap(long, default_value = "node.toml")]
        config: PathBuf,

        /// Act as the proposing primary regardless of the config file
        #[clap(long)]
        primary: bool,
    },
    /// Generate an identity keypair
    Keygen {
        /// Where to write the hex-encoded secret seed
        #[clap(long, default_value = "node.key")]
        out: PathBuf,
    },
}

pub async fn run_cli() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.cmd {
        Cmd::Run { config, primary } => {
            let mut cfg = NodeConfig::load(config)?;
            if primary {
                cfg.primary = true;
            }
            let svc = Node::new(cfg).start().await?;
            tokio::signal::ctrl_c().await?;
            println!("shutting down");
            svc.shutdown().await;
            Ok(())
        }
        Cmd::Keygen { out } => {
            let kp = NodeKeypair::generate();
            kp.save(&out)?;
            println!("wrote {} (public key {})", out.display(), kp.public_hex());
            Ok(())
        }
    }
}
