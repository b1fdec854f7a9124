use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    ballotchain::node::cli::run_cli().await
}
