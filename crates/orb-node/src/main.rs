//! `orb-node` binary: CLI entry point around the [`orb_node::Node`] library.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use orb_node::config::NodeConfig;
use orb_node::Node;

/// Federation node: anchors linked data under watch of a transparency-log
/// monitor, per spec.md's OVERVIEW.
#[derive(Parser)]
#[command(name = "orb-node", version = env!("CARGO_PKG_VERSION"), about = "Federation anchor-publishing node")]
struct Cli {
    /// Path to an optional config file (without extension; `config` crate
    /// resolves `.toml`/`.yaml`/`.json` automatically).
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = NodeConfig::load(cli.config.as_deref())?;

    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_new(&config.log_filter)?).init();

    let node = Node::new(&config).await?;
    node.run(config.tick_interval()).await
}
