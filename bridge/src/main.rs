use anyhow::Context;
use clap::Parser;
use gui_bridge::bridge::serve;
use gui_bridge::state::BridgeState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::BridgeConfig;

mod gui_bridge;
mod repository;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Development bridge host for the cyclone dashboard")]
struct Args {
    /// Load the bridge config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Data root holding database/, gis/ and historical/
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,
    #[arg(long, default_value = "127.0.0.1:9000")]
    bind: SocketAddr,
    /// Delay between scripted analysis phases, in milliseconds
    #[arg(long, default_value_t = 800)]
    phase_ms: u64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = if let Some(path) = args.config {
        BridgeConfig::load(path)?
    } else {
        BridgeConfig::from_args(args.bind, &args.data_dir, args.phase_ms)
    };

    let state = Arc::new(BridgeState::from_config(&config).context("loading bridge data")?);
    let runtime = TokioBuilder::new_multi_thread()
        .enable_all()
        .build()
        .context("creating runtime for the bridge")?;
    runtime.block_on(async move {
        let shutdown = async {
            if let Err(err) = signal::ctrl_c().await {
                log::error!("awaiting Ctrl+C: {}", err);
            }
        };
        println!("Bridge running on http://{} (Ctrl+C to stop)...", config.bind);
        serve(state, config.bind, shutdown).await
    })
}
