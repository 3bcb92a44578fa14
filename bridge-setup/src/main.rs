//! Bootstraps a Sygma bridge test environment on a fresh chain through its sudo account.
//!
//! Usage: `bridge-setup --rpc ws://127.0.0.1:9944 [--config plan.json]`
use std::process;
use std::time::Duration;

use bridge_setup::chain::SubxtChain;
use bridge_setup::config::SetupConfig;
use bridge_setup::error::Result;
use bridge_setup::setup;
use bridge_setup::signer::{load_signer, DEFAULT_SUDO_URI};
use bridge_setup::submitter::Submitter;
use clap::Parser;
use env_logger::Env;
use log::{error, info};

/// How long to wait for the node to accept the connection.
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// CLI entrypoint
#[derive(Parser, Debug)]
#[command(
    name = "bridge-setup",
    version,
    about = "Configures the Sygma bridge pallets of a test chain through sudo"
)]
struct Cli {
    /// Node RPC endpoint
    #[arg(long, env = "PALLETWSENDPOINT", default_value = "ws://127.0.0.1:9944")]
    rpc: url::Url,

    /// MPC address (20 bytes, hex) overriding the one in the plan
    #[arg(long, env = "MPCADDR")]
    mpc_address: Option<String>,

    /// Secret URI of the sudo account
    #[arg(long, env = "SUDO_URI", default_value = DEFAULT_SUDO_URI)]
    sudo_uri: String,

    /// Hex encoded sudo secret key file, takes precedence over the URI
    #[arg(long, env = "SUDO_KEY_FILE")]
    sudo_key_file: Option<String>,

    /// JSON setup plan; the built-in test environment plan when absent
    #[arg(long, env = "SETUP_CONFIG")]
    config: Option<String>,

    /// Treat each step as done once it is in a best block instead of waiting for finality
    #[arg(long)]
    in_block_only: bool,

    /// Give up on a single transaction after this many seconds
    #[arg(long, env = "SETUP_TX_TIMEOUT_SECS")]
    tx_timeout_secs: Option<u64>,
}

impl Cli {
    /// The plan with command line overrides applied.
    fn setup_config(&self) -> Result<SetupConfig> {
        let mut config = match &self.config {
            Some(path) => SetupConfig::from_file(path)?,
            None => SetupConfig::default(),
        };

        if let Some(mpc_address) = &self.mpc_address {
            config = config.with_mpc_address(mpc_address.clone());
        }
        if self.in_block_only {
            config = config.with_wait_for_finalization(false);
        }
        if let Some(secs) = self.tx_timeout_secs {
            config = config.with_tx_timeout(Some(Duration::from_secs(secs)));
        }

        Ok(config)
    }
}

/// Runs the whole bootstrap.
async fn run(cli: Cli) -> Result<()> {
    let config = cli.setup_config()?;
    let signer = load_signer(&cli.sudo_uri, cli.sudo_key_file.as_deref()).await?;
    let chain = SubxtChain::connect(&cli.rpc, CONNECTION_TIMEOUT).await?;

    let mut submitter = Submitter::new(chain, signer).with_timeout(config.tx_timeout());
    let report = setup::run(&mut submitter, &config).await?;

    info!(
        "{} steps submitted, {} domains ready",
        report.steps.len(),
        report.ready_domains.len()
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("Bridge setup failed: {}", e);
        process::exit(1);
    }

    info!("🚀 Bridge setup is done! 🚀");
}
