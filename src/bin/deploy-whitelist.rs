//! Deploys the Whitelist contract and prints its address.
//!
//! Exits 0 on success and 1 on any error.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use whitelist_dapp::blockchain::deploy::deploy_whitelist;
use whitelist_dapp::config::load_or_default;
use whitelist_dapp::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "deploy-whitelist")]
#[command(about = "Deploy the Whitelist contract", long_about = None)]
struct Cli {
    /// Configuration file (TOML).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the JSON-RPC endpoint.
    #[arg(long)]
    rpc_url: Option<String>,

    /// Override the compiled contract artifact.
    #[arg(long)]
    artifact: Option<String>,

    /// Whitelist capacity passed to the constructor.
    #[arg(long)]
    max_addresses: Option<u64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(rpc_url) = cli.rpc_url {
        config.network.rpc_url = rpc_url;
    }
    if let Some(artifact) = cli.artifact {
        config.whitelist.artifact_path = artifact;
    }
    if let Some(max) = cli.max_addresses {
        config.whitelist.max_whitelisted_addresses = max;
    }

    init_logging(&config.observability);

    match deploy_whitelist(&config).await {
        Ok(address) => {
            println!("Whitelist Contract Address: {}", address);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
