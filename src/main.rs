//! Whitelist dApp client (v1)
//!
//! Connects a wallet to the deployed Whitelist contract, shows the session
//! state and joins the whitelist.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌────────────────────────────────────────────────────────────────────┐
//!   │                        WhitelistSession                            │
//!   │                                                                    │
//!   │  ┌──────────────┐   ┌──────────────┐   ┌─────────────────┐         │
//!   │  │   gateway    │──▶│  validator   │──▶│    binding      │──reads──┼──▶ JSON-RPC
//!   │  │ (one handle) │   │ (chain id)   │   │ reader / writer │         │
//!   │  └──────┬───────┘   └──────────────┘   └────────┬────────┘         │
//!   │         │                                       │ join            │
//!   │         ▼                                       ▼                 │
//!   │  ┌──────────────┐                      ┌─────────────────┐        │
//!   │  │ wallet link  │◀─────────────────────│    tracker      │        │
//!   │  │ (local key)  │    sign + broadcast  │ submit / wait   │        │
//!   │  └──────────────┘                      └─────────────────┘        │
//!   │                                                                    │
//!   │  watch: SessionSnapshot      broadcast: SessionEvent → Reconnector │
//!   └────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use whitelist_dapp::blockchain::prompt::{Approver, AutoApprove, TerminalPrompt};
use whitelist_dapp::blockchain::rpc::LocalWalletConnector;
use whitelist_dapp::blockchain::{ProviderGateway, WhitelistError};
use whitelist_dapp::config::{load_or_default, AppConfig};
use whitelist_dapp::observability::logging::init_logging;
use whitelist_dapp::session::{Reconnector, SessionSettings, WhitelistSession};

#[derive(Parser)]
#[command(name = "whitelist-dapp")]
#[command(about = "Join the Crypto Devs whitelist", long_about = None)]
struct Cli {
    /// Configuration file (TOML).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the JSON-RPC endpoint.
    #[arg(long)]
    rpc_url: Option<String>,

    /// Override the deployed contract address.
    #[arg(long)]
    contract: Option<String>,

    /// Approve wallet prompts without asking.
    #[arg(short, long)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show whitelist count and membership of the connected wallet
    Status {
        /// Connect without a signing key (count only)
        #[arg(long)]
        read_only: bool,
    },
    /// Add the connected wallet to the whitelist
    Join,
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
    if let Some(contract) = cli.contract {
        config.whitelist.contract_address = contract;
    }
    if cli.yes {
        config.wallet.auto_approve = true;
    }

    init_logging(&config.observability);
    tracing::info!(
        rpc_url = %config.network.rpc_url,
        chain_id = config.network.chain_id,
        "whitelist-dapp v0.1.0 starting"
    );

    match run(&config, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &AppConfig, command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    let approver: Arc<dyn Approver> = if config.wallet.auto_approve {
        Arc::new(AutoApprove)
    } else {
        Arc::new(TerminalPrompt)
    };
    let read_only = matches!(command, Commands::Status { read_only: true });

    let connector = LocalWalletConnector::from_config(config, read_only, approver)?;
    let settings = SessionSettings::from_config(config)?;
    let session = Arc::new(WhitelistSession::new(
        ProviderGateway::new(Arc::new(connector)),
        settings,
    ));
    let reconnector = Reconnector::new(&session).spawn();

    let result = drive(&session, command).await;
    reconnector.abort();
    result?;

    println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
    Ok(())
}

async fn drive(session: &WhitelistSession, command: Commands) -> Result<(), WhitelistError> {
    if let Err(e) = session.connect().await {
        if let WhitelistError::WrongNetwork { required, .. } = &e {
            eprintln!("Change the network to chain {}", required);
        }
        return Err(e);
    }

    match command {
        Commands::Status { .. } => Ok(()),
        Commands::Join => {
            if session.state().joined {
                eprintln!("Thanks for joining the Whitelist!");
                return Ok(());
            }
            let receipt = session.submit_join().await?;
            tracing::info!(
                tx_hash = %receipt.tx_hash,
                block_number = ?receipt.block_number,
                "Joined the whitelist"
            );
            eprintln!("Thanks for joining the Whitelist!");
            Ok(())
        }
    }
}
