mod app;

use alloy::primitives::Address;
use clap::{
    ArgGroup,
    Parser,
    Subcommand,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use pizza_party::{
    config::{
        AppConfig,
        DEFAULT_BASE_RPC_URL,
        DEFAULT_BASE_SEPOLIA_RPC_URL,
        DEFAULT_LOCAL_RPC_URL,
        NetworkTarget,
        ReadFailurePolicy,
        SyncSettings,
        WalletConfig,
    },
    reset::ResetSchedule,
    wallets,
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "pizza-party",
    about = "Play the Pizza Party daily game on Base",
    version,
    group(
        ArgGroup::new("network")
            .args(["base", "base_sepolia", "local"])
            .required(false)
    ),
    group(
        ArgGroup::new("account")
            .args(["wallet", "address"])
            .required(false)
    )
)]
struct Args {
    /// Connect to Base mainnet (default)
    #[arg(long)]
    base: bool,

    /// Connect to Base Sepolia
    #[arg(long)]
    base_sepolia: bool,

    /// Connect to a local node
    #[arg(long)]
    local: bool,

    /// Override RPC URL
    #[arg(long)]
    rpc_url: Option<String>,

    /// Keystore name to play with
    #[arg(long)]
    wallet: Option<String>,

    /// Override keystore directory (defaults to ~/.foundry/keystores)
    #[arg(long)]
    wallet_dir: Option<String>,

    /// Follow an address without signing
    #[arg(long)]
    address: Option<Address>,

    /// Write logs to daily files in this directory instead of stderr
    #[arg(long)]
    log_dir: Option<String>,

    /// Assume "not entered" and "not approved" when those reads fail
    #[arg(long)]
    fail_open: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Refresh once and print the game state
    Status,
    /// Keep syncing and print the game state whenever it changes
    Watch,
    /// Approve the game contract to spend VMF
    Approve,
    /// Enter today's game
    Enter {
        /// Referral code, only used on a first entry
        #[arg(long)]
        referral_code: Option<String>,
    },
    /// Create a referral code for this wallet
    CreateReferral,
    /// Record contract addresses for the selected network
    RegisterDeployment {
        /// Pizza Party contract address
        #[arg(long)]
        game: Address,

        /// VMF token address
        #[arg(long)]
        token: Address,
    },
}

impl Args {
    fn network(&self) -> NetworkTarget {
        let pick = |default: &str| self.rpc_url.clone().unwrap_or_else(|| default.to_string());
        if self.base_sepolia {
            NetworkTarget::BaseSepolia {
                url: pick(DEFAULT_BASE_SEPOLIA_RPC_URL),
            }
        } else if self.local {
            NetworkTarget::Local {
                url: pick(DEFAULT_LOCAL_RPC_URL),
            }
        } else {
            NetworkTarget::Base {
                url: pick(DEFAULT_BASE_RPC_URL),
            }
        }
    }

    fn wallet(&self) -> Result<WalletConfig> {
        if let Some(address) = self.address {
            return Ok(WalletConfig::WatchOnly { address });
        }
        match &self.wallet {
            Some(name) => {
                let dir = wallets::resolve_wallet_dir(self.wallet_dir.as_deref())?;
                Ok(WalletConfig::Keystore {
                    name: name.clone(),
                    dir,
                })
            }
            None => Ok(WalletConfig::Disconnected),
        }
    }

    fn app_config(&self) -> Result<AppConfig> {
        let read_failure_policy = if self.fail_open {
            ReadFailurePolicy::FailOpen
        } else {
            ReadFailurePolicy::FailClosed
        };
        Ok(AppConfig {
            network: self.network(),
            wallet: self.wallet()?,
            sync: SyncSettings {
                read_failure_policy,
                ..SyncSettings::default()
            },
            schedule: ResetSchedule::default(),
        })
    }
}

/// The returned guard flushes the file writer and must outlive the program.
fn init_tracing(log_dir: Option<&str>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match log_dir {
        Some(dir) => {
            let dir = shellexpand::tilde(dir).into_owned();
            let appender = rolling::daily(dir, "pizza-party.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(writer)
                .try_init()
                .map_err(|e| eyre!(e))?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| eyre!(e))?;
            Ok(None)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    let _guard = init_tracing(args.log_dir.as_deref())?;
    tracing::info!("starting pizza-party client");
    deployments::ensure_structure()
        .map_err(|e| eyre!(e))
        .wrap_err("Failed to prepare deployments directory")?;
    let config = args.app_config()?;
    app::run(args.command, config).await
}
