//! Wires a contract, the sync worker and a controller into one running
//! session.

use crate::{
    config::{
        AppConfig,
        ContractAddresses,
        WalletConfig,
    },
    contract::{
        AlloyGameContract,
        GameContract,
    },
    controller::GameController,
    sync::{
        BlockSource,
        PollingBlockSource,
        SyncEvent,
        spawn_sync_worker,
    },
    wallets,
};
use alloy::{
    primitives::Address,
    signers::local::PrivateKeySigner,
};
use chrono::Utc;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use deployments::DeploymentStore;
use std::time::Duration;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{
        Instant,
        timeout_at,
    },
};
use tracing::{
    info,
    warn,
};

pub struct Session<C> {
    controller: GameController<C>,
    events: mpsc::UnboundedReceiver<SyncEvent>,
    worker: JoinHandle<()>,
}

impl<C: GameContract> Session<C> {
    pub fn start<B: BlockSource>(
        contract: C,
        blocks: B,
        config: &AppConfig,
        account: Option<Address>,
    ) -> Self {
        let (sync, events, worker) =
            spawn_sync_worker(contract.clone(), blocks, config.sync.clone(), account);
        let controller = GameController::new(
            contract,
            sync,
            config.sync.clone(),
            config.network.chain_id(),
            config.schedule,
            Utc::now(),
        )
        .with_account(account);
        Self {
            controller,
            events,
            worker,
        }
    }

    pub fn controller(&self) -> &GameController<C> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut GameController<C> {
        &mut self.controller
    }

    /// Waits for the next worker event and applies it. `None` once the worker
    /// is gone.
    pub async fn next_event(&mut self) -> Option<bool> {
        let event = self.events.recv().await?;
        Some(self.controller.ingest(event))
    }

    /// Applies events until every read has landed once or `limit` elapses.
    pub async fn wait_for_initial_sync(&mut self, limit: Duration) -> Result<()> {
        let deadline = Instant::now() + limit;
        while !self.controller.state().is_synced() {
            match timeout_at(deadline, self.next_event()).await {
                Ok(Some(_)) => {}
                Ok(None) => return Err(eyre!("Sync worker stopped before first refresh")),
                Err(_) => {
                    warn!(?limit, "initial sync incomplete");
                    return Err(eyre!("Timed out waiting for game state"));
                }
            }
        }
        Ok(())
    }

    pub async fn shutdown(self) -> Result<()> {
        self.controller.sync().shutdown();
        self.worker.await.wrap_err("Sync worker panicked")?;
        Ok(())
    }
}

fn load_signer(wallet: &WalletConfig) -> Result<(Option<PrivateKeySigner>, Option<Address>)> {
    match wallet {
        WalletConfig::Keystore { name, dir } => {
            let descriptor = wallets::find_wallet(dir, name)?;
            let signer = wallets::unlock_wallet(&descriptor)?;
            let address = signer.address();
            Ok((Some(signer), Some(address)))
        }
        WalletConfig::WatchOnly { address } => Ok((None, Some(*address))),
        WalletConfig::Disconnected => Ok((None, None)),
    }
}

/// Resolves addresses, unlocks the wallet and starts syncing against a node.
pub async fn connect(config: &AppConfig) -> Result<Session<AlloyGameContract>> {
    let env = config.network.deployment_env();
    let record = DeploymentStore::new(env)
        .and_then(|store| store.load())
        .map_err(|e| eyre!(e))?;
    let addresses = ContractAddresses::resolve(&config.network, record.as_ref())?;
    let (signer, account) = load_signer(&config.wallet)?;

    let contract = AlloyGameContract::connect(config.network.url(), addresses, signer)
        .await
        .map_err(|e| eyre!(e))
        .wrap_err_with(|| format!("Failed to connect to {}", config.network.url()))?;
    let blocks = PollingBlockSource::new(contract.clone(), config.sync.block_poll_interval);
    info!(network = %env, ?account, "session started");
    Ok(Session::start(contract, blocks, config, account))
}
