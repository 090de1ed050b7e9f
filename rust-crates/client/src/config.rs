use crate::reset::ResetSchedule;
use alloy::primitives::Address;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use contract_abi::{
    BASE_CHAIN_ID,
    BASE_SEPOLIA_CHAIN_ID,
    LOCAL_CHAIN_ID,
    PIZZA_PARTY_ADDRESS,
    VMF_TOKEN_ADDRESS,
};
use deployments::{
    DeploymentEnv,
    DeploymentRecord,
};
use std::{
    path::PathBuf,
    time::Duration,
};

pub const DEFAULT_BASE_RPC_URL: &str = "https://mainnet.base.org";
pub const DEFAULT_BASE_SEPOLIA_RPC_URL: &str = "https://sepolia.base.org";
pub const DEFAULT_LOCAL_RPC_URL: &str = "http://localhost:8545";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NetworkTarget {
    Base { url: String },
    BaseSepolia { url: String },
    Local { url: String },
}

impl NetworkTarget {
    pub fn url(&self) -> &str {
        match self {
            NetworkTarget::Base { url }
            | NetworkTarget::BaseSepolia { url }
            | NetworkTarget::Local { url } => url,
        }
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            NetworkTarget::Base { .. } => BASE_CHAIN_ID,
            NetworkTarget::BaseSepolia { .. } => BASE_SEPOLIA_CHAIN_ID,
            NetworkTarget::Local { .. } => LOCAL_CHAIN_ID,
        }
    }

    pub fn deployment_env(&self) -> DeploymentEnv {
        match self {
            NetworkTarget::Base { .. } => DeploymentEnv::Base,
            NetworkTarget::BaseSepolia { .. } => DeploymentEnv::BaseSepolia,
            NetworkTarget::Local { .. } => DeploymentEnv::Local,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalletConfig {
    Keystore { name: String, dir: PathBuf },
    WatchOnly { address: Address },
    Disconnected,
}

/// What to assume about allowance and entry status when their read fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReadFailurePolicy {
    /// Keep the previous values, mark them unverified and refuse to submit.
    #[default]
    FailClosed,
    /// Treat both as false, the way the web client always did.
    FailOpen,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncSettings {
    pub block_poll_interval: Duration,
    /// Refresh anyway when no new block was seen for this long.
    pub fallback_interval: Duration,
    pub entry_settle_delay: Duration,
    pub approval_settle_delay: Duration,
    pub boundary_refresh_delay: Duration,
    pub receipt_poll_interval: Duration,
    pub receipt_poll_attempts: u32,
    pub read_failure_policy: ReadFailurePolicy,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            block_poll_interval: Duration::from_secs(2),
            fallback_interval: Duration::from_secs(12),
            entry_settle_delay: Duration::from_secs(3),
            approval_settle_delay: Duration::from_secs(2),
            boundary_refresh_delay: Duration::from_millis(500),
            receipt_poll_interval: Duration::from_secs(1),
            receipt_poll_attempts: 30,
            read_failure_policy: ReadFailurePolicy::FailClosed,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContractAddresses {
    pub game: Address,
    pub token: Address,
}

impl ContractAddresses {
    pub fn base_mainnet() -> Self {
        Self {
            game: PIZZA_PARTY_ADDRESS,
            token: VMF_TOKEN_ADDRESS,
        }
    }

    /// A stored deployment wins; mainnet falls back to the known addresses.
    pub fn resolve(
        network: &NetworkTarget,
        record: Option<&DeploymentRecord>,
    ) -> Result<Self> {
        if let Some(record) = record {
            if !record.is_for_chain(network.chain_id()) {
                return Err(eyre!(
                    "Deployment record for {} targets chain {}, expected {}",
                    network.deployment_env(),
                    record.chain_id,
                    network.chain_id()
                ));
            }
            let game = record
                .pizza_party_address
                .parse::<Address>()
                .wrap_err("Invalid game contract address in deployment record")?;
            let token = record
                .vmf_token_address
                .parse::<Address>()
                .wrap_err("Invalid token address in deployment record")?;
            return Ok(Self { game, token });
        }
        match network {
            NetworkTarget::Base { .. } => Ok(Self::base_mainnet()),
            other => Err(eyre!(
                "No deployment recorded for {}; run register-deployment first",
                other.deployment_env()
            )),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub network: NetworkTarget,
    pub wallet: WalletConfig,
    pub sync: SyncSettings,
    pub schedule: ResetSchedule,
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    fn record(chain_id: u64) -> DeploymentRecord {
        DeploymentRecord {
            deployed_at: "2026-01-01T00:00:00+00:00".to_string(),
            pizza_party_address: "0x00000000000000000000000000000000000000aa".to_string(),
            vmf_token_address: "0x00000000000000000000000000000000000000bb".to_string(),
            chain_id,
            network_url: DEFAULT_BASE_SEPOLIA_RPC_URL.to_string(),
            deployment_block_height: None,
        }
    }

    #[test]
    fn resolve__falls_back_to_mainnet_addresses_on_base() {
        // given
        let network = NetworkTarget::Base {
            url: DEFAULT_BASE_RPC_URL.to_string(),
        };

        // when
        let addresses = ContractAddresses::resolve(&network, None).unwrap();

        // then
        assert_eq!(addresses, ContractAddresses::base_mainnet());
    }

    #[test]
    fn resolve__prefers_recorded_deployment() {
        // given
        let network = NetworkTarget::BaseSepolia {
            url: DEFAULT_BASE_SEPOLIA_RPC_URL.to_string(),
        };

        // when
        let addresses =
            ContractAddresses::resolve(&network, Some(&record(BASE_SEPOLIA_CHAIN_ID))).unwrap();

        // then
        assert_eq!(addresses.game, Address::with_last_byte(0xaa));
        assert_eq!(addresses.token, Address::with_last_byte(0xbb));
    }

    #[test]
    fn resolve__rejects_missing_or_mismatched_records_off_mainnet() {
        // given
        let network = NetworkTarget::Local {
            url: DEFAULT_LOCAL_RPC_URL.to_string(),
        };

        // then
        assert!(ContractAddresses::resolve(&network, None).is_err());
        assert!(
            ContractAddresses::resolve(&network, Some(&record(BASE_SEPOLIA_CHAIN_ID)))
                .is_err()
        );
    }

    #[test]
    fn sync_settings__default_to_web_client_timings() {
        let settings = SyncSettings::default();
        assert_eq!(settings.entry_settle_delay, Duration::from_secs(3));
        assert_eq!(settings.approval_settle_delay, Duration::from_secs(2));
        assert_eq!(settings.boundary_refresh_delay, Duration::from_millis(500));
        assert_eq!(settings.read_failure_policy, ReadFailurePolicy::FailClosed);
    }
}
