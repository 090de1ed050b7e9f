//! The game and token contracts as seen by the client, plus the alloy-backed
//! implementation used against a real node.

use crate::{
    config::ContractAddresses,
    errors::ContractError,
    state::{
        DailyGameSnapshot,
        PlayerRecord,
        ReferralRecord,
    },
};
use alloy::{
    network::{
        EthereumWallet,
        ReceiptResponse,
    },
    primitives::{
        Address,
        TxHash,
        U256,
    },
    providers::{
        DynProvider,
        Provider,
        ProviderBuilder,
    },
    signers::local::PrivateKeySigner,
    sol_types::decode_revert_reason,
};
use contract_abi::{
    pizza_party_types::IPizzaParty,
    vmf_types::IVmfToken,
};
use std::future::Future;
use tracing::{
    debug,
    info,
};

pub trait GameContract: Clone + Send + Sync + 'static {
    fn entry_fee(&self) -> impl Future<Output = Result<U256, ContractError>> + Send;

    /// USD per token scaled by 10^18.
    fn token_price(&self) -> impl Future<Output = Result<U256, ContractError>> + Send;

    fn token_balance(
        &self,
        owner: Address,
    ) -> impl Future<Output = Result<U256, ContractError>> + Send;

    /// Allowance `owner` granted to the game contract.
    fn allowance(
        &self,
        owner: Address,
    ) -> impl Future<Output = Result<U256, ContractError>> + Send;

    fn has_entered_today(
        &self,
        player: Address,
    ) -> impl Future<Output = Result<bool, ContractError>> + Send;

    fn player_info(
        &self,
        player: Address,
    ) -> impl Future<Output = Result<PlayerRecord, ContractError>> + Send;

    fn referral_info(
        &self,
        player: Address,
    ) -> impl Future<Output = Result<ReferralRecord, ContractError>> + Send;

    fn current_daily_game(
        &self,
    ) -> impl Future<Output = Result<DailyGameSnapshot, ContractError>> + Send;

    fn current_jackpot(&self) -> impl Future<Output = Result<U256, ContractError>> + Send;

    fn chain_id(&self) -> impl Future<Output = Result<u64, ContractError>> + Send;

    fn block_number(&self) -> impl Future<Output = Result<u64, ContractError>> + Send;

    /// Address transactions are signed with, if this session can sign.
    fn signer_address(&self) -> Option<Address>;

    /// Dry-runs `enterDailyGame(code)` as `player` without broadcasting.
    fn simulate_entry(
        &self,
        player: Address,
        code: &str,
    ) -> impl Future<Output = Result<(), ContractError>> + Send;

    fn approve_game(
        &self,
        amount: U256,
    ) -> impl Future<Output = Result<TxHash, ContractError>> + Send;

    fn enter_daily_game(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<TxHash, ContractError>> + Send;

    fn create_referral_code(
        &self,
    ) -> impl Future<Output = Result<TxHash, ContractError>> + Send;

    /// `Some(success)` once mined, `None` while still pending.
    fn receipt_status(
        &self,
        tx: TxHash,
    ) -> impl Future<Output = Result<Option<bool>, ContractError>> + Send;
}

impl From<alloy::contract::Error> for ContractError {
    fn from(err: alloy::contract::Error) -> Self {
        let reason = err
            .as_revert_data()
            .and_then(|data| decode_revert_reason(&data));
        match reason {
            Some(reason) => ContractError::Reverted { reason },
            None => ContractError::rpc(err),
        }
    }
}

fn saturating_u64(value: U256) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

impl From<IPizzaParty::DailyGame> for DailyGameSnapshot {
    fn from(game: IPizzaParty::DailyGame) -> Self {
        Self {
            game_id: saturating_u64(game.gameId),
            start_time: saturating_u64(game.startTime),
            end_time: saturating_u64(game.endTime),
            total_entries: saturating_u64(game.totalEntries),
            jackpot: game.jackpotAmount,
            is_completed: game.isCompleted,
        }
    }
}

impl From<IPizzaParty::PlayerInfo> for PlayerRecord {
    fn from(info: IPizzaParty::PlayerInfo) -> Self {
        Self {
            total_toppings: saturating_u64(info.totalToppings),
            daily_entries: saturating_u64(info.dailyEntries),
            last_entry_time: saturating_u64(info.lastEntryTime),
        }
    }
}

impl From<IPizzaParty::ReferralInfo> for ReferralRecord {
    fn from(info: IPizzaParty::ReferralInfo) -> Self {
        Self {
            code: Some(info.referralCode).filter(|code| !code.is_empty()),
            referrer: Some(info.referrer).filter(|referrer| !referrer.is_zero()),
            total_referrals_this_week: saturating_u64(info.totalReferrals),
            lifetime_referrals: saturating_u64(info.lifetimeReferrals),
            is_active: info.isActive,
        }
    }
}

#[derive(Clone)]
pub struct AlloyGameContract {
    provider: DynProvider,
    game: IPizzaParty::IPizzaPartyInstance<DynProvider>,
    token: IVmfToken::IVmfTokenInstance<DynProvider>,
    signer: Option<Address>,
}

impl AlloyGameContract {
    pub async fn connect(
        url: &str,
        addresses: ContractAddresses,
        signer: Option<PrivateKeySigner>,
    ) -> Result<Self, ContractError> {
        let signer_address = signer.as_ref().map(|s| s.address());
        let provider = match signer {
            Some(signer) => ProviderBuilder::new()
                .wallet(EthereumWallet::from(signer))
                .connect(url)
                .await
                .map_err(ContractError::rpc)?
                .erased(),
            None => ProviderBuilder::new()
                .connect(url)
                .await
                .map_err(ContractError::rpc)?
                .erased(),
        };
        info!(
            %url,
            game = %addresses.game,
            token = %addresses.token,
            signer = ?signer_address,
            "connected to rpc"
        );
        Ok(Self {
            game: IPizzaParty::new(addresses.game, provider.clone()),
            token: IVmfToken::new(addresses.token, provider.clone()),
            provider,
            signer: signer_address,
        })
    }

    fn require_signer(&self) -> Result<Address, ContractError> {
        self.signer.ok_or(ContractError::NoSigner)
    }
}

impl GameContract for AlloyGameContract {
    async fn entry_fee(&self) -> Result<U256, ContractError> {
        Ok(self.game.getEntryFee().call().await?)
    }

    async fn token_price(&self) -> Result<U256, ContractError> {
        Ok(self.game.getCurrentVMFPrice().call().await?)
    }

    async fn token_balance(&self, owner: Address) -> Result<U256, ContractError> {
        Ok(self.token.balanceOf(owner).call().await?)
    }

    async fn allowance(&self, owner: Address) -> Result<U256, ContractError> {
        Ok(self
            .token
            .allowance(owner, *self.game.address())
            .call()
            .await?)
    }

    async fn has_entered_today(&self, player: Address) -> Result<bool, ContractError> {
        Ok(self.game.hasEnteredToday(player).call().await?)
    }

    async fn player_info(&self, player: Address) -> Result<PlayerRecord, ContractError> {
        Ok(self.game.getPlayerInfo(player).call().await?.into())
    }

    async fn referral_info(&self, player: Address) -> Result<ReferralRecord, ContractError> {
        Ok(self.game.getReferralInfo(player).call().await?.into())
    }

    async fn current_daily_game(&self) -> Result<DailyGameSnapshot, ContractError> {
        Ok(self.game.getCurrentDailyGame().call().await?.into())
    }

    async fn current_jackpot(&self) -> Result<U256, ContractError> {
        Ok(self.game.currentDailyJackpot().call().await?)
    }

    async fn chain_id(&self) -> Result<u64, ContractError> {
        self.provider
            .get_chain_id()
            .await
            .map_err(ContractError::rpc)
    }

    async fn block_number(&self) -> Result<u64, ContractError> {
        self.provider
            .get_block_number()
            .await
            .map_err(ContractError::rpc)
    }

    fn signer_address(&self) -> Option<Address> {
        self.signer
    }

    async fn simulate_entry(&self, player: Address, code: &str) -> Result<(), ContractError> {
        self.game
            .enterDailyGame(code.to_string())
            .from(player)
            .call()
            .await?;
        debug!(%player, "entry simulation passed");
        Ok(())
    }

    async fn approve_game(&self, amount: U256) -> Result<TxHash, ContractError> {
        self.require_signer()?;
        let pending = self
            .token
            .approve(*self.game.address(), amount)
            .send()
            .await?;
        Ok(*pending.tx_hash())
    }

    async fn enter_daily_game(&self, code: &str) -> Result<TxHash, ContractError> {
        self.require_signer()?;
        let pending = self.game.enterDailyGame(code.to_string()).send().await?;
        Ok(*pending.tx_hash())
    }

    async fn create_referral_code(&self) -> Result<TxHash, ContractError> {
        self.require_signer()?;
        let pending = self.game.createReferralCode().send().await?;
        Ok(*pending.tx_hash())
    }

    async fn receipt_status(&self, tx: TxHash) -> Result<Option<bool>, ContractError> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx)
            .await
            .map_err(ContractError::rpc)?;
        Ok(receipt.map(|r| r.status()))
    }
}
