use crate::{
    contract::GameContract,
    errors::ContractError,
    state::{
        DailyGameSnapshot,
        PlayerRecord,
        ReferralRecord,
    },
};
use alloy::primitives::{
    Address,
    TxHash,
    U256,
};
use contract_abi::{
    BASE_CHAIN_ID,
    WEI_PER_TOKEN,
};
use std::{
    collections::{
        HashMap,
        HashSet,
    },
    sync::{
        Arc,
        Mutex,
        MutexGuard,
    },
};

pub const PLAYER: Address = Address::repeat_byte(0x11);

pub fn tokens(whole: u64) -> U256 {
    U256::from(whole) * WEI_PER_TOKEN
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteCall {
    Approve(U256),
    Enter(String),
    CreateReferral,
}

#[derive(Debug)]
pub struct FakeChain {
    pub entry_fee: U256,
    pub token_price: U256,
    pub balances: HashMap<Address, U256>,
    pub allowances: HashMap<Address, U256>,
    pub entered: HashSet<Address>,
    pub players: HashMap<Address, PlayerRecord>,
    pub referrals: HashMap<Address, ReferralRecord>,
    pub daily: DailyGameSnapshot,
    pub jackpot: U256,
    pub chain_id: u64,
    pub block_number: u64,
    pub signer: Option<Address>,
    pub simulate_error: Option<ContractError>,
    pub submit_error: Option<ContractError>,
    pub fail_price: bool,
    pub fail_token_price: bool,
    pub fail_entry_status: bool,
    pub fail_player: bool,
    pub fail_daily: bool,
    /// Mined transactions and whether they succeeded; absent means pending.
    pub receipts: HashMap<TxHash, bool>,
    /// Receipt given to each newly broadcast transaction, if any.
    pub auto_receipt: Option<bool>,
    pub writes: Vec<WriteCall>,
    pub simulations: Vec<(Address, String)>,
    next_tx: u8,
}

impl Default for FakeChain {
    fn default() -> Self {
        Self {
            entry_fee: tokens(100),
            token_price: U256::from(10_000_000_000_000_000u64),
            balances: HashMap::new(),
            allowances: HashMap::new(),
            entered: HashSet::new(),
            players: HashMap::new(),
            referrals: HashMap::new(),
            daily: DailyGameSnapshot {
                game_id: 1,
                ..Default::default()
            },
            jackpot: tokens(1_000),
            chain_id: BASE_CHAIN_ID,
            block_number: 1,
            signer: Some(PLAYER),
            simulate_error: None,
            submit_error: None,
            fail_price: false,
            fail_token_price: false,
            fail_entry_status: false,
            fail_player: false,
            fail_daily: false,
            receipts: HashMap::new(),
            auto_receipt: Some(true),
            writes: Vec::new(),
            simulations: Vec::new(),
            next_tx: 0,
        }
    }
}

impl FakeChain {
    fn broadcast(&mut self, call: WriteCall) -> Result<TxHash, ContractError> {
        if self.signer.is_none() {
            return Err(ContractError::NoSigner);
        }
        if let Some(err) = self.submit_error.clone() {
            return Err(err);
        }
        self.next_tx += 1;
        let tx = TxHash::repeat_byte(self.next_tx);
        if let Some(success) = self.auto_receipt {
            self.receipts.insert(tx, success);
        }
        self.writes.push(call);
        Ok(tx)
    }
}

/// In-memory game contract; clones share one chain.
#[derive(Clone, Default)]
pub struct FakeGameContract {
    chain: Arc<Mutex<FakeChain>>,
}

impl FakeGameContract {
    pub fn new() -> Self {
        Self::default()
    }

    /// A funded, approved player who has never entered.
    pub fn with_ready_player() -> Self {
        let fake = Self::new();
        {
            let mut chain = fake.chain();
            chain.balances.insert(PLAYER, tokens(500));
            chain.allowances.insert(PLAYER, tokens(100_000_000));
        }
        fake
    }

    pub fn chain(&self) -> MutexGuard<'_, FakeChain> {
        self.chain.lock().unwrap()
    }

    pub fn writes(&self) -> Vec<WriteCall> {
        self.chain().writes.clone()
    }
}

impl GameContract for FakeGameContract {
    async fn entry_fee(&self) -> Result<U256, ContractError> {
        let chain = self.chain();
        if chain.fail_price {
            return Err(ContractError::Reverted {
                reason: "Reserves call failed".to_string(),
            });
        }
        Ok(chain.entry_fee)
    }

    async fn token_price(&self) -> Result<U256, ContractError> {
        let chain = self.chain();
        if chain.fail_price || chain.fail_token_price {
            return Err(ContractError::Reverted {
                reason: "Invalid VMF price".to_string(),
            });
        }
        Ok(chain.token_price)
    }

    async fn token_balance(&self, owner: Address) -> Result<U256, ContractError> {
        Ok(self.chain().balances.get(&owner).copied().unwrap_or_default())
    }

    async fn allowance(&self, owner: Address) -> Result<U256, ContractError> {
        let chain = self.chain();
        if chain.fail_entry_status {
            return Err(ContractError::rpc("allowance call timed out"));
        }
        Ok(chain.allowances.get(&owner).copied().unwrap_or_default())
    }

    async fn has_entered_today(&self, player: Address) -> Result<bool, ContractError> {
        let chain = self.chain();
        if chain.fail_entry_status {
            return Err(ContractError::rpc("hasEnteredToday call timed out"));
        }
        Ok(chain.entered.contains(&player))
    }

    async fn player_info(&self, player: Address) -> Result<PlayerRecord, ContractError> {
        let chain = self.chain();
        if chain.fail_player {
            return Err(ContractError::rpc("getPlayerInfo failed"));
        }
        Ok(chain.players.get(&player).copied().unwrap_or_default())
    }

    async fn referral_info(&self, player: Address) -> Result<ReferralRecord, ContractError> {
        Ok(self
            .chain()
            .referrals
            .get(&player)
            .cloned()
            .unwrap_or_default())
    }

    async fn current_daily_game(&self) -> Result<DailyGameSnapshot, ContractError> {
        let chain = self.chain();
        if chain.fail_daily {
            return Err(ContractError::rpc("getCurrentDailyGame failed"));
        }
        Ok(chain.daily.clone())
    }

    async fn current_jackpot(&self) -> Result<U256, ContractError> {
        Ok(self.chain().jackpot)
    }

    async fn chain_id(&self) -> Result<u64, ContractError> {
        Ok(self.chain().chain_id)
    }

    async fn block_number(&self) -> Result<u64, ContractError> {
        Ok(self.chain().block_number)
    }

    fn signer_address(&self) -> Option<Address> {
        self.chain().signer
    }

    async fn simulate_entry(&self, player: Address, code: &str) -> Result<(), ContractError> {
        let mut chain = self.chain();
        chain.simulations.push((player, code.to_string()));
        match chain.simulate_error.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn approve_game(&self, amount: U256) -> Result<TxHash, ContractError> {
        let mut chain = self.chain();
        let tx = chain.broadcast(WriteCall::Approve(amount))?;
        if let Some(signer) = chain.signer {
            chain.allowances.insert(signer, amount);
        }
        Ok(tx)
    }

    async fn enter_daily_game(&self, code: &str) -> Result<TxHash, ContractError> {
        let mut chain = self.chain();
        let tx = chain.broadcast(WriteCall::Enter(code.to_string()))?;
        if chain.auto_receipt == Some(true) {
            if let Some(signer) = chain.signer {
                chain.entered.insert(signer);
            }
        }
        Ok(tx)
    }

    async fn create_referral_code(&self) -> Result<TxHash, ContractError> {
        self.chain().broadcast(WriteCall::CreateReferral)
    }

    async fn receipt_status(&self, tx: TxHash) -> Result<Option<bool>, ContractError> {
        Ok(self.chain().receipts.get(&tx).copied())
    }
}
