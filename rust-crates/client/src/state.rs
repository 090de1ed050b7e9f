//! Locally cached view of the game contract, fed by the sync worker.

use crate::{
    config::ReadFailurePolicy,
    errors::ContractError,
    units::tokens_as_f64,
};
use alloy::primitives::{
    Address,
    TxHash,
    U256,
};
use contract_abi::{
    DEFAULT_ENTRY_FEE,
    DEFAULT_USD_PER_TOKEN,
    MAX_INVITES_PER_WEEK,
};
use tracing::{
    debug,
    warn,
};


#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PriceQuote {
    pub entry_fee: U256,
    pub usd_per_token: f64,
    pub oracle_healthy: bool,
}

impl Default for PriceQuote {
    fn default() -> Self {
        Self {
            entry_fee: DEFAULT_ENTRY_FEE,
            usd_per_token: DEFAULT_USD_PER_TOKEN,
            oracle_healthy: false,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Balance {
    pub amount: U256,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Allowance {
    pub amount: U256,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EntryStatus {
    pub has_entered_today: bool,
    /// False until a read succeeds, and again after a failed read or a reset.
    pub verified: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DailyGameSnapshot {
    pub game_id: u64,
    pub start_time: u64,
    pub end_time: u64,
    pub total_entries: u64,
    pub jackpot: U256,
    pub is_completed: bool,
}

impl DailyGameSnapshot {
    pub fn has_ended(&self, now_secs: u64) -> bool {
        self.end_time != 0 && now_secs >= self.end_time
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlayerRecord {
    pub total_toppings: u64,
    pub daily_entries: u64,
    pub last_entry_time: u64,
}

impl PlayerRecord {
    pub fn is_first_entry(&self) -> bool {
        self.daily_entries == 0
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReferralRecord {
    pub code: Option<String>,
    pub referrer: Option<Address>,
    pub total_referrals_this_week: u64,
    pub lifetime_referrals: u64,
    pub is_active: bool,
}

impl ReferralRecord {
    pub fn weekly_used(&self) -> u64 {
        self.total_referrals_this_week.min(MAX_INVITES_PER_WEEK)
    }
}

/// The fee and the token price are read separately; either may fail alone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriceReading {
    pub entry_fee: Result<U256, ContractError>,
    /// USD per token, scaled by 10^18.
    pub token_price: Result<U256, ContractError>,
}

impl PriceReading {
    pub fn ok(entry_fee: U256, token_price: U256) -> Self {
        Self {
            entry_fee: Ok(entry_fee),
            token_price: Ok(token_price),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryReading {
    pub allowance: U256,
    pub has_entered_today: bool,
}

/// Outcome of one of the five reads that make up a refresh.
#[derive(Clone, Debug, PartialEq)]
pub enum Fetched {
    Price(PriceReading),
    Balance(Result<U256, ContractError>),
    EntryStatus(Result<EntryReading, ContractError>),
    Player(Result<(PlayerRecord, ReferralRecord), ContractError>),
    DailyGame(Result<DailyGameSnapshot, ContractError>),
}

impl Fetched {
    pub fn is_account_scoped(&self) -> bool {
        matches!(
            self,
            Fetched::Balance(_) | Fetched::EntryStatus(_) | Fetched::Player(_)
        )
    }

    fn label(&self) -> &'static str {
        match self {
            Fetched::Price(_) => "price",
            Fetched::Balance(_) => "balance",
            Fetched::EntryStatus(_) => "entry status",
            Fetched::Player(_) => "player info",
            Fetched::DailyGame(_) => "daily game",
        }
    }
}

/// A fetch result tagged with the refresh that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct Update {
    pub generation: u64,
    pub account: Option<Address>,
    pub payload: Fetched,
}

/// Highest generation applied per field; older results are discarded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Fences {
    price: u64,
    balance: u64,
    entry: u64,
    player: u64,
    daily: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Seen {
    price: bool,
    balance: bool,
    entry: bool,
    player: bool,
    daily: bool,
}

#[derive(Clone, Debug)]
pub struct GameState {
    account: Option<Address>,
    price: PriceQuote,
    balance: Option<Balance>,
    allowance: Option<Allowance>,
    entry: EntryStatus,
    optimistic_entry: Option<TxHash>,
    daily: Option<DailyGameSnapshot>,
    daily_error: Option<String>,
    player: Option<PlayerRecord>,
    referral: Option<ReferralRecord>,
    block_height: Option<u64>,
    fences: Fences,
    seen: Seen,
    policy: ReadFailurePolicy,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(ReadFailurePolicy::default())
    }
}

impl GameState {
    pub fn new(policy: ReadFailurePolicy) -> Self {
        Self {
            account: None,
            price: PriceQuote::default(),
            balance: None,
            allowance: None,
            entry: EntryStatus::default(),
            optimistic_entry: None,
            daily: None,
            daily_error: None,
            player: None,
            referral: None,
            block_height: None,
            fences: Fences::default(),
            seen: Seen::default(),
            policy,
        }
    }

    pub fn account(&self) -> Option<Address> {
        self.account
    }

    pub fn price(&self) -> &PriceQuote {
        &self.price
    }

    pub fn entry_fee(&self) -> U256 {
        self.price.entry_fee
    }

    pub fn balance(&self) -> Option<Balance> {
        self.balance
    }

    pub fn allowance(&self) -> Option<Allowance> {
        self.allowance
    }

    /// Entry status with any unconfirmed local entry folded in.
    pub fn entry(&self) -> EntryStatus {
        if self.optimistic_entry.is_some() {
            return EntryStatus {
                has_entered_today: true,
                verified: self.entry.verified,
            };
        }
        self.entry
    }

    pub fn optimistic_entry(&self) -> Option<TxHash> {
        self.optimistic_entry
    }

    pub fn daily(&self) -> Option<&DailyGameSnapshot> {
        self.daily.as_ref()
    }

    pub fn daily_error(&self) -> Option<&str> {
        self.daily_error.as_deref()
    }

    pub fn player(&self) -> Option<&PlayerRecord> {
        self.player.as_ref()
    }

    pub fn referral(&self) -> Option<&ReferralRecord> {
        self.referral.as_ref()
    }

    pub fn block_height(&self) -> Option<u64> {
        self.block_height
    }

    pub fn policy(&self) -> ReadFailurePolicy {
        self.policy
    }

    /// True once every read relevant to the current account has landed once.
    pub fn is_synced(&self) -> bool {
        let global = self.seen.price && self.seen.daily;
        match self.account {
            Some(_) => global && self.seen.balance && self.seen.entry && self.seen.player,
            None => global,
        }
    }

    /// Switches the cached account. Account-scoped caches are cleared and
    /// results older than `fence` are ignored for them.
    pub fn set_account(&mut self, account: Option<Address>, fence: u64) -> bool {
        if self.account == account {
            return false;
        }
        self.account = account;
        self.balance = None;
        self.allowance = None;
        self.entry = EntryStatus::default();
        self.optimistic_entry = None;
        self.player = None;
        self.referral = None;
        self.seen.balance = false;
        self.seen.entry = false;
        self.seen.player = false;
        self.fences.balance = self.fences.balance.max(fence);
        self.fences.entry = self.fences.entry.max(fence);
        self.fences.player = self.fences.player.max(fence);
        true
    }

    pub fn observe_block(&mut self, height: u64) -> bool {
        if self.block_height.is_some_and(|seen| seen >= height) {
            return false;
        }
        self.block_height = Some(height);
        true
    }

    /// Applies a fetch result unless it is older than what the field already
    /// holds or was issued for another account. Returns whether it applied.
    pub fn apply(&mut self, update: Update) -> bool {
        let Update {
            generation,
            account,
            payload,
        } = update;

        if payload.is_account_scoped() && (account.is_none() || account != self.account) {
            debug!(
                generation,
                field = payload.label(),
                "dropping result for another account"
            );
            return false;
        }

        let fence = match &payload {
            Fetched::Price(_) => &mut self.fences.price,
            Fetched::Balance(_) => &mut self.fences.balance,
            Fetched::EntryStatus(_) => &mut self.fences.entry,
            Fetched::Player(_) => &mut self.fences.player,
            Fetched::DailyGame(_) => &mut self.fences.daily,
        };
        if generation < *fence {
            debug!(
                generation,
                fence = *fence,
                field = payload.label(),
                "dropping stale result"
            );
            return false;
        }
        *fence = generation;

        match payload {
            Fetched::Price(reading) => self.apply_price(reading),
            Fetched::Balance(result) => self.apply_balance(result),
            Fetched::EntryStatus(result) => self.apply_entry(result),
            Fetched::Player(result) => self.apply_player(result),
            Fetched::DailyGame(result) => self.apply_daily(result),
        }
        true
    }

    fn apply_price(&mut self, reading: PriceReading) {
        self.seen.price = true;
        match reading.entry_fee {
            Ok(fee) if !fee.is_zero() => {
                self.price.entry_fee = fee;
                self.price.oracle_healthy = true;
            }
            Ok(_) => {}
            Err(err) => {
                warn!(?err, "entry fee read failed; keeping last known fee");
                self.price.oracle_healthy = false;
            }
        }
        match reading.token_price {
            Ok(price) if !price.is_zero() => {
                self.price.usd_per_token = tokens_as_f64(price);
            }
            Ok(_) => {}
            Err(err) => {
                warn!(?err, "token price read failed; keeping last known price");
                self.price.oracle_healthy = false;
            }
        }
    }

    fn apply_balance(&mut self, result: Result<U256, ContractError>) {
        self.seen.balance = true;
        match result {
            Ok(amount) => self.balance = Some(Balance { amount }),
            Err(err) => warn!(?err, "balance read failed; keeping last known balance"),
        }
    }

    fn apply_entry(&mut self, result: Result<EntryReading, ContractError>) {
        self.seen.entry = true;
        match result {
            Ok(reading) => {
                self.allowance = Some(Allowance {
                    amount: reading.allowance,
                });
                self.entry = EntryStatus {
                    has_entered_today: reading.has_entered_today,
                    verified: true,
                };
            }
            Err(err) => match self.policy {
                ReadFailurePolicy::FailClosed => {
                    warn!(?err, "entry status read failed; marking unverified");
                    self.entry.verified = false;
                }
                ReadFailurePolicy::FailOpen => {
                    warn!(?err, "entry status read failed; assuming not entered");
                    self.allowance = None;
                    self.entry = EntryStatus {
                        has_entered_today: false,
                        verified: true,
                    };
                }
            },
        }
    }

    fn apply_player(
        &mut self,
        result: Result<(PlayerRecord, ReferralRecord), ContractError>,
    ) {
        self.seen.player = true;
        match result {
            Ok((player, referral)) => {
                self.player = Some(player);
                self.referral = Some(referral);
            }
            Err(err) => warn!(?err, "player info read failed; keeping last known record"),
        }
    }

    fn apply_daily(&mut self, result: Result<DailyGameSnapshot, ContractError>) {
        self.seen.daily = true;
        match result {
            Ok(snapshot) => {
                self.daily = Some(snapshot);
                self.daily_error = None;
            }
            Err(err) => {
                warn!(?err, "daily game read failed");
                self.daily_error = Some(err.to_string());
            }
        }
    }

    /// Flags the player as entered before the chain confirms it. Entry reads
    /// from refreshes older than `fence` are ignored from here on.
    pub fn mark_entered_optimistically(&mut self, tx: TxHash, fence: u64) {
        self.optimistic_entry = Some(tx);
        self.fences.entry = self.fences.entry.max(fence);
    }

    /// The receipt succeeded: the entry is now known, not assumed.
    pub fn settle_optimistic_entry(&mut self, tx: TxHash) -> bool {
        if self.optimistic_entry != Some(tx) {
            return false;
        }
        self.optimistic_entry = None;
        self.entry = EntryStatus {
            has_entered_today: true,
            verified: true,
        };
        true
    }

    /// The receipt failed: fall back to whatever the chain last reported.
    pub fn revert_optimistic_entry(&mut self, tx: TxHash) -> bool {
        if self.optimistic_entry != Some(tx) {
            return false;
        }
        self.optimistic_entry = None;
        true
    }

    /// No verdict for the transaction: drop the assumption and require a
    /// fresh read before another entry.
    pub fn abandon_optimistic_entry(&mut self, tx: TxHash) -> bool {
        if self.optimistic_entry != Some(tx) {
            return false;
        }
        self.optimistic_entry = None;
        self.entry.verified = false;
        true
    }

    /// A new game day started: nobody has entered yet. Reads issued before the
    /// boundary can no longer say otherwise.
    pub fn on_reset_boundary(&mut self, fence: u64) {
        self.optimistic_entry = None;
        self.entry = EntryStatus {
            has_entered_today: false,
            verified: false,
        };
        self.fences.entry = self.fences.entry.max(fence);
    }
}
