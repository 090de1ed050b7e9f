use crate::{
    config::SyncSettings,
    contract::GameContract,
    entry::{
        EntrySequencer,
        check_submission_guards,
    },
    errors::{
        ActionError,
        Precondition,
    },
    flags::{
        ActionState,
        DerivedFlags,
    },
    referral::{
        GateDecision,
        ReferralCode,
        ReferralGate,
    },
    reset::{
        BoundaryCrossed,
        ResetClock,
        ResetSchedule,
    },
    state::GameState,
    sync::{
        SettleOutcome,
        SyncEvent,
        SyncHandle,
    },
};
use alloy::primitives::{
    Address,
    TxHash,
};
use chrono::{
    DateTime,
    Utc,
};
use contract_abi::APPROVAL_AMOUNT;
use tracing::{
    error,
    info,
    warn,
};


const MAX_ERRORS: usize = 50;

/// Owns the cached state and runs the write flows against it. Only this
/// type mutates `GameState`; the sync worker just delivers events.
pub struct GameController<C> {
    contract: C,
    sync: SyncHandle,
    settings: SyncSettings,
    expected_chain_id: u64,
    state: GameState,
    clock: ResetClock,
    entry: EntrySequencer,
    status: String,
    errors: Vec<String>,
}

impl<C: GameContract> GameController<C> {
    pub fn new(
        contract: C,
        sync: SyncHandle,
        settings: SyncSettings,
        expected_chain_id: u64,
        schedule: ResetSchedule,
        now: DateTime<Utc>,
    ) -> Self {
        let state = GameState::new(settings.read_failure_policy);
        Self {
            contract,
            sync,
            settings,
            expected_chain_id,
            state,
            clock: ResetClock::new(schedule, now),
            entry: EntrySequencer::default(),
            status: String::new(),
            errors: Vec::new(),
        }
    }

    /// Seeds the account the worker was spawned with, without asking it to
    /// switch again.
    pub fn with_account(mut self, account: Option<Address>) -> Self {
        self.state.set_account(account, 0);
        self
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn flags(&self) -> DerivedFlags {
        DerivedFlags::evaluate(&self.state)
    }

    pub fn action(&self) -> ActionState {
        self.flags().action()
    }

    pub fn clock(&self) -> &ResetClock {
        &self.clock
    }

    pub fn entry(&self) -> &EntrySequencer {
        &self.entry
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn sync(&self) -> &SyncHandle {
        &self.sync
    }

    /// Applies one worker event. Returns whether anything visible changed.
    pub fn ingest(&mut self, event: SyncEvent) -> bool {
        match event {
            SyncEvent::Fetched(update) => self.state.apply(update),
            SyncEvent::BlockObserved(height) => self.state.observe_block(height),
            SyncEvent::EntrySettled { tx, outcome } => {
                if !self.entry.settle(tx, outcome) {
                    return false;
                }
                match outcome {
                    SettleOutcome::Confirmed => {
                        self.state.settle_optimistic_entry(tx);
                        self.set_status(format!("Entry confirmed ({tx})"));
                    }
                    SettleOutcome::Failed => {
                        self.state.revert_optimistic_entry(tx);
                        self.push_errors(vec![format!(
                            "Failed to enter game: transaction {tx} reverted"
                        )]);
                        self.set_status("Entry failed");
                    }
                    SettleOutcome::Unknown => {
                        self.state.abandon_optimistic_entry(tx);
                        self.set_status(format!(
                            "Entry {tx} not confirmed yet; waiting for the next refresh"
                        ));
                    }
                }
                true
            }
        }
    }

    /// Checks the daily boundary. On crossing, the cached entry flag is
    /// cleared before the chain is asked again.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<BoundaryCrossed> {
        let crossed = self.clock.tick(now)?;
        let fence = self.sync.current_generation() + 1;
        self.state.on_reset_boundary(fence);
        self.sync.refresh_after(self.settings.boundary_refresh_delay);
        info!(
            boundary = %crossed.boundary,
            next = %crossed.next,
            "daily reset boundary crossed"
        );
        self.set_status("New game day started");
        Some(crossed)
    }

    pub fn set_account(&mut self, account: Option<Address>) {
        let fence = self.sync.current_generation() + 1;
        if self.state.set_account(account, fence) {
            info!(?account, "account changed");
            self.sync.set_account(account);
        }
    }

    pub fn referral_decision(&self, supplied: Option<ReferralCode>) -> GateDecision {
        ReferralGate::decide(&self.flags(), supplied)
    }

    pub fn referral_code_argument(&self, supplied: Option<ReferralCode>) -> String {
        self.referral_decision(supplied).code_argument().to_string()
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
    }

    fn push_errors(&mut self, mut items: Vec<String>) {
        if items.is_empty() {
            return;
        }
        for item in &items {
            error!("{}", item);
        }
        self.errors.append(&mut items);
        if self.errors.len() > MAX_ERRORS {
            let drain = self.errors.len() - MAX_ERRORS;
            self.errors.drain(0..drain);
        }
    }

    fn record_failure(&mut self, err: &ActionError) {
        self.push_errors(vec![err.to_string()]);
        self.set_status(err.to_string());
    }

    /// Account that can sign for this session.
    fn require_signer(&self) -> Result<Address, Precondition> {
        let account = self.state.account().ok_or(Precondition::WalletNotConnected)?;
        match self.contract.signer_address() {
            Some(signer) if signer == account => Ok(account),
            _ => Err(Precondition::CannotSign),
        }
    }

    async fn require_network(&self) -> Result<(), Precondition> {
        let actual = self.contract.chain_id().await.map_err(|err| {
            warn!(?err, "chain id lookup failed");
            Precondition::NetworkUnavailable
        })?;
        if actual != self.expected_chain_id {
            return Err(Precondition::WrongNetwork {
                expected: self.expected_chain_id,
                actual,
            });
        }
        Ok(())
    }

    /// Reads the daily game right before entering; the cached snapshot is
    /// only used when that read fails.
    async fn require_open_game(&self) -> Result<(), Precondition> {
        let completed = match self.contract.current_daily_game().await {
            Ok(daily) => {
                let now_secs = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
                info!(
                    game_id = daily.game_id,
                    is_completed = daily.is_completed,
                    end_time = daily.end_time,
                    has_ended = daily.has_ended(now_secs),
                    "current game state"
                );
                daily.is_completed
            }
            Err(err) => {
                warn!(?err, "could not fetch game state; using cached snapshot");
                self.state.daily().is_some_and(|daily| daily.is_completed)
            }
        };
        if completed {
            return Err(Precondition::GameCompleted);
        }
        Ok(())
    }

    pub async fn approve(&mut self) -> Result<TxHash, ActionError> {
        let result = self.submit_approval().await;
        if let Err(err) = &result {
            self.record_failure(err);
        }
        result
    }

    async fn submit_approval(&mut self) -> Result<TxHash, ActionError> {
        self.require_signer()?;
        self.require_network().await?;
        let tx = self
            .contract
            .approve_game(APPROVAL_AMOUNT)
            .await
            .map_err(|err| ActionError::Submission(err.kind()))?;
        info!(%tx, "approval submitted");
        self.sync.refresh_after(self.settings.approval_settle_delay);
        self.set_status(format!("Approval submitted ({tx})"));
        Ok(tx)
    }

    /// Enters today's game. `code` only matters on a player's first entry.
    pub async fn enter(&mut self, code: Option<ReferralCode>) -> Result<TxHash, ActionError> {
        if let Err(err) = self.entry.begin() {
            // leave the entry already in flight untouched
            let err = ActionError::from(err);
            self.record_failure(&err);
            return Err(err);
        }
        let result = self.submit_entry(code).await;
        if let Err(err) = &result {
            self.entry.abort();
            self.record_failure(err);
        }
        result
    }

    async fn submit_entry(&mut self, code: Option<ReferralCode>) -> Result<TxHash, ActionError> {
        let player = self.require_signer()?;
        self.require_network().await?;
        self.require_open_game().await?;

        let code = self.referral_code_argument(code);
        self.set_status("Simulating entry...");
        self.contract
            .simulate_entry(player, &code)
            .await
            .map_err(|err| {
                warn!(?err, %player, "entry simulation failed");
                ActionError::Rejected(err.kind())
            })?;
        self.entry.simulation_passed();

        check_submission_guards(&self.flags())?;

        self.set_status("Waiting for signature...");
        let tx = self
            .contract
            .enter_daily_game(&code)
            .await
            .map_err(|err| ActionError::Submission(err.kind()))?;

        let fence = self.sync.current_generation() + 1;
        self.state.mark_entered_optimistically(tx, fence);
        self.entry.submitted(tx);
        self.sync.settle_entry(tx, self.settings.entry_settle_delay);
        self.entry.settling();
        info!(%tx, %player, referral = %code, "entry submitted");
        self.set_status(format!("Entry submitted ({tx})"));
        Ok(tx)
    }

    pub async fn create_referral_code(&mut self) -> Result<TxHash, ActionError> {
        let result = self.submit_referral_code().await;
        if let Err(err) = &result {
            self.record_failure(err);
        }
        result
    }

    async fn submit_referral_code(&mut self) -> Result<TxHash, ActionError> {
        self.require_signer()?;
        self.require_network().await?;
        let tx = self
            .contract
            .create_referral_code()
            .await
            .map_err(|err| ActionError::Submission(err.kind()))?;
        info!(%tx, "referral code creation submitted");
        self.sync.refresh_now();
        self.set_status(format!("Referral code requested ({tx})"));
        Ok(tx)
    }
}
