//! Flags derived from the cached state. Never authoritative: the contract
//! re-checks everything on submission.

use crate::{
    state::GameState,
    units::format_entry_fee,
};
use alloy::primitives::U256;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DerivedFlags {
    pub connected: bool,
    pub has_enough_tokens: bool,
    pub needs_approval: bool,
    pub has_entered_today: bool,
    pub is_first_entry: bool,
    pub entry_status_verified: bool,
    pub entry_fee: U256,
}

impl DerivedFlags {
    pub fn evaluate(state: &GameState) -> Self {
        let entry_fee = state.entry_fee();
        let balance = state.balance().map(|b| b.amount).unwrap_or_default();
        // an unknown allowance does not ask for approval
        let needs_approval = state
            .allowance()
            .is_some_and(|allowance| allowance.amount < entry_fee);
        let entry = state.entry();
        Self {
            connected: state.account().is_some(),
            has_enough_tokens: balance >= entry_fee,
            needs_approval,
            has_entered_today: entry.has_entered_today,
            is_first_entry: state.player().is_some_and(|p| p.is_first_entry()),
            entry_status_verified: entry.verified,
            entry_fee,
        }
    }

    pub fn action(&self) -> ActionState {
        ActionState::from_flags(self)
    }
}

/// The single primary action offered to the player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionState {
    NotConnected,
    AlreadyEntered,
    InsufficientBalance { required: String },
    NeedsApproval,
    ReadyToEnter,
}

impl ActionState {
    pub fn from_flags(flags: &DerivedFlags) -> Self {
        if !flags.connected {
            ActionState::NotConnected
        } else if flags.has_entered_today {
            ActionState::AlreadyEntered
        } else if !flags.has_enough_tokens {
            ActionState::InsufficientBalance {
                required: format_entry_fee(flags.entry_fee),
            }
        } else if flags.needs_approval {
            ActionState::NeedsApproval
        } else {
            ActionState::ReadyToEnter
        }
    }

    pub fn label(&self) -> String {
        match self {
            ActionState::NotConnected => "CONNECT WALLET".to_string(),
            ActionState::AlreadyEntered => "ALREADY ENTERED TODAY".to_string(),
            ActionState::InsufficientBalance { required } => {
                format!("NEED {required} VMF TO PLAY")
            }
            ActionState::NeedsApproval => "APPROVE VMF".to_string(),
            ActionState::ReadyToEnter => "ENTER GAME".to_string(),
        }
    }

    pub fn enabled(&self, in_progress: bool) -> bool {
        match self {
            ActionState::NotConnected => true,
            ActionState::AlreadyEntered | ActionState::InsufficientBalance { .. } => false,
            ActionState::NeedsApproval | ActionState::ReadyToEnter => !in_progress,
        }
    }
}
