use crate::{
    errors::Precondition,
    flags::DerivedFlags,
    sync::SettleOutcome,
    units::format_entry_fee,
};
use alloy::primitives::TxHash;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EntryPhase {
    #[default]
    Idle,
    Simulating,
    AwaitingSignature,
    Submitted,
    Settling,
}

/// Where the locally assumed "entered today" stands against the chain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EntryCommit {
    #[default]
    None,
    Optimistic(TxHash),
    Confirmed(TxHash),
    Reverted(TxHash),
}

#[derive(Clone, Debug, Default)]
pub struct EntrySequencer {
    phase: EntryPhase,
    commit: EntryCommit,
}

impl EntrySequencer {
    pub fn phase(&self) -> EntryPhase {
        self.phase
    }

    pub fn commit(&self) -> EntryCommit {
        self.commit
    }

    pub fn in_progress(&self) -> bool {
        self.phase != EntryPhase::Idle
    }

    pub fn begin(&mut self) -> Result<(), Precondition> {
        if self.in_progress() {
            return Err(Precondition::InProgress);
        }
        self.phase = EntryPhase::Simulating;
        Ok(())
    }

    pub fn simulation_passed(&mut self) {
        self.phase = EntryPhase::AwaitingSignature;
    }

    pub fn submitted(&mut self, tx: TxHash) {
        self.phase = EntryPhase::Submitted;
        self.commit = EntryCommit::Optimistic(tx);
    }

    pub fn settling(&mut self) {
        self.phase = EntryPhase::Settling;
    }

    /// Back to idle after a failure anywhere before broadcast.
    pub fn abort(&mut self) {
        self.phase = EntryPhase::Idle;
    }

    /// Resolves the optimistic commit for `tx`; other transactions are ignored.
    pub fn settle(&mut self, tx: TxHash, outcome: SettleOutcome) -> bool {
        if self.commit != EntryCommit::Optimistic(tx) {
            return false;
        }
        self.commit = match outcome {
            SettleOutcome::Confirmed => EntryCommit::Confirmed(tx),
            SettleOutcome::Failed => EntryCommit::Reverted(tx),
            SettleOutcome::Unknown => EntryCommit::None,
        };
        self.phase = EntryPhase::Idle;
        true
    }
}

/// Cached-state checks repeated right before broadcasting, after the dry run.
pub fn check_submission_guards(flags: &DerivedFlags) -> Result<(), Precondition> {
    if !flags.has_enough_tokens {
        return Err(Precondition::InsufficientBalance {
            required: format_entry_fee(flags.entry_fee),
        });
    }
    if flags.needs_approval {
        return Err(Precondition::NeedsApproval);
    }
    if flags.has_entered_today {
        return Err(Precondition::AlreadyEntered);
    }
    if !flags.entry_status_verified {
        return Err(Precondition::EntryStatusUnverified);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use alloy::primitives::U256;
    use contract_abi::DEFAULT_ENTRY_FEE;

    fn ready_flags() -> DerivedFlags {
        DerivedFlags {
            connected: true,
            has_enough_tokens: true,
            needs_approval: false,
            has_entered_today: false,
            is_first_entry: false,
            entry_status_verified: true,
            entry_fee: DEFAULT_ENTRY_FEE,
        }
    }

    #[test]
    fn begin__rejects_a_second_entry_in_flight() {
        // given
        let mut sequencer = EntrySequencer::default();
        sequencer.begin().unwrap();

        // when
        let second = sequencer.begin();

        // then
        assert_eq!(second, Err(Precondition::InProgress));
        assert_eq!(sequencer.phase(), EntryPhase::Simulating);
    }

    #[test]
    fn settle__walks_the_commit_protocol() {
        // given
        let tx = TxHash::repeat_byte(0x07);
        let mut sequencer = EntrySequencer::default();
        sequencer.begin().unwrap();
        sequencer.simulation_passed();
        sequencer.submitted(tx);
        sequencer.settling();

        // when
        let foreign = sequencer.settle(TxHash::repeat_byte(0x08), SettleOutcome::Failed);
        let own = sequencer.settle(tx, SettleOutcome::Failed);

        // then
        assert!(!foreign);
        assert!(own);
        assert_eq!(sequencer.commit(), EntryCommit::Reverted(tx));
        assert_eq!(sequencer.phase(), EntryPhase::Idle);
    }

    #[test]
    fn settle__unknown_outcome_drops_the_assumption() {
        // given
        let tx = TxHash::repeat_byte(0x09);
        let mut sequencer = EntrySequencer::default();
        sequencer.begin().unwrap();
        sequencer.submitted(tx);

        // when
        sequencer.settle(tx, SettleOutcome::Unknown);

        // then
        assert_eq!(sequencer.commit(), EntryCommit::None);
        assert!(!sequencer.in_progress());
    }

    #[test]
    fn check_submission_guards__reports_first_failing_guard() {
        let mut flags = ready_flags();
        assert_eq!(check_submission_guards(&flags), Ok(()));

        flags.entry_status_verified = false;
        assert_eq!(
            check_submission_guards(&flags),
            Err(Precondition::EntryStatusUnverified)
        );

        flags.has_entered_today = true;
        assert_eq!(check_submission_guards(&flags), Err(Precondition::AlreadyEntered));

        flags.needs_approval = true;
        assert_eq!(check_submission_guards(&flags), Err(Precondition::NeedsApproval));

        flags.has_enough_tokens = false;
        flags.entry_fee = U256::ZERO;
        assert_eq!(
            check_submission_guards(&flags),
            Err(Precondition::InsufficientBalance {
                required: "100".to_string()
            })
        );
    }
}
