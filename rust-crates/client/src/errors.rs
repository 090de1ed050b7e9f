use thiserror::Error;

/// Failure talking to the chain, before any user-facing interpretation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ContractError {
    #[error("execution reverted: {reason}")]
    Reverted { reason: String },
    #[error("{0}")]
    Rpc(String),
    #[error("no signer available for this session")]
    NoSigner,
}

impl ContractError {
    pub fn rpc(err: impl ToString) -> Self {
        ContractError::Rpc(err.to_string())
    }

    pub fn kind(&self) -> RejectionKind {
        match self {
            ContractError::Reverted { reason } => RejectionKind::classify(reason),
            other => RejectionKind::classify(&other.to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RejectionKind {
    AlreadyEnteredToday,
    GameCompleted,
    GameEnded,
    InvalidTokenPrice,
    ReservesUnavailable,
    InvalidReferralCode,
    InviteLimitReached,
    ReferralAlreadyUsed,
    UserRejected,
    InsufficientGasFunds,
    Other(String),
}

/// Substrings of revert reasons and wallet errors, matched in order.
const KNOWN_REASONS: &[(&str, RejectionKind)] = &[
    ("Already entered today", RejectionKind::AlreadyEnteredToday),
    ("Game completed", RejectionKind::GameCompleted),
    ("Game ended", RejectionKind::GameEnded),
    ("Invalid VMF price", RejectionKind::InvalidTokenPrice),
    ("Reserves call failed", RejectionKind::ReservesUnavailable),
    ("Invalid code", RejectionKind::InvalidReferralCode),
    ("Invite limit reached", RejectionKind::InviteLimitReached),
    ("Already used referral", RejectionKind::ReferralAlreadyUsed),
    ("User rejected", RejectionKind::UserRejected),
    ("insufficient funds", RejectionKind::InsufficientGasFunds),
];

impl RejectionKind {
    pub fn classify(raw: &str) -> Self {
        KNOWN_REASONS
            .iter()
            .find(|(needle, _)| raw.contains(needle))
            .map(|(_, kind)| kind.clone())
            .unwrap_or_else(|| RejectionKind::Other(raw.to_string()))
    }

    pub fn user_message(&self) -> &str {
        match self {
            RejectionKind::AlreadyEnteredToday => "You have already entered today",
            RejectionKind::GameCompleted => "Game has been completed",
            RejectionKind::GameEnded => "Game has ended, waiting for settlement",
            RejectionKind::InvalidTokenPrice => {
                "Price oracle error - SushiSwap pair not configured correctly"
            }
            RejectionKind::ReservesUnavailable => {
                "Cannot fetch VMF price from SushiSwap. Contract needs configuration."
            }
            RejectionKind::InvalidReferralCode => "Invalid referral code",
            RejectionKind::InviteLimitReached => {
                "Referrer has reached their weekly invite limit"
            }
            RejectionKind::ReferralAlreadyUsed => "You have already used a referral code",
            RejectionKind::UserRejected => "Transaction rejected by user",
            RejectionKind::InsufficientGasFunds => "Insufficient funds for gas",
            RejectionKind::Other(raw) if raw.is_empty() => "Unknown contract error",
            RejectionKind::Other(raw) => raw.as_str(),
        }
    }
}

/// Local checks that stop a write before anything reaches the chain.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Precondition {
    #[error("An entry is already in progress")]
    InProgress,
    #[error("Please connect your wallet first")]
    WalletNotConnected,
    #[error("This session is watch-only; unlock a wallet to sign transactions")]
    CannotSign,
    #[error("Please switch to Base network (Chain ID: {expected}); connected to {actual}")]
    WrongNetwork { expected: u64, actual: u64 },
    #[error("Unable to reach the network")]
    NetworkUnavailable,
    #[error("Current game is completed. Please wait for the next game to start.")]
    GameCompleted,
    #[error("Insufficient VMF balance. You need {required} VMF")]
    InsufficientBalance { required: String },
    #[error("Please approve VMF spending first")]
    NeedsApproval,
    #[error("You have already entered today")]
    AlreadyEntered,
    #[error("Entry status could not be verified; try again after the next refresh")]
    EntryStatusUnverified,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error(transparent)]
    Precondition(#[from] Precondition),
    #[error("Transaction would fail: {}", .0.user_message())]
    Rejected(RejectionKind),
    #[error("Transaction failed: {}", .0.user_message())]
    Submission(RejectionKind),
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn classify__maps_known_revert_strings() {
        let cases = [
            ("execution reverted: Already entered today", RejectionKind::AlreadyEnteredToday),
            ("Game completed", RejectionKind::GameCompleted),
            ("revert: Game ended", RejectionKind::GameEnded),
            ("Invalid VMF price", RejectionKind::InvalidTokenPrice),
            ("Reserves call failed", RejectionKind::ReservesUnavailable),
            ("Invalid code", RejectionKind::InvalidReferralCode),
            ("Invite limit reached", RejectionKind::InviteLimitReached),
            ("Already used referral", RejectionKind::ReferralAlreadyUsed),
            ("User rejected the request.", RejectionKind::UserRejected),
            ("insufficient funds for gas * price + value", RejectionKind::InsufficientGasFunds),
        ];
        for (raw, expected) in cases {
            assert_eq!(RejectionKind::classify(raw), expected, "{raw}");
        }
    }

    #[test]
    fn classify__passes_unknown_messages_through() {
        // when
        let kind = RejectionKind::classify("nonce too low");

        // then
        assert_eq!(kind, RejectionKind::Other("nonce too low".to_string()));
        assert_eq!(kind.user_message(), "nonce too low");
    }

    #[test]
    fn action_error__renders_user_facing_message() {
        // given
        let rejected = ActionError::Rejected(RejectionKind::InviteLimitReached);
        let submission = ActionError::Submission(RejectionKind::UserRejected);
        let precondition = ActionError::from(Precondition::InsufficientBalance {
            required: "111.11".to_string(),
        });

        // then
        assert_eq!(
            rejected.to_string(),
            "Transaction would fail: Referrer has reached their weekly invite limit"
        );
        assert_eq!(
            submission.to_string(),
            "Transaction failed: Transaction rejected by user"
        );
        assert_eq!(
            precondition.to_string(),
            "Insufficient VMF balance. You need 111.11 VMF"
        );
    }

    #[test]
    fn contract_error__kind_reads_revert_reason() {
        // given
        let err = ContractError::Reverted {
            reason: "Already entered today".to_string(),
        };

        // then
        assert_eq!(err.kind(), RejectionKind::AlreadyEnteredToday);
        assert_eq!(
            ContractError::rpc("connection refused").kind(),
            RejectionKind::Other("connection refused".to_string())
        );
    }
}
