use crate::{
    flags::DerivedFlags,
    state::ReferralRecord,
};
use contract_abi::MAX_INVITES_PER_WEEK;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReferralCode(String);

impl ReferralCode {
    /// Trims and uppercases user input; blank input is no code at all.
    pub fn normalize(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReferralCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateDecision {
    /// First entry without a code: ask the player for one (they may skip).
    Prompt,
    Proceed(Option<ReferralCode>),
}

impl GateDecision {
    /// Argument passed to `enterDailyGame`; empty when there is no code.
    pub fn code_argument(&self) -> &str {
        match self {
            GateDecision::Proceed(Some(code)) => code.as_str(),
            GateDecision::Proceed(None) | GateDecision::Prompt => "",
        }
    }
}

pub struct ReferralGate;

impl ReferralGate {
    pub fn decide(flags: &DerivedFlags, supplied: Option<ReferralCode>) -> GateDecision {
        match (flags.is_first_entry, supplied) {
            (true, None) => GateDecision::Prompt,
            (true, Some(code)) => GateDecision::Proceed(Some(code)),
            // codes only count on a player's first entry
            (false, _) => GateDecision::Proceed(None),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferralSummary {
    pub code: Option<String>,
    pub used_this_week: u64,
    pub lifetime: u64,
    pub active: bool,
}

impl ReferralSummary {
    pub fn from_record(record: &ReferralRecord) -> Self {
        Self {
            code: record.code.clone(),
            used_this_week: record.weekly_used(),
            lifetime: record.lifetime_referrals,
            active: record.is_active,
        }
    }

    pub fn weekly_label(&self) -> String {
        format!("{}/{}", self.used_this_week, MAX_INVITES_PER_WEEK)
    }
}
