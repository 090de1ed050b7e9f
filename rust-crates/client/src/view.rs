//! Plain-text rendering of the derived game state.

use crate::{
    contract::GameContract,
    controller::GameController,
    referral::ReferralSummary,
    reset::Countdown,
    units::{
        format_entry_fee,
        format_tokens,
        usd_value,
    },
};
use alloy::primitives::Address;
use chrono::{
    DateTime,
    Utc,
};
use std::fmt;

const SHOWN_ERRORS: usize = 3;

#[derive(Clone, Debug, PartialEq)]
pub struct GameView {
    pub account: Option<Address>,
    pub block_height: Option<u64>,
    pub jackpot: Option<String>,
    pub jackpot_usd: Option<f64>,
    pub entry_fee: String,
    pub entry_fee_usd: f64,
    pub oracle_healthy: bool,
    pub total_entries: Option<u64>,
    pub daily_error: Option<String>,
    pub countdown: Countdown,
    pub action: String,
    pub action_enabled: bool,
    pub balance: Option<String>,
    pub toppings: Option<u64>,
    pub referral: Option<ReferralSummary>,
    pub status: String,
    pub recent_errors: Vec<String>,
}

impl GameView {
    pub fn capture<C: GameContract>(controller: &GameController<C>, now: DateTime<Utc>) -> Self {
        let state = controller.state();
        let price = state.price();
        let daily = state.daily();
        let errors = controller.errors();
        let skip = errors.len().saturating_sub(SHOWN_ERRORS);
        Self {
            account: state.account(),
            block_height: state.block_height(),
            jackpot: daily.map(|d| format_tokens(d.jackpot)),
            jackpot_usd: daily.map(|d| usd_value(d.jackpot, price.usd_per_token)),
            entry_fee: format_entry_fee(price.entry_fee),
            entry_fee_usd: usd_value(price.entry_fee, price.usd_per_token),
            oracle_healthy: price.oracle_healthy,
            total_entries: daily.map(|d| d.total_entries),
            daily_error: state.daily_error().map(str::to_owned),
            countdown: controller.clock().countdown(now),
            action: controller.action().label(),
            action_enabled: controller
                .action()
                .enabled(controller.entry().in_progress()),
            balance: state.balance().map(|b| format_tokens(b.amount)),
            toppings: state.player().map(|p| p.total_toppings),
            referral: state.referral().map(ReferralSummary::from_record),
            status: controller.status().to_string(),
            recent_errors: errors[skip..].to_vec(),
        }
    }
}

impl fmt::Display for GameView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.account {
            Some(account) => writeln!(f, "Account:       {account}")?,
            None => writeln!(f, "Account:       not connected")?,
        }
        if let Some(height) = self.block_height {
            writeln!(f, "Block:         {height}")?;
        }
        match (&self.jackpot, self.jackpot_usd) {
            (Some(jackpot), Some(usd)) => {
                writeln!(f, "Jackpot:       {jackpot} VMF (${usd:.2})")?
            }
            _ => match &self.daily_error {
                Some(err) => writeln!(f, "Jackpot:       unavailable ({err})")?,
                None => writeln!(f, "Jackpot:       loading...")?,
            },
        }
        let oracle = if self.oracle_healthy {
            "live"
        } else {
            "fallback"
        };
        writeln!(
            f,
            "Entry fee:     {} VMF (${:.2}, {oracle} price)",
            self.entry_fee, self.entry_fee_usd
        )?;
        if let Some(entries) = self.total_entries {
            writeln!(f, "Entries today: {entries}")?;
        }
        writeln!(f, "Next draw in:  {}", self.countdown)?;
        if let Some(balance) = &self.balance {
            writeln!(f, "Balance:       {balance} VMF")?;
        }
        if let Some(toppings) = self.toppings {
            writeln!(f, "Toppings:      {toppings}")?;
        }
        if let Some(referral) = &self.referral {
            let code = referral.code.as_deref().unwrap_or("none");
            writeln!(
                f,
                "Referral:      {code} ({} this week, {} lifetime)",
                referral.weekly_label(),
                referral.lifetime
            )?;
        }
        let marker = if self.action_enabled { "" } else { " (disabled)" };
        writeln!(f, "Action:        [{}]{marker}", self.action)?;
        if !self.status.is_empty() {
            writeln!(f, "Status:        {}", self.status)?;
        }
        for err in &self.recent_errors {
            writeln!(f, "Error:         {err}")?;
        }
        Ok(())
    }
}
