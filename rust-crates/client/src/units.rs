//! Fixed-point token amounts (18 decimals) rendered for people.

use alloy::primitives::U256;
use contract_abi::WEI_PER_TOKEN;

const DISPLAY_DECIMALS: usize = 8;
/// 10^(18 - 8): wei per smallest displayed digit.
const DISPLAY_STEP: U256 = U256::from_limbs([10_000_000_000, 0, 0, 0]);
const DISPLAY_UNIT: U256 = U256::from_limbs([100_000_000, 0, 0, 0]);

/// Rounds to 8 decimals and trims trailing zeros, e.g. `111.11`.
pub fn format_tokens(amount: U256) -> String {
    let half_step = DISPLAY_STEP / U256::from(2u8);
    let scaled = amount.saturating_add(half_step) / DISPLAY_STEP;
    let whole = scaled / DISPLAY_UNIT;
    let frac = (scaled % DISPLAY_UNIT).to::<u64>();
    if frac == 0 {
        return whole.to_string();
    }
    let digits = format!("{frac:0width$}", width = DISPLAY_DECIMALS);
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

/// Entry fee label; a zero fee means the oracle has not produced one yet.
pub fn format_entry_fee(fee: U256) -> String {
    if fee.is_zero() {
        return String::from("100");
    }
    format_tokens(fee)
}

/// Converts a wei amount to whole tokens with a single float rounding.
pub fn tokens_as_f64(amount: U256) -> f64 {
    let whole = amount / WEI_PER_TOKEN;
    let frac = amount % WEI_PER_TOKEN;
    format!("{whole}.{:018}", frac.to::<u64>())
        .parse::<f64>()
        .unwrap_or(f64::MAX)
}

pub fn usd_value(amount: U256, usd_per_token: f64) -> f64 {
    tokens_as_f64(amount) * usd_per_token
}
