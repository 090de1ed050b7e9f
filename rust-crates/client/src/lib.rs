pub mod config;
pub mod contract;
pub mod controller;
pub mod entry;
pub mod errors;
pub mod flags;
pub mod referral;
pub mod reset;
pub mod session;
pub mod state;
pub mod sync;
pub mod units;
pub mod view;
pub mod wallets;

#[cfg(test)]
pub(crate) mod test_helpers;
