//! Power accrual and staking projection for the Luckypot indexer
//!
//! Handles the points contract (credit/debit) and the miner contract
//! (lock, unlock, stake, unstake, claim), maintaining per-user per-token
//! ledgers in the shared store.

pub mod events;
pub mod projection;

pub use events::{MinerEvent, PowerEvent};
pub use projection::PowerProjection;
