//! Read-only chain access for the projections.
//!
//! Handlers never talk to a node directly; everything goes through
//! [`ChainReader`] so tests can substitute a mock. A reverted call is
//! data, not an error: per-field `Option`s (token metadata) or `Ok(None)`
//! (pot state) model the revert, while `Err` is reserved for transport
//! failures.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Address, U256};

/// ERC20-style metadata reported by a token contract.
///
/// A `None` field means that individual call reverted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Erc20Metadata {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u32>,
}

/// Full parameter struct of one pot as the lottery contract reports it.
///
/// This is the authoritative source for pot fields: creation and
/// close/cancel handlers overwrite their stored record from it rather
/// than trusting event payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PotState {
    /// Raw status as the contract stores it (0 = pending, 1 = open,
    /// 2 = closed, 3 = ended, 4 = cancelled).
    pub status: u8,
    pub prize_token: Address,
    pub prize_amount: U256,
    pub power_token: Address,
    pub power_unit: U256,
    pub sponsor_amount: U256,
    pub start_time: u64,
    pub end_time: u64,
    pub max_per_user: U256,
    pub total_tickets: U256,
    pub use_sqrt_tickets: bool,
    pub note: String,
}

/// Read-only queries into contract state, issued synchronously from the
/// handlers at event-processing time.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Current powers balance of `user` for `token` on the points contract.
    async fn balance_of(&self, contract: Address, user: Address, token: Address) -> Result<U256>;

    /// Full pot parameter struct. `Ok(None)` means the call reverted
    /// (e.g. the pot id does not exist on the contract).
    async fn luckypot_state(&self, contract: Address, pot_id: u64) -> Result<Option<PotState>>;

    /// Prize amounts and claimed flags per win place, snapshotted at end.
    async fn prize_states(&self, contract: Address, pot_id: u64) -> Result<(Vec<U256>, Vec<bool>)>;

    /// name/symbol/decimals of an ERC20 token, each field independently
    /// revert-tolerant.
    async fn erc20_metadata(&self, token: Address) -> Result<Erc20Metadata>;
}
