//! Projected entity records.
//!
//! Every entity is keyed by a natural key built from domain identifiers
//! (addresses, pot ids, tx hashes), never by a surrogate id. Handlers
//! read the current record, fold the event into it, and write it back;
//! the `new` constructors carry the zero-valued defaults a record starts
//! from when an event touches it for the first time.

use luckypot_common::{Address, TxHash, U256};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use thiserror::Error;

use crate::status::PotStatus;

/// Cached token descriptor. Fetched once from the contract, never
/// refreshed (see `registry::ensure_token`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
}

/// Per-user-per-token points balance.
///
/// `balance` is an authoritative overwrite from the chain on every
/// event; `total_credit`/`total_debit` are delta accumulators and only
/// ever increase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPower {
    pub user: Address,
    pub token: Address,
    pub balance: U256,
    pub total_credit: U256,
    pub total_debit: U256,
}

impl UserPower {
    pub fn new(user: Address, token: Address) -> Self {
        Self {
            user,
            token,
            balance: U256::zero(),
            total_credit: U256::zero(),
            total_debit: U256::zero(),
        }
    }
}

/// Immutable snapshot of one lock action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRecord {
    pub user: Address,
    pub token: Address,
    pub lock_index: u64,
    pub amount: U256,
    pub unlock_time: u64,
    pub powers: U256,
    /// Set at creation; unlock flagging is reserved for future events
    /// and not currently exercised.
    pub active: bool,
    pub tx_hash: TxHash,
    pub timestamp: u64,
}

/// Per-user-per-token lock rollup.
///
/// `locking` is maintained purely by increment/decrement with no floor
/// and no reconciliation against `locked`/`unlocked`; a deficit wraps
/// modulo 2^256.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserLockStat {
    pub user: Address,
    pub token: Address,
    pub locked: U256,
    pub unlocked: U256,
    pub locking: U256,
    pub powers: U256,
}

impl UserLockStat {
    pub fn new(user: Address, token: Address) -> Self {
        Self {
            user,
            token,
            locked: U256::zero(),
            unlocked: U256::zero(),
            locking: U256::zero(),
            powers: U256::zero(),
        }
    }
}

/// Discriminates the two stake-record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StakeKind {
    Stake,
    Unstake,
}

#[derive(Debug, Error)]
#[error("invalid stake kind: {0}")]
pub struct InvalidStakeKind(pub String);

impl StakeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stake => "STAKE",
            Self::Unstake => "UNSTAKE",
        }
    }
}

impl ToSql for StakeKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for StakeKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "STAKE" => Ok(Self::Stake),
            "UNSTAKE" => Ok(Self::Unstake),
            other => Err(FromSqlError::Other(Box::new(InvalidStakeKind(
                other.to_string(),
            )))),
        }
    }
}

/// One row per stake/unstake transaction. Keyed by tx hash; the source
/// contract emits at most one such event per transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakeRecord {
    pub tx_hash: TxHash,
    pub user: Address,
    pub token: Address,
    pub kind: StakeKind,
    pub amount: U256,
    pub timestamp: u64,
}

/// Per-user-per-token stake rollup. `staking` is floor-free like
/// `UserLockStat::locking`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStake {
    pub user: Address,
    pub token: Address,
    pub staked: U256,
    pub unstaked: U256,
    pub staking: U256,
    pub claimed_powers: U256,
}

impl UserStake {
    pub fn new(user: Address, token: Address) -> Self {
        Self {
            user,
            token,
            staked: U256::zero(),
            unstaked: U256::zero(),
            staking: U256::zero(),
            claimed_powers: U256::zero(),
        }
    }
}

/// The lottery aggregate. One row per on-chain pot id.
///
/// `winners` and `prize_claims` are fixed at exactly four slots from
/// creation (zero-address / false sentinels), one per win place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pot {
    pub pot_id: u64,
    pub status: PotStatus,
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
    pub funder: Address,
    pub note: String,
    /// Derived human-readable label, e.g. "2 BNB".
    pub title: String,
    /// Link into the token registry; absent when the prize token is the
    /// zero address (native coin).
    pub prize_token_info: Option<Address>,
    pub power_token_info: Option<Address>,
    /// Count of distinct ticket holders.
    pub participants: u32,
    pub winners: Vec<Address>,
    pub prize_claims: Vec<bool>,
    /// Snapshot from the contract at end time.
    pub prize_amounts: Vec<U256>,
    pub draw_numbers: Vec<i32>,
    pub created_at: u64,
    pub tx_hash: TxHash,
}

/// Number of win places; `Pot::winners`/`Pot::prize_claims` always hold
/// exactly this many slots.
pub const WIN_PLACES: usize = 4;

/// Per-pot-per-user ticket rollup. Creation of this row is what bumps
/// the pot's `participants` counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PotParticipant {
    pub pot_id: u64,
    pub user: Address,
    pub total_tickets: U256,
    /// Reserved; initialized zero and not updated by current events.
    pub stake_amount: U256,
}

impl PotParticipant {
    pub fn new(pot_id: u64, user: Address) -> Self {
        Self {
            pot_id,
            user,
            total_tickets: U256::zero(),
            stake_amount: U256::zero(),
        }
    }
}

/// Cumulative sponsor contribution per user per pot, floor-clamped at
/// zero on refunds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PotSponsor {
    pub pot_id: u64,
    pub user: Address,
    pub sponsor_amount: U256,
}

impl PotSponsor {
    pub fn new(pot_id: u64, user: Address) -> Self {
        Self {
            pot_id,
            user,
            sponsor_amount: U256::zero(),
        }
    }
}

/// Immutable snapshot of one ticket purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PotTicket {
    pub pot_id: u64,
    pub ticket_id: u64,
    pub user: Address,
    pub num: U256,
    pub current_size: U256,
    pub use_powers: U256,
    pub note: String,
    pub created_at: u64,
    pub tx_hash: TxHash,
}

/// Audit row appended when a pot is cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PotCancelEvent {
    pub pot_id: u64,
    pub caller: Address,
    pub total_tickets: U256,
    pub created_at: u64,
    pub tx_hash: TxHash,
}

/// Audit row appended when a pot is closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PotCloseEvent {
    pub pot_id: u64,
    pub caller: Address,
    pub total_tickets: U256,
    pub created_at: u64,
    pub tx_hash: TxHash,
}

/// Audit row appended when a pot ends, carrying the randomness draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PotEndEvent {
    pub pot_id: u64,
    pub caller: Address,
    pub draw_numbers: Vec<i32>,
    pub amounts: Vec<U256>,
    pub created_at: u64,
    pub tx_hash: TxHash,
}

/// Audit row appended for every sponsor contribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PotSponsorRecord {
    pub pot_id: u64,
    pub user: Address,
    pub prize_token: Address,
    pub sponsor_amount: U256,
    pub note: String,
    pub created_at: u64,
    pub tx_hash: TxHash,
}

/// One row per claimed win place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimPrizeRecord {
    pub pot_id: u64,
    pub win_place: u32,
    pub user: Address,
    pub prize_token: Address,
    pub prize_amount: U256,
    pub created_at: u64,
    pub tx_hash: TxHash,
}

/// Global per-user rollup across all pots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStat {
    pub user: Address,
    pub create_count: u32,
    pub sponsor_count: u32,
    pub join_count: u32,
    pub win_count: u32,
    pub total_tickets: U256,
}

impl UserStat {
    pub fn new(user: Address) -> Self {
        Self {
            user,
            create_count: 0,
            sponsor_count: 0,
            join_count: 0,
            win_count: 0,
            total_tickets: U256::zero(),
        }
    }
}

/// Per-user-per-token amount rollup across all pots.
///
/// The token key is the raw event address; a row may reference the zero
/// address even though no Token record exists for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserTokenStat {
    pub user: Address,
    pub token: Address,
    pub create_amount: U256,
    pub sponsor_amount: U256,
    pub join_amount: U256,
    pub win_amount: U256,
}

impl UserTokenStat {
    pub fn new(user: Address, token: Address) -> Self {
        Self {
            user,
            token,
            create_amount: U256::zero(),
            sponsor_amount: U256::zero(),
            join_amount: U256::zero(),
            win_amount: U256::zero(),
        }
    }
}

/// Flat descriptor parsed from fetched JSON content, keyed by CID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMetadataRecord {
    pub cid: String,
    pub name: String,
    pub image: String,
    pub description: String,
}
