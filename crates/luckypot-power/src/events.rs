//! Power and staking event payloads

use luckypot::etl::{TypeId, TypedBody};
use luckypot_common::{Address, U256};
use serde::{Deserialize, Serialize};
use std::any::Any;

/// Points accrual events emitted by the power contract
///
/// The amount is the delta the contract reported; the stored balance is
/// re-read from the chain on every event rather than derived from these
/// deltas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PowerEvent {
    Credited {
        user: Address,
        token: Address,
        amount: U256,
    },
    Debited {
        user: Address,
        token: Address,
        amount: U256,
    },
}

impl TypedBody for PowerEvent {
    fn envelope_type_id(&self) -> TypeId {
        match self {
            PowerEvent::Credited { .. } => TypeId::new("power.credited"),
            PowerEvent::Debited { .. } => TypeId::new("power.debited"),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Lock and stake events emitted by the miner contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MinerEvent {
    Locked {
        user: Address,
        token: Address,
        amount: U256,
        unlock_time: u64,
        powers: U256,
        lock_index: u64,
    },
    Unlocked {
        user: Address,
        token: Address,
        amount: U256,
    },
    Staked {
        user: Address,
        token: Address,
        amount: U256,
    },
    Unstaked {
        user: Address,
        token: Address,
        amount: U256,
    },
    Claimed {
        user: Address,
        token: Address,
        powers: U256,
    },
}

impl TypedBody for MinerEvent {
    fn envelope_type_id(&self) -> TypeId {
        match self {
            MinerEvent::Locked { .. } => TypeId::new("miner.locked"),
            MinerEvent::Unlocked { .. } => TypeId::new("miner.unlocked"),
            MinerEvent::Staked { .. } => TypeId::new("miner.staked"),
            MinerEvent::Unstaked { .. } => TypeId::new("miner.unstaked"),
            MinerEvent::Claimed { .. } => TypeId::new("miner.claimed"),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
