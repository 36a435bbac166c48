//! Decoded lottery contract events.

use luckypot::etl::{TypeId, TypedBody};
use luckypot_common::{Address, U256};
use serde::{Deserialize, Serialize};
use std::any::Any;

/// Events emitted by the lottery contract.
///
/// `Created` only signals that a pot exists; the authoritative parameters are
/// re-read from the chain by the projection. The remaining variants carry the
/// full payload the projection needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PotEvent {
    Created {
        pot_id: u64,
        funder: Address,
    },
    Cancelled {
        pot_id: u64,
        caller: Address,
        total_tickets: U256,
    },
    Closed {
        pot_id: u64,
        caller: Address,
        total_tickets: U256,
    },
    TicketCreated {
        pot_id: u64,
        user: Address,
        ticket_id: u64,
        num: U256,
        current_size: U256,
        use_powers: U256,
        note: String,
    },
    Ended {
        pot_id: u64,
        caller: Address,
        draw_numbers: Vec<i64>,
        amounts: Vec<U256>,
    },
    SponsorAdded {
        pot_id: u64,
        user: Address,
        prize_token: Address,
        sponsor_amount: U256,
        note: String,
    },
    SponsorRefunded {
        pot_id: u64,
        sponsor: Address,
        prize_token: Address,
        amount: U256,
    },
    TransferPrize {
        pot_id: u64,
        to: Address,
        prize_token: Address,
        prize_amount: U256,
        win_place: u32,
    },
}

impl TypedBody for PotEvent {
    fn envelope_type_id(&self) -> TypeId {
        match self {
            PotEvent::Created { .. } => TypeId::new("pot.created"),
            PotEvent::Cancelled { .. } => TypeId::new("pot.cancelled"),
            PotEvent::Closed { .. } => TypeId::new("pot.closed"),
            PotEvent::TicketCreated { .. } => TypeId::new("pot.ticket_created"),
            PotEvent::Ended { .. } => TypeId::new("pot.ended"),
            PotEvent::SponsorAdded { .. } => TypeId::new("pot.sponsor_added"),
            PotEvent::SponsorRefunded { .. } => TypeId::new("pot.sponsor_refunded"),
            PotEvent::TransferPrize { .. } => TypeId::new("pot.transfer_prize"),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
