//! Lottery projection
//!
//! Folds lottery contract events into the pot aggregate and its
//! satellite records. Pot parameters are never trusted from event
//! payloads: creation and close/cancel re-read the full struct from the
//! contract, so a re-delivered event converges on the same row. Only
//! the counters (create/join/win/sponsor) accumulate per delivery.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use luckypot::etl::{Envelope, EventContext, Projection, TypeId};
use luckypot_common::chain::ChainReader;
use luckypot_common::{format_wei, Address, U256};
use luckypot_store::{
    ensure_token, ClaimPrizeRecord, Pot, PotCancelEvent, PotCloseEvent, PotEndEvent,
    PotParticipant, PotSponsor, PotSponsorRecord, PotStatus, PotTicket, Store, UserStat,
    UserTokenStat, WIN_PLACES,
};

use crate::events::PotEvent;

/// Label used in pot titles when the prize is paid in the native coin
/// (zero prize token address).
const NATIVE_SYMBOL: &str = "BNB";

/// Decode the contract's raw status byte, keeping `fallback` when the
/// value is outside the known range.
fn decode_status(raw: u8, fallback: PotStatus) -> PotStatus {
    match PotStatus::from_raw(raw) {
        Some(status) => status,
        None => {
            tracing::warn!(
                target: "luckypot_pot::projection",
                raw,
                fallback = %fallback,
                "Unknown pot status from contract, keeping previous"
            );
            fallback
        }
    }
}

/// Projects lottery contract events into the store
pub struct PotProjection {
    store: Store,
    chain: Arc<dyn ChainReader>,
}

impl PotProjection {
    pub fn new(store: Store, chain: Arc<dyn ChainReader>) -> Self {
        Self { store, chain }
    }

    /// Get a reference to the store
    pub fn store(&self) -> &Store {
        &self.store
    }

    fn user_stat(&self, user: Address) -> Result<UserStat> {
        Ok(self
            .store
            .get_user_stat(user)?
            .unwrap_or_else(|| UserStat::new(user)))
    }

    fn user_token_stat(&self, user: Address, token: Address) -> Result<UserTokenStat> {
        Ok(self
            .store
            .get_user_token_stat(user, token)?
            .unwrap_or_else(|| UserTokenStat::new(user, token)))
    }

    async fn on_created(&self, context: &EventContext, pot_id: u64, funder: Address) -> Result<()> {
        self.store.ensure_user(funder)?;

        // The event only signals that the pot exists; the parameters
        // are read back from the contract.
        let state = match self.chain.luckypot_state(context.contract, pot_id).await {
            Ok(Some(state)) => state,
            Ok(None) => {
                tracing::warn!(
                    target: "luckypot_pot::projection",
                    pot_id,
                    "Pot state call reverted, skipping create"
                );
                return Ok(());
            }
            Err(e) => {
                tracing::warn!(
                    target: "luckypot_pot::projection",
                    pot_id,
                    error = %e,
                    "Pot state fetch failed, skipping create"
                );
                return Ok(());
            }
        };

        // Ticket-driven and end-time fields survive re-application
        // untouched; a fresh pot starts with sentinel-filled win slots.
        let (participants, winners, prize_claims, prize_amounts, draw_numbers, fallback_status) =
            match self.store.get_pot(pot_id)? {
                Some(prev) => (
                    prev.participants,
                    prev.winners,
                    prev.prize_claims,
                    prev.prize_amounts,
                    prev.draw_numbers,
                    prev.status,
                ),
                None => (
                    0,
                    vec![Address::zero(); WIN_PLACES],
                    vec![false; WIN_PLACES],
                    Vec::new(),
                    Vec::new(),
                    PotStatus::Pending,
                ),
            };

        let prize_info = ensure_token(&self.store, self.chain.as_ref(), state.prize_token).await?;
        let power_info = ensure_token(&self.store, self.chain.as_ref(), state.power_token).await?;

        let amount_label = format_wei(state.prize_amount);
        let title = match &prize_info {
            Some(token) => format!("{} {}", amount_label, token.symbol),
            None => format!("{amount_label} {NATIVE_SYMBOL}"),
        };

        let pot = Pot {
            pot_id,
            status: decode_status(state.status, fallback_status),
            prize_token: state.prize_token,
            prize_amount: state.prize_amount,
            power_token: state.power_token,
            power_unit: state.power_unit,
            sponsor_amount: state.sponsor_amount,
            start_time: state.start_time,
            end_time: state.end_time,
            max_per_user: state.max_per_user,
            total_tickets: state.total_tickets,
            use_sqrt_tickets: state.use_sqrt_tickets,
            funder,
            note: state.note,
            title,
            prize_token_info: prize_info.map(|t| t.address),
            power_token_info: power_info.map(|t| t.address),
            participants,
            winners,
            prize_claims,
            prize_amounts,
            draw_numbers,
            created_at: context.block_timestamp,
            tx_hash: context.tx_hash,
        };
        self.store.put_pot(&pot)?;

        let mut stat = self.user_stat(funder)?;
        stat.create_count += 1;
        self.store.put_user_stat(&stat)?;

        // Keyed by the raw prize token address, zero included
        let mut token_stat = self.user_token_stat(funder, state.prize_token)?;
        token_stat.create_amount = token_stat.create_amount.saturating_add(state.prize_amount);
        self.store.put_user_token_stat(&token_stat)?;

        tracing::debug!(
            target: "luckypot_pot::projection",
            pot_id,
            funder = %funder,
            title = %pot.title,
            "Created pot"
        );

        Ok(())
    }

    /// Shared tail of the close and cancel handlers: the event payload
    /// is audit data only, status and ticket count come from the
    /// contract. A failed or reverted read keeps the stored values.
    async fn refresh_pot_from_chain(&self, context: &EventContext, pot: &mut Pot) -> Result<()> {
        match self.chain.luckypot_state(context.contract, pot.pot_id).await {
            Ok(Some(state)) => {
                pot.status = decode_status(state.status, pot.status);
                pot.total_tickets = state.total_tickets;
                self.store.put_pot(pot)?;
            }
            Ok(None) => {
                tracing::warn!(
                    target: "luckypot_pot::projection",
                    pot_id = pot.pot_id,
                    "Pot state call reverted, keeping stored status"
                );
            }
            Err(e) => {
                tracing::warn!(
                    target: "luckypot_pot::projection",
                    pot_id = pot.pot_id,
                    error = %e,
                    "Pot state fetch failed, keeping stored status"
                );
            }
        }
        Ok(())
    }

    async fn on_cancelled(
        &self,
        context: &EventContext,
        pot_id: u64,
        caller: Address,
        total_tickets: U256,
    ) -> Result<()> {
        self.store.ensure_user(caller)?;
        let Some(mut pot) = self.store.get_pot(pot_id)? else {
            tracing::debug!(target: "luckypot_pot::projection", pot_id, "Cancel for unknown pot, skipping");
            return Ok(());
        };

        self.store.insert_cancel_event(&PotCancelEvent {
            pot_id,
            caller,
            total_tickets,
            created_at: context.block_timestamp,
            tx_hash: context.tx_hash,
        })?;

        self.refresh_pot_from_chain(context, &mut pot).await
    }

    async fn on_closed(
        &self,
        context: &EventContext,
        pot_id: u64,
        caller: Address,
        total_tickets: U256,
    ) -> Result<()> {
        self.store.ensure_user(caller)?;
        let Some(mut pot) = self.store.get_pot(pot_id)? else {
            tracing::debug!(target: "luckypot_pot::projection", pot_id, "Close for unknown pot, skipping");
            return Ok(());
        };

        self.store.insert_close_event(&PotCloseEvent {
            pot_id,
            caller,
            total_tickets,
            created_at: context.block_timestamp,
            tx_hash: context.tx_hash,
        })?;

        self.refresh_pot_from_chain(context, &mut pot).await
    }

    #[allow(clippy::too_many_arguments)]
    async fn on_ticket_created(
        &self,
        context: &EventContext,
        pot_id: u64,
        user: Address,
        ticket_id: u64,
        num: U256,
        current_size: U256,
        use_powers: U256,
        note: &str,
    ) -> Result<()> {
        self.store.ensure_user(user)?;
        let Some(mut pot) = self.store.get_pot(pot_id)? else {
            tracing::debug!(target: "luckypot_pot::projection", pot_id, "Ticket for unknown pot, skipping");
            return Ok(());
        };

        self.store.put_ticket(&PotTicket {
            pot_id,
            ticket_id,
            user,
            num,
            current_size,
            use_powers,
            note: note.to_string(),
            created_at: context.block_timestamp,
            tx_hash: context.tx_hash,
        })?;

        // The contract reports its running total with every ticket
        pot.total_tickets = current_size;

        let mut participant = match self.store.get_participant(pot_id, user)? {
            Some(participant) => participant,
            None => {
                pot.participants += 1;
                PotParticipant::new(pot_id, user)
            }
        };
        participant.total_tickets = participant.total_tickets.saturating_add(num);
        self.store.put_participant(&participant)?;
        self.store.put_pot(&pot)?;

        let mut stat = self.user_stat(user)?;
        stat.join_count += 1;
        stat.total_tickets = stat.total_tickets.saturating_add(num);
        self.store.put_user_stat(&stat)?;

        // Powers spent only roll up when the pot runs on a registered
        // power token
        if let Some(power_info) =
            ensure_token(&self.store, self.chain.as_ref(), pot.power_token).await?
        {
            let mut token_stat = self.user_token_stat(user, power_info.address)?;
            token_stat.join_amount = token_stat.join_amount.saturating_add(use_powers);
            self.store.put_user_token_stat(&token_stat)?;
        }

        tracing::debug!(
            target: "luckypot_pot::projection",
            pot_id,
            ticket_id,
            user = %user,
            num = %num,
            "Recorded ticket"
        );

        Ok(())
    }

    async fn on_ended(
        &self,
        context: &EventContext,
        pot_id: u64,
        caller: Address,
        draw_numbers: &[i64],
        amounts: &[U256],
    ) -> Result<()> {
        self.store.ensure_user(caller)?;
        let Some(mut pot) = self.store.get_pot(pot_id)? else {
            tracing::debug!(target: "luckypot_pot::projection", pot_id, "End for unknown pot, skipping");
            return Ok(());
        };

        let draws: Vec<i32> = draw_numbers.iter().map(|n| *n as i32).collect();

        self.store.insert_end_event(&PotEndEvent {
            pot_id,
            caller,
            draw_numbers: draws.clone(),
            amounts: amounts.to_vec(),
            created_at: context.block_timestamp,
            tx_hash: context.tx_hash,
        })?;

        // End is the one transition the handler forces itself
        pot.status = PotStatus::Ended;
        pot.draw_numbers = draws;

        match self.chain.prize_states(context.contract, pot_id).await {
            Ok((prize_amounts, prize_claims)) => {
                pot.prize_amounts = prize_amounts;
                pot.prize_claims = prize_claims;
            }
            Err(e) => {
                tracing::warn!(
                    target: "luckypot_pot::projection",
                    pot_id,
                    error = %e,
                    "Prize state fetch failed, keeping stored prize arrays"
                );
            }
        }

        // One slot per win place, whatever the contract answered
        pot.prize_claims.resize(WIN_PLACES, false);
        pot.winners.resize(WIN_PLACES, Address::zero());
        self.store.put_pot(&pot)?;

        tracing::debug!(
            target: "luckypot_pot::projection",
            pot_id,
            caller = %caller,
            "Pot ended"
        );

        Ok(())
    }

    async fn on_sponsor_added(
        &self,
        context: &EventContext,
        pot_id: u64,
        user: Address,
        prize_token: Address,
        sponsor_amount: U256,
        note: &str,
    ) -> Result<()> {
        self.store.ensure_user(user)?;
        let Some(mut pot) = self.store.get_pot(pot_id)? else {
            tracing::debug!(target: "luckypot_pot::projection", pot_id, "Sponsor for unknown pot, skipping");
            return Ok(());
        };

        self.store.insert_sponsor_record(&PotSponsorRecord {
            pot_id,
            user,
            prize_token,
            sponsor_amount,
            note: note.to_string(),
            created_at: context.block_timestamp,
            tx_hash: context.tx_hash,
        })?;

        pot.sponsor_amount = pot.sponsor_amount.saturating_add(sponsor_amount);
        self.store.put_pot(&pot)?;

        let mut stat = self.user_stat(user)?;
        stat.sponsor_count += 1;
        self.store.put_user_stat(&stat)?;

        let mut sponsor = self
            .store
            .get_sponsor(pot_id, user)?
            .unwrap_or_else(|| PotSponsor::new(pot_id, user));
        sponsor.sponsor_amount = sponsor.sponsor_amount.saturating_add(sponsor_amount);
        self.store.put_sponsor(&sponsor)?;

        ensure_token(&self.store, self.chain.as_ref(), prize_token).await?;
        let mut token_stat = self.user_token_stat(user, prize_token)?;
        token_stat.sponsor_amount = token_stat.sponsor_amount.saturating_add(sponsor_amount);
        self.store.put_user_token_stat(&token_stat)?;

        Ok(())
    }

    async fn on_sponsor_refunded(
        &self,
        pot_id: u64,
        sponsor: Address,
        prize_token: Address,
        amount: U256,
    ) -> Result<()> {
        self.store.ensure_user(sponsor)?;
        let Some(mut pot) = self.store.get_pot(pot_id)? else {
            tracing::debug!(target: "luckypot_pot::projection", pot_id, "Refund for unknown pot, skipping");
            return Ok(());
        };

        // Three independent ledgers, each clamped at zero
        pot.sponsor_amount = pot.sponsor_amount.saturating_sub(amount);
        self.store.put_pot(&pot)?;

        let mut row = self
            .store
            .get_sponsor(pot_id, sponsor)?
            .unwrap_or_else(|| PotSponsor::new(pot_id, sponsor));
        row.sponsor_amount = row.sponsor_amount.saturating_sub(amount);
        self.store.put_sponsor(&row)?;

        ensure_token(&self.store, self.chain.as_ref(), prize_token).await?;
        let mut token_stat = self.user_token_stat(sponsor, prize_token)?;
        token_stat.sponsor_amount = token_stat.sponsor_amount.saturating_sub(amount);
        self.store.put_user_token_stat(&token_stat)?;

        Ok(())
    }

    async fn on_transfer_prize(
        &self,
        context: &EventContext,
        pot_id: u64,
        to: Address,
        prize_token: Address,
        prize_amount: U256,
        win_place: u32,
    ) -> Result<()> {
        self.store.ensure_user(to)?;
        let Some(mut pot) = self.store.get_pot(pot_id)? else {
            tracing::debug!(target: "luckypot_pot::projection", pot_id, "Claim for unknown pot, skipping");
            return Ok(());
        };

        if pot.status != PotStatus::Ended {
            tracing::debug!(
                target: "luckypot_pot::projection",
                pot_id,
                status = %pot.status,
                "Claim before pot ended, skipping"
            );
            return Ok(());
        }

        pot.winners.resize(WIN_PLACES, Address::zero());
        pot.prize_claims.resize(WIN_PLACES, false);

        // Win places are 1-based on chain
        let slot = win_place as usize;
        if (1..=WIN_PLACES).contains(&slot) {
            pot.winners[slot - 1] = to;
            pot.prize_claims[slot - 1] = true;
        } else {
            tracing::warn!(
                target: "luckypot_pot::projection",
                pot_id,
                win_place,
                "Win place outside the slot range, recording claim only"
            );
        }
        self.store.put_pot(&pot)?;

        self.store.put_claim_record(&ClaimPrizeRecord {
            pot_id,
            win_place,
            user: to,
            prize_token,
            prize_amount,
            created_at: context.block_timestamp,
            tx_hash: context.tx_hash,
        })?;

        let mut stat = self.user_stat(to)?;
        stat.win_count += 1;
        self.store.put_user_stat(&stat)?;

        ensure_token(&self.store, self.chain.as_ref(), prize_token).await?;
        let mut token_stat = self.user_token_stat(to, prize_token)?;
        token_stat.win_amount = token_stat.win_amount.saturating_add(prize_amount);
        self.store.put_user_token_stat(&token_stat)?;

        tracing::debug!(
            target: "luckypot_pot::projection",
            pot_id,
            win_place,
            to = %to,
            "Recorded prize claim"
        );

        Ok(())
    }

    async fn apply_pot(&self, event: &PotEvent, context: &EventContext) -> Result<()> {
        match event {
            PotEvent::Created { pot_id, funder } => {
                self.on_created(context, *pot_id, *funder).await
            }
            PotEvent::Cancelled {
                pot_id,
                caller,
                total_tickets,
            } => {
                self.on_cancelled(context, *pot_id, *caller, *total_tickets)
                    .await
            }
            PotEvent::Closed {
                pot_id,
                caller,
                total_tickets,
            } => {
                self.on_closed(context, *pot_id, *caller, *total_tickets)
                    .await
            }
            PotEvent::TicketCreated {
                pot_id,
                user,
                ticket_id,
                num,
                current_size,
                use_powers,
                note,
            } => {
                self.on_ticket_created(
                    context,
                    *pot_id,
                    *user,
                    *ticket_id,
                    *num,
                    *current_size,
                    *use_powers,
                    note,
                )
                .await
            }
            PotEvent::Ended {
                pot_id,
                caller,
                draw_numbers,
                amounts,
            } => {
                self.on_ended(context, *pot_id, *caller, draw_numbers, amounts)
                    .await
            }
            PotEvent::SponsorAdded {
                pot_id,
                user,
                prize_token,
                sponsor_amount,
                note,
            } => {
                self.on_sponsor_added(context, *pot_id, *user, *prize_token, *sponsor_amount, note)
                    .await
            }
            PotEvent::SponsorRefunded {
                pot_id,
                sponsor,
                prize_token,
                amount,
            } => {
                self.on_sponsor_refunded(*pot_id, *sponsor, *prize_token, *amount)
                    .await
            }
            PotEvent::TransferPrize {
                pot_id,
                to,
                prize_token,
                prize_amount,
                win_place,
            } => {
                self.on_transfer_prize(
                    context,
                    *pot_id,
                    *to,
                    *prize_token,
                    *prize_amount,
                    *win_place,
                )
                .await
            }
        }
    }
}

#[async_trait]
impl Projection for PotProjection {
    fn name(&self) -> &str {
        "pot"
    }

    fn interested_types(&self) -> Vec<TypeId> {
        vec![
            TypeId::new("pot.created"),
            TypeId::new("pot.cancelled"),
            TypeId::new("pot.closed"),
            TypeId::new("pot.ticket_created"),
            TypeId::new("pot.ended"),
            TypeId::new("pot.sponsor_added"),
            TypeId::new("pot.sponsor_refunded"),
            TypeId::new("pot.transfer_prize"),
        ]
    }

    async fn apply(&self, envelope: &Envelope) -> Result<()> {
        if let Some(event) = envelope.downcast_ref::<PotEvent>() {
            return self.apply_pot(event, &envelope.context).await;
        }
        Ok(())
    }
}
