//! Power and staking projection
//!
//! Folds point accrual, lock and stake events into per-user ledgers.
//! Balances are authoritative reads from the chain on every event; the
//! credit/debit accumulators are event deltas and only ever grow.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use luckypot::etl::{Envelope, EventContext, Projection, TypeId};
use luckypot_common::chain::ChainReader;
use luckypot_common::{Address, U256};
use luckypot_store::{
    ensure_token, LockRecord, StakeKind, StakeRecord, Store, UserLockStat, UserPower, UserStake,
};

use crate::events::{MinerEvent, PowerEvent};

/// Projects power and miner contract events into the store
pub struct PowerProjection {
    store: Store,
    chain: Arc<dyn ChainReader>,
}

impl PowerProjection {
    pub fn new(store: Store, chain: Arc<dyn ChainReader>) -> Self {
        Self { store, chain }
    }

    /// Get a reference to the store
    pub fn store(&self) -> &Store {
        &self.store
    }

    async fn apply_power(&self, event: &PowerEvent, context: &EventContext) -> Result<()> {
        match *event {
            PowerEvent::Credited { user, token, amount } => {
                self.apply_power_change(context, user, token, amount, true).await
            }
            PowerEvent::Debited { user, token, amount } => {
                self.apply_power_change(context, user, token, amount, false).await
            }
        }
    }

    /// Shared body of the credit and debit handlers.
    ///
    /// The balance column is overwritten from `balance_of`, so it heals
    /// itself after missed events; the accumulators do not.
    async fn apply_power_change(
        &self,
        context: &EventContext,
        user: Address,
        token: Address,
        amount: U256,
        credit: bool,
    ) -> Result<()> {
        self.store.ensure_user(user)?;
        ensure_token(&self.store, self.chain.as_ref(), token).await?;

        let mut power = self
            .store
            .get_user_power(user, token)?
            .unwrap_or_else(|| UserPower::new(user, token));

        match self.chain.balance_of(context.contract, user, token).await {
            Ok(balance) => power.balance = balance,
            Err(e) => {
                tracing::warn!(
                    target: "luckypot_power::projection",
                    user = %user,
                    token = %token,
                    error = %e,
                    "Balance refresh failed, keeping stored balance"
                );
            }
        }

        if !amount.is_zero() {
            if credit {
                power.total_credit = power.total_credit.saturating_add(amount);
            } else {
                power.total_debit = power.total_debit.saturating_add(amount);
            }
        }

        self.store.put_user_power(&power)?;

        tracing::debug!(
            target: "luckypot_power::projection",
            user = %user,
            token = %token,
            amount = %amount,
            credit,
            "Applied power change"
        );

        Ok(())
    }

    async fn apply_miner(&self, event: &MinerEvent, context: &EventContext) -> Result<()> {
        match *event {
            MinerEvent::Locked {
                user,
                token,
                amount,
                unlock_time,
                powers,
                lock_index,
            } => {
                self.on_locked(context, user, token, amount, unlock_time, powers, lock_index)
                    .await
            }
            MinerEvent::Unlocked { user, token, amount } => {
                self.on_unlocked(user, token, amount).await
            }
            MinerEvent::Staked { user, token, amount } => {
                self.on_stake(context, user, token, amount, StakeKind::Stake).await
            }
            MinerEvent::Unstaked { user, token, amount } => {
                self.on_stake(context, user, token, amount, StakeKind::Unstake).await
            }
            MinerEvent::Claimed { user, token, powers } => {
                self.on_claimed(user, token, powers).await
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn on_locked(
        &self,
        context: &EventContext,
        user: Address,
        token: Address,
        amount: U256,
        unlock_time: u64,
        powers: U256,
        lock_index: u64,
    ) -> Result<()> {
        self.store.ensure_user(user)?;
        ensure_token(&self.store, self.chain.as_ref(), token).await?;

        self.store.put_lock_record(&LockRecord {
            user,
            token,
            lock_index,
            amount,
            unlock_time,
            powers,
            active: true,
            tx_hash: context.tx_hash,
            timestamp: context.block_timestamp,
        })?;

        let mut stat = self
            .store
            .get_user_lock_stat(user, token)?
            .unwrap_or_else(|| UserLockStat::new(user, token));
        stat.locked = stat.locked.saturating_add(amount);
        stat.locking = stat.locking.overflowing_add(amount).0;
        stat.powers = stat.powers.saturating_add(powers);
        self.store.put_user_lock_stat(&stat)?;

        Ok(())
    }

    async fn on_unlocked(&self, user: Address, token: Address, amount: U256) -> Result<()> {
        self.store.ensure_user(user)?;
        ensure_token(&self.store, self.chain.as_ref(), token).await?;

        let mut stat = self
            .store
            .get_user_lock_stat(user, token)?
            .unwrap_or_else(|| UserLockStat::new(user, token));
        stat.unlocked = stat.unlocked.saturating_add(amount);
        // Unreconciled decrement, wraps when unlocks outrun locks
        stat.locking = stat.locking.overflowing_sub(amount).0;
        self.store.put_user_lock_stat(&stat)?;

        Ok(())
    }

    async fn on_stake(
        &self,
        context: &EventContext,
        user: Address,
        token: Address,
        amount: U256,
        kind: StakeKind,
    ) -> Result<()> {
        self.store.ensure_user(user)?;
        ensure_token(&self.store, self.chain.as_ref(), token).await?;

        // One stake/unstake event per transaction, keyed by its hash
        self.store.put_stake_record(&StakeRecord {
            tx_hash: context.tx_hash,
            user,
            token,
            kind,
            amount,
            timestamp: context.block_timestamp,
        })?;

        let mut stake = self
            .store
            .get_user_stake(user, token)?
            .unwrap_or_else(|| UserStake::new(user, token));
        match kind {
            StakeKind::Stake => {
                stake.staked = stake.staked.saturating_add(amount);
                stake.staking = stake.staking.overflowing_add(amount).0;
            }
            StakeKind::Unstake => {
                stake.unstaked = stake.unstaked.saturating_add(amount);
                stake.staking = stake.staking.overflowing_sub(amount).0;
            }
        }
        self.store.put_user_stake(&stake)?;

        Ok(())
    }

    async fn on_claimed(&self, user: Address, token: Address, powers: U256) -> Result<()> {
        self.store.ensure_user(user)?;
        ensure_token(&self.store, self.chain.as_ref(), token).await?;

        let mut stake = self
            .store
            .get_user_stake(user, token)?
            .unwrap_or_else(|| UserStake::new(user, token));
        stake.claimed_powers = stake.claimed_powers.saturating_add(powers);
        self.store.put_user_stake(&stake)?;

        Ok(())
    }
}

#[async_trait]
impl Projection for PowerProjection {
    fn name(&self) -> &str {
        "power"
    }

    fn interested_types(&self) -> Vec<TypeId> {
        vec![
            TypeId::new("power.credited"),
            TypeId::new("power.debited"),
            TypeId::new("miner.locked"),
            TypeId::new("miner.unlocked"),
            TypeId::new("miner.staked"),
            TypeId::new("miner.unstaked"),
            TypeId::new("miner.claimed"),
        ]
    }

    async fn apply(&self, envelope: &Envelope) -> Result<()> {
        if let Some(event) = envelope.downcast_ref::<PowerEvent>() {
            return self.apply_power(event, &envelope.context).await;
        }
        if let Some(event) = envelope.downcast_ref::<MinerEvent>() {
            return self.apply_miner(event, &envelope.context).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use luckypot_test_utils::{addr, event_context, MockChainReader};

    const POWER_CONTRACT: u64 = 0xC0;

    struct Fixture {
        store: Store,
        chain: Arc<MockChainReader>,
        projection: PowerProjection,
    }

    fn fixture() -> Fixture {
        let store = Store::new(":memory:").unwrap();
        let chain = Arc::new(MockChainReader::new());
        let projection = PowerProjection::new(store.clone(), chain.clone());
        Fixture {
            store,
            chain,
            projection,
        }
    }

    fn power_envelope(event: PowerEvent, tx: u64) -> Envelope {
        Envelope::new(
            format!("power_{tx}"),
            Box::new(event),
            event_context(addr(POWER_CONTRACT), tx, 1_700_000_000 + tx),
        )
    }

    fn miner_envelope(event: MinerEvent, tx: u64) -> Envelope {
        Envelope::new(
            format!("miner_{tx}"),
            Box::new(event),
            event_context(addr(POWER_CONTRACT), tx, 1_700_000_000 + tx),
        )
    }

    #[tokio::test]
    async fn test_credit_overwrites_balance_and_accumulates() {
        let f = fixture();
        let user = addr(1);
        let token = addr(2);

        f.chain
            .set_balance(addr(POWER_CONTRACT), user, token, U256::from(500u64));
        f.projection
            .apply(&power_envelope(
                PowerEvent::Credited {
                    user,
                    token,
                    amount: U256::from(100u64),
                },
                1,
            ))
            .await
            .unwrap();

        let power = f.store.get_user_power(user, token).unwrap().unwrap();
        assert_eq!(power.balance, U256::from(500u64));
        assert_eq!(power.total_credit, U256::from(100u64));
        assert_eq!(power.total_debit, U256::zero());

        // Debit lowers the live balance but only grows total_debit
        f.chain
            .set_balance(addr(POWER_CONTRACT), user, token, U256::from(450u64));
        f.projection
            .apply(&power_envelope(
                PowerEvent::Debited {
                    user,
                    token,
                    amount: U256::from(30u64),
                },
                2,
            ))
            .await
            .unwrap();

        let power = f.store.get_user_power(user, token).unwrap().unwrap();
        assert_eq!(power.balance, U256::from(450u64));
        assert_eq!(power.total_credit, U256::from(100u64));
        assert_eq!(power.total_debit, U256::from(30u64));

        // The handler registered the user and the raw token address
        assert!(f.store.has_user(user).unwrap());
        assert!(f.store.get_token(token).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_balance_failure_keeps_stored_balance() {
        let f = fixture();
        let user = addr(1);
        let token = addr(2);

        f.chain
            .set_balance(addr(POWER_CONTRACT), user, token, U256::from(100u64));
        f.projection
            .apply(&power_envelope(
                PowerEvent::Credited {
                    user,
                    token,
                    amount: U256::from(100u64),
                },
                1,
            ))
            .await
            .unwrap();

        // Endpoint goes away, accumulators still apply
        f.chain.clear_balance(addr(POWER_CONTRACT), user, token);
        f.projection
            .apply(&power_envelope(
                PowerEvent::Debited {
                    user,
                    token,
                    amount: U256::from(40u64),
                },
                2,
            ))
            .await
            .unwrap();

        let power = f.store.get_user_power(user, token).unwrap().unwrap();
        assert_eq!(power.balance, U256::from(100u64));
        assert_eq!(power.total_debit, U256::from(40u64));
    }

    #[tokio::test]
    async fn test_zero_amount_leaves_accumulators_untouched() {
        let f = fixture();
        let user = addr(1);
        let token = addr(2);

        f.chain
            .set_balance(addr(POWER_CONTRACT), user, token, U256::from(7u64));
        f.projection
            .apply(&power_envelope(
                PowerEvent::Credited {
                    user,
                    token,
                    amount: U256::zero(),
                },
                1,
            ))
            .await
            .unwrap();

        let power = f.store.get_user_power(user, token).unwrap().unwrap();
        assert_eq!(power.balance, U256::from(7u64));
        assert_eq!(power.total_credit, U256::zero());
    }

    #[tokio::test]
    async fn test_locked_writes_record_and_stats() {
        let f = fixture();
        let user = addr(1);
        let token = addr(3);

        f.projection
            .apply(&miner_envelope(
                MinerEvent::Locked {
                    user,
                    token,
                    amount: U256::from(1000u64),
                    unlock_time: 1_800_000_000,
                    powers: U256::from(50u64),
                    lock_index: 3,
                },
                9,
            ))
            .await
            .unwrap();

        let record = f.store.get_lock_record(user, token, 3).unwrap().unwrap();
        assert!(record.active);
        assert_eq!(record.amount, U256::from(1000u64));
        assert_eq!(record.unlock_time, 1_800_000_000);
        assert_eq!(record.timestamp, 1_700_000_009);

        let stat = f.store.get_user_lock_stat(user, token).unwrap().unwrap();
        assert_eq!(stat.locked, U256::from(1000u64));
        assert_eq!(stat.locking, U256::from(1000u64));
        assert_eq!(stat.powers, U256::from(50u64));
    }

    #[tokio::test]
    async fn test_unlock_is_floor_free() {
        let f = fixture();
        let user = addr(1);
        let token = addr(3);

        f.projection
            .apply(&miner_envelope(
                MinerEvent::Locked {
                    user,
                    token,
                    amount: U256::from(100u64),
                    unlock_time: 1_800_000_000,
                    powers: U256::zero(),
                    lock_index: 0,
                },
                1,
            ))
            .await
            .unwrap();

        // Unlock more than was ever locked: locking is not clamped, the
        // stored value wraps like the counter it mirrors
        f.projection
            .apply(&miner_envelope(
                MinerEvent::Unlocked {
                    user,
                    token,
                    amount: U256::from(150u64),
                },
                2,
            ))
            .await
            .unwrap();

        let stat = f.store.get_user_lock_stat(user, token).unwrap().unwrap();
        assert_eq!(stat.locked, U256::from(100u64));
        assert_eq!(stat.unlocked, U256::from(150u64));
        assert_eq!(
            stat.locking,
            U256::from(100u64).overflowing_sub(U256::from(150u64)).0
        );
    }

    #[tokio::test]
    async fn test_stake_and_unstake_records() {
        let f = fixture();
        let user = addr(4);
        let token = addr(5);

        f.projection
            .apply(&miner_envelope(
                MinerEvent::Staked {
                    user,
                    token,
                    amount: U256::from(100u64),
                },
                11,
            ))
            .await
            .unwrap();
        f.projection
            .apply(&miner_envelope(
                MinerEvent::Unstaked {
                    user,
                    token,
                    amount: U256::from(40u64),
                },
                12,
            ))
            .await
            .unwrap();

        let staked = f
            .store
            .get_stake_record(luckypot_common::TxHash::from_low_u64_be(11))
            .unwrap()
            .unwrap();
        assert_eq!(staked.kind, StakeKind::Stake);
        assert_eq!(staked.amount, U256::from(100u64));

        let unstaked = f
            .store
            .get_stake_record(luckypot_common::TxHash::from_low_u64_be(12))
            .unwrap()
            .unwrap();
        assert_eq!(unstaked.kind, StakeKind::Unstake);

        let stake = f.store.get_user_stake(user, token).unwrap().unwrap();
        assert_eq!(stake.staked, U256::from(100u64));
        assert_eq!(stake.unstaked, U256::from(40u64));
        assert_eq!(stake.staking, U256::from(60u64));
    }

    #[tokio::test]
    async fn test_claimed_accumulates_powers() {
        let f = fixture();
        let user = addr(4);
        let token = addr(5);

        for (tx, powers) in [(21u64, 10u64), (22, 5)] {
            f.projection
                .apply(&miner_envelope(
                    MinerEvent::Claimed {
                        user,
                        token,
                        powers: U256::from(powers),
                    },
                    tx,
                ))
                .await
                .unwrap();
        }

        let stake = f.store.get_user_stake(user, token).unwrap().unwrap();
        assert_eq!(stake.claimed_powers, U256::from(15u64));
        assert_eq!(stake.staked, U256::zero());
    }
}
