//! Test utilities for the Luckypot indexer
//!
//! Provides a programmable in-memory [`ChainReader`] plus small
//! builders for the envelope context handlers receive.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use luckypot::etl::EventContext;
use luckypot_common::chain::{ChainReader, Erc20Metadata, PotState};
use luckypot_common::{Address, TxHash, U256};

/// Shorthand for a test address derived from a small integer.
pub fn addr(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

/// Build an event context keyed by a transaction nonce.
///
/// The block number tracks the nonce so consecutive contexts stay
/// ordered the way a real feed would deliver them.
pub fn event_context(contract: Address, tx: u64, timestamp: u64) -> EventContext {
    EventContext {
        contract,
        tx_hash: TxHash::from_low_u64_be(tx),
        block_number: tx,
        block_timestamp: timestamp,
        log_index: 0,
    }
}

/// A pot parameter struct with plausible defaults for tests.
pub fn sample_pot_state(status: u8) -> PotState {
    PotState {
        status,
        prize_token: addr(0x1000),
        prize_amount: U256::from(10u64).pow(U256::from(18u64)) * U256::from(2u64),
        power_token: addr(0x2000),
        power_unit: U256::from(10u64).pow(U256::from(18u64)),
        sponsor_amount: U256::zero(),
        start_time: 1_700_000_000,
        end_time: 1_700_086_400,
        max_per_user: U256::from(10u64),
        total_tickets: U256::zero(),
        use_sqrt_tickets: false,
        note: "ipfs://QmPotNote".to_string(),
    }
}

#[derive(Default)]
struct Inner {
    balances: HashMap<(Address, Address, Address), U256>,
    pot_states: HashMap<(Address, u64), PotState>,
    pot_state_failures: HashSet<(Address, u64)>,
    prize_states: HashMap<(Address, u64), (Vec<U256>, Vec<bool>)>,
    metadata: HashMap<Address, Erc20Metadata>,
    metadata_failures: HashSet<Address>,
    balance_fetches: usize,
    state_fetches: usize,
    metadata_fetches: usize,
}

/// Programmable in-memory chain for handler tests.
///
/// Unprogrammed reads behave like the real thing at its worst: balances
/// and prize states error (transport failure), pot states revert, token
/// metadata reports nothing. Every read attempt is counted so tests can
/// assert how often a handler went back to the chain.
#[derive(Default)]
pub struct MockChainReader {
    inner: Mutex<Inner>,
}

impl MockChainReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&self, contract: Address, user: Address, token: Address, balance: U256) {
        let mut inner = self.inner.lock().unwrap();
        inner.balances.insert((contract, user, token), balance);
    }

    /// Make `balance_of` fail again for this key (the unprogrammed default).
    pub fn clear_balance(&self, contract: Address, user: Address, token: Address) {
        let mut inner = self.inner.lock().unwrap();
        inner.balances.remove(&(contract, user, token));
    }

    pub fn set_pot_state(&self, contract: Address, pot_id: u64, state: PotState) {
        let mut inner = self.inner.lock().unwrap();
        inner.pot_state_failures.remove(&(contract, pot_id));
        inner.pot_states.insert((contract, pot_id), state);
    }

    /// Make `luckypot_state` revert for this pot (the unprogrammed default).
    pub fn clear_pot_state(&self, contract: Address, pot_id: u64) {
        let mut inner = self.inner.lock().unwrap();
        inner.pot_states.remove(&(contract, pot_id));
        inner.pot_state_failures.remove(&(contract, pot_id));
    }

    /// Make `luckypot_state` fail with a transport error for this pot.
    pub fn fail_pot_state(&self, contract: Address, pot_id: u64) {
        let mut inner = self.inner.lock().unwrap();
        inner.pot_states.remove(&(contract, pot_id));
        inner.pot_state_failures.insert((contract, pot_id));
    }

    pub fn set_prize_states(
        &self,
        contract: Address,
        pot_id: u64,
        amounts: Vec<U256>,
        claims: Vec<bool>,
    ) {
        let mut inner = self.inner.lock().unwrap();
        inner.prize_states.insert((contract, pot_id), (amounts, claims));
    }

    pub fn set_erc20_metadata(&self, token: Address, metadata: Erc20Metadata) {
        let mut inner = self.inner.lock().unwrap();
        inner.metadata_failures.remove(&token);
        inner.metadata.insert(token, metadata);
    }

    /// Make `erc20_metadata` fail with a transport error for this token.
    pub fn fail_erc20_metadata(&self, token: Address) {
        let mut inner = self.inner.lock().unwrap();
        inner.metadata.remove(&token);
        inner.metadata_failures.insert(token);
    }

    pub fn balance_fetches(&self) -> usize {
        self.inner.lock().unwrap().balance_fetches
    }

    pub fn state_fetches(&self) -> usize {
        self.inner.lock().unwrap().state_fetches
    }

    pub fn metadata_fetches(&self) -> usize {
        self.inner.lock().unwrap().metadata_fetches
    }
}

#[async_trait]
impl ChainReader for MockChainReader {
    async fn balance_of(&self, contract: Address, user: Address, token: Address) -> Result<U256> {
        let mut inner = self.inner.lock().unwrap();
        inner.balance_fetches += 1;
        inner
            .balances
            .get(&(contract, user, token))
            .copied()
            .ok_or_else(|| anyhow::anyhow!("no balance programmed for user {user:?} token {token:?}"))
    }

    async fn luckypot_state(&self, contract: Address, pot_id: u64) -> Result<Option<PotState>> {
        let mut inner = self.inner.lock().unwrap();
        inner.state_fetches += 1;
        if inner.pot_state_failures.contains(&(contract, pot_id)) {
            anyhow::bail!("pot state endpoint down for pot {pot_id}");
        }
        Ok(inner.pot_states.get(&(contract, pot_id)).cloned())
    }

    async fn prize_states(&self, contract: Address, pot_id: u64) -> Result<(Vec<U256>, Vec<bool>)> {
        let inner = self.inner.lock().unwrap();
        inner
            .prize_states
            .get(&(contract, pot_id))
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no prize states programmed for pot {pot_id}"))
    }

    async fn erc20_metadata(&self, token: Address) -> Result<Erc20Metadata> {
        let mut inner = self.inner.lock().unwrap();
        inner.metadata_fetches += 1;
        if inner.metadata_failures.contains(&token) {
            anyhow::bail!("metadata endpoint down for token {token:?}");
        }
        Ok(inner.metadata.get(&token).cloned().unwrap_or_default())
    }
}
