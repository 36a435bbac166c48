//! Offline chain access backed by a snapshot file.
//!
//! Replay has no node to query, so the read-back calls the handlers
//! issue (pot parameters, balances, prize states, token metadata) are
//! answered from a JSON snapshot captured alongside the event files.
//! Missing entries degrade the way the handlers already tolerate: pot
//! states revert, balances and prize states error, token metadata
//! reports nothing.

use anyhow::{Context, Result};
use async_trait::async_trait;
use luckypot_common::chain::{ChainReader, Erc20Metadata, PotState};
use luckypot_common::{Address, U256};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// On-disk snapshot shape. Every section is optional.
#[derive(Debug, Default, Deserialize)]
pub struct ChainSnapshot {
    #[serde(default)]
    balances: Vec<BalanceEntry>,
    #[serde(default)]
    pots: Vec<PotEntry>,
    #[serde(default)]
    prize_states: Vec<PrizeStateEntry>,
    #[serde(default)]
    tokens: Vec<TokenEntry>,
}

#[derive(Debug, Deserialize)]
struct BalanceEntry {
    contract: Address,
    user: Address,
    token: Address,
    balance: U256,
}

#[derive(Debug, Deserialize)]
struct PotEntry {
    contract: Address,
    pot_id: u64,
    #[serde(flatten)]
    state: PotState,
}

#[derive(Debug, Deserialize)]
struct PrizeStateEntry {
    contract: Address,
    pot_id: u64,
    amounts: Vec<U256>,
    claims: Vec<bool>,
}

#[derive(Debug, Deserialize)]
struct TokenEntry {
    address: Address,
    #[serde(flatten)]
    metadata: Erc20Metadata,
}

/// [`ChainReader`] answering from an immutable snapshot.
pub struct SnapshotChainReader {
    balances: HashMap<(Address, Address, Address), U256>,
    pots: HashMap<(Address, u64), PotState>,
    prize_states: HashMap<(Address, u64), (Vec<U256>, Vec<bool>)>,
    tokens: HashMap<Address, Erc20Metadata>,
}

impl SnapshotChainReader {
    /// A snapshot with no entries: every read degrades gracefully.
    pub fn empty() -> Self {
        Self::from_snapshot(ChainSnapshot::default())
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read(path)
            .with_context(|| format!("reading chain snapshot {}", path.display()))?;
        let snapshot: ChainSnapshot = serde_json::from_slice(&content)
            .with_context(|| format!("parsing chain snapshot {}", path.display()))?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn from_snapshot(snapshot: ChainSnapshot) -> Self {
        Self {
            balances: snapshot
                .balances
                .into_iter()
                .map(|e| ((e.contract, e.user, e.token), e.balance))
                .collect(),
            pots: snapshot
                .pots
                .into_iter()
                .map(|e| ((e.contract, e.pot_id), e.state))
                .collect(),
            prize_states: snapshot
                .prize_states
                .into_iter()
                .map(|e| ((e.contract, e.pot_id), (e.amounts, e.claims)))
                .collect(),
            tokens: snapshot
                .tokens
                .into_iter()
                .map(|e| (e.address, e.metadata))
                .collect(),
        }
    }
}

#[async_trait]
impl ChainReader for SnapshotChainReader {
    async fn balance_of(&self, contract: Address, user: Address, token: Address) -> Result<U256> {
        self.balances
            .get(&(contract, user, token))
            .copied()
            .ok_or_else(|| {
                anyhow::anyhow!("balance not in snapshot for user {user:?} token {token:?}")
            })
    }

    async fn luckypot_state(&self, contract: Address, pot_id: u64) -> Result<Option<PotState>> {
        Ok(self.pots.get(&(contract, pot_id)).cloned())
    }

    async fn prize_states(&self, contract: Address, pot_id: u64) -> Result<(Vec<U256>, Vec<bool>)> {
        self.prize_states
            .get(&(contract, pot_id))
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("prize states not in snapshot for pot {pot_id}"))
    }

    async fn erc20_metadata(&self, token: Address) -> Result<Erc20Metadata> {
        Ok(self.tokens.get(&token).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POT_CONTRACT: &str = "0x00000000000000000000000000000000000000b0";

    fn reader() -> SnapshotChainReader {
        let raw = format!(
            r#"{{
                "pots": [{{
                    "contract": "{POT_CONTRACT}",
                    "pot_id": 1,
                    "status": 1,
                    "prize_token": "0x0000000000000000000000000000000000001000",
                    "prize_amount": "0x1bc16d674ec80000",
                    "power_token": "0x0000000000000000000000000000000000002000",
                    "power_unit": "0xde0b6b3a7640000",
                    "sponsor_amount": "0x0",
                    "start_time": 1700000000,
                    "end_time": 1700086400,
                    "max_per_user": "0xa",
                    "total_tickets": "0x5",
                    "use_sqrt_tickets": false,
                    "note": "ipfs://QmPotNote"
                }}],
                "prize_states": [{{
                    "contract": "{POT_CONTRACT}",
                    "pot_id": 1,
                    "amounts": ["0x1", "0x2"],
                    "claims": [false, true]
                }}],
                "tokens": [{{
                    "address": "0x0000000000000000000000000000000000001000",
                    "name": "Lucky Token",
                    "symbol": "LKT",
                    "decimals": 18
                }}]
            }}"#
        );
        let snapshot: ChainSnapshot = serde_json::from_str(&raw).unwrap();
        SnapshotChainReader::from_snapshot(snapshot)
    }

    fn contract() -> Address {
        Address::from_low_u64_be(0xb0)
    }

    #[tokio::test]
    async fn test_pot_state_lookup() {
        let reader = reader();
        let state = reader.luckypot_state(contract(), 1).await.unwrap().unwrap();
        assert_eq!(state.status, 1);
        assert_eq!(state.total_tickets, U256::from(5u64));
        assert_eq!(state.note, "ipfs://QmPotNote");
    }

    #[tokio::test]
    async fn test_missing_pot_reverts() {
        let reader = reader();
        assert!(reader.luckypot_state(contract(), 2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_balance_errors() {
        let reader = reader();
        let user = Address::from_low_u64_be(1);
        assert!(reader.balance_of(contract(), user, user).await.is_err());
    }

    #[tokio::test]
    async fn test_prize_states_lookup() {
        let reader = reader();
        let (amounts, claims) = reader.prize_states(contract(), 1).await.unwrap();
        assert_eq!(amounts, vec![U256::from(1u64), U256::from(2u64)]);
        assert_eq!(claims, vec![false, true]);
    }

    #[tokio::test]
    async fn test_token_metadata_lookup_and_default() {
        let reader = reader();
        let token = Address::from_low_u64_be(0x1000);
        let metadata = reader.erc20_metadata(token).await.unwrap();
        assert_eq!(metadata.symbol.as_deref(), Some("LKT"));

        // Unknown tokens answer like a contract with reverting getters
        let unknown = reader
            .erc20_metadata(Address::from_low_u64_be(0x9999))
            .await
            .unwrap();
        assert!(unknown.symbol.is_none());
    }
}
