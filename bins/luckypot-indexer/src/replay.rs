//! JSONL event replay.
//!
//! One JSON object per line; files replay in filename order and lines
//! in file order, reproducing the total delivery order the projections
//! assume. Each record carries the envelope context inline and tags its
//! payload with the emitting contract family (`pot`, `power`, `miner`).

use anyhow::{Context, Result};
use luckypot::etl::{Envelope, EventContext, MultiProjection, TypedBody};
use luckypot_common::{Address, TxHash};
use luckypot_pot::PotEvent;
use luckypot_power::{MinerEvent, PowerEvent};
use luckypot_store::Store;
use serde::Deserialize;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
enum ReplayEvent {
    Pot(PotEvent),
    Power(PowerEvent),
    Miner(MinerEvent),
}

/// One replayable event as serialized in the feed files.
#[derive(Debug, Deserialize)]
struct ReplayRecord {
    #[serde(default)]
    id: Option<String>,
    contract: Address,
    tx_hash: TxHash,
    block_number: u64,
    block_timestamp: u64,
    #[serde(default)]
    log_index: u32,
    event: ReplayEvent,
}

impl ReplayRecord {
    fn into_envelope(self) -> Envelope {
        // Fall back to the feed's natural id, tx hash plus log index
        let id = self.id.unwrap_or_else(|| {
            format!(
                "0x{}:{}",
                hex::encode(self.tx_hash.as_bytes()),
                self.log_index
            )
        });
        let context = EventContext {
            contract: self.contract,
            tx_hash: self.tx_hash,
            block_number: self.block_number,
            block_timestamp: self.block_timestamp,
            log_index: self.log_index,
        };
        let body: Box<dyn TypedBody> = match self.event {
            ReplayEvent::Pot(event) => Box::new(event),
            ReplayEvent::Power(event) => Box::new(event),
            ReplayEvent::Miner(event) => Box::new(event),
        };
        Envelope::new(id, body, context)
    }
}

/// Replay every `.jsonl` file under `dir`, filtered to `contracts` when
/// the list is non-empty. Returns the number of events applied.
pub async fn replay_dir(
    projections: &MultiProjection,
    dir: &Path,
    contracts: &[Address],
) -> Result<u64> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("reading events directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "jsonl"))
        .collect();
    files.sort();

    let mut applied = 0u64;
    for path in &files {
        applied += replay_file(projections, path, contracts).await?;
    }
    Ok(applied)
}

async fn replay_file(
    projections: &MultiProjection,
    path: &Path,
    contracts: &[Address],
) -> Result<u64> {
    let file = fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut applied = 0u64;
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("reading {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: ReplayRecord = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(
                    target: "luckypot_indexer::replay",
                    file = %path.display(),
                    line = index + 1,
                    error = %e,
                    "Skipping malformed event record"
                );
                continue;
            }
        };
        if !contracts.is_empty() && !contracts.contains(&record.contract) {
            continue;
        }
        projections.apply(&record.into_envelope()).await?;
        applied += 1;
    }

    tracing::debug!(
        target: "luckypot_indexer::replay",
        file = %path.display(),
        applied,
        "Replayed file"
    );
    Ok(applied)
}

/// Feed fetched metadata documents to the metadata ingester, one file
/// per CID (the file stem). Returns the number of documents processed;
/// non-JSON documents count as processed but store nothing.
pub fn ingest_metadata_dir(store: &Store, dir: &Path) -> Result<u64> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("reading metadata directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut processed = 0u64;
    for path in &paths {
        let Some(cid) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        let content = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        luckypot_metadata::ingest(store, cid, &content)?;
        processed += 1;
    }
    Ok(processed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ChainSnapshot, SnapshotChainReader};
    use luckypot::etl::{Projection, TypeId};
    use luckypot_pot::PotProjection;
    use luckypot_store::PotStatus;
    use std::sync::Arc;

    const CONTRACT: &str = "0x00000000000000000000000000000000000000b0";
    const FUNDER: &str = "0x00000000000000000000000000000000000000f0";
    const USER: &str = "0x00000000000000000000000000000000000000a1";
    const TX1: &str = "0x0000000000000000000000000000000000000000000000000000000000000001";
    const TX2: &str = "0x0000000000000000000000000000000000000000000000000000000000000002";
    const TX3: &str = "0x0000000000000000000000000000000000000000000000000000000000000003";

    fn created_line() -> String {
        format!(
            r#"{{"contract":"{CONTRACT}","tx_hash":"{TX1}","block_number":1,"block_timestamp":1700000001,"event":{{"source":"pot","type":"created","pot_id":1,"funder":"{FUNDER}"}}}}"#
        )
    }

    fn ticket_line() -> String {
        format!(
            r#"{{"contract":"{CONTRACT}","tx_hash":"{TX2}","block_number":2,"block_timestamp":1700000002,"event":{{"source":"pot","type":"ticket_created","pot_id":1,"user":"{USER}","ticket_id":1,"num":"0x1","current_size":"0x1","use_powers":"0x0","note":""}}}}"#
        )
    }

    fn closed_line() -> String {
        format!(
            r#"{{"contract":"{CONTRACT}","tx_hash":"{TX3}","block_number":3,"block_timestamp":1700000003,"event":{{"source":"pot","type":"closed","pot_id":1,"caller":"{FUNDER}","total_tickets":"0x5"}}}}"#
        )
    }

    fn snapshot() -> SnapshotChainReader {
        let raw = format!(
            r#"{{
                "pots": [{{
                    "contract": "{CONTRACT}",
                    "pot_id": 1,
                    "status": 2,
                    "prize_token": "0x0000000000000000000000000000000000000000",
                    "prize_amount": "0x1bc16d674ec80000",
                    "power_token": "0x0000000000000000000000000000000000002000",
                    "power_unit": "0xde0b6b3a7640000",
                    "sponsor_amount": "0x0",
                    "start_time": 1700000000,
                    "end_time": 1700086400,
                    "max_per_user": "0xa",
                    "total_tickets": "0x5",
                    "use_sqrt_tickets": false,
                    "note": ""
                }}]
            }}"#
        );
        let parsed: ChainSnapshot = serde_json::from_str(&raw).unwrap();
        SnapshotChainReader::from_snapshot(parsed)
    }

    #[test]
    fn test_record_routes_pot_events() {
        let record: ReplayRecord = serde_json::from_str(&created_line()).unwrap();
        let envelope = record.into_envelope();
        assert_eq!(envelope.type_id, TypeId::new("pot.created"));
        assert_eq!(envelope.context.block_timestamp, 1_700_000_001);
        assert_eq!(envelope.context.contract, Address::from_low_u64_be(0xb0));
        // No explicit id: tx hash and log index form one
        assert_eq!(envelope.id, format!("{TX1}:0"));

        let Some(PotEvent::Created { pot_id, funder }) = envelope.downcast_ref::<PotEvent>() else {
            panic!("expected a pot created event");
        };
        assert_eq!(*pot_id, 1);
        assert_eq!(*funder, Address::from_low_u64_be(0xf0));
    }

    #[test]
    fn test_record_routes_power_and_miner_events() {
        let power_line = format!(
            r#"{{"contract":"{CONTRACT}","tx_hash":"{TX1}","block_number":1,"block_timestamp":1700000001,"event":{{"source":"power","type":"credited","user":"{USER}","token":"0x0000000000000000000000000000000000001000","amount":"0x64"}}}}"#
        );
        let record: ReplayRecord = serde_json::from_str(&power_line).unwrap();
        let envelope = record.into_envelope();
        assert_eq!(envelope.type_id, TypeId::new("power.credited"));
        assert!(envelope.downcast_ref::<PowerEvent>().is_some());

        let miner_line = format!(
            r#"{{"contract":"{CONTRACT}","tx_hash":"{TX1}","block_number":1,"block_timestamp":1700000001,"log_index":2,"event":{{"source":"miner","type":"locked","user":"{USER}","token":"0x0000000000000000000000000000000000001000","amount":"0x64","unlock_time":1800000000,"powers":"0x5","lock_index":3}}}}"#
        );
        let record: ReplayRecord = serde_json::from_str(&miner_line).unwrap();
        let envelope = record.into_envelope();
        assert_eq!(envelope.type_id, TypeId::new("miner.locked"));
        assert_eq!(envelope.id, format!("{TX1}:2"));
        assert!(envelope.downcast_ref::<MinerEvent>().is_some());
    }

    #[tokio::test]
    async fn test_replay_dir_feeds_projections_in_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("001_pots.jsonl"),
            format!("{}\n{}\n", created_line(), ticket_line()),
        )
        .unwrap();
        // A malformed line is skipped, the rest of the file still applies
        fs::write(
            dir.path().join("002_close.jsonl"),
            format!("not json\n\n{}\n", closed_line()),
        )
        .unwrap();
        fs::write(dir.path().join("README.txt"), "not an event file").unwrap();

        let store = Store::new(":memory:").unwrap();
        let chain = Arc::new(snapshot());
        let projections: Vec<Arc<dyn Projection>> =
            vec![Arc::new(PotProjection::new(store.clone(), chain))];
        let multi = MultiProjection::new(projections);

        let applied = replay_dir(&multi, dir.path(), &[]).await.unwrap();
        assert_eq!(applied, 3);

        let pot = store.get_pot(1).unwrap().unwrap();
        assert_eq!(pot.status, PotStatus::Closed);
        assert_eq!(pot.participants, 1);
        // The close handler re-read the authoritative ticket count
        assert_eq!(pot.total_tickets, luckypot_common::U256::from(5u64));
        assert_eq!(pot.title, "2 BNB");
        assert!(store.get_ticket(1, 1).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_contract_filter_skips_foreign_events() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("001_pots.jsonl"),
            format!("{}\n", created_line()),
        )
        .unwrap();

        let store = Store::new(":memory:").unwrap();
        let chain = Arc::new(snapshot());
        let projections: Vec<Arc<dyn Projection>> =
            vec![Arc::new(PotProjection::new(store.clone(), chain))];
        let multi = MultiProjection::new(projections);

        let only = [Address::from_low_u64_be(0xdead)];
        let applied = replay_dir(&multi, dir.path(), &only).await.unwrap();
        assert_eq!(applied, 0);
        assert!(store.get_pot(1).unwrap().is_none());
    }

    #[test]
    fn test_ingest_metadata_dir_keys_by_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("QmPotNote.json"), br#"{"name":"Pot"}"#).unwrap();
        fs::write(dir.path().join("notes.txt"), b"not metadata").unwrap();

        let store = Store::new(":memory:").unwrap();
        let processed = ingest_metadata_dir(&store, dir.path()).unwrap();
        assert_eq!(processed, 2);

        let record = store.get_token_metadata("QmPotNote").unwrap().unwrap();
        assert_eq!(record.name, "Pot");
        assert!(store.get_token_metadata("notes").unwrap().is_none());
    }
}
