//! Configuration for the replay indexer

use anyhow::Result;
use clap::Parser;
use luckypot_common::{parse_address, Address};
use std::path::PathBuf;

/// Luckypot event indexer
///
/// Replays chain event files into a SQLite projection of pots, tickets,
/// sponsors, powers and stakes.
#[derive(Parser, Debug)]
#[command(name = "luckypot-indexer")]
#[command(about = "Project Luckypot chain events into SQLite", long_about = None)]
pub struct Config {
    /// Directory of JSONL event files, replayed in filename order
    #[arg(long, env = "LUCKYPOT_EVENTS_DIR", default_value = "./events")]
    pub events_dir: PathBuf,

    /// Database path for the projected state
    #[arg(long, env = "LUCKYPOT_DB_PATH", default_value = "./luckypot-data.db")]
    pub db_path: String,

    /// Chain snapshot JSON answering the handlers' read-back calls
    ///
    /// Without one every read-back behaves like a reverted call and the
    /// projections fall back to event data alone.
    #[arg(long, env = "LUCKYPOT_CHAIN_STATE")]
    pub chain_state: Option<PathBuf>,

    /// Directory of fetched metadata documents, one file per CID
    #[arg(long, env = "LUCKYPOT_METADATA_DIR")]
    pub metadata_dir: Option<PathBuf>,

    /// Replay only events from these contracts (comma-separated hex addresses)
    #[arg(long, value_delimiter = ',')]
    pub contracts: Vec<String>,
}

impl Config {
    /// Parse the contract allow-list; empty means every contract.
    pub fn parse_contracts(&self) -> Result<Vec<Address>> {
        self.contracts.iter().map(|s| parse_address(s)).collect()
    }
}
