//! Luckypot Indexer - Lottery and Power Event Projector
//!
//! Replays captured Luckypot, LuckyPower and miner contract events into
//! a SQLite projection store. Chain read-backs (pot parameters, power
//! balances, prize states, token metadata) are answered from an optional
//! JSON snapshot; without one every read-back behaves like a reverted
//! call and the projections degrade to event-only data.
//!
//! # Usage
//!
//! ```bash
//! # Replay ./events into ./luckypot-data.db
//! luckypot-indexer
//!
//! # Replay a capture with chain read-backs answered from a snapshot
//! luckypot-indexer --events-dir ./capture --chain-state ./chain.json
//!
//! # Only apply events emitted by specific contracts
//! luckypot-indexer --contracts 0x123...,0x456...
//!
//! # Side-load fetched note metadata (one file per CID)
//! luckypot-indexer --metadata-dir ./metadata
//! ```

mod chain;
mod config;
mod replay;

use anyhow::Result;
use chain::SnapshotChainReader;
use clap::Parser;
use config::Config;
use luckypot::etl::{MultiProjection, Projection};
use luckypot_common::ChainReader;
use luckypot_pot::PotProjection;
use luckypot_power::PowerProjection;
use luckypot_store::Store;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let config = Config::parse();

    // Initialize logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    tracing::info!("Starting Luckypot Indexer");
    tracing::info!("Events directory: {}", config.events_dir.display());
    tracing::info!("Database: {}", config.db_path);

    let store = Store::new(&config.db_path)?;
    tracing::info!("Database initialized");

    // Chain read-backs come from the snapshot when one is given
    let chain: Arc<dyn ChainReader> = match &config.chain_state {
        Some(path) => {
            tracing::info!("Chain snapshot: {}", path.display());
            Arc::new(SnapshotChainReader::from_path(path)?)
        }
        None => {
            tracing::warn!("No chain snapshot; read-backs will behave like reverted calls");
            Arc::new(SnapshotChainReader::empty())
        }
    };

    let contracts = config.parse_contracts()?;
    if contracts.is_empty() {
        tracing::info!("Applying events from all contracts");
    } else {
        for contract in &contracts {
            tracing::info!("Applying events from {:#x}", contract);
        }
    }

    let projections: Vec<Arc<dyn Projection>> = vec![
        Arc::new(PotProjection::new(store.clone(), chain.clone())),
        Arc::new(PowerProjection::new(store.clone(), chain.clone())),
    ];
    let projections = MultiProjection::new(projections);

    let applied = replay::replay_dir(&projections, &config.events_dir, &contracts).await?;
    tracing::info!("Replay complete: {} events applied", applied);

    if let Some(dir) = &config.metadata_dir {
        let processed = replay::ingest_metadata_dir(&store, dir)?;
        tracing::info!("Metadata ingested: {} documents", processed);
    }

    // Print final statistics
    tracing::info!("Final Statistics:");
    if let Ok(users) = store.count_users() {
        tracing::info!("  Total users: {}", users);
    }
    if let Ok(pots) = store.count_pots() {
        tracing::info!("  Total pots: {}", pots);
    }
    if let Ok(tickets) = store.count_tickets() {
        tracing::info!("  Total tickets: {}", tickets);
    }

    Ok(())
}
