//! SQLite storage for all projected entities
//!
//! Uses binary (BLOB) storage for addresses and amounts, JSON TEXT for
//! the small fixed arrays on the pot aggregate. Every table is keyed by
//! its natural key; writes are id-based upserts, so re-applying the same
//! write is a no-op for full-overwrite records.

use anyhow::Result;
use luckypot_common::{
    address_to_blob, blob_to_address, blob_to_tx_hash, blob_to_u256, tx_hash_to_blob, u256_to_blob,
    Address, TxHash, U256,
};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

use crate::entities::{
    ClaimPrizeRecord, LockRecord, Pot, PotCancelEvent, PotCloseEvent, PotEndEvent, PotParticipant,
    PotSponsor, PotSponsorRecord, PotTicket, StakeKind, StakeRecord, Token, TokenMetadataRecord,
    UserLockStat, UserPower, UserStake, UserStat, UserTokenStat,
};
use crate::status::PotStatus;

/// Storage for the projected snapshot. One SQLite database holds every
/// entity; handlers share it through cheap clones of the inner handle.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Create or open the database
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        // Enable WAL mode + Performance PRAGMAs
        // - WAL mode: Readers don't block writers
        // - synchronous=NORMAL: Relaxed fsync (safe with WAL)
        // - cache_size=-64000: 64MB cache (negative value = KB)
        // - mmap_size: 256MB memory-mapped I/O
        // - busy_timeout: 5s wait for lock
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;
             PRAGMA cache_size=-64000;
             PRAGMA temp_store=MEMORY;
             PRAGMA mmap_size=268435456;
             PRAGMA page_size=4096;
             PRAGMA busy_timeout=5000;",
        )?;

        tracing::info!(target: "luckypot_store::store", "SQLite configured: WAL mode, 64MB cache, 256MB mmap, NORMAL sync");

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                address BLOB PRIMARY KEY
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS tokens (
                address BLOB PRIMARY KEY,
                name TEXT NOT NULL,
                symbol TEXT NOT NULL,
                decimals INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS user_powers (
                user BLOB NOT NULL,
                token BLOB NOT NULL,
                balance BLOB NOT NULL,
                total_credit BLOB NOT NULL,
                total_debit BLOB NOT NULL,
                PRIMARY KEY (user, token)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS lock_records (
                user BLOB NOT NULL,
                token BLOB NOT NULL,
                lock_index INTEGER NOT NULL,
                amount BLOB NOT NULL,
                unlock_time INTEGER NOT NULL,
                powers BLOB NOT NULL,
                active INTEGER NOT NULL,
                tx_hash BLOB NOT NULL,
                timestamp INTEGER NOT NULL,
                PRIMARY KEY (user, token, lock_index)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS user_lock_stats (
                user BLOB NOT NULL,
                token BLOB NOT NULL,
                locked BLOB NOT NULL,
                unlocked BLOB NOT NULL,
                locking BLOB NOT NULL,
                powers BLOB NOT NULL,
                PRIMARY KEY (user, token)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS stake_records (
                tx_hash BLOB PRIMARY KEY,
                user BLOB NOT NULL,
                token BLOB NOT NULL,
                kind TEXT NOT NULL CHECK(kind IN ('STAKE', 'UNSTAKE')),
                amount BLOB NOT NULL,
                timestamp INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_stake_records_user ON stake_records(user, token)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS user_stakes (
                user BLOB NOT NULL,
                token BLOB NOT NULL,
                staked BLOB NOT NULL,
                unstaked BLOB NOT NULL,
                staking BLOB NOT NULL,
                claimed_powers BLOB NOT NULL,
                PRIMARY KEY (user, token)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS luckypots (
                pot_id INTEGER PRIMARY KEY,
                status TEXT NOT NULL CHECK(status IN ('PENDING', 'OPEN', 'CLOSED', 'ENDED', 'CANCELLED')),
                prize_token BLOB NOT NULL,
                prize_amount BLOB NOT NULL,
                power_token BLOB NOT NULL,
                power_unit BLOB NOT NULL,
                sponsor_amount BLOB NOT NULL,
                start_time INTEGER NOT NULL,
                end_time INTEGER NOT NULL,
                max_per_user BLOB NOT NULL,
                total_tickets BLOB NOT NULL,
                use_sqrt_tickets INTEGER NOT NULL,
                funder BLOB NOT NULL,
                note TEXT NOT NULL,
                title TEXT NOT NULL,
                prize_token_info BLOB,
                power_token_info BLOB,
                participants INTEGER NOT NULL,
                winners TEXT NOT NULL,
                prize_claims TEXT NOT NULL,
                prize_amounts TEXT NOT NULL,
                draw_numbers TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                tx_hash BLOB NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_luckypots_status ON luckypots(status)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_luckypots_funder ON luckypots(funder)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS luckypot_participants (
                pot_id INTEGER NOT NULL,
                user BLOB NOT NULL,
                total_tickets BLOB NOT NULL,
                stake_amount BLOB NOT NULL,
                PRIMARY KEY (pot_id, user)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_participants_user ON luckypot_participants(user)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS luckypot_sponsors (
                pot_id INTEGER NOT NULL,
                user BLOB NOT NULL,
                sponsor_amount BLOB NOT NULL,
                PRIMARY KEY (pot_id, user)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sponsors_user ON luckypot_sponsors(user)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS luckypot_tickets (
                pot_id INTEGER NOT NULL,
                ticket_id INTEGER NOT NULL,
                user BLOB NOT NULL,
                num BLOB NOT NULL,
                current_size BLOB NOT NULL,
                use_powers BLOB NOT NULL,
                note TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                tx_hash BLOB NOT NULL,
                PRIMARY KEY (pot_id, ticket_id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_tickets_user ON luckypot_tickets(user)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS pot_cancel_events (
                pot_id INTEGER NOT NULL,
                tx_hash BLOB NOT NULL,
                caller BLOB NOT NULL,
                total_tickets BLOB NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (pot_id, tx_hash)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS pot_close_events (
                pot_id INTEGER NOT NULL,
                tx_hash BLOB NOT NULL,
                caller BLOB NOT NULL,
                total_tickets BLOB NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (pot_id, tx_hash)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS pot_end_events (
                pot_id INTEGER NOT NULL,
                tx_hash BLOB NOT NULL,
                caller BLOB NOT NULL,
                draw_numbers TEXT NOT NULL,
                amounts TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (pot_id, tx_hash)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS pot_sponsor_records (
                pot_id INTEGER NOT NULL,
                tx_hash BLOB NOT NULL,
                user BLOB NOT NULL,
                prize_token BLOB NOT NULL,
                sponsor_amount BLOB NOT NULL,
                note TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (pot_id, tx_hash)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS claim_prize_records (
                pot_id INTEGER NOT NULL,
                win_place INTEGER NOT NULL,
                user BLOB NOT NULL,
                prize_token BLOB NOT NULL,
                prize_amount BLOB NOT NULL,
                created_at INTEGER NOT NULL,
                tx_hash BLOB NOT NULL,
                PRIMARY KEY (pot_id, win_place)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_claims_user ON claim_prize_records(user)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS user_stats (
                user BLOB PRIMARY KEY,
                create_count INTEGER NOT NULL,
                sponsor_count INTEGER NOT NULL,
                join_count INTEGER NOT NULL,
                win_count INTEGER NOT NULL,
                total_tickets BLOB NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS user_token_stats (
                user BLOB NOT NULL,
                token BLOB NOT NULL,
                create_amount BLOB NOT NULL,
                sponsor_amount BLOB NOT NULL,
                join_amount BLOB NOT NULL,
                win_amount BLOB NOT NULL,
                PRIMARY KEY (user, token)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS token_metadata (
                cid TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                image TEXT NOT NULL,
                description TEXT NOT NULL
            )",
            [],
        )?;

        tracing::info!(target: "luckypot_store::store", db_path = %db_path, "Database initialized");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // ===== Users =====

    /// Create the user row if it does not exist yet. Idempotent.
    pub fn ensure_user(&self, address: Address) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO users (address) VALUES (?1)",
            params![address_to_blob(address)],
        )?;
        Ok(())
    }

    pub fn has_user(&self, address: Address) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE address = ?1",
            params![address_to_blob(address)],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn count_users(&self) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn count_pots(&self) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM luckypots", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn count_tickets(&self) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM luckypot_tickets", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Tokens =====

    /// Insert the token descriptor unless one is already cached for the
    /// address. The first write wins permanently.
    pub fn insert_token(&self, token: &Token) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO tokens (address, name, symbol, decimals)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                address_to_blob(token.address),
                token.name,
                token.symbol,
                token.decimals
            ],
        )?;
        Ok(())
    }

    pub fn get_token(&self, address: Address) -> Result<Option<Token>> {
        let conn = self.conn.lock().unwrap();
        let token = conn
            .query_row(
                "SELECT name, symbol, decimals FROM tokens WHERE address = ?1",
                params![address_to_blob(address)],
                |row| {
                    Ok(Token {
                        address,
                        name: row.get(0)?,
                        symbol: row.get(1)?,
                        decimals: row.get::<_, i64>(2)? as u32,
                    })
                },
            )
            .ok();
        Ok(token)
    }

    // ===== User powers =====

    pub fn get_user_power(&self, user: Address, token: Address) -> Result<Option<UserPower>> {
        let conn = self.conn.lock().unwrap();
        let power = conn
            .query_row(
                "SELECT balance, total_credit, total_debit FROM user_powers
                 WHERE user = ?1 AND token = ?2",
                params![address_to_blob(user), address_to_blob(token)],
                |row| {
                    let balance: Vec<u8> = row.get(0)?;
                    let credit: Vec<u8> = row.get(1)?;
                    let debit: Vec<u8> = row.get(2)?;
                    Ok(UserPower {
                        user,
                        token,
                        balance: blob_to_u256(&balance),
                        total_credit: blob_to_u256(&credit),
                        total_debit: blob_to_u256(&debit),
                    })
                },
            )
            .ok();
        Ok(power)
    }

    pub fn put_user_power(&self, power: &UserPower) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO user_powers (user, token, balance, total_credit, total_debit)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                address_to_blob(power.user),
                address_to_blob(power.token),
                u256_to_blob(power.balance),
                u256_to_blob(power.total_credit),
                u256_to_blob(power.total_debit)
            ],
        )?;
        Ok(())
    }

    // ===== Lock records and stats =====

    pub fn put_lock_record(&self, record: &LockRecord) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO lock_records
                 (user, token, lock_index, amount, unlock_time, powers, active, tx_hash, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                address_to_blob(record.user),
                address_to_blob(record.token),
                record.lock_index,
                u256_to_blob(record.amount),
                record.unlock_time,
                u256_to_blob(record.powers),
                record.active,
                tx_hash_to_blob(record.tx_hash),
                record.timestamp
            ],
        )?;
        Ok(())
    }

    pub fn get_lock_record(
        &self,
        user: Address,
        token: Address,
        lock_index: u64,
    ) -> Result<Option<LockRecord>> {
        let conn = self.conn.lock().unwrap();
        let record = conn
            .query_row(
                "SELECT amount, unlock_time, powers, active, tx_hash, timestamp
                 FROM lock_records WHERE user = ?1 AND token = ?2 AND lock_index = ?3",
                params![address_to_blob(user), address_to_blob(token), lock_index],
                |row| {
                    let amount: Vec<u8> = row.get(0)?;
                    let powers: Vec<u8> = row.get(2)?;
                    let tx_hash: Vec<u8> = row.get(4)?;
                    Ok(LockRecord {
                        user,
                        token,
                        lock_index,
                        amount: blob_to_u256(&amount),
                        unlock_time: row.get::<_, i64>(1)? as u64,
                        powers: blob_to_u256(&powers),
                        active: row.get(3)?,
                        tx_hash: blob_to_tx_hash(&tx_hash),
                        timestamp: row.get::<_, i64>(5)? as u64,
                    })
                },
            )
            .ok();
        Ok(record)
    }

    pub fn get_user_lock_stat(&self, user: Address, token: Address) -> Result<Option<UserLockStat>> {
        let conn = self.conn.lock().unwrap();
        let stat = conn
            .query_row(
                "SELECT locked, unlocked, locking, powers FROM user_lock_stats
                 WHERE user = ?1 AND token = ?2",
                params![address_to_blob(user), address_to_blob(token)],
                |row| {
                    let locked: Vec<u8> = row.get(0)?;
                    let unlocked: Vec<u8> = row.get(1)?;
                    let locking: Vec<u8> = row.get(2)?;
                    let powers: Vec<u8> = row.get(3)?;
                    Ok(UserLockStat {
                        user,
                        token,
                        locked: blob_to_u256(&locked),
                        unlocked: blob_to_u256(&unlocked),
                        locking: blob_to_u256(&locking),
                        powers: blob_to_u256(&powers),
                    })
                },
            )
            .ok();
        Ok(stat)
    }

    pub fn put_user_lock_stat(&self, stat: &UserLockStat) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO user_lock_stats (user, token, locked, unlocked, locking, powers)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                address_to_blob(stat.user),
                address_to_blob(stat.token),
                u256_to_blob(stat.locked),
                u256_to_blob(stat.unlocked),
                u256_to_blob(stat.locking),
                u256_to_blob(stat.powers)
            ],
        )?;
        Ok(())
    }

    // ===== Stake records and stats =====

    pub fn put_stake_record(&self, record: &StakeRecord) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO stake_records (tx_hash, user, token, kind, amount, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                tx_hash_to_blob(record.tx_hash),
                address_to_blob(record.user),
                address_to_blob(record.token),
                record.kind,
                u256_to_blob(record.amount),
                record.timestamp
            ],
        )?;
        Ok(())
    }

    pub fn get_stake_record(&self, tx_hash: TxHash) -> Result<Option<StakeRecord>> {
        let conn = self.conn.lock().unwrap();
        let record = conn
            .query_row(
                "SELECT user, token, kind, amount, timestamp FROM stake_records
                 WHERE tx_hash = ?1",
                params![tx_hash_to_blob(tx_hash)],
                |row| {
                    let user: Vec<u8> = row.get(0)?;
                    let token: Vec<u8> = row.get(1)?;
                    let kind: StakeKind = row.get(2)?;
                    let amount: Vec<u8> = row.get(3)?;
                    Ok(StakeRecord {
                        tx_hash,
                        user: blob_to_address(&user),
                        token: blob_to_address(&token),
                        kind,
                        amount: blob_to_u256(&amount),
                        timestamp: row.get::<_, i64>(4)? as u64,
                    })
                },
            )
            .ok();
        Ok(record)
    }

    pub fn get_user_stake(&self, user: Address, token: Address) -> Result<Option<UserStake>> {
        let conn = self.conn.lock().unwrap();
        let stake = conn
            .query_row(
                "SELECT staked, unstaked, staking, claimed_powers FROM user_stakes
                 WHERE user = ?1 AND token = ?2",
                params![address_to_blob(user), address_to_blob(token)],
                |row| {
                    let staked: Vec<u8> = row.get(0)?;
                    let unstaked: Vec<u8> = row.get(1)?;
                    let staking: Vec<u8> = row.get(2)?;
                    let claimed: Vec<u8> = row.get(3)?;
                    Ok(UserStake {
                        user,
                        token,
                        staked: blob_to_u256(&staked),
                        unstaked: blob_to_u256(&unstaked),
                        staking: blob_to_u256(&staking),
                        claimed_powers: blob_to_u256(&claimed),
                    })
                },
            )
            .ok();
        Ok(stake)
    }

    pub fn put_user_stake(&self, stake: &UserStake) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO user_stakes (user, token, staked, unstaked, staking, claimed_powers)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                address_to_blob(stake.user),
                address_to_blob(stake.token),
                u256_to_blob(stake.staked),
                u256_to_blob(stake.unstaked),
                u256_to_blob(stake.staking),
                u256_to_blob(stake.claimed_powers)
            ],
        )?;
        Ok(())
    }

    // ===== Pots =====

    pub fn put_pot(&self, pot: &Pot) -> Result<()> {
        let winners = serde_json::to_string(&pot.winners)?;
        let prize_claims = serde_json::to_string(&pot.prize_claims)?;
        let prize_amounts = serde_json::to_string(&pot.prize_amounts)?;
        let draw_numbers = serde_json::to_string(&pot.draw_numbers)?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO luckypots
                 (pot_id, status, prize_token, prize_amount, power_token, power_unit,
                  sponsor_amount, start_time, end_time, max_per_user, total_tickets,
                  use_sqrt_tickets, funder, note, title, prize_token_info, power_token_info,
                  participants, winners, prize_claims, prize_amounts, draw_numbers,
                  created_at, tx_hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                     ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)",
            params![
                pot.pot_id,
                pot.status,
                address_to_blob(pot.prize_token),
                u256_to_blob(pot.prize_amount),
                address_to_blob(pot.power_token),
                u256_to_blob(pot.power_unit),
                u256_to_blob(pot.sponsor_amount),
                pot.start_time,
                pot.end_time,
                u256_to_blob(pot.max_per_user),
                u256_to_blob(pot.total_tickets),
                pot.use_sqrt_tickets,
                address_to_blob(pot.funder),
                pot.note,
                pot.title,
                pot.prize_token_info.map(address_to_blob),
                pot.power_token_info.map(address_to_blob),
                pot.participants,
                winners,
                prize_claims,
                prize_amounts,
                draw_numbers,
                pot.created_at,
                tx_hash_to_blob(pot.tx_hash)
            ],
        )?;
        Ok(())
    }

    pub fn get_pot(&self, pot_id: u64) -> Result<Option<Pot>> {
        struct PotRow {
            status: PotStatus,
            prize_token: Vec<u8>,
            prize_amount: Vec<u8>,
            power_token: Vec<u8>,
            power_unit: Vec<u8>,
            sponsor_amount: Vec<u8>,
            start_time: i64,
            end_time: i64,
            max_per_user: Vec<u8>,
            total_tickets: Vec<u8>,
            use_sqrt_tickets: bool,
            funder: Vec<u8>,
            note: String,
            title: String,
            prize_token_info: Option<Vec<u8>>,
            power_token_info: Option<Vec<u8>>,
            participants: i64,
            winners: String,
            prize_claims: String,
            prize_amounts: String,
            draw_numbers: String,
            created_at: i64,
            tx_hash: Vec<u8>,
        }

        let raw = {
            let conn = self.conn.lock().unwrap();
            conn.query_row(
                "SELECT status, prize_token, prize_amount, power_token, power_unit,
                        sponsor_amount, start_time, end_time, max_per_user, total_tickets,
                        use_sqrt_tickets, funder, note, title, prize_token_info,
                        power_token_info, participants, winners, prize_claims, prize_amounts,
                        draw_numbers, created_at, tx_hash
                 FROM luckypots WHERE pot_id = ?1",
                params![pot_id],
                |row| {
                    Ok(PotRow {
                        status: row.get(0)?,
                        prize_token: row.get(1)?,
                        prize_amount: row.get(2)?,
                        power_token: row.get(3)?,
                        power_unit: row.get(4)?,
                        sponsor_amount: row.get(5)?,
                        start_time: row.get(6)?,
                        end_time: row.get(7)?,
                        max_per_user: row.get(8)?,
                        total_tickets: row.get(9)?,
                        use_sqrt_tickets: row.get(10)?,
                        funder: row.get(11)?,
                        note: row.get(12)?,
                        title: row.get(13)?,
                        prize_token_info: row.get(14)?,
                        power_token_info: row.get(15)?,
                        participants: row.get(16)?,
                        winners: row.get(17)?,
                        prize_claims: row.get(18)?,
                        prize_amounts: row.get(19)?,
                        draw_numbers: row.get(20)?,
                        created_at: row.get(21)?,
                        tx_hash: row.get(22)?,
                    })
                },
            )
            .ok()
        };

        let Some(raw) = raw else {
            return Ok(None);
        };

        let winners: Vec<Address> = serde_json::from_str(&raw.winners)?;
        let prize_claims: Vec<bool> = serde_json::from_str(&raw.prize_claims)?;
        let prize_amounts: Vec<U256> = serde_json::from_str(&raw.prize_amounts)?;
        let draw_numbers: Vec<i32> = serde_json::from_str(&raw.draw_numbers)?;

        Ok(Some(Pot {
            pot_id,
            status: raw.status,
            prize_token: blob_to_address(&raw.prize_token),
            prize_amount: blob_to_u256(&raw.prize_amount),
            power_token: blob_to_address(&raw.power_token),
            power_unit: blob_to_u256(&raw.power_unit),
            sponsor_amount: blob_to_u256(&raw.sponsor_amount),
            start_time: raw.start_time as u64,
            end_time: raw.end_time as u64,
            max_per_user: blob_to_u256(&raw.max_per_user),
            total_tickets: blob_to_u256(&raw.total_tickets),
            use_sqrt_tickets: raw.use_sqrt_tickets,
            funder: blob_to_address(&raw.funder),
            note: raw.note,
            title: raw.title,
            prize_token_info: raw.prize_token_info.map(|b| blob_to_address(&b)),
            power_token_info: raw.power_token_info.map(|b| blob_to_address(&b)),
            participants: raw.participants as u32,
            winners,
            prize_claims,
            prize_amounts,
            draw_numbers,
            created_at: raw.created_at as u64,
            tx_hash: blob_to_tx_hash(&raw.tx_hash),
        }))
    }

    // ===== Participants =====

    pub fn get_participant(&self, pot_id: u64, user: Address) -> Result<Option<PotParticipant>> {
        let conn = self.conn.lock().unwrap();
        let participant = conn
            .query_row(
                "SELECT total_tickets, stake_amount FROM luckypot_participants
                 WHERE pot_id = ?1 AND user = ?2",
                params![pot_id, address_to_blob(user)],
                |row| {
                    let tickets: Vec<u8> = row.get(0)?;
                    let stake: Vec<u8> = row.get(1)?;
                    Ok(PotParticipant {
                        pot_id,
                        user,
                        total_tickets: blob_to_u256(&tickets),
                        stake_amount: blob_to_u256(&stake),
                    })
                },
            )
            .ok();
        Ok(participant)
    }

    pub fn put_participant(&self, participant: &PotParticipant) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO luckypot_participants (pot_id, user, total_tickets, stake_amount)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                participant.pot_id,
                address_to_blob(participant.user),
                u256_to_blob(participant.total_tickets),
                u256_to_blob(participant.stake_amount)
            ],
        )?;
        Ok(())
    }

    pub fn count_participants(&self, pot_id: u64) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM luckypot_participants WHERE pot_id = ?1",
            params![pot_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Sponsors =====

    pub fn get_sponsor(&self, pot_id: u64, user: Address) -> Result<Option<PotSponsor>> {
        let conn = self.conn.lock().unwrap();
        let sponsor = conn
            .query_row(
                "SELECT sponsor_amount FROM luckypot_sponsors WHERE pot_id = ?1 AND user = ?2",
                params![pot_id, address_to_blob(user)],
                |row| {
                    let amount: Vec<u8> = row.get(0)?;
                    Ok(PotSponsor {
                        pot_id,
                        user,
                        sponsor_amount: blob_to_u256(&amount),
                    })
                },
            )
            .ok();
        Ok(sponsor)
    }

    pub fn put_sponsor(&self, sponsor: &PotSponsor) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO luckypot_sponsors (pot_id, user, sponsor_amount)
             VALUES (?1, ?2, ?3)",
            params![
                sponsor.pot_id,
                address_to_blob(sponsor.user),
                u256_to_blob(sponsor.sponsor_amount)
            ],
        )?;
        Ok(())
    }

    // ===== Tickets =====

    pub fn put_ticket(&self, ticket: &PotTicket) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO luckypot_tickets
                 (pot_id, ticket_id, user, num, current_size, use_powers, note, created_at, tx_hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                ticket.pot_id,
                ticket.ticket_id,
                address_to_blob(ticket.user),
                u256_to_blob(ticket.num),
                u256_to_blob(ticket.current_size),
                u256_to_blob(ticket.use_powers),
                ticket.note,
                ticket.created_at,
                tx_hash_to_blob(ticket.tx_hash)
            ],
        )?;
        Ok(())
    }

    pub fn get_ticket(&self, pot_id: u64, ticket_id: u64) -> Result<Option<PotTicket>> {
        let conn = self.conn.lock().unwrap();
        let ticket = conn
            .query_row(
                "SELECT user, num, current_size, use_powers, note, created_at, tx_hash
                 FROM luckypot_tickets WHERE pot_id = ?1 AND ticket_id = ?2",
                params![pot_id, ticket_id],
                |row| {
                    let user: Vec<u8> = row.get(0)?;
                    let num: Vec<u8> = row.get(1)?;
                    let current_size: Vec<u8> = row.get(2)?;
                    let use_powers: Vec<u8> = row.get(3)?;
                    let tx_hash: Vec<u8> = row.get(6)?;
                    Ok(PotTicket {
                        pot_id,
                        ticket_id,
                        user: blob_to_address(&user),
                        num: blob_to_u256(&num),
                        current_size: blob_to_u256(&current_size),
                        use_powers: blob_to_u256(&use_powers),
                        note: row.get(4)?,
                        created_at: row.get::<_, i64>(5)? as u64,
                        tx_hash: blob_to_tx_hash(&tx_hash),
                    })
                },
            )
            .ok();
        Ok(ticket)
    }

    // ===== Audit events =====

    pub fn insert_cancel_event(&self, event: &PotCancelEvent) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO pot_cancel_events (pot_id, tx_hash, caller, total_tickets, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                event.pot_id,
                tx_hash_to_blob(event.tx_hash),
                address_to_blob(event.caller),
                u256_to_blob(event.total_tickets),
                event.created_at
            ],
        )?;
        Ok(())
    }

    pub fn insert_close_event(&self, event: &PotCloseEvent) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO pot_close_events (pot_id, tx_hash, caller, total_tickets, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                event.pot_id,
                tx_hash_to_blob(event.tx_hash),
                address_to_blob(event.caller),
                u256_to_blob(event.total_tickets),
                event.created_at
            ],
        )?;
        Ok(())
    }

    pub fn insert_end_event(&self, event: &PotEndEvent) -> Result<()> {
        let draw_numbers = serde_json::to_string(&event.draw_numbers)?;
        let amounts = serde_json::to_string(&event.amounts)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO pot_end_events (pot_id, tx_hash, caller, draw_numbers, amounts, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                event.pot_id,
                tx_hash_to_blob(event.tx_hash),
                address_to_blob(event.caller),
                draw_numbers,
                amounts,
                event.created_at
            ],
        )?;
        Ok(())
    }

    pub fn insert_sponsor_record(&self, record: &PotSponsorRecord) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO pot_sponsor_records
                 (pot_id, tx_hash, user, prize_token, sponsor_amount, note, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.pot_id,
                tx_hash_to_blob(record.tx_hash),
                address_to_blob(record.user),
                address_to_blob(record.prize_token),
                u256_to_blob(record.sponsor_amount),
                record.note,
                record.created_at
            ],
        )?;
        Ok(())
    }

    pub fn get_cancel_events(&self, pot_id: u64) -> Result<Vec<PotCancelEvent>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT caller, total_tickets, created_at, tx_hash
             FROM pot_cancel_events WHERE pot_id = ?1 ORDER BY created_at, tx_hash",
        )?;
        let rows = stmt.query_map(params![pot_id], |row| {
            let caller: Vec<u8> = row.get(0)?;
            let total_tickets: Vec<u8> = row.get(1)?;
            let tx_hash: Vec<u8> = row.get(3)?;
            Ok(PotCancelEvent {
                pot_id,
                caller: blob_to_address(&caller),
                total_tickets: blob_to_u256(&total_tickets),
                created_at: row.get::<_, i64>(2)? as u64,
                tx_hash: blob_to_tx_hash(&tx_hash),
            })
        })?;
        let events = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }

    pub fn get_close_events(&self, pot_id: u64) -> Result<Vec<PotCloseEvent>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT caller, total_tickets, created_at, tx_hash
             FROM pot_close_events WHERE pot_id = ?1 ORDER BY created_at, tx_hash",
        )?;
        let rows = stmt.query_map(params![pot_id], |row| {
            let caller: Vec<u8> = row.get(0)?;
            let total_tickets: Vec<u8> = row.get(1)?;
            let tx_hash: Vec<u8> = row.get(3)?;
            Ok(PotCloseEvent {
                pot_id,
                caller: blob_to_address(&caller),
                total_tickets: blob_to_u256(&total_tickets),
                created_at: row.get::<_, i64>(2)? as u64,
                tx_hash: blob_to_tx_hash(&tx_hash),
            })
        })?;
        let events = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }

    pub fn get_end_events(&self, pot_id: u64) -> Result<Vec<PotEndEvent>> {
        let raw = {
            let conn = self.conn.lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT caller, draw_numbers, amounts, created_at, tx_hash
                 FROM pot_end_events WHERE pot_id = ?1 ORDER BY created_at, tx_hash",
            )?;
            let rows = stmt.query_map(params![pot_id], |row| {
                let caller: Vec<u8> = row.get(0)?;
                let tx_hash: Vec<u8> = row.get(4)?;
                Ok((
                    blob_to_address(&caller),
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)? as u64,
                    blob_to_tx_hash(&tx_hash),
                ))
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        let mut events = Vec::with_capacity(raw.len());
        for (caller, draw_numbers, amounts, created_at, tx_hash) in raw {
            events.push(PotEndEvent {
                pot_id,
                caller,
                draw_numbers: serde_json::from_str(&draw_numbers)?,
                amounts: serde_json::from_str(&amounts)?,
                created_at,
                tx_hash,
            });
        }
        Ok(events)
    }

    pub fn get_sponsor_records(&self, pot_id: u64) -> Result<Vec<PotSponsorRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT user, prize_token, sponsor_amount, note, created_at, tx_hash
             FROM pot_sponsor_records WHERE pot_id = ?1 ORDER BY created_at, tx_hash",
        )?;
        let rows = stmt.query_map(params![pot_id], |row| {
            let user: Vec<u8> = row.get(0)?;
            let prize_token: Vec<u8> = row.get(1)?;
            let sponsor_amount: Vec<u8> = row.get(2)?;
            let tx_hash: Vec<u8> = row.get(5)?;
            Ok(PotSponsorRecord {
                pot_id,
                user: blob_to_address(&user),
                prize_token: blob_to_address(&prize_token),
                sponsor_amount: blob_to_u256(&sponsor_amount),
                note: row.get(3)?,
                created_at: row.get::<_, i64>(4)? as u64,
                tx_hash: blob_to_tx_hash(&tx_hash),
            })
        })?;
        let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    pub fn put_claim_record(&self, record: &ClaimPrizeRecord) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO claim_prize_records
                 (pot_id, win_place, user, prize_token, prize_amount, created_at, tx_hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.pot_id,
                record.win_place,
                address_to_blob(record.user),
                address_to_blob(record.prize_token),
                u256_to_blob(record.prize_amount),
                record.created_at,
                tx_hash_to_blob(record.tx_hash)
            ],
        )?;
        Ok(())
    }

    pub fn get_claim_record(&self, pot_id: u64, win_place: u32) -> Result<Option<ClaimPrizeRecord>> {
        let conn = self.conn.lock().unwrap();
        let record = conn
            .query_row(
                "SELECT user, prize_token, prize_amount, created_at, tx_hash
                 FROM claim_prize_records WHERE pot_id = ?1 AND win_place = ?2",
                params![pot_id, win_place],
                |row| {
                    let user: Vec<u8> = row.get(0)?;
                    let prize_token: Vec<u8> = row.get(1)?;
                    let prize_amount: Vec<u8> = row.get(2)?;
                    let tx_hash: Vec<u8> = row.get(4)?;
                    Ok(ClaimPrizeRecord {
                        pot_id,
                        win_place,
                        user: blob_to_address(&user),
                        prize_token: blob_to_address(&prize_token),
                        prize_amount: blob_to_u256(&prize_amount),
                        created_at: row.get::<_, i64>(3)? as u64,
                        tx_hash: blob_to_tx_hash(&tx_hash),
                    })
                },
            )
            .ok();
        Ok(record)
    }

    // ===== User stats =====

    pub fn get_user_stat(&self, user: Address) -> Result<Option<UserStat>> {
        let conn = self.conn.lock().unwrap();
        let stat = conn
            .query_row(
                "SELECT create_count, sponsor_count, join_count, win_count, total_tickets
                 FROM user_stats WHERE user = ?1",
                params![address_to_blob(user)],
                |row| {
                    let tickets: Vec<u8> = row.get(4)?;
                    Ok(UserStat {
                        user,
                        create_count: row.get::<_, i64>(0)? as u32,
                        sponsor_count: row.get::<_, i64>(1)? as u32,
                        join_count: row.get::<_, i64>(2)? as u32,
                        win_count: row.get::<_, i64>(3)? as u32,
                        total_tickets: blob_to_u256(&tickets),
                    })
                },
            )
            .ok();
        Ok(stat)
    }

    pub fn put_user_stat(&self, stat: &UserStat) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO user_stats
                 (user, create_count, sponsor_count, join_count, win_count, total_tickets)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                address_to_blob(stat.user),
                stat.create_count,
                stat.sponsor_count,
                stat.join_count,
                stat.win_count,
                u256_to_blob(stat.total_tickets)
            ],
        )?;
        Ok(())
    }

    pub fn get_user_token_stat(
        &self,
        user: Address,
        token: Address,
    ) -> Result<Option<UserTokenStat>> {
        let conn = self.conn.lock().unwrap();
        let stat = conn
            .query_row(
                "SELECT create_amount, sponsor_amount, join_amount, win_amount
                 FROM user_token_stats WHERE user = ?1 AND token = ?2",
                params![address_to_blob(user), address_to_blob(token)],
                |row| {
                    let create: Vec<u8> = row.get(0)?;
                    let sponsor: Vec<u8> = row.get(1)?;
                    let join: Vec<u8> = row.get(2)?;
                    let win: Vec<u8> = row.get(3)?;
                    Ok(UserTokenStat {
                        user,
                        token,
                        create_amount: blob_to_u256(&create),
                        sponsor_amount: blob_to_u256(&sponsor),
                        join_amount: blob_to_u256(&join),
                        win_amount: blob_to_u256(&win),
                    })
                },
            )
            .ok();
        Ok(stat)
    }

    pub fn put_user_token_stat(&self, stat: &UserTokenStat) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO user_token_stats
                 (user, token, create_amount, sponsor_amount, join_amount, win_amount)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                address_to_blob(stat.user),
                address_to_blob(stat.token),
                u256_to_blob(stat.create_amount),
                u256_to_blob(stat.sponsor_amount),
                u256_to_blob(stat.join_amount),
                u256_to_blob(stat.win_amount)
            ],
        )?;
        Ok(())
    }

    // ===== Token metadata =====

    pub fn put_token_metadata(&self, record: &TokenMetadataRecord) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO token_metadata (cid, name, image, description)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(cid) DO UPDATE SET
                 name = excluded.name,
                 image = excluded.image,
                 description = excluded.description",
            params![record.cid, record.name, record.image, record.description],
        )?;
        Ok(())
    }

    pub fn get_token_metadata(&self, cid: &str) -> Result<Option<TokenMetadataRecord>> {
        let conn = self.conn.lock().unwrap();
        let record = conn
            .query_row(
                "SELECT name, image, description FROM token_metadata WHERE cid = ?1",
                params![cid],
                |row| {
                    Ok(TokenMetadataRecord {
                        cid: cid.to_string(),
                        name: row.get(0)?,
                        image: row.get(1)?,
                        description: row.get(2)?,
                    })
                },
            )
            .ok();
        Ok(record)
    }
}
