//! Projected state storage for the Luckypot indexer
//!
//! All entities produced by the event handlers live in a single SQLite
//! database behind [`Store`]. Rows are keyed by their natural keys so the
//! same event applied twice lands on the same row.

pub mod entities;
pub mod registry;
pub mod status;
pub mod store;

pub use entities::{
    ClaimPrizeRecord, LockRecord, Pot, PotCancelEvent, PotCloseEvent, PotEndEvent, PotParticipant,
    PotSponsor, PotSponsorRecord, PotTicket, StakeKind, StakeRecord, Token, TokenMetadataRecord,
    UserLockStat, UserPower, UserStake, UserStat, UserTokenStat, WIN_PLACES,
};
pub use registry::ensure_token;
pub use status::{InvalidStatus, PotStatus};
pub use store::Store;
