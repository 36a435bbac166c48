//! Lottery projection for the Luckypot indexer.
//!
//! Maintains the pot aggregate (parameters, lifecycle status, win
//! slots) plus ticket, sponsor, claim and audit records, folding the
//! lottery contract's events in delivery order.

pub mod events;
pub mod projection;

pub use events::PotEvent;
pub use projection::PotProjection;
