//! Luckypot - event-to-state projection engine.
//!
//! This library provides the generic pipeline core: typed envelopes
//! carrying decoded chain events, and the projection seam that folds
//! them into a durable snapshot. The domain logic (lottery state
//! machine, power/stake ledgers, token metadata) lives in the member
//! crates and plugs in through the [`etl::Projection`] trait.

pub mod etl;

// Re-export commonly used types for external projection authors
pub use async_trait::async_trait;
pub use tokio;

pub use etl::{Envelope, EventContext, MultiProjection, Projection, TypeId, TypedBody};
