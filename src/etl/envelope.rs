//! Envelopes carry decoded chain events through the projection pipeline.

use std::any::Any;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use luckypot_common::{Address, TxHash};
use serde::{Deserialize, Serialize};

/// Stable identifier for an event kind, derived from its dotted wire
/// name. Dispatch compares ids instead of strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(u64);

impl TypeId {
    /// Id for an event name such as "pot.ticket_created".
    pub fn new(name: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self(hasher.finish())
    }
}

/// Chain coordinates of the event an envelope was decoded from.
///
/// Handlers read timestamps, the emitting contract and the transaction
/// hash from here instead of walking back to the raw feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventContext {
    /// Contract that emitted the event
    pub contract: Address,

    /// Hash of the transaction that emitted the event
    pub tx_hash: TxHash,

    /// Block the event landed in
    pub block_number: u64,

    /// Block timestamp in seconds
    pub block_timestamp: u64,

    /// Position of the event within the block
    pub log_index: u32,
}

/// A decoded event that knows its own [`TypeId`].
///
/// Bodies cross the pipeline as trait objects; projections filter on
/// the id, then downcast back to the concrete event enum.
pub trait TypedBody: Send + Sync {
    fn envelope_type_id(&self) -> TypeId;
    fn as_any(&self) -> &dyn Any;
}

/// One decoded event plus everything a projection needs to fold it.
pub struct Envelope {
    /// Feed-unique identifier, used for logging
    pub id: String,

    /// Id of the concrete body type
    pub type_id: TypeId,

    /// The decoded event
    pub body: Box<dyn TypedBody>,

    /// Chain coordinates of the source event
    pub context: EventContext,

    /// Unix seconds when the envelope entered the pipeline
    pub ingested_at: i64,
}

impl Envelope {
    pub fn new(id: String, body: Box<dyn TypedBody>, context: EventContext) -> Self {
        Self {
            id,
            type_id: body.envelope_type_id(),
            body,
            context,
            ingested_at: chrono::Utc::now().timestamp(),
        }
    }

    /// The concrete event behind the trait object, if `T` matches.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.body.as_any().downcast_ref::<T>()
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("id", &self.id)
            .field("type_id", &self.type_id)
            .field("context", &self.context)
            .field("ingested_at", &self.ingested_at)
            .finish_non_exhaustive()
    }
}
