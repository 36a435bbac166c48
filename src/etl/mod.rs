pub mod envelope;
pub mod projection;

pub use envelope::{Envelope, EventContext, TypeId, TypedBody};
pub use projection::{MultiProjection, Projection};
