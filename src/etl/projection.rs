//! Projections fold envelopes into the stored snapshot
//!
//! Each projection processes envelopes independently.
//! Projections can filter by TypeId to only process events they're
//! interested in.

use async_trait::async_trait;
use std::sync::Arc;

use super::envelope::{Envelope, TypeId};

/// Projection trait - folds typed envelopes into durable state
///
/// Implementations must stay safe under at-least-once delivery: applying
/// the same envelope twice leaves full-overwrite records unchanged, while
/// delta accumulators are documented as replay-sensitive.
#[async_trait]
pub trait Projection: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Type ids this projection wants to see
    ///
    /// An empty Vec means the projection accepts every type.
    fn interested_types(&self) -> Vec<TypeId>;

    /// Apply a single envelope.
    async fn apply(&self, envelope: &Envelope) -> anyhow::Result<()>;
}

/// MultiProjection runs multiple projections in sequence
///
/// Envelopes are delivered strictly one at a time, in feed order, so the
/// writes of one event are visible before the next event is applied.
pub struct MultiProjection {
    projections: Vec<Arc<dyn Projection>>,
}

impl MultiProjection {
    pub fn new(projections: Vec<Arc<dyn Projection>>) -> Self {
        Self { projections }
    }

    /// Apply one envelope to every interested projection, in order.
    ///
    /// A projection failure is logged and skipped: one bad event never
    /// stalls the feed, and the envelope still reaches the remaining
    /// projections.
    pub async fn apply(&self, envelope: &Envelope) -> anyhow::Result<()> {
        for projection in &self.projections {
            let interested = projection.interested_types();
            if !interested.is_empty() && !interested.contains(&envelope.type_id) {
                continue;
            }

            if let Err(e) = projection.apply(envelope).await {
                tracing::error!(
                    target: "luckypot::etl::multi_projection",
                    "Projection '{}' failed on envelope '{}': {}",
                    projection.name(),
                    envelope.id,
                    e
                );
            }
        }

        Ok(())
    }

    /// Apply a batch sequentially, one envelope at a time.
    pub async fn apply_batch(&self, envelopes: &[Envelope]) -> anyhow::Result<()> {
        for envelope in envelopes {
            self.apply(envelope).await?;
        }

        tracing::debug!(
            target: "luckypot::etl::multi_projection",
            "Applied {} envelopes across {} projections",
            envelopes.len(),
            self.projections.len()
        );

        Ok(())
    }
}
