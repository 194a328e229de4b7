//! Prometheus metrics for the event projector

use anyhow::Result;

/// Counters covering every projection outcome
pub struct ProjectorMetrics {
    pub events_applied: prometheus::IntCounter,
    pub duplicates_discarded: prometheus::IntCounter,
    pub events_skipped: prometheus::IntCounter,
    pub projection_failures: prometheus::IntCounter,
}

impl ProjectorMetrics {
    pub fn new() -> Self {
        Self {
            events_applied: prometheus::IntCounter::new(
                "redress_projector_events_applied_total",
                "Ledger events applied to the projection",
            )
            .unwrap(),
            duplicates_discarded: prometheus::IntCounter::new(
                "redress_projector_duplicates_discarded_total",
                "Duplicate deliveries discarded without writes",
            )
            .unwrap(),
            events_skipped: prometheus::IntCounter::new(
                "redress_projector_events_skipped_total",
                "Events skipped because no local submission matched",
            )
            .unwrap(),
            projection_failures: prometheus::IntCounter::new(
                "redress_projector_failures_total",
                "Projection transactions rolled back",
            )
            .unwrap(),
        }
    }

    pub fn register(&self, registry: &prometheus::Registry) -> Result<()> {
        registry.register(Box::new(self.events_applied.clone()))?;
        registry.register(Box::new(self.duplicates_discarded.clone()))?;
        registry.register(Box::new(self.events_skipped.clone()))?;
        registry.register(Box::new(self.projection_failures.clone()))?;
        Ok(())
    }
}

impl Default for ProjectorMetrics {
    fn default() -> Self {
        Self::new()
    }
}
