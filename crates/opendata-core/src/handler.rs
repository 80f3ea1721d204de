//! Event handler abstraction.

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::event::DomainEvent;

/// A reactive consumer of domain events.
///
/// Handlers never receive ownership of the event and must tolerate
/// redelivery: delivery is at-least-once, not exactly-once.
#[async_trait]
pub trait EventHandler<E: DomainEvent>: Send + Sync {
    /// Stable name used in logs and dead-letter context.
    fn name(&self) -> &'static str;

    /// Reacts to a single event.
    ///
    /// Failures are caught by the dispatcher and recorded as dead letters;
    /// they never abort the dispatch cycle.
    async fn handle(&self, event: &E) -> Result<(), HandlerError>;
}
