//! EventPublisher port - Interface for publishing domain events.
//!
//! Lifecycle handlers publish after the state change is persisted. A
//! failed publish never rolls back the change.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};

#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a single event.
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Publish events in order. Adapters without atomic delivery publish
    /// sequentially and stop at the first failure.
    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError>;
}
