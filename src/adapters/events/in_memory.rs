//! In-memory event bus.
//!
//! Keeps a bounded history of published envelopes for assertions and
//! fans every envelope out to live subscribers over a tokio broadcast
//! channel. Subscribers that fall behind lose the oldest envelopes.

use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::{broadcast, RwLock};

use crate::domain::foundation::{DomainError, EventEnvelope};
use crate::ports::EventPublisher;

const DEFAULT_HISTORY: usize = 1024;
const CHANNEL_CAPACITY: usize = 256;

/// In-process event bus.
///
/// # Example
///
/// ```ignore
/// let bus = Arc::new(InMemoryEventBus::new());
/// let mut rx = bus.subscribe();
///
/// bus.publish(envelope).await?;
/// assert_eq!(rx.recv().await?.event_type, "session.went_live.v1");
/// ```
pub struct InMemoryEventBus {
    history: RwLock<VecDeque<EventEnvelope>>,
    history_limit: usize,
    sender: broadcast::Sender<EventEnvelope>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY)
    }

    /// Keeps at most `limit` envelopes in history.
    pub fn with_history_limit(limit: usize) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            history: RwLock::new(VecDeque::new()),
            history_limit: limit.max(1),
            sender,
        }
    }

    /// Receives every envelope published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    pub async fn published_events(&self) -> Vec<EventEnvelope> {
        self.history.read().await.iter().cloned().collect()
    }

    /// Event types in publish order.
    pub async fn event_types(&self) -> Vec<String> {
        self.history
            .read()
            .await
            .iter()
            .map(|e| e.event_type.clone())
            .collect()
    }

    pub async fn events_of_type(&self, event_type: &str) -> Vec<EventEnvelope> {
        self.history
            .read()
            .await
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    pub async fn event_count(&self) -> usize {
        self.history.read().await.len()
    }

    pub async fn clear(&self) {
        self.history.write().await.clear();
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        {
            let mut history = self.history.write().await;
            if history.len() == self.history_limit {
                history.pop_front();
            }
            history.push_back(event.clone());
        }

        // No subscribers is not an error.
        let _ = self.sender.send(event);
        Ok(())
    }

    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}
