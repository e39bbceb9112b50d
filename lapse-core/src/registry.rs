use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Protocol;
use crate::error::Result;

pub const EXPIRATION_ACTION: &str = "expiration";

/// A dated action attached to a registry record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub action: String,
    pub date: String,
}

impl LifecycleEvent {
    pub fn new(action: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            date: date.into(),
        }
    }
}

/// What the scraper needs from a registry answer: its events, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRecord {
    pub events: Vec<LifecycleEvent>,
}

impl DomainRecord {
    pub fn new(events: Vec<LifecycleEvent>) -> Self {
        Self { events }
    }

    /// First event tagged as the expiration, if any.
    pub fn expiration_event(&self) -> Option<&LifecycleEvent> {
        self.events.iter().find(|e| e.action == EXPIRATION_ACTION)
    }
}

/// A registry that can be asked about a domain.
///
/// Implementations are shared across concurrently running lookups and must
/// not retry internally.
#[async_trait]
pub trait RegistryClient: Send + Sync + fmt::Debug {
    fn protocol(&self) -> Protocol;

    async fn query_domain(&self, name: &str) -> Result<DomainRecord>;
}

/// Registry clients by protocol, built once at start-up.
#[derive(Debug, Clone, Default)]
pub struct RegistryClients {
    clients: HashMap<Protocol, Arc<dyn RegistryClient>>,
}

impl RegistryClients {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(mut self, client: Arc<dyn RegistryClient>) -> Self {
        self.clients.insert(client.protocol(), client);
        self
    }

    pub fn get(&self, protocol: Protocol) -> Option<Arc<dyn RegistryClient>> {
        self.clients.get(&protocol).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiration_event_first_match_wins() {
        let record = DomainRecord::new(vec![
            LifecycleEvent::new("registration", "2020-01-01T00:00:00Z"),
            LifecycleEvent::new("expiration", "2030-01-01T00:00:00Z"),
            LifecycleEvent::new("expiration", "2031-01-01T00:00:00Z"),
        ]);

        let event = record.expiration_event().unwrap();
        assert_eq!(event.date, "2030-01-01T00:00:00Z");
    }

    #[test]
    fn test_expiration_event_missing() {
        let record = DomainRecord::new(vec![LifecycleEvent::new(
            "last changed",
            "2024-01-01T00:00:00Z",
        )]);
        assert!(record.expiration_event().is_none());
        assert!(DomainRecord::default().expiration_event().is_none());
    }
}
