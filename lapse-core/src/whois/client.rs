use async_trait::async_trait;
use tracing::instrument;

use crate::config::Protocol;
use crate::error::{LapseError, Result};
use crate::registry::{DomainRecord, RegistryClient};

/// WHOIS registry client.
///
/// Declared so configurations can name the protocol, but lookups are not
/// implemented yet and every query fails. Configuration validation rejects
/// WHOIS domains, so a running scraper never reaches this client.
#[derive(Debug, Clone, Default)]
pub struct WhoisClient;

impl WhoisClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RegistryClient for WhoisClient {
    fn protocol(&self) -> Protocol {
        Protocol::Whois
    }

    #[instrument(skip(self), fields(domain = %name))]
    async fn query_domain(&self, name: &str) -> Result<DomainRecord> {
        Err(LapseError::NotImplemented(format!("whois lookup of {}", name)))
    }
}
