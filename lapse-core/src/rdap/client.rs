use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

use super::types::RdapResponse;
use crate::config::{HttpClientConfig, Protocol, RdapConfig};
use crate::error::{LapseError, Result};
use crate::registry::{DomainRecord, RegistryClient};
use crate::validation::normalize_domain;

const RDAP_MEDIA_TYPE: &str = "application/rdap+json";

/// Builds the HTTP transport shared by every registry query.
pub fn build_transport(config: &HttpClientConfig) -> Result<Client> {
    Ok(Client::builder()
        .timeout(config.timeout())
        .user_agent(config.user_agent.as_str())
        .build()?)
}

#[derive(Deserialize)]
struct BootstrapResponse {
    services: Vec<Vec<serde_json::Value>>,
}

/// TLD to RDAP base URL, from an IANA bootstrap registry.
#[derive(Debug, Default)]
struct DnsBootstrap {
    servers: HashMap<String, String>,
}

impl DnsBootstrap {
    fn from_response(response: BootstrapResponse) -> Self {
        let mut servers = HashMap::new();

        for service in response.services {
            if service.len() < 2 {
                continue;
            }
            if let (Some(tlds), Some(urls)) = (service[0].as_array(), service[1].as_array()) {
                // prefer https when a service lists several base URLs
                let url = urls
                    .iter()
                    .filter_map(|u| u.as_str())
                    .find(|u| u.starts_with("https://"))
                    .or_else(|| urls.first().and_then(|u| u.as_str()));

                if let Some(url) = url {
                    for tld in tlds.iter().filter_map(|t| t.as_str()) {
                        servers.insert(tld.to_lowercase(), url.to_string());
                    }
                }
            }
        }

        Self { servers }
    }

    /// Longest registered suffix of `domain` wins.
    fn server_for(&self, domain: &str) -> Option<&str> {
        let mut suffix = domain;
        loop {
            if let Some(url) = self.servers.get(suffix) {
                return Some(url);
            }
            let (_, rest) = suffix.split_once('.')?;
            suffix = rest;
        }
    }
}

/// RDAP client over an externally built HTTP transport.
///
/// Cloning is cheap and clones share the bootstrap registry, which is loaded
/// once on first use. A failed load is retried by the next query.
#[derive(Debug, Clone)]
pub struct RdapClient {
    http: Client,
    settings: RdapConfig,
    bootstrap: Arc<OnceCell<DnsBootstrap>>,
}

impl RdapClient {
    pub fn new(http: Client, settings: RdapConfig) -> Self {
        Self {
            http,
            settings,
            bootstrap: Arc::new(OnceCell::new()),
        }
    }

    async fn load_bootstrap(&self) -> Result<DnsBootstrap> {
        debug!(url = %self.settings.bootstrap_url, "Loading RDAP bootstrap data");

        let response = self
            .http
            .get(&self.settings.bootstrap_url)
            .send()
            .await
            .map_err(|e| LapseError::RdapBootstrapError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LapseError::RdapBootstrapError(format!(
                "bootstrap registry returned status {}",
                response.status()
            )));
        }

        let data: BootstrapResponse = response
            .json()
            .await
            .map_err(|e| LapseError::RdapBootstrapError(e.to_string()))?;
        let bootstrap = DnsBootstrap::from_response(data);

        debug!(dns_entries = bootstrap.servers.len(), "RDAP bootstrap loaded");
        Ok(bootstrap)
    }

    async fn base_url_for(&self, domain: &str) -> Result<String> {
        if let Some(server) = &self.settings.server_url {
            return Ok(server.clone());
        }

        let bootstrap = self
            .bootstrap
            .get_or_try_init(|| self.load_bootstrap())
            .await?;

        bootstrap
            .server_for(domain)
            .map(str::to_string)
            .ok_or_else(|| LapseError::RdapBootstrapError(format!("No RDAP server for {}", domain)))
    }

    #[instrument(skip(self), fields(domain = %domain))]
    pub async fn lookup_domain(&self, domain: &str) -> Result<RdapResponse> {
        let domain = normalize_domain(domain)?;
        let base_url = self.base_url_for(&domain).await?;

        let url = format!("{}domain/{}", ensure_trailing_slash(&base_url), domain);
        debug!(url = %url, "Querying RDAP");

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, RDAP_MEDIA_TYPE)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response.json().await?),
            StatusCode::NOT_FOUND => Err(LapseError::DomainNotFound(domain)),
            status => Err(LapseError::RdapError(format!(
                "RDAP query failed with status {}",
                status
            ))),
        }
    }
}

#[async_trait]
impl RegistryClient for RdapClient {
    fn protocol(&self) -> Protocol {
        Protocol::Rdap
    }

    async fn query_domain(&self, name: &str) -> Result<DomainRecord> {
        self.lookup_domain(name).await.map(DomainRecord::from)
    }
}

fn ensure_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}
